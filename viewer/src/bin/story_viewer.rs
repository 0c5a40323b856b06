use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use story_engine::{Catalog, PlaybackConfig, Preloader, StorySession, ViewerFrame};
use story_viewer::console::{is_notable_change, key_for_line, render_line};
use story_viewer::remote_api::RemoteServer;
use story_viewer::settings::resolve_api_addr;
use story_viewer::{DriverCommand, DriverExit, MediaLoader, SessionDriver, SettingsStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Parser)]
#[command(name = "story-viewer")]
#[command(about = "Full-screen story playback, driven from the terminal or a local HTTP API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a catalog until the last story finishes or the viewer is closed.
    Play {
        catalog: PathBuf,
        /// Zero-based index of the first story shown.
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Also serve the remote control API.
        #[arg(long, default_value_t = false)]
        serve: bool,
        /// Listen address for the remote API (overrides env and settings).
        #[arg(long)]
        addr: Option<SocketAddr>,
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Parse a catalog and print the normalized stories.
    Check {
        catalog: PathBuf,
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Write the effective settings (defaults filled in, values repaired) back to disk.
    InitSettings {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play {
            catalog,
            start,
            serve,
            addr,
            settings,
        } => {
            let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            let exit = rt.block_on(play(catalog, start, serve, addr, settings));
            // Stdin reads park a blocking thread that never returns on its own.
            rt.shutdown_timeout(Duration::from_millis(100));
            let exit = exit?;
            info!("viewer exited: {exit:?}");
            Ok(())
        }
        Commands::Check { catalog, settings } => check(&catalog, settings),
        Commands::InitSettings { settings } => {
            let store = settings_store(settings);
            let effective = store.load();
            store.save(&effective)?;
            println!("wrote {}", store.path().display());
            Ok(())
        }
    }
}

fn settings_store(explicit: Option<PathBuf>) -> SettingsStore {
    explicit.map_or_else(SettingsStore::from_env, SettingsStore::new)
}

fn load_catalog(path: &Path, config: &PlaybackConfig) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalog::from_json(&text, config)
        .with_context(|| format!("invalid catalog {}", path.display()))
}

fn check(path: &Path, settings: Option<PathBuf>) -> Result<()> {
    let settings = settings_store(settings).load();
    let catalog = load_catalog(path, &settings.playback)?;
    for (index, item) in catalog.items().iter().enumerate() {
        println!(
            "{:>3}  {:<16} {:>6}ms  {:<16} {}",
            index,
            item.id,
            item.duration.as_millis(),
            item.display_name(),
            item.media_url
        );
    }
    println!("{} stories", catalog.len());
    Ok(())
}

async fn play(
    path: PathBuf,
    start: usize,
    serve: bool,
    addr: Option<SocketAddr>,
    settings: Option<PathBuf>,
) -> Result<DriverExit> {
    let store = settings_store(settings);
    let settings = store.load();
    let catalog = load_catalog(&path, &settings.playback)?;
    if start > catalog.last_index() {
        warn!(
            "start index {start} is past the end, clamping to {}",
            catalog.last_index()
        );
    }

    let mut loader = MediaLoader::new();
    if let Some(root) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        loader = loader.with_media_root(root);
    }

    let session = StorySession::open(
        catalog.clone(),
        start,
        settings.playback,
        settings.gestures,
        tokio::time::Instant::now().into_std(),
    );
    let preloader = Preloader::new(catalog, loader);
    let (driver, tx) = SessionDriver::new(session, preloader);
    let frames = driver.subscribe();

    let _server = if serve || settings.remote.enabled {
        let addr = addr.unwrap_or_else(|| {
            resolve_api_addr(|key| std::env::var(key).ok(), settings.remote.port)
        });
        let server = RemoteServer::start(addr, tx.clone())
            .with_context(|| format!("failed to bind remote api on {addr}"))?;
        println!("remote api on http://{}", server.addr());
        Some(server)
    } else {
        None
    };

    tokio::spawn(print_frames(frames));
    tokio::spawn(read_console(tx.clone()));

    let exit = driver.run().await;
    drop(tx);
    Ok(exit)
}

async fn print_frames(mut frames: watch::Receiver<ViewerFrame>) {
    let mut last: Option<ViewerFrame> = None;
    loop {
        let frame = frames.borrow_and_update().clone();
        if is_notable_change(last.as_ref(), &frame) {
            println!("{}", render_line(&frame));
        }
        last = Some(frame);
        if frames.changed().await.is_err() {
            return;
        }
    }
}

async fn read_console(tx: mpsc::UnboundedSender<DriverCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            // No console attached; playback continues until the last story or the API closes it.
            Ok(None) => return,
            Err(err) => {
                warn!("console input failed: {err}");
                return;
            }
        };
        let Some(key) = key_for_line(&line) else {
            println!("keys: <enter>/n next, b back, p pause, q quit");
            continue;
        };
        let (respond, rx) = oneshot::channel();
        let cmd = DriverCommand::Key {
            key: key.to_string(),
            respond,
        };
        if tx.send(cmd).is_err() {
            return;
        }
        if let Ok(reply) = rx.await {
            if let Some(outcome) = reply.outcome {
                info!(
                    "{key} -> {}",
                    story_viewer::driver::outcome_label(outcome)
                );
            }
        }
    }
}
