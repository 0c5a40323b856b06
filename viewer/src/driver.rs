use std::time::Instant;

use log::{debug, info};
use story_engine::{
    AssetLoader, Intent, IntentOutcome, Navigation, PlaybackEvent, PreloadReport, Preloader,
    StorySession, Surface, ViewerFrame,
};
use tokio::sync::{mpsc, oneshot, watch};

/// Input from the host surface or the remote API.
#[derive(Debug)]
pub enum DriverCommand {
    Intent {
        intent: Intent,
        respond: oneshot::Sender<CommandReply>,
    },
    PointerDown {
        x: f32,
        y: f32,
    },
    PointerUp {
        x: f32,
        y: f32,
        surface: Surface,
        respond: oneshot::Sender<CommandReply>,
    },
    Click {
        x: f32,
        surface: Surface,
        respond: oneshot::Sender<CommandReply>,
    },
    Key {
        key: String,
        respond: oneshot::Sender<CommandReply>,
    },
    AssetReady {
        index: usize,
        respond: oneshot::Sender<bool>,
    },
    Snapshot {
        respond: oneshot::Sender<ViewerFrame>,
    },
    /// Host teardown. Bypasses the intent gate.
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    /// `None` when the input did not map to an intent.
    pub outcome: Option<IntentOutcome>,
    pub frame: ViewerFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// The last story finished (or the user advanced past it).
    Completed,
    Closed,
    /// Every command sender went away.
    Disconnected,
}

pub struct SessionDriver<L> {
    session: StorySession,
    preloader: Preloader<L>,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    reports_tx: mpsc::UnboundedSender<PreloadReport>,
    reports_rx: mpsc::UnboundedReceiver<PreloadReport>,
    frames: watch::Sender<ViewerFrame>,
    completions_seen: usize,
}

impl<L: AssetLoader> SessionDriver<L> {
    pub fn new(
        session: StorySession,
        preloader: Preloader<L>,
    ) -> (Self, mpsc::UnboundedSender<DriverCommand>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (frames, _) = watch::channel(session.frame());
        let completions_seen = session.completions();
        let driver = Self {
            session,
            preloader,
            commands,
            reports_tx,
            reports_rx,
            frames,
            completions_seen,
        };
        (driver, tx)
    }

    /// Latest frame, republished after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewerFrame> {
        self.frames.subscribe()
    }

    pub async fn run(mut self) -> DriverExit {
        let mut exit = DriverExit::Closed;
        loop {
            if self.take_completion() {
                info!("last story finished, closing viewer");
                self.session.close();
                exit = DriverExit::Completed;
            }
            self.spawn_preloads();
            self.publish();
            if self.session.is_closed() {
                return exit;
            }

            let deadline = self
                .session
                .next_deadline()
                .map(tokio::time::Instant::from_std);

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => {
                        debug!("all command senders dropped");
                        self.session.close();
                        self.publish();
                        return DriverExit::Disconnected;
                    }
                },
                Some(report) = self.reports_rx.recv() => {
                    self.session.report_preload(report, now());
                }
                _ = wait_until(deadline) => {
                    for event in self.session.poll(now()) {
                        log_event(event);
                    }
                }
            }
        }
    }

    fn handle(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::Intent { intent, respond } => {
                let outcome = self.session.dispatch(intent, now());
                self.reply(respond, Some(outcome));
            }
            DriverCommand::PointerDown { x, y } => self.session.pointer_down(x, y, now()),
            DriverCommand::PointerUp {
                x,
                y,
                surface,
                respond,
            } => {
                let outcome = self.session.pointer_up(x, y, surface, now());
                self.reply(respond, outcome);
            }
            DriverCommand::Click {
                x,
                surface,
                respond,
            } => {
                let outcome = self.session.click(x, surface, now());
                self.reply(respond, outcome);
            }
            DriverCommand::Key { key, respond } => {
                let outcome = self.session.key(&key, now());
                self.reply(respond, outcome);
            }
            DriverCommand::AssetReady { index, respond } => {
                let accepted = self.session.report_asset_ready(index, now());
                let _ = respond.send(accepted);
            }
            DriverCommand::Snapshot { respond } => {
                let _ = respond.send(self.session.frame());
            }
            DriverCommand::Close => {
                self.session.close();
            }
        }
    }

    fn reply(&mut self, respond: oneshot::Sender<CommandReply>, outcome: Option<IntentOutcome>) {
        if let Some(outcome) = outcome {
            debug!("input resolved to {outcome:?}");
        }
        let _ = respond.send(CommandReply {
            outcome,
            frame: self.session.frame(),
        });
    }

    fn take_completion(&mut self) -> bool {
        let seen = self.session.completions();
        let fresh = seen > self.completions_seen;
        self.completions_seen = seen;
        fresh
    }

    fn spawn_preloads(&mut self) {
        for index in self.session.take_preload_requests() {
            let preloader = self.preloader.clone();
            let reports = self.reports_tx.clone();
            tokio::spawn(async move {
                let report = preloader.preload(index).await;
                // The driver may have exited; a late report has nowhere to go.
                let _ = reports.send(report);
            });
        }
    }

    fn publish(&self) {
        let frame = self.session.frame();
        self.frames.send_if_modified(|current| {
            if *current == frame {
                false
            } else {
                *current = frame;
                true
            }
        });
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn log_event(event: PlaybackEvent) {
    match event {
        PlaybackEvent::Ticked { .. } => {}
        PlaybackEvent::Navigated { from, to } => debug!("autoplay moved {from} -> {to}"),
        PlaybackEvent::Completed => debug!("autoplay ran off the end"),
    }
}

/// Short machine-friendly label for an outcome, used on the wire and in the CLI.
pub fn outcome_label(outcome: IntentOutcome) -> &'static str {
    match outcome {
        IntentOutcome::Navigated(Navigation::Moved { .. }) => "moved",
        IntentOutcome::Navigated(Navigation::Completed) => "completed",
        IntentOutcome::Navigated(Navigation::Locked) => "locked",
        IntentOutcome::Navigated(Navigation::AtStart) => "atStart",
        IntentOutcome::Navigated(Navigation::Closed) => "inactive",
        IntentOutcome::PlayToggled { playing: true } => "playing",
        IntentOutcome::PlayToggled { playing: false } => "paused",
        IntentOutcome::Closed => "closed",
        IntentOutcome::Debounced => "debounced",
        IntentOutcome::KeySuppressed => "keySuppressed",
        IntentOutcome::Inactive => "inactive",
    }
}
