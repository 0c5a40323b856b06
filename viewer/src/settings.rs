use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use story_engine::{GestureConfig, PlaybackConfig};
use thiserror::Error;

pub const DEFAULT_API_PORT: u16 = 4100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_API_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            playback: PlaybackConfig::default(),
            gestures: GestureConfig::default(),
            remote: RemoteSettings::default(),
        }
    }
}

impl ViewerSettings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.playback = self.playback.sanitized();
        self.gestures = self.gestures.sanitized();
        if self.remote.port == 0 {
            self.remote.port = DEFAULT_API_PORT;
        }
        self
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut get_env: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(explicit) = get_env("STORY_VIEWER_SETTINGS_PATH") {
            return Self::new(explicit);
        }

        let base = get_env("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| get_env("HOME").map(|home| Path::new(&home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(base.join("story-viewer").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield defaults; settings never block playback.
    pub fn load(&self) -> ViewerSettings {
        let Ok(bytes) = fs::read(&self.path) else {
            return ViewerSettings::default();
        };
        match serde_json::from_slice::<ViewerSettings>(&bytes) {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                log::warn!(
                    "ignoring corrupt settings at {}: {err}",
                    self.path.display()
                );
                ViewerSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &ViewerSettings) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, text).map_err(write_err)
    }
}

/// Address for the remote API: `STORY_VIEWER_API_ADDR`, then `STORY_VIEWER_API_PORT`,
/// then the configured port on localhost.
pub fn resolve_api_addr<F>(mut get_env: F, configured_port: u16) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("STORY_VIEWER_API_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    let port = get_env("STORY_VIEWER_API_PORT")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(configured_port);
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn serde_defaults_fill_missing_sections() {
        let parsed: ViewerSettings =
            serde_json::from_str(r#"{"version":1,"playback":{"tickInterval":50}}"#)
                .expect("settings JSON should parse");
        assert_eq!(parsed.playback.tick_interval, Duration::from_millis(50));
        assert_eq!(
            parsed.playback.navigation_cooldown,
            PlaybackConfig::default().navigation_cooldown
        );
        assert_eq!(parsed.gestures, GestureConfig::default());
        assert_eq!(parsed.remote, RemoteSettings::default());
    }

    #[test]
    fn sanitized_repairs_out_of_range_values() {
        let settings = ViewerSettings {
            version: 7,
            playback: PlaybackConfig {
                tick_interval: Duration::ZERO,
                ..PlaybackConfig::default()
            },
            gestures: GestureConfig {
                swipe_min_distance: -4.0,
                ..GestureConfig::default()
            },
            remote: RemoteSettings {
                enabled: true,
                port: 0,
            },
        }
        .sanitized();

        assert_eq!(settings.version, 1);
        assert_eq!(settings.playback.tick_interval, Duration::from_millis(1));
        assert_eq!(settings.gestures.swipe_min_distance, 50.0);
        assert_eq!(settings.remote.port, DEFAULT_API_PORT);
    }

    #[test]
    fn store_prefers_explicit_path_then_xdg() {
        let explicit = SettingsStore::from_env_with(|k| match k {
            "STORY_VIEWER_SETTINGS_PATH" => Some("/tmp/custom.json".to_string()),
            "XDG_CONFIG_HOME" => Some("/xdg".to_string()),
            _ => None,
        });
        assert_eq!(explicit.path(), Path::new("/tmp/custom.json"));

        let xdg = SettingsStore::from_env_with(|k| match k {
            "XDG_CONFIG_HOME" => Some("/xdg".to_string()),
            "HOME" => Some("/home/me".to_string()),
            _ => None,
        });
        assert_eq!(xdg.path(), Path::new("/xdg/story-viewer/settings.json"));

        let home = SettingsStore::from_env_with(|k| match k {
            "HOME" => Some("/home/me".to_string()),
            _ => None,
        });
        assert_eq!(
            home.path(),
            Path::new("/home/me/.config/story-viewer/settings.json")
        );
    }

    #[test]
    fn save_then_load_keeps_values_and_corrupt_files_fall_back() {
        let dir = std::env::temp_dir().join(format!("story-viewer-settings-{}", std::process::id()));
        let store = SettingsStore::new(dir.join("nested").join("settings.json"));

        let mut settings = ViewerSettings::default();
        settings.playback.navigation_cooldown = Duration::from_millis(250);
        settings.remote.enabled = true;
        store.save(&settings).expect("save should create parent dirs");
        assert_eq!(store.load(), settings);

        fs::write(store.path(), "{not json").expect("overwrite settings");
        assert_eq!(store.load(), ViewerSettings::default());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_addr_defaults_to_configured_port() {
        let addr = resolve_api_addr(|_| None, DEFAULT_API_PORT);
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4100)));
    }

    #[test]
    fn api_addr_ignores_invalid_addr_but_uses_valid_port() {
        let addr = resolve_api_addr(
            |k| match k {
                "STORY_VIEWER_API_ADDR" => Some("not-an-addr".to_string()),
                "STORY_VIEWER_API_PORT" => Some("4557".to_string()),
                _ => None,
            },
            DEFAULT_API_PORT,
        );
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4557)));
    }

    #[test]
    fn api_addr_prefers_explicit_addr() {
        let addr = resolve_api_addr(
            |k| match k {
                "STORY_VIEWER_API_ADDR" => Some("0.0.0.0:4555".to_string()),
                _ => None,
            },
            DEFAULT_API_PORT,
        );
        assert_eq!(addr, "0.0.0.0:4555".parse().unwrap());
    }
}
