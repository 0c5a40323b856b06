use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_NAVIGATION_COOLDOWN: Duration = Duration::from_millis(100);
pub const DEFAULT_STORY_DURATION: Duration = Duration::from_millis(5_000);
pub const MIN_STORY_DURATION: Duration = Duration::from_millis(1_000);

pub const DEFAULT_TAP_MAX_DURATION: Duration = Duration::from_millis(300);
pub const DEFAULT_INTENT_COOLDOWN: Duration = Duration::from_millis(200);

/// Timing knobs for the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    #[serde(with = "crate::serde_duration")]
    pub tick_interval: Duration,
    #[serde(with = "crate::serde_duration")]
    pub navigation_cooldown: Duration,
    /// Used when a story has no usable duration of its own.
    #[serde(with = "crate::serde_duration")]
    pub default_story_duration: Duration,
    #[serde(with = "crate::serde_duration")]
    pub min_story_duration: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            navigation_cooldown: DEFAULT_NAVIGATION_COOLDOWN,
            default_story_duration: DEFAULT_STORY_DURATION,
            min_story_duration: MIN_STORY_DURATION,
        }
    }
}

impl PlaybackConfig {
    pub fn sanitized(mut self) -> Self {
        let one_ms = Duration::from_millis(1);
        self.tick_interval = self.tick_interval.max(one_ms);
        // A story shorter than one tick would complete before it is ever drawn.
        self.min_story_duration = self.min_story_duration.max(self.tick_interval);
        self.default_story_duration = self.default_story_duration.max(self.min_story_duration);
        self.navigation_cooldown = self.navigation_cooldown.min(self.min_story_duration);
        self
    }

    /// Resolves a raw catalog duration (milliseconds) into the effective story duration.
    pub fn story_duration(&self, raw_ms: Option<i64>) -> Duration {
        match raw_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64).max(self.min_story_duration),
            _ => self.default_story_duration,
        }
    }
}

/// Thresholds for turning raw pointer input into intents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GestureConfig {
    #[serde(with = "crate::serde_duration")]
    pub tap_max_duration: Duration,
    pub tap_max_movement: f32,
    pub swipe_min_distance: f32,
    #[serde(with = "crate::serde_duration")]
    pub intent_cooldown: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_max_duration: DEFAULT_TAP_MAX_DURATION,
            tap_max_movement: 30.0,
            swipe_min_distance: 50.0,
            intent_cooldown: DEFAULT_INTENT_COOLDOWN,
        }
    }
}

impl GestureConfig {
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.tap_max_movement.is_finite() || self.tap_max_movement < 0.0 {
            self.tap_max_movement = defaults.tap_max_movement;
        }
        if !self.swipe_min_distance.is_finite() || self.swipe_min_distance < 0.0 {
            self.swipe_min_distance = defaults.swipe_min_distance;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_duration_defaults_and_clamps() {
        let cfg = PlaybackConfig::default();
        assert_eq!(cfg.story_duration(None), DEFAULT_STORY_DURATION);
        assert_eq!(cfg.story_duration(Some(0)), DEFAULT_STORY_DURATION);
        assert_eq!(cfg.story_duration(Some(-250)), DEFAULT_STORY_DURATION);
        assert_eq!(cfg.story_duration(Some(200)), MIN_STORY_DURATION);
        assert_eq!(
            cfg.story_duration(Some(7_500)),
            Duration::from_millis(7_500)
        );
    }

    #[test]
    fn sanitized_keeps_min_duration_above_one_tick() {
        let cfg = PlaybackConfig {
            tick_interval: Duration::ZERO,
            min_story_duration: Duration::ZERO,
            default_story_duration: Duration::ZERO,
            ..PlaybackConfig::default()
        }
        .sanitized();

        assert_eq!(cfg.tick_interval, Duration::from_millis(1));
        assert_eq!(cfg.min_story_duration, Duration::from_millis(1));
        assert_eq!(cfg.default_story_duration, Duration::from_millis(1));
    }

    #[test]
    fn sanitized_keeps_navigation_cooldown_within_shortest_story() {
        let cfg = PlaybackConfig {
            navigation_cooldown: Duration::from_millis(4_000),
            ..PlaybackConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.navigation_cooldown, MIN_STORY_DURATION);
        assert_eq!(
            PlaybackConfig::default().sanitized().navigation_cooldown,
            DEFAULT_NAVIGATION_COOLDOWN
        );
    }

    #[test]
    fn gesture_config_fills_missing_fields_from_defaults() {
        let parsed: GestureConfig =
            serde_json::from_str(r#"{"tapMaxDuration":200}"#).expect("gesture JSON should parse");
        assert_eq!(parsed.tap_max_duration, Duration::from_millis(200));
        assert_eq!(parsed.swipe_min_distance, 50.0);
        assert_eq!(parsed.intent_cooldown, DEFAULT_INTENT_COOLDOWN);
    }
}
