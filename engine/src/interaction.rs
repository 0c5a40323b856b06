use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::timer::Cooldown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    Advance,
    Retreat,
    TogglePlay,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapZone {
    Left,
    Middle,
    Right,
}

impl TapZone {
    pub fn intent(self) -> Intent {
        match self {
            TapZone::Left => Intent::Retreat,
            TapZone::Middle => Intent::TogglePlay,
            TapZone::Right => Intent::Advance,
        }
    }
}

/// Horizontal extent of the interactive surface, in the same space as pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    #[serde(default)]
    pub left: f32,
    pub width: f32,
}

impl Surface {
    pub fn with_width(width: f32) -> Self {
        Self { left: 0.0, width }
    }

    /// Thirds of the surface; points outside it fall into the nearest edge zone.
    pub fn zone_at(&self, x: f32) -> Option<TapZone> {
        if !(self.width > 0.0) || !x.is_finite() {
            return None;
        }
        let rel = x - self.left;
        let third = self.width / 3.0;
        Some(if rel < third {
            TapZone::Left
        } else if rel >= third * 2.0 {
            TapZone::Right
        } else {
            TapZone::Middle
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub at: Instant,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, at: Instant) -> Self {
        Self { x, y, at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Finger moved right: go back.
    SwipeRight,
    /// Finger moved left: go forward.
    SwipeLeft,
    Tap(TapZone),
    Ignored,
}

impl Gesture {
    pub fn intent(self) -> Option<Intent> {
        match self {
            Gesture::SwipeRight => Some(Intent::Retreat),
            Gesture::SwipeLeft => Some(Intent::Advance),
            Gesture::Tap(zone) => Some(zone.intent()),
            Gesture::Ignored => None,
        }
    }
}

pub fn classify(
    start: PointerSample,
    end: PointerSample,
    surface: Surface,
    config: &GestureConfig,
) -> Gesture {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let dt = end.at.saturating_duration_since(start.at);

    if dx.abs() > config.swipe_min_distance && dx.abs() > dy.abs() {
        return if dx > 0.0 {
            Gesture::SwipeRight
        } else {
            Gesture::SwipeLeft
        };
    }

    let still = dx.abs() < config.tap_max_movement && dy.abs() < config.tap_max_movement;
    if dt < config.tap_max_duration && still {
        if let Some(zone) = surface.zone_at(end.x) {
            return Gesture::Tap(zone);
        }
    }

    Gesture::Ignored
}

/// Remembers the pointer-down of the gesture in progress.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    start: Option<PointerSample>,
}

impl GestureTracker {
    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    pub fn pointer_down(&mut self, sample: PointerSample) {
        self.start = Some(sample);
    }

    /// Ends the gesture. An up without a matching down is ignored.
    pub fn pointer_up(
        &mut self,
        sample: PointerSample,
        surface: Surface,
        config: &GestureConfig,
    ) -> Gesture {
        match self.start.take() {
            Some(start) => classify(start, sample, surface, config),
            None => Gesture::Ignored,
        }
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }
}

/// Discrete (non-touch) click: zone only, no movement or timing.
pub fn click_intent(x: f32, surface: Surface) -> Option<Intent> {
    surface.zone_at(x).map(TapZone::intent)
}

/// Maps DOM-style key names.
pub fn key_intent(key: &str) -> Option<Intent> {
    match key {
        "ArrowLeft" => Some(Intent::Retreat),
        "ArrowRight" | " " | "Space" | "Spacebar" => Some(Intent::Advance),
        "Escape" | "Esc" => Some(Intent::Close),
        "p" | "P" => Some(Intent::TogglePlay),
        _ => None,
    }
}

/// Re-entrancy guard shared by every input path: after one intent is let through, the rest
/// are dropped until the cooldown runs out.
#[derive(Debug, Clone)]
pub struct IntentGate {
    window: Duration,
    cooldown: Cooldown,
}

impl IntentGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cooldown: Cooldown::default(),
        }
    }

    pub fn try_pass(&mut self, now: Instant) -> bool {
        if self.cooldown.is_active(now) {
            return false;
        }
        self.cooldown.engage(now, self.window);
        true
    }

    pub fn reset(&mut self) {
        self.cooldown.clear();
    }
}
