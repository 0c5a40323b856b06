//! The engine never reads a clock: every operation takes the caller's `now`, and deferred
//! work only happens inside [`PlaybackEngine::poll`].

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use crate::config::PlaybackConfig;
use crate::story::{Catalog, StoryItem};
use crate::timer::{Cooldown, IntervalTimer, ProgressTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    Playing,
    Paused,
    Loading,
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    /// `advance` at the last story: the session is over.
    Completed,
    /// Ignored: another navigation happened within the cooldown window.
    Locked,
    /// `retreat` at the first story.
    AtStart,
    Closed,
}

impl Navigation {
    pub fn moved_to(self) -> Option<usize> {
        match self {
            Navigation::Moved { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// Something that happened while deferred timers were fired by [`PlaybackEngine::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Ticked { index: usize, percent: f32 },
    Navigated { from: usize, to: usize },
    Completed,
}

/// Read-only snapshot handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_index: usize,
    pub progress_percent: f32,
    pub is_playing: bool,
    pub is_loading: bool,
    pub preloaded: Vec<usize>,
    pub navigation_locked: bool,
    pub total_count: usize,
    pub phase: PlaybackPhase,
}

/// Everything the progress ticker depends on. A change in any of these tears the ticker down
/// and starts a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickerKey {
    playing: bool,
    loading: bool,
    duration: Duration,
}

#[derive(Debug)]
pub struct PlaybackEngine {
    catalog: Catalog,
    config: PlaybackConfig,
    current: usize,
    progress: ProgressTimer,
    playing: bool,
    loading: bool,
    preloaded: BTreeSet<usize>,
    nav_lock: Cooldown,
    ticker: IntervalTimer,
    ticker_key: Option<TickerKey>,
    closed: bool,
}

impl PlaybackEngine {
    /// Opens a session at `initial_index`, clamped into the catalog. The first story starts
    /// playing but loading: nothing has been confirmed ready yet.
    pub fn open(
        catalog: Catalog,
        initial_index: usize,
        config: PlaybackConfig,
        now: Instant,
    ) -> Self {
        let config = config.sanitized();
        let current = catalog.clamp_index(initial_index);
        let limit = catalog.items()[current].duration.max(config.min_story_duration);

        let mut engine = Self {
            catalog,
            config,
            current,
            progress: ProgressTimer::new(limit),
            playing: true,
            loading: true,
            preloaded: BTreeSet::new(),
            nav_lock: Cooldown::default(),
            ticker: IntervalTimer::new(config.tick_interval),
            ticker_key: None,
            closed: false,
        };
        engine.sync_ticker(now, true);
        debug!(
            "playback opened at {}/{} (requested {initial_index})",
            current + 1,
            engine.catalog.len()
        );
        engine
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_story(&self) -> &StoryItem {
        &self.catalog.items()[self.current]
    }

    pub fn total_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn progress_percent(&self) -> f32 {
        self.progress.percent()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_preloaded(&self, index: usize) -> bool {
        self.preloaded.contains(&index)
    }

    pub fn preloaded(&self) -> &BTreeSet<usize> {
        &self.preloaded
    }

    pub fn navigation_locked(&self) -> bool {
        self.nav_lock.is_engaged()
    }

    /// Like [`navigation_locked`](Self::navigation_locked), but counts a lock whose deadline
    /// has passed as released even if no poll has run since.
    pub fn navigation_locked_at(&self, now: Instant) -> bool {
        self.nav_lock.until().is_some_and(|until| now < until)
    }

    pub fn ticker_armed(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.loading {
            PlaybackPhase::Loading
        } else if self.playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.current,
            progress_percent: self.progress_percent(),
            is_playing: self.playing,
            is_loading: self.loading,
            preloaded: self.preloaded.iter().copied().collect(),
            navigation_locked: self.navigation_locked(),
            total_count: self.catalog.len(),
            phase: self.phase(),
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has deferred work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.closed {
            return None;
        }
        match (self.ticker.next_due(), self.nav_lock.until()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn advance(&mut self, now: Instant) -> Navigation {
        if self.closed {
            return Navigation::Closed;
        }
        if self.nav_lock.is_active(now) {
            debug!("advance ignored: navigation locked");
            return Navigation::Locked;
        }
        if self.current + 1 < self.catalog.len() {
            self.move_to(self.current + 1, now)
        } else {
            debug!("advance past last story: completed");
            Navigation::Completed
        }
    }

    pub fn retreat(&mut self, now: Instant) -> Navigation {
        if self.closed {
            return Navigation::Closed;
        }
        if self.nav_lock.is_active(now) {
            debug!("retreat ignored: navigation locked");
            return Navigation::Locked;
        }
        if self.current == 0 {
            return Navigation::AtStart;
        }
        self.move_to(self.current - 1, now)
    }

    /// Flips play/pause. Not subject to the navigation lock. Returns the new playing flag.
    pub fn toggle_play(&mut self, now: Instant) -> bool {
        if self.closed {
            return self.playing;
        }
        self.set_playing(!self.playing, now);
        self.playing
    }

    pub fn pause(&mut self, now: Instant) {
        if !self.closed {
            self.set_playing(false, now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if !self.closed {
            self.set_playing(true, now);
        }
    }

    /// Marks `index` as ready. Clears loading only when it is the story on screen, so stale
    /// completions for stories already navigated away from just grow the preloaded set.
    /// Returns `true` if this call changed anything.
    pub fn report_asset_ready(&mut self, index: usize, now: Instant) -> bool {
        if self.closed || index >= self.catalog.len() {
            return false;
        }
        let mut changed = self.preloaded.insert(index);
        if index == self.current && self.loading {
            self.loading = false;
            changed = true;
            debug!("story {index} ready, loading cleared");
            self.sync_ticker(now, false);
        }
        changed
    }

    /// Fires every deferred action due at or before `now`, oldest first.
    pub fn poll(&mut self, now: Instant) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        loop {
            if self.closed {
                break;
            }
            let Some(due) = self.ticker.next_due().filter(|due| *due <= now) else {
                self.nav_lock.release_if_due(now);
                break;
            };
            // An unlock scheduled no later than this tick happens first.
            self.nav_lock.release_if_due(due);
            if self.ticker.fire_if_due(due).is_none() {
                break;
            }
            self.on_tick(due, &mut events);
        }
        events
    }

    /// Teardown: stops the ticker and makes every later call a no-op.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.ticker.disarm();
        self.ticker_key = None;
        self.nav_lock.clear();
        debug!("playback closed at {}", self.current);
        true
    }

    fn on_tick(&mut self, at: Instant, events: &mut Vec<PlaybackEvent>) {
        self.progress.tick(self.ticker.period());
        events.push(PlaybackEvent::Ticked {
            index: self.current,
            percent: self.progress.percent(),
        });
        if !self.progress.is_up() {
            return;
        }

        match self.advance(at) {
            Navigation::Moved { from, to } => events.push(PlaybackEvent::Navigated { from, to }),
            Navigation::Completed => {
                self.progress.reset();
                events.push(PlaybackEvent::Completed);
            }
            // Progress stays full so the next tick retries.
            Navigation::Locked => debug!("autoplay deferred: navigation locked"),
            Navigation::AtStart | Navigation::Closed => {}
        }
    }

    fn move_to(&mut self, target: usize, now: Instant) -> Navigation {
        let from = self.current;
        self.nav_lock.engage(now, self.config.navigation_cooldown);
        self.current = target;
        self.progress = ProgressTimer::new(
            self.catalog.items()[target]
                .duration
                .max(self.config.min_story_duration),
        );
        self.playing = true;
        self.loading = !self.preloaded.contains(&target);
        debug!(
            "navigated {from} -> {target} (loading: {})",
            self.loading
        );
        self.sync_ticker(now, true);
        Navigation::Moved { from, to: target }
    }

    fn set_playing(&mut self, playing: bool, now: Instant) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        debug!("playing = {playing}");
        self.sync_ticker(now, false);
    }

    fn sync_ticker(&mut self, now: Instant, force: bool) {
        let key = TickerKey {
            playing: self.playing,
            loading: self.loading,
            duration: self.progress.limit(),
        };
        if !force && self.ticker_key == Some(key) {
            return;
        }
        self.ticker.disarm();
        if key.playing && !key.loading {
            self.ticker.arm(now);
        }
        self.ticker_key = Some(key);
    }
}
