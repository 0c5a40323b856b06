use std::time::Instant;

use log::{debug, info};

use crate::config::{GestureConfig, PlaybackConfig};
use crate::interaction::{
    GestureTracker, Intent, IntentGate, PointerSample, Surface, click_intent, key_intent,
};
use crate::playback::{Navigation, PlaybackEngine, PlaybackEvent, PlaybackState};
use crate::preload::{PreloadOutcome, PreloadReport, adjacent_preloads};
use crate::story::Catalog;
use crate::view::ViewerFrame;

type CompletionHook = Box<dyn FnMut() + Send>;

/// What became of one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    Navigated(Navigation),
    PlayToggled { playing: bool },
    Closed,
    /// Dropped by the intent gate: another intent went through moments ago.
    Debounced,
    /// Keyboard navigation is held back while the engine's navigation lock is active.
    KeySuppressed,
    /// The session is already closed.
    Inactive,
}

pub struct StorySession {
    engine: PlaybackEngine,
    gestures: GestureConfig,
    tracker: GestureTracker,
    gate: IntentGate,
    pending_preloads: Vec<usize>,
    on_complete: Option<CompletionHook>,
    completions: usize,
}

impl std::fmt::Debug for StorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorySession")
            .field("engine", &self.engine)
            .field("pending_preloads", &self.pending_preloads)
            .field("completions", &self.completions)
            .finish_non_exhaustive()
    }
}

impl StorySession {
    pub fn open(
        catalog: Catalog,
        initial_index: usize,
        playback: PlaybackConfig,
        gestures: GestureConfig,
        now: Instant,
    ) -> Self {
        let gestures = gestures.sanitized();
        let engine = PlaybackEngine::open(catalog, initial_index, playback, now);
        info!(
            "story session opened at {} of {}",
            engine.current_index() + 1,
            engine.total_count()
        );

        let mut session = Self {
            engine,
            gestures,
            tracker: GestureTracker::default(),
            gate: IntentGate::new(gestures.intent_cooldown),
            pending_preloads: Vec::new(),
            on_complete: None,
            completions: 0,
        };
        session.queue_adjacent_preloads();
        session
    }

    /// Called every time `advance` runs off the end of the catalog.
    pub fn with_completion(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    pub fn frame(&self) -> ViewerFrame {
        ViewerFrame::from_engine(&self.engine)
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }

    pub fn completions(&self) -> usize {
        self.completions
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.engine.next_deadline()
    }

    pub fn take_preload_requests(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.pending_preloads)
    }

    /// Routes an intent through the shared re-entrancy gate.
    pub fn dispatch(&mut self, intent: Intent, now: Instant) -> IntentOutcome {
        if self.is_closed() {
            return IntentOutcome::Inactive;
        }
        if !self.gate.try_pass(now) {
            debug!("intent {intent:?} debounced");
            return IntentOutcome::Debounced;
        }
        self.apply(intent, now)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, now: Instant) {
        if !self.is_closed() {
            self.tracker.pointer_down(PointerSample::new(x, y, now));
        }
    }

    /// Ends a touch gesture. `None` when the gesture did not map to any intent.
    pub fn pointer_up(
        &mut self,
        x: f32,
        y: f32,
        surface: Surface,
        now: Instant,
    ) -> Option<IntentOutcome> {
        if self.is_closed() {
            return Some(IntentOutcome::Inactive);
        }
        let gesture =
            self.tracker
                .pointer_up(PointerSample::new(x, y, now), surface, &self.gestures);
        let intent = gesture.intent()?;
        Some(self.dispatch(intent, now))
    }

    pub fn click(&mut self, x: f32, surface: Surface, now: Instant) -> Option<IntentOutcome> {
        let intent = click_intent(x, surface)?;
        Some(self.dispatch(intent, now))
    }

    pub fn key(&mut self, key: &str, now: Instant) -> Option<IntentOutcome> {
        let intent = key_intent(key)?;
        if self.is_closed() {
            return Some(IntentOutcome::Inactive);
        }
        if intent != Intent::Close && self.engine.navigation_locked_at(now) {
            return Some(IntentOutcome::KeySuppressed);
        }
        Some(self.dispatch(intent, now))
    }

    /// The renderer's explicit "this story is on screen and loaded" signal.
    pub fn report_asset_ready(&mut self, index: usize, now: Instant) -> bool {
        self.engine.report_asset_ready(index, now)
    }

    /// Feeds back a finished preload. Failed fetches are dropped here: the index stays out
    /// of the preloaded set, so it keeps loading if on screen and is requested again on the
    /// next navigation that lands near it.
    pub fn report_preload(&mut self, report: PreloadReport, now: Instant) -> bool {
        match report.outcome {
            PreloadOutcome::Ready => self.engine.report_asset_ready(report.index, now),
            PreloadOutcome::ReadyAfterFailure => {
                debug!("preload of story {} failed, not marking it ready", report.index);
                false
            }
            PreloadOutcome::Skipped => false,
        }
    }

    /// Fires due timers and reacts to what they did (preloads after autoplay, completion).
    pub fn poll(&mut self, now: Instant) -> Vec<PlaybackEvent> {
        let events = self.engine.poll(now);
        for event in &events {
            match event {
                PlaybackEvent::Navigated { .. } => self.queue_adjacent_preloads(),
                PlaybackEvent::Completed => self.notify_completed(),
                PlaybackEvent::Ticked { .. } => {}
            }
        }
        events
    }

    /// Teardown. Stops the ticker and drops the completion hook and any queued preloads.
    pub fn close(&mut self) -> bool {
        if !self.engine.close() {
            return false;
        }
        self.tracker.cancel();
        self.gate.reset();
        self.pending_preloads.clear();
        self.on_complete = None;
        info!("story session closed");
        true
    }

    fn apply(&mut self, intent: Intent, now: Instant) -> IntentOutcome {
        match intent {
            Intent::Advance => {
                let nav = self.engine.advance(now);
                self.after_navigation(nav);
                IntentOutcome::Navigated(nav)
            }
            Intent::Retreat => {
                let nav = self.engine.retreat(now);
                self.after_navigation(nav);
                IntentOutcome::Navigated(nav)
            }
            Intent::TogglePlay => IntentOutcome::PlayToggled {
                playing: self.engine.toggle_play(now),
            },
            Intent::Close => {
                self.close();
                IntentOutcome::Closed
            }
        }
    }

    fn after_navigation(&mut self, nav: Navigation) {
        match nav {
            Navigation::Moved { .. } => self.queue_adjacent_preloads(),
            Navigation::Completed => self.notify_completed(),
            Navigation::Locked | Navigation::AtStart | Navigation::Closed => {}
        }
    }

    fn notify_completed(&mut self) {
        self.completions += 1;
        if let Some(hook) = self.on_complete.as_mut() {
            hook();
        }
    }

    fn queue_adjacent_preloads(&mut self) {
        let wanted = adjacent_preloads(
            self.engine.current_index(),
            self.engine.total_count(),
            self.engine.preloaded(),
        );
        for index in wanted {
            if !self.pending_preloads.contains(&index) {
                self.pending_preloads.push(index);
            }
        }
    }
}
