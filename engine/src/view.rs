use serde::Serialize;

use crate::playback::{PlaybackEngine, PlaybackState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentStatus {
    Completed,
    Active,
    Pending,
}

/// One bar of the progress strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSegment {
    pub status: SegmentStatus,
    pub fill_percent: f32,
}

/// Everything a renderer needs to draw the current frame. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerFrame {
    pub story_id: String,
    pub media_url: String,
    pub author_name: String,
    pub author_avatar_url: String,
    pub counter_label: String,
    pub segments: Vec<ProgressSegment>,
    pub show_loading_overlay: bool,
    pub show_paused_overlay: bool,
    pub has_previous: bool,
    pub has_next: bool,
    pub playback: PlaybackState,
}

impl ViewerFrame {
    pub fn from_engine(engine: &PlaybackEngine) -> Self {
        let state = engine.state();
        let story = engine.current_story();
        let current = state.current_index;

        let segments = (0..state.total_count)
            .map(|index| {
                if index < current {
                    ProgressSegment {
                        status: SegmentStatus::Completed,
                        fill_percent: 100.0,
                    }
                } else if index == current {
                    ProgressSegment {
                        status: SegmentStatus::Active,
                        fill_percent: state.progress_percent,
                    }
                } else {
                    ProgressSegment {
                        status: SegmentStatus::Pending,
                        fill_percent: 0.0,
                    }
                }
            })
            .collect();

        Self {
            story_id: story.id.clone(),
            media_url: story.media_url.clone(),
            author_name: story.display_name().to_string(),
            author_avatar_url: story.display_avatar().to_string(),
            counter_label: format!("{} / {}", current + 1, state.total_count),
            segments,
            show_loading_overlay: state.is_loading && !engine.is_preloaded(current),
            show_paused_overlay: !state.is_playing && !state.is_loading,
            has_previous: current > 0,
            has_next: current + 1 < state.total_count,
            playback: state,
        }
    }
}
