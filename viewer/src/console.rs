use story_engine::ViewerFrame;
use story_engine::view::SegmentStatus;

const BAR_WIDTH: usize = 10;

/// Key name for a line typed at the console, or `None` if the line means nothing.
pub fn key_for_line(line: &str) -> Option<&'static str> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "n" | "next" | "right" | "d" => Some("ArrowRight"),
        "b" | "back" | "prev" | "left" | "a" => Some("ArrowLeft"),
        "p" | "pause" | "play" => Some("p"),
        "q" | "quit" | "esc" | "exit" => Some("Escape"),
        _ => None,
    }
}

pub fn render_line(frame: &ViewerFrame) -> String {
    let strip: String = frame
        .segments
        .iter()
        .map(|segment| match segment.status {
            SegmentStatus::Completed => '#',
            SegmentStatus::Active => '>',
            SegmentStatus::Pending => '.',
        })
        .collect();

    let filled = ((frame.playback.progress_percent / 100.0) * BAR_WIDTH as f32).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let bar = format!("{}{}", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled));

    let status = if frame.show_loading_overlay {
        " loading"
    } else if frame.show_paused_overlay {
        " paused"
    } else {
        ""
    };

    format!(
        "[{strip}] {} {} [{bar}] {}{status}",
        frame.counter_label, frame.author_name, frame.media_url
    )
}

/// Whether a new frame is worth printing. Progress ticks alone are not.
pub fn is_notable_change(previous: Option<&ViewerFrame>, next: &ViewerFrame) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    previous.playback.current_index != next.playback.current_index
        || previous.show_loading_overlay != next.show_loading_overlay
        || previous.show_paused_overlay != next.show_paused_overlay
}
