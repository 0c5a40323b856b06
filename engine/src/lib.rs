pub mod config;
pub mod interaction;
pub mod playback;
pub mod preload;
pub mod serde_duration;
pub mod session;
pub mod story;
pub mod timer;
pub mod view;

pub use config::{GestureConfig, PlaybackConfig};
pub use interaction::{Intent, Surface};
pub use playback::{Navigation, PlaybackEngine, PlaybackEvent, PlaybackPhase, PlaybackState};
pub use preload::{AssetError, AssetLoader, PreloadOutcome, PreloadReport, Preloader};
pub use session::{IntentOutcome, StorySession};
pub use story::{Catalog, CatalogError, StoryItem, StoryRecord};
pub use view::ViewerFrame;
