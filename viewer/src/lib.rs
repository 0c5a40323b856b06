pub mod asset_loader;
pub mod console;
pub mod driver;
pub mod remote_api;
pub mod settings;

pub use asset_loader::MediaLoader;
pub use driver::{CommandReply, DriverCommand, DriverExit, SessionDriver};
pub use settings::{SettingsStore, ViewerSettings};
