mod loader;
mod types;

pub use loader::{DEFAULT_FILE, load};
pub use types::{Config, ImageConfig, LaunchConfig, TempContainerConfig, ToolkitConfig};
