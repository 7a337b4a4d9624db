pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ParleyError, Result};
pub use settings::{SettingsSource, SharedSettings};
pub use types::*;
