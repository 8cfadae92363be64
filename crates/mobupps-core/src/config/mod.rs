mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{API_BASE_URL_ENV, Config};
pub use validation::warn_unknown_fields;
