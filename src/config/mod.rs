mod defaults;
mod loader;

pub use defaults::{ClientConfig, DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL, DEFAULT_CLIENT_ID, DEFAULT_SCOPE};
pub use loader::{get_default_config, load_configuration, write_config_to};
