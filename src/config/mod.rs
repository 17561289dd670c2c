//! Configuration system: TOML schemas with embedded defaults and a
//! process-wide, hot-reloadable instance.

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    broker_credentials, get_config_clone, init_config_with, load_config, load_config_from_path,
    reload_config, reload_config_from_path, resolve_config_path, save_config, with_config, CONFIG,
};
