//! Configuration discovery, parsing, and persistence for sift.

mod env_subst;
mod loader;
mod schema;

pub use {
    env_subst::substitute_env,
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_or_default_config_path, load_config,
        save_config, set_config_dir,
    },
    schema::{
        DEFAULT_ALLOWED_EXTENSIONS, GeminiConfig, ServerConfig, SiftConfig, UploadsConfig,
    },
};
