//! Configuration for the checked environment.
//!
//! # Modules
//!
//! - [`loader`] - YAML file loading and the `DEPCONFLICT_PATH` override
//! - [`schema`] - The [`EnvironmentConfig`] structure

pub mod loader;
pub mod schema;

pub use loader::{
    apply_search_path_override, load_config, load_config_file, parse_config, SEARCH_PATH_ENV,
};
pub use schema::EnvironmentConfig;
