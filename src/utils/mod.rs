/// TOML configuration loading, defaults and validation.
pub mod toml_config;
