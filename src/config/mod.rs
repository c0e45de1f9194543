/// Application settings loaded from config.toml and the environment
pub mod app;

pub use app::{AppConfig, MacroGoals, load_app_configuration, load_config};
