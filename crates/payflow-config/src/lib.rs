mod app_config;
mod layered;

pub use app_config::{AgentTimeouts, AppConfig};
pub use layered::{apply_env_overrides, load_layered_yaml, LoadedConfig};
