pub mod settings;

pub use settings::{AppConfig, FieldConfig, RuleConfig, ServerConfig};
