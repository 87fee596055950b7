use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::files::{
    ErrorKind, Field, FileSize, FileValidator, MaxPixelSize, MimeTypes, MinPixelSize, Rule,
    ValidatorError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub fields: HashMap<String, FieldConfig>,
    /// Replaces the default message templates wholesale when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_size_mb: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub single_file: bool,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfig {
    FileSize { min: u64, max: u64 },
    MimeTypes { allow: Vec<String> },
    MinPixelSize { width: u32, height: u32 },
    MaxPixelSize { width: u32, height: u32 },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            fields: default_fields(),
            messages: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_upload_size_mb: 10,
            request_timeout_seconds: 30,
        }
    }
}

fn default_fields() -> HashMap<String, FieldConfig> {
    let mut fields = HashMap::new();
    fields.insert(
        "file".to_string(),
        FieldConfig {
            required: true,
            single_file: true,
            rules: vec![
                RuleConfig::FileSize {
                    min: 1,
                    max: 10 * 1024 * 1024,
                },
                RuleConfig::MimeTypes {
                    allow: vec!["*".to_string()],
                },
            ],
        },
    );
    fields
}

impl RuleConfig {
    pub fn to_rule(&self) -> Box<dyn Rule> {
        match self {
            RuleConfig::FileSize { min, max } => Box::new(FileSize::new(*min, *max)),
            RuleConfig::MimeTypes { allow } => Box::new(MimeTypes::new(allow.iter().cloned())),
            RuleConfig::MinPixelSize { width, height } => {
                Box::new(MinPixelSize::new(*width, *height))
            }
            RuleConfig::MaxPixelSize { width, height } => {
                Box::new(MaxPixelSize::new(*width, *height))
            }
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            RuleConfig::FileSize { min, max } if min > max => Err(ConfigError::Message(format!(
                "Field '{}': file_size min ({}) is greater than max ({})",
                field, min, max
            ))),
            RuleConfig::MimeTypes { allow } if allow.is_empty() => Err(ConfigError::Message(
                format!("Field '{}': mime_types allow-list cannot be empty", field),
            )),
            RuleConfig::MimeTypes { allow } => {
                for entry in allow.iter().filter(|entry| entry.as_str() != "*") {
                    if entry.parse::<mime::Mime>().is_err() {
                        return Err(ConfigError::Message(format!(
                            "Field '{}': '{}' is not a valid MIME type",
                            field, entry
                        )));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl FieldConfig {
    pub fn to_field(&self) -> Field {
        Field::with_rules(
            self.required,
            self.single_file,
            self.rules.iter().map(RuleConfig::to_rule).collect(),
        )
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::defaults_builder()?;

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(Self::environment());

        Self::finish(builder)
    }

    /// `APP_` prefix, `__` between path segments, e.g. `APP_SERVER__PORT`.
    /// A single `_` stays part of the key, as in `max_upload_size_mb`.
    fn environment() -> Environment {
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Defaults overlaid with an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = Self::defaults_builder()?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    // Fields are left out of the defaults so a config file that declares its
    // own fields does not inherit the default "file" field.
    fn defaults_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = AppConfig {
            fields: HashMap::new(),
            ..AppConfig::default()
        };
        Ok(Config::builder().add_source(Config::try_from(&defaults)?))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        if app_config.fields.is_empty() {
            app_config.fields = default_fields();
        }

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.server.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "Max upload size must be greater than 0".to_string(),
            ));
        }

        if self.fields.is_empty() {
            return Err(ConfigError::Message(
                "At least one upload field must be declared".to_string(),
            ));
        }

        for (name, field) in &self.fields {
            for rule in &field.rules {
                rule.validate(name)?;
            }
        }

        if let Some(messages) = &self.messages {
            if let Some(unknown) = messages.keys().find(|key| ErrorKind::from_key(key).is_none()) {
                return Err(ConfigError::Message(format!(
                    "Unknown message key: {}",
                    unknown
                )));
            }

            let missing: Vec<&str> = ErrorKind::ALL
                .iter()
                .map(ErrorKind::key)
                .filter(|key| !messages.contains_key(*key))
                .collect();
            if !missing.is_empty() {
                tracing::warn!(
                    "Message override omits {}; those errors will render empty",
                    missing.join(", ")
                );
            }
        }

        Ok(())
    }

    pub fn build_validator(&self) -> Result<FileValidator, ValidatorError> {
        let fields = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.to_field()))
            .collect();

        let mut validator = FileValidator::new(Some(fields))?;

        if let Some(messages) = &self.messages {
            validator.set_error_templates(Some(messages.clone().into()))?;
        }

        Ok(validator)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        let bytes = self.server.max_upload_size_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}
