use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::compose::DEFAULT_ATTACHMENT_PLACEHOLDER;
use crate::error::{ChatError, Result};

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Selectable models; the first entry is the default unless
    /// `default_model` says otherwise.
    #[serde(default = "default_models")]
    pub models: Vec<ModelOption>,
    pub default_model: Option<String>,
    pub attachment_placeholder: String,
    /// Pause between streamed chunks of the local agent.
    pub stream_delay_ms: u64,
    /// Idle time after which a session is dropped.
    pub session_timeout_secs: u64,
}

/// An entry of the model picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    /// Display name.
    pub name: String,
    /// Provider-qualified id sent with each request.
    pub value: String,
}

impl ModelOption {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

fn default_models() -> Vec<ModelOption> {
    vec![
        ModelOption::new("GPT 5 Nano", "openai/gpt-5-nano"),
        ModelOption::new("Mistral Nemo", "mistral/mistral-nemo"),
        ModelOption::new("Deepseek R1", "deepseek/deepseek-r1"),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("chat.attachment_placeholder", DEFAULT_ATTACHMENT_PLACEHOLDER)?
            .set_default("chat.stream_delay_ms", 25)?
            .set_default("chat.session_timeout_secs", 30 * 60)?
            .set_default("logging.format", "text")?
            .set_default("logging.filter", "info,tower_http=debug")?;

        // 2. Config file: explicit path must exist, ./config.yaml is optional
        match cli.config.as_deref() {
            Some(path) => builder = builder.add_source(File::with_name(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        // 3. Environment, e.g. CHAT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their plain env vars) win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("logging.format", format.as_str())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), config::ConfigError> {
        if self.chat.models.is_empty() {
            return Err(config::ConfigError::Message(
                "chat.models must list at least one model".to_string(),
            ));
        }
        if let Some(default) = &self.chat.default_model {
            if self.chat.model(default).is_none() {
                return Err(config::ConfigError::Message(format!(
                    "chat.default_model '{default}' is not in chat.models"
                )));
            }
        }
        Ok(())
    }
}

impl ChatConfig {
    /// Look up a model by id.
    #[must_use]
    pub fn model(&self, value: &str) -> Option<&ModelOption> {
        self.models.iter().find(|m| m.value == value)
    }

    /// Model id selected when the composer opens.
    #[must_use]
    pub fn default_model_id(&self) -> &str {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(|m| m.value.as_str()))
            .unwrap_or_default()
    }

    /// Resolve the model of a request, falling back to the default when the
    /// request names none.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        match requested.map(str::trim).filter(|m| !m.is_empty()) {
            None => Ok(self.default_model_id().to_string()),
            Some(value) => self
                .model(value)
                .map(|m| m.value.clone())
                .ok_or_else(|| ChatError::UnknownModel(value.to_string())),
        }
    }

    #[must_use]
    pub fn stream_delay(&self) -> Duration {
        Duration::from_millis(self.stream_delay_ms)
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> ChatConfig {
        ChatConfig {
            models: default_models(),
            default_model: None,
            attachment_placeholder: DEFAULT_ATTACHMENT_PLACEHOLDER.to_string(),
            stream_delay_ms: 0,
            session_timeout_secs: 60,
        }
    }

    #[test]
    fn test_default_model_is_first() {
        assert_eq!(chat().default_model_id(), "openai/gpt-5-nano");

        let mut chat = chat();
        chat.default_model = Some("deepseek/deepseek-r1".to_string());
        assert_eq!(chat.default_model_id(), "deepseek/deepseek-r1");
    }

    #[test]
    fn test_resolve_model() {
        let chat = chat();
        assert_eq!(chat.resolve_model(None).unwrap(), "openai/gpt-5-nano");
        assert_eq!(chat.resolve_model(Some("")).unwrap(), "openai/gpt-5-nano");
        assert_eq!(
            chat.resolve_model(Some("mistral/mistral-nemo")).unwrap(),
            "mistral/mistral-nemo"
        );
        assert!(matches!(
            chat.resolve_model(Some("acme/unknown")),
            Err(ChatError::UnknownModel(m)) if m == "acme/unknown"
        ));
    }

    #[test]
    fn test_cli_parses_log_format() {
        let cli = Cli::try_parse_from(["agent-chat-view", "--log-format", "json", "--port", "8081"])
            .unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.port, Some(8081));
    }
}
