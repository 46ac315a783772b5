use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://vendo.db".to_string(), max_connections: 5, timeout_secs: 30 }
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    /// Reads `VENDO_*` environment overrides. Malformed numeric values are
    /// reported rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("VENDO_PORT") {
            Ok(value) => Some(value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "VENDO_PORT".to_string(),
                value,
            })?),
            Err(_) => None,
        };
        Ok(Self {
            database_url: env::var("VENDO_DATABASE_URL").ok(),
            log_level: env::var("VENDO_LOG_LEVEL").ok(),
            llm_api_key: env::var("VENDO_LLM_API_KEY").ok(),
            llm_base_url: env::var("VENDO_LLM_BASE_URL").ok(),
            llm_model: env::var("VENDO_LLM_MODEL").ok(),
            bind_address: env::var("VENDO_BIND_ADDRESS").ok(),
            port,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                health_check_port: 8081,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<FileDatabase>,
    llm: Option<FileLlm>,
    server: Option<FileServer>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLlm {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServer {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Defaults, then file values, then overrides, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = &options.config_path {
            if path.exists() {
                let raw = fs::read_to_string(path)
                    .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
                let file: FileConfig = toml::from_str(&raw)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_file(file);
            } else if options.require_file {
                return Err(ConfigError::MissingConfigFile(path.clone()));
            }
        }

        config.apply_overrides(&options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(database) = file.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(llm) = file.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }
        if let Some(server) = file.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.database_url {
            self.database.url = url.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(api_key) = &overrides.llm_api_key {
            self.llm.api_key = Some(api_key.clone().into());
        }
        if let Some(base_url) = &overrides.llm_base_url {
            self.llm.base_url = base_url.clone();
        }
        if let Some(model) = &overrides.llm_model {
            self.llm.model = model.clone();
        }
        if let Some(bind_address) = &overrides.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.server.port == self.server.health_check_port {
            return Err(ConfigError::Validation(
                "server.port and server.health_check_port must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_pass_validation() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
            [database]
            url = "sqlite://store.db"

            [llm]
            model = "gpt-4o"

            [logging]
            level = "debug"
            format = "json"
            "#
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect("file load");

        assert_eq!(config.database.url, "sqlite://store.db");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[database]\nurl = \"sqlite://file.db\"").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://env.db".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load with overrides");

        assert_eq!(config.database.url, "sqlite://env.db");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/vendo.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("must fail");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn colliding_ports_fail_validation() {
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { port: Some(8081), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        })
        .expect_err("port collision");
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
