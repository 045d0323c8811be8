use config::{Config, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;

/// アプリケーション設定
///
/// `yado.toml` と `YADO_` 接頭辞の環境変数から読み込む。
#[derive(Clone, Debug, Deserialize)]
pub struct YadoConfig {
    pub eventstore: EventStore,
    pub meilisearch: MeiliSearch,
    pub web: Web,
    pub logger: Logger,
}

impl YadoConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("yado.toml"))
            .add_source(config::Environment::with_prefix("YADO").separator("_"))
            .build()?
            .try_deserialize::<YadoConfig>()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventStore {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeiliSearch {
    pub url: String,
    pub api_key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Web {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tls {
    pub cert: String,
    pub key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}
