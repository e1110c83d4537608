use std::env;
use std::path::PathBuf;

use encoding_rs::Encoding;
use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

use crate::quiz::parser::DEFAULT_ENCODING;

pub const DEFAULT_QA_FOLDER: &str = "data/QA_FOLDER";
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("unknown quiz file encoding {0:?}")]
    UnknownEncoding(String),
    #[error("REDIS_PORT is not a port number: {0:?}")]
    InvalidRedisPort(String),
    #[error("REDIS_URL is not a valid Redis URL: {0}")]
    InvalidRedisUrl(#[from] redis::RedisError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tg_bot_token: String,
    /// `None` keeps the questions in process memory.
    pub redis: Option<ConnectionInfo>,
    pub qa_folder: PathBuf,
    pub qa_archive: Option<PathBuf>,
    pub qa_encoding: &'static Encoding,
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let tg_bot_token = var("TG_BOT_TOKEN").ok_or(ConfigError::Missing("TG_BOT_TOKEN"))?;

        // Address, port and password stay separate values, so passwords need no URL escaping.
        let redis = match (var("REDIS_URL"), var("REDIS_ADDRESS")) {
            (Some(url), _) => Some(url.as_str().into_connection_info()?),
            (None, Some(host)) => {
                let port = match var("REDIS_PORT") {
                    Some(port) => port
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidRedisPort(port))?,
                    None => DEFAULT_REDIS_PORT,
                };
                Some(ConnectionInfo {
                    addr: ConnectionAddr::Tcp(host, port),
                    redis: RedisConnectionInfo {
                        password: var("REDIS_PASSWORD"),
                        ..Default::default()
                    },
                })
            }
            (None, None) => None,
        };

        let qa_encoding = match var("QA_ENCODING") {
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .ok_or(ConfigError::UnknownEncoding(label))?,
            None => DEFAULT_ENCODING,
        };

        Ok(Self {
            tg_bot_token,
            redis,
            qa_folder: var("QA_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QA_FOLDER)),
            qa_archive: var("QA_ARCHIVE").map(PathBuf::from),
            qa_encoding,
        })
    }
}
