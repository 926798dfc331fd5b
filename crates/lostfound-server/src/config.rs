use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::info;

use lostfound_db::DEFAULT_READER_POOL_SIZE;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub db_readers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: load("LOSTFOUND_HOST", "0.0.0.0")?,
            port: load("LOSTFOUND_PORT", "5000")?,
            db_path: load("LOSTFOUND_DB_PATH", "lost_and_found.db")?,
            db_readers: load("LOSTFOUND_DB_READERS", &DEFAULT_READER_POOL_SIZE.to_string())?,
        })
    }
}

fn load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        let port: u16 = load("LOSTFOUND_TEST_UNSET_PORT", "5000").unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn rejects_unparseable_default() {
        let err = load::<u16>("LOSTFOUND_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(err.to_string().contains("LOSTFOUND_TEST_UNSET_PORT"));
    }
}
