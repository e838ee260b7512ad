use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub users_file: PathBuf,
    pub auth_secret: Option<String>,
    pub static_dir: PathBuf,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("LMS_PORT", "3000")?,
            data_path: try_load("LMS_DATA_PATH", "lms_data.json")?,
            users_file: try_load("LMS_USERS_FILE", "users.enc")?,
            auth_secret: var("AUTH_SECRET").ok(),
            static_dir: try_load("LMS_STATIC_DIR", "static")?,
            admin_username: try_load("LMS_ADMIN_USERNAME", "admin")?,
            admin_password: var("LMS_ADMIN_PASSWORD").ok(),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value: {e}"))
}
