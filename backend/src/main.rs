use anyhow::Context;
use backend::config::Config;
use backend::store::ContentStore;
use backend::AppState;
use common::auth::{decrypt_users, User};
use common::Role;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let users = load_users(&config)?;
    let store = ContentStore::open(&config.data_path)
        .with_context(|| format!("failed to open {}", config.data_path.display()))?;

    let state = Arc::new(AppState {
        store,
        users,
        static_dir: config.static_dir.clone(),
    });

    let app = backend::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn load_users(config: &Config) -> anyhow::Result<Vec<User>> {
    let mut users = match (&config.auth_secret, config.users_file.exists()) {
        (Some(secret), true) => {
            let content = fs::read_to_string(&config.users_file)?;
            let users = decrypt_users(&content, secret)
                .with_context(|| format!("cannot decrypt {}", config.users_file.display()))?;
            info!(count = users.len(), "loaded users");
            users
        }
        (None, true) => {
            warn!("users file present but AUTH_SECRET is not set, ignoring it");
            Vec::new()
        }
        _ => Vec::new(),
    };

    // Bootstrap admin for a fresh install
    if let Some(password) = &config.admin_password {
        users.retain(|u| u.username != config.admin_username);
        users.push(User::with_password(
            config.admin_username.clone(),
            password,
            Role::Admin,
        )?);
        info!(username = %config.admin_username, "bootstrap admin enabled");
    }

    if users.is_empty() {
        warn!("no users configured, nobody will be able to sign in");
    }
    Ok(users)
}
