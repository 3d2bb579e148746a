use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::auth::{
    authority::{SessionAuthority, SessionPolicy},
    cookies::CookieOptions,
    mailer::{LogSender, VerificationSender},
    memory::MemoryAuthStore,
    repo::PgAuthStore,
    store::AuthStore,
};
use crate::config::{AppConfig, StoreKind};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: SessionAuthority,
    pub mailer: Arc<dyn VerificationSender>,
    pub cookies: CookieOptions,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn AuthStore> = match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres store")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres auth store");
                Arc::new(PgAuthStore::new(db))
            }
            StoreKind::Memory => {
                warn!("using in-memory auth store; data is lost on restart");
                Arc::new(MemoryAuthStore::new())
            }
        };

        let mailer = Arc::new(LogSender::new(config.public_url.clone()));
        Ok(Self::from_parts(config, store, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn AuthStore>,
        mailer: Arc<dyn VerificationSender>,
    ) -> Self {
        let policy = SessionPolicy {
            ttl: time::Duration::days(config.session.ttl_days),
            sliding: config.session.sliding,
        };
        let cookies = CookieOptions {
            name: config.session.cookie_name.clone(),
            secure: config.session.cookie_secure,
        };
        Self {
            auth: SessionAuthority::new(store, policy),
            config,
            mailer,
            cookies,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(|_| {})
    }

    /// Memory-backed state with test tweaks applied to the config.
    #[cfg(test)]
    pub fn fake_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        use crate::config::SessionConfig;

        let mut config = AppConfig {
            store: StoreKind::Memory,
            database_url: None,
            public_url: "http://localhost:8080".into(),
            session: SessionConfig {
                ttl_days: 90,
                sliding: false,
                cookie_name: "session".into(),
                cookie_secure: false,
                purge_interval_secs: 3600,
            },
        };
        tweak(&mut config);
        let config = Arc::new(config);
        let mailer = Arc::new(LogSender::new(config.public_url.clone()));
        Self::from_parts(config, Arc::new(MemoryAuthStore::new()), mailer)
    }

    #[cfg(test)]
    pub fn with_mailer(mut self, mailer: Arc<dyn VerificationSender>) -> Self {
        self.mailer = mailer;
        self
    }
}
