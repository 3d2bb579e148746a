use async_trait::async_trait;
use tracing::info;

use crate::auth::repo_types::User;

/// Delivers email verification links.
#[async_trait]
pub trait VerificationSender: Send + Sync {
    async fn send(&self, user: &User, token: &str) -> anyhow::Result<()>;
}

pub fn verification_link(public_url: &str, user: &User, token: &str) -> String {
    format!(
        "{}/verify-email?user={}&token={}",
        public_url.trim_end_matches('/'),
        user.id,
        token
    )
}

/// Writes the link to the log instead of sending mail.
pub struct LogSender {
    public_url: String,
}

impl LogSender {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
        }
    }
}

#[async_trait]
impl VerificationSender for LogSender {
    async fn send(&self, user: &User, token: &str) -> anyhow::Result<()> {
        let link = verification_link(&self.public_url, user, token);
        info!(user_id = %user.id, email = %user.email, %link, "verification link");
        Ok(())
    }
}
