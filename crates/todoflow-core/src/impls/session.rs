//! StaticSession - 固定のユーザーを持つ AuthSession

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::UserId;
use crate::ports::AuthSession;

#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<UserId>>,
}

impl StaticSession {
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthSession for StaticSession {
    fn current_user(&self) -> Option<UserId> {
        *self.user.read().unwrap_or_else(|e| e.into_inner())
    }

    async fn sign_out(&self) {
        let mut user = self.user.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = user.take() {
            tracing::info!(user = %previous, "signed out");
        }
    }
}
