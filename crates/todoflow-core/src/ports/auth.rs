//! AuthSession port - 認証の協調者
//!
//! 現在のユーザー（またはなし）とサインアウトだけを公開します。
//! ユーザーがいない場合、TodoStore は空の集合として振る舞い、何も保存しません。

use async_trait::async_trait;

use crate::domain::UserId;

#[async_trait]
pub trait AuthSession: Send + Sync {
    fn current_user(&self) -> Option<UserId>;

    async fn sign_out(&self);
}
