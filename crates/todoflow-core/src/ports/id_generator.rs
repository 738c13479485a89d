//! IdGenerator port - ID 生成の抽象化
//!
//! Todo の ID は作成時にクライアント側で確定します。
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::TodoId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は調整なしで一意な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    /// Todo ID を生成
    fn generate_todo_id(&self) -> TodoId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// これにより、テスト時に FixedClock を使って timestamp 部分を固定できます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    /// 新しい UlidGenerator を作成
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_todo_id(&self) -> TodoId {
        TodoId::from(self.next_ulid())
    }
}
