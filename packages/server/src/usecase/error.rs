//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::DomainError;

/// 参加者接続（ハンドシェイク）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// ハンドシェイクで受け取った表示名が不正
    #[error("invalid display name: {0}")]
    InvalidDisplayName(#[from] DomainError),
}
