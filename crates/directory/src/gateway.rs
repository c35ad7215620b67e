//! The directory service as seen by the provisioning pipeline.

use async_trait::async_trait;
use thiserror::Error;

use onboard_core::error::OnboardError;

use crate::models::{AttributeDiff, NewUser, UserAttributes};

/// Typed failure of a single gateway call. The directory's own message is
/// kept verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("directory unavailable: {0}")]
    TransientFailure(String),
}

impl From<GatewayError> for OnboardError {
    fn from(e: GatewayError) -> Self {
        OnboardError::Directory(e.to_string())
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Existence checks and mutations against the directory service.
///
/// Each call is attempted once; implementations own any timeout policy.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    async fn organizational_unit_exists(&self, path: &str) -> GatewayResult<bool>;

    async fn create_organizational_unit(
        &self,
        name: &str,
        parent_path: &str,
        description: &str,
    ) -> GatewayResult<()>;

    async fn user_exists(&self, username: &str) -> GatewayResult<bool>;

    /// Fails with [`GatewayError::NotFound`] when no such account exists.
    async fn get_user(&self, username: &str) -> GatewayResult<UserAttributes>;

    async fn create_user(&self, user: &NewUser) -> GatewayResult<()>;

    async fn update_user(&self, username: &str, diff: &AttributeDiff) -> GatewayResult<()>;

    async fn disable_user(&self, username: &str) -> GatewayResult<()>;

    async fn delete_user(&self, username: &str) -> GatewayResult<()>;

    async fn group_exists(&self, name: &str) -> GatewayResult<bool>;

    async fn add_group_member(&self, group_name: &str, username: &str) -> GatewayResult<()>;

    async fn list_all_users(&self) -> GatewayResult<Vec<UserAttributes>>;
}
