//! Create-if-absent handling for OUs, user accounts, and group memberships.

use std::sync::Arc;

use tracing::{debug, info};

use onboard_core::models::InputRecord;

use crate::gateway::{DirectoryGateway, GatewayError};
use crate::models::NewUser;
use crate::ou::{department_ou_dn, ou_dn};

/// Result of ensuring one directory entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
    Failed(GatewayError),
}

/// Per-account settings shared by every record of a run.
#[derive(Debug, Clone, Default)]
pub struct AccountSettings {
    /// DNS domain used for principal names.
    pub domain: String,
    /// DN under which department OUs live.
    pub users_root: String,
}

/// Each ensure call checks existence once and creates at most once. Nothing
/// is retried.
pub struct IdempotencyResolver {
    gateway: Arc<dyn DirectoryGateway>,
}

impl IdempotencyResolver {
    pub fn new(gateway: Arc<dyn DirectoryGateway>) -> Self {
        Self { gateway }
    }

    pub async fn ensure_organizational_unit(
        &self,
        name: &str,
        parent_path: &str,
        description: &str,
    ) -> EnsureOutcome {
        let path = ou_dn(name, parent_path);
        match self.gateway.organizational_unit_exists(&path).await {
            Ok(true) => {
                debug!(ou = %path, "organizational unit already exists");
                return EnsureOutcome::AlreadyExists;
            }
            Ok(false) => {}
            Err(e) => return EnsureOutcome::Failed(e),
        }

        match self
            .gateway
            .create_organizational_unit(name, parent_path, description)
            .await
        {
            Ok(()) => {
                info!(ou = %path, "created organizational unit");
                EnsureOutcome::Created
            }
            Err(e) => EnsureOutcome::Failed(e),
        }
    }

    pub async fn ensure_user_account(&self, user: &NewUser) -> EnsureOutcome {
        match self.gateway.user_exists(&user.username).await {
            Ok(true) => {
                debug!(username = %user.username, "user already exists");
                return EnsureOutcome::AlreadyExists;
            }
            Ok(false) => {}
            Err(e) => return EnsureOutcome::Failed(e),
        }

        match self.gateway.create_user(user).await {
            Ok(()) => {
                info!(username = %user.username, dn = %user.dn(), "created user");
                EnsureOutcome::Created
            }
            Err(e) => EnsureOutcome::Failed(e),
        }
    }

    /// A missing group is reported as `Failed(NotFound)`.
    pub async fn ensure_group_membership(&self, group_name: &str, username: &str) -> EnsureOutcome {
        match self.gateway.group_exists(group_name).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(group = %group_name, "group does not exist");
                return EnsureOutcome::Failed(GatewayError::NotFound(format!(
                    "group {group_name}"
                )));
            }
            Err(e) => return EnsureOutcome::Failed(e),
        }

        match self.gateway.add_group_member(group_name, username).await {
            Ok(()) => {
                debug!(group = %group_name, username = %username, "added group member");
                EnsureOutcome::Created
            }
            Err(GatewayError::Conflict(_)) => EnsureOutcome::AlreadyExists,
            Err(e) => EnsureOutcome::Failed(e),
        }
    }
}

/// Full attribute set for a new account built from one record.
pub fn build_new_user(record: &InputRecord, password: String, settings: &AccountSettings) -> NewUser {
    let optional = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    let username = record.username.trim().to_string();

    NewUser {
        principal_name: format!("{username}@{}", settings.domain),
        display_name: record.display_name(),
        given_name: record.first_name.trim().to_string(),
        surname: record.last_name.trim().to_string(),
        ou_dn: department_ou_dn(&record.department, &settings.users_root),
        email: optional(&record.email),
        department: optional(&record.department),
        job_title: optional(&record.job_title),
        password,
        enabled: true,
        must_change_password: true,
        home_directory: None,
        home_drive: None,
        username,
    }
}
