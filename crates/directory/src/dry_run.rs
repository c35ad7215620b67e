//! Gateway wrapper that plans mutations instead of performing them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::gateway::{DirectoryGateway, GatewayError, GatewayResult};
use crate::models::{AttributeDiff, NewUser, UserAttributes};
use crate::ou::ou_dn;

/// Entities a dry run has pretended to create or delete.
#[derive(Default)]
struct Planned {
    ous: HashSet<String>,
    users: HashSet<String>,
    deleted: HashSet<String>,
}

/// Read calls go to the wrapped gateway; every mutation is logged as
/// `dry run: would ...` and reported as successful.
///
/// Planned creations and deletions are remembered so later existence checks
/// in the same run answer as they would after a live run.
pub struct DryRunGateway {
    inner: Arc<dyn DirectoryGateway>,
    planned: Mutex<Planned>,
}

impl DryRunGateway {
    pub fn new(inner: Arc<dyn DirectoryGateway>) -> Self {
        Self {
            inner,
            planned: Mutex::new(Planned::default()),
        }
    }

    fn with_planned<T>(&self, f: impl FnOnce(&mut Planned) -> T) -> T {
        let mut planned = self
            .planned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut planned)
    }
}

#[async_trait]
impl DirectoryGateway for DryRunGateway {
    async fn organizational_unit_exists(&self, path: &str) -> GatewayResult<bool> {
        if self.with_planned(|p| p.ous.contains(&path.to_lowercase())) {
            return Ok(true);
        }
        self.inner.organizational_unit_exists(path).await
    }

    async fn create_organizational_unit(
        &self,
        name: &str,
        parent_path: &str,
        _description: &str,
    ) -> GatewayResult<()> {
        let dn = ou_dn(name, parent_path);
        info!(ou = %dn, "dry run: would create organizational unit");
        self.with_planned(|p| p.ous.insert(dn.to_lowercase()));
        Ok(())
    }

    async fn user_exists(&self, username: &str) -> GatewayResult<bool> {
        let key = username.to_lowercase();
        let (planned, deleted) =
            self.with_planned(|p| (p.users.contains(&key), p.deleted.contains(&key)));
        if planned {
            return Ok(true);
        }
        if deleted {
            return Ok(false);
        }
        self.inner.user_exists(username).await
    }

    async fn get_user(&self, username: &str) -> GatewayResult<UserAttributes> {
        if self.with_planned(|p| p.deleted.contains(&username.to_lowercase())) {
            return Err(GatewayError::NotFound(format!(
                "user {username} (deleted earlier in this dry run)"
            )));
        }
        self.inner.get_user(username).await
    }

    async fn create_user(&self, user: &NewUser) -> GatewayResult<()> {
        info!(
            username = %user.username,
            dn = %user.dn(),
            principal_name = %user.principal_name,
            "dry run: would create user"
        );
        let key = user.username.to_lowercase();
        self.with_planned(|p| {
            p.deleted.remove(&key);
            p.users.insert(key);
        });
        Ok(())
    }

    async fn update_user(&self, username: &str, diff: &AttributeDiff) -> GatewayResult<()> {
        info!(username = %username, fields = %diff.describe(), "dry run: would update user");
        Ok(())
    }

    async fn disable_user(&self, username: &str) -> GatewayResult<()> {
        info!(username = %username, "dry run: would disable user");
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> GatewayResult<()> {
        info!(username = %username, "dry run: would delete user");
        let key = username.to_lowercase();
        self.with_planned(|p| {
            p.users.remove(&key);
            p.deleted.insert(key);
        });
        Ok(())
    }

    async fn group_exists(&self, name: &str) -> GatewayResult<bool> {
        self.inner.group_exists(name).await
    }

    async fn add_group_member(&self, group_name: &str, username: &str) -> GatewayResult<()> {
        info!(group = %group_name, username = %username, "dry run: would add group member");
        Ok(())
    }

    async fn list_all_users(&self) -> GatewayResult<Vec<UserAttributes>> {
        self.inner.list_all_users().await
    }
}
