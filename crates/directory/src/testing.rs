//! In-memory directory used by the unit tests of this crate.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::gateway::{DirectoryGateway, GatewayError, GatewayResult};
use crate::models::{AttributeDiff, NewUser, UserAttributes, UserField};
use crate::ou::{ou_dn, user_dn};

/// Gateway operations that change directory state.
pub(crate) const MUTATIONS: &[&str] = &[
    "create_organizational_unit",
    "create_user",
    "update_user",
    "disable_user",
    "delete_user",
    "add_group_member",
];

#[derive(Default)]
struct MockState {
    ous: BTreeSet<String>,
    users: BTreeMap<String, UserAttributes>,
    groups: BTreeMap<String, Vec<String>>,
    calls: Vec<String>,
    failures: HashMap<&'static str, GatewayError>,
}

pub(crate) struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub(crate) fn with_ou(mut self, dn: &str) -> Self {
        self.state.get_mut().unwrap().ous.insert(dn.to_lowercase());
        self
    }

    pub(crate) fn with_group(mut self, name: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .groups
            .insert(name.to_lowercase(), Vec::new());
        self
    }

    pub(crate) fn with_member(mut self, group: &str, username: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .groups
            .entry(group.to_lowercase())
            .or_default()
            .push(username.to_string());
        self
    }

    pub(crate) fn with_user(mut self, user: UserAttributes) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .users
            .insert(user.username.to_lowercase(), user);
        self
    }

    /// Make every call of `op` fail with `err`.
    pub(crate) fn failing(mut self, op: &'static str, err: GatewayError) -> Self {
        self.state.get_mut().unwrap().failures.insert(op, err);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATIONS.iter().any(|m| c.split(':').next() == Some(*m)))
            .collect()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub(crate) fn user(&self, username: &str) -> Option<UserAttributes> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(&username.to_lowercase())
            .cloned()
    }

    pub(crate) fn members(&self, group: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(&group.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn ou_count(&self) -> usize {
        self.state.lock().unwrap().ous.len()
    }

    fn begin(&self, op: &'static str, arg: &str) -> GatewayResult<MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{op}:{arg}"));
        if let Some(err) = state.failures.get(op).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

/// A directory account with the usual test values.
pub(crate) fn sample_user(username: &str, first: &str, last: &str, department: &str) -> UserAttributes {
    let ou = format!("OU={department},OU=Users,DC=corp,DC=local");
    UserAttributes {
        dn: user_dn(&format!("{first} {last}"), &ou),
        username: username.to_string(),
        principal_name: Some(format!("{username}@corp.local")),
        display_name: format!("{first} {last}"),
        given_name: first.to_string(),
        surname: last.to_string(),
        email: Some(format!("{}.{}@x.local", first.to_lowercase(), last.to_lowercase())),
        department: Some(department.to_string()),
        job_title: Some("Dev".to_string()),
        ou,
        enabled: true,
    }
}

#[async_trait]
impl DirectoryGateway for MockGateway {
    async fn organizational_unit_exists(&self, path: &str) -> GatewayResult<bool> {
        let state = self.begin("organizational_unit_exists", path)?;
        Ok(state.ous.contains(&path.to_lowercase()))
    }

    async fn create_organizational_unit(
        &self,
        name: &str,
        parent_path: &str,
        _description: &str,
    ) -> GatewayResult<()> {
        let dn = ou_dn(name, parent_path);
        let mut state = self.begin("create_organizational_unit", &dn)?;
        if !state.ous.insert(dn.to_lowercase()) {
            return Err(GatewayError::Conflict(format!("{dn} already exists")));
        }
        Ok(())
    }

    async fn user_exists(&self, username: &str) -> GatewayResult<bool> {
        let state = self.begin("user_exists", username)?;
        Ok(state.users.contains_key(&username.to_lowercase()))
    }

    async fn get_user(&self, username: &str) -> GatewayResult<UserAttributes> {
        let state = self.begin("get_user", username)?;
        state
            .users
            .get(&username.to_lowercase())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("user {username}")))
    }

    async fn create_user(&self, user: &NewUser) -> GatewayResult<()> {
        let mut state = self.begin("create_user", &user.username)?;
        let key = user.username.to_lowercase();
        if state.users.contains_key(&key) {
            return Err(GatewayError::Conflict(format!("{} already exists", user.username)));
        }
        state.users.insert(
            key,
            UserAttributes {
                dn: user.dn(),
                username: user.username.clone(),
                principal_name: Some(user.principal_name.clone()),
                display_name: user.display_name.clone(),
                given_name: user.given_name.clone(),
                surname: user.surname.clone(),
                email: user.email.clone(),
                department: user.department.clone(),
                job_title: user.job_title.clone(),
                ou: user.ou_dn.clone(),
                enabled: user.enabled,
            },
        );
        Ok(())
    }

    async fn update_user(&self, username: &str, diff: &AttributeDiff) -> GatewayResult<()> {
        let mut state = self.begin("update_user", username)?;
        let user = state
            .users
            .get_mut(&username.to_lowercase())
            .ok_or_else(|| GatewayError::NotFound(format!("user {username}")))?;
        for change in &diff.changes {
            let value = change.new.clone();
            match change.field {
                UserField::FirstName => user.given_name = value,
                UserField::LastName => user.surname = value,
                UserField::Email => user.email = Some(value),
                UserField::Department => user.department = Some(value),
                UserField::JobTitle => user.job_title = Some(value),
            }
        }
        Ok(())
    }

    async fn disable_user(&self, username: &str) -> GatewayResult<()> {
        let mut state = self.begin("disable_user", username)?;
        let user = state
            .users
            .get_mut(&username.to_lowercase())
            .ok_or_else(|| GatewayError::NotFound(format!("user {username}")))?;
        user.enabled = false;
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> GatewayResult<()> {
        let mut state = self.begin("delete_user", username)?;
        state
            .users
            .remove(&username.to_lowercase())
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("user {username}")))
    }

    async fn group_exists(&self, name: &str) -> GatewayResult<bool> {
        let state = self.begin("group_exists", name)?;
        Ok(state.groups.contains_key(&name.to_lowercase()))
    }

    async fn add_group_member(&self, group_name: &str, username: &str) -> GatewayResult<()> {
        let mut state = self.begin("add_group_member", &format!("{group_name}:{username}"))?;
        let members = state
            .groups
            .get_mut(&group_name.to_lowercase())
            .ok_or_else(|| GatewayError::NotFound(format!("group {group_name}")))?;
        if members.iter().any(|m| m.eq_ignore_ascii_case(username)) {
            return Err(GatewayError::Conflict(format!(
                "{username} is already a member of {group_name}"
            )));
        }
        members.push(username.to_string());
        Ok(())
    }

    async fn list_all_users(&self) -> GatewayResult<Vec<UserAttributes>> {
        let state = self.begin("list_all_users", "")?;
        Ok(state.users.values().cloned().collect())
    }
}
