//! LDAP client wrapper for Active Directory operations.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{
    ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope,
    SearchEntry, SearchResult,
};
use tracing::{debug, info};

use onboard_core::config::DirectoryConfig;
use onboard_core::error::Result;

use crate::gateway::{DirectoryGateway, GatewayError, GatewayResult};
use crate::models::{AttributeDiff, NewUser, UserAttributes};
use crate::ou::{ou_dn, parent_dn};

/// Normal active account flag.
const UAC_NORMAL_ACCOUNT: u32 = 512;
/// Disabled account flag.
const UAC_DISABLED_ACCOUNT: u32 = 514;
/// ACCOUNTDISABLE bit inside userAccountControl.
const UAC_DISABLE_BIT: u32 = 0x2;

const PAGE_SIZE: i32 = 500;

const USER_ATTRS: &[&str] = &[
    "sAMAccountName",
    "userPrincipalName",
    "displayName",
    "givenName",
    "sn",
    "mail",
    "department",
    "title",
    "userAccountControl",
];

/// Attribute list as accepted by `Ldap::add`.
type AddAttrs = Vec<(Vec<u8>, HashSet<Vec<u8>>)>;

/// LDAP client for Active Directory. Binds once per operation.
pub struct AdClient {
    server: String,
    bind_dn: String,
    bind_password: String,
    base_dn: String,
    tls_verify: bool,
}

impl AdClient {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            server: config.server.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            base_dn: config.base_dn.clone(),
            tls_verify: config.tls_verify,
        }
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    async fn connect(&self) -> GatewayResult<Ldap> {
        let settings = LdapConnSettings::new().set_no_tls_verify(!self.tls_verify);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(|e| transport("LDAP connect failed", e))?;

        ldap3::drive!(conn);

        let result = ldap
            .simple_bind(&self.bind_dn, &self.bind_password)
            .await
            .map_err(|e| transport("LDAP bind failed", e))?;
        check(result, "LDAP bind rejected")?;

        debug!(server = %self.server, "LDAP bind successful");
        Ok(ldap)
    }

    /// Bind and unbind once.
    pub async fn test_connection(&self) -> Result<()> {
        let mut ldap = self.connect().await?;
        ldap.unbind()
            .await
            .map_err(|e| transport("LDAP unbind failed", e))?;
        info!(server = %self.server, "directory connection test successful");
        Ok(())
    }

    async fn find_user(&self, ldap: &mut Ldap, username: &str) -> GatewayResult<Option<UserAttributes>> {
        let filter = format!(
            "(&(objectCategory=person)(objectClass=user)(sAMAccountName={}))",
            ldap_escape(username)
        );
        let SearchResult(entries, result) = ldap
            .search(&self.base_dn, Scope::Subtree, &filter, USER_ATTRS.to_vec())
            .await
            .map_err(|e| transport("LDAP search user failed", e))?;
        check(result, "LDAP search user error")?;

        Ok(entries
            .into_iter()
            .next()
            .map(|entry| user_from_entry(SearchEntry::construct(entry))))
    }

    async fn require_user(&self, ldap: &mut Ldap, username: &str) -> GatewayResult<UserAttributes> {
        self.find_user(ldap, username)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("user {username}")))
    }

    async fn find_group_dn(&self, ldap: &mut Ldap, name: &str) -> GatewayResult<Option<String>> {
        let escaped = ldap_escape(name);
        let filter = format!("(&(objectClass=group)(|(cn={escaped})(sAMAccountName={escaped})))");
        let SearchResult(entries, result) = ldap
            .search(&self.base_dn, Scope::Subtree, &filter, vec!["cn"])
            .await
            .map_err(|e| transport("LDAP search group failed", e))?;
        check(result, "LDAP search group error")?;

        Ok(entries
            .into_iter()
            .next()
            .map(|entry| SearchEntry::construct(entry).dn))
    }

    async fn modify(&self, ldap: &mut Ldap, dn: &str, mods: Vec<Mod<String>>, context: &str) -> GatewayResult<()> {
        let result = ldap
            .modify(dn, mods)
            .await
            .map_err(|e| transport(context, e))?;
        check(result, context)
    }
}

#[async_trait]
impl DirectoryGateway for AdClient {
    async fn organizational_unit_exists(&self, path: &str) -> GatewayResult<bool> {
        let mut ldap = self.connect().await?;
        let SearchResult(entries, result) = ldap
            .search(path, Scope::Base, "(objectClass=organizationalUnit)", vec!["ou"])
            .await
            .map_err(|e| transport("LDAP search OU failed", e))?;
        ldap.unbind().await.ok();

        match check(result, "LDAP search OU error") {
            Ok(()) => Ok(!entries.is_empty()),
            Err(GatewayError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_organizational_unit(
        &self,
        name: &str,
        parent_path: &str,
        description: &str,
    ) -> GatewayResult<()> {
        let dn = ou_dn(name, parent_path);
        let mut ldap = self.connect().await?;

        let mut attrs: AddAttrs = vec![
            attr("objectClass", &["top", "organizationalUnit"]),
            attr("ou", &[name.trim()]),
        ];
        if !description.trim().is_empty() {
            attrs.push(attr("description", &[description.trim()]));
        }

        let result = ldap
            .add(&dn, attrs)
            .await
            .map_err(|e| transport("LDAP create OU failed", e))?;
        ldap.unbind().await.ok();
        check(result, "LDAP create OU rejected")?;

        info!(ou_dn = %dn, "AD OU created");
        Ok(())
    }

    async fn user_exists(&self, username: &str) -> GatewayResult<bool> {
        let mut ldap = self.connect().await?;
        let found = self.find_user(&mut ldap, username).await;
        ldap.unbind().await.ok();
        Ok(found?.is_some())
    }

    async fn get_user(&self, username: &str) -> GatewayResult<UserAttributes> {
        let mut ldap = self.connect().await?;
        let user = self.require_user(&mut ldap, username).await;
        ldap.unbind().await.ok();
        user
    }

    async fn create_user(&self, user: &NewUser) -> GatewayResult<()> {
        let dn = user.dn();
        let mut ldap = self.connect().await?;
        let result = ldap
            .add(&dn, new_user_attributes(user))
            .await
            .map_err(|e| transport("LDAP add user failed", e))?;
        ldap.unbind().await.ok();
        check(result, "LDAP add user rejected")?;

        info!(dn = %dn, sam = %user.username, "AD user created");
        Ok(())
    }

    async fn update_user(&self, username: &str, diff: &AttributeDiff) -> GatewayResult<()> {
        if diff.is_empty() {
            return Ok(());
        }
        let mut ldap = self.connect().await?;
        let outcome: GatewayResult<()> = async {
            let current = self.require_user(&mut ldap, username).await?;
            self.modify(&mut ldap, &current.dn, update_mods(diff), "LDAP modify user rejected")
                .await?;
            debug!(dn = %current.dn, fields = %diff.describe(), "AD user modified");
            Ok(())
        }
        .await;
        ldap.unbind().await.ok();
        outcome
    }

    async fn disable_user(&self, username: &str) -> GatewayResult<()> {
        let mut ldap = self.connect().await?;
        let outcome: GatewayResult<()> = async {
            let current = self.require_user(&mut ldap, username).await?;
            let mods = vec![Mod::Replace(
                "userAccountControl".to_string(),
                HashSet::from([UAC_DISABLED_ACCOUNT.to_string()]),
            )];
            self.modify(&mut ldap, &current.dn, mods, "LDAP disable user rejected")
                .await?;
            info!(dn = %current.dn, "AD user disabled");
            Ok(())
        }
        .await;
        ldap.unbind().await.ok();
        outcome
    }

    async fn delete_user(&self, username: &str) -> GatewayResult<()> {
        let mut ldap = self.connect().await?;
        let outcome: GatewayResult<()> = async {
            let current = self.require_user(&mut ldap, username).await?;
            let result = ldap
                .delete(&current.dn)
                .await
                .map_err(|e| transport("LDAP delete failed", e))?;
            check(result, "LDAP delete rejected")?;
            info!(dn = %current.dn, "AD user deleted");
            Ok(())
        }
        .await;
        ldap.unbind().await.ok();
        outcome
    }

    async fn group_exists(&self, name: &str) -> GatewayResult<bool> {
        let mut ldap = self.connect().await?;
        let found = self.find_group_dn(&mut ldap, name).await;
        ldap.unbind().await.ok();
        Ok(found?.is_some())
    }

    async fn add_group_member(&self, group_name: &str, username: &str) -> GatewayResult<()> {
        let mut ldap = self.connect().await?;
        let outcome: GatewayResult<()> = async {
            let group_dn = self
                .find_group_dn(&mut ldap, group_name)
                .await?
                .ok_or_else(|| GatewayError::NotFound(format!("group {group_name}")))?;
            let user = self.require_user(&mut ldap, username).await?;
            let mods = vec![Mod::Add("member".to_string(), HashSet::from([user.dn.clone()]))];
            self.modify(&mut ldap, &group_dn, mods, "LDAP add to group rejected")
                .await?;
            debug!(group = %group_dn, user = %user.dn, "user added to group");
            Ok(())
        }
        .await;
        ldap.unbind().await.ok();
        outcome
    }

    async fn list_all_users(&self) -> GatewayResult<Vec<UserAttributes>> {
        let mut ldap = self.connect().await?;
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(PAGE_SIZE)),
        ];
        let mut stream = ldap
            .streaming_search_with(
                adapters,
                &self.base_dn,
                Scope::Subtree,
                "(&(objectCategory=person)(objectClass=user))",
                USER_ATTRS.to_vec(),
            )
            .await
            .map_err(|e| transport("LDAP list users failed", e))?;

        let mut users = Vec::new();
        while let Some(entry) = stream
            .next()
            .await
            .map_err(|e| transport("LDAP list users failed", e))?
        {
            users.push(user_from_entry(SearchEntry::construct(entry)));
        }
        let result = stream.finish().await;
        ldap.unbind().await.ok();
        check(result, "LDAP list users error")?;

        debug!(count = users.len(), "listed AD users");
        Ok(users)
    }
}

/// Map an LDAP result code to a typed gateway error. The server's
/// diagnostic text is kept.
fn check(result: LdapResult, context: &str) -> GatewayResult<()> {
    if result.rc == 0 {
        return Ok(());
    }
    let message = if result.text.is_empty() {
        format!("{context} (rc={})", result.rc)
    } else {
        format!("{context} (rc={}): {}", result.rc, result.text)
    };
    Err(classify_rc(result.rc, message))
}

fn classify_rc(rc: u32, message: String) -> GatewayError {
    match rc {
        32 => GatewayError::NotFound(message),
        49 | 50 => GatewayError::PermissionDenied(message),
        20 | 68 => GatewayError::Conflict(message),
        _ => GatewayError::TransientFailure(message),
    }
}

fn transport(context: &str, e: LdapError) -> GatewayError {
    match e {
        LdapError::LdapResult { result } => check(result, context)
            .err()
            .unwrap_or_else(|| GatewayError::TransientFailure(context.to_string())),
        other => GatewayError::TransientFailure(format!("{context}: {other}")),
    }
}

fn attr(name: &str, values: &[&str]) -> (Vec<u8>, HashSet<Vec<u8>>) {
    (
        name.as_bytes().to_vec(),
        values.iter().map(|v| v.as_bytes().to_vec()).collect(),
    )
}

/// Attribute set for a new account, password included.
fn new_user_attributes(user: &NewUser) -> AddAttrs {
    let uac = if user.enabled {
        UAC_NORMAL_ACCOUNT
    } else {
        UAC_DISABLED_ACCOUNT
    }
    .to_string();

    let mut attrs = vec![
        attr("objectClass", &["top", "person", "organizationalPerson", "user"]),
        attr("cn", &[user.display_name.as_str()]),
        attr("sAMAccountName", &[user.username.as_str()]),
        attr("userPrincipalName", &[user.principal_name.as_str()]),
        attr("displayName", &[user.display_name.as_str()]),
        attr("givenName", &[user.given_name.as_str()]),
        attr("sn", &[user.surname.as_str()]),
        attr("userAccountControl", &[uac.as_str()]),
    ];

    let optional = [
        ("mail", &user.email),
        ("department", &user.department),
        ("title", &user.job_title),
        ("homeDirectory", &user.home_directory),
        ("homeDrive", &user.home_drive),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            attrs.push(attr(name, &[value.as_str()]));
        }
    }

    if user.must_change_password {
        attrs.push(attr("pwdLastSet", &["0"]));
    }

    // AD requires the password as UTF-16LE of the quoted string
    attrs.push((
        b"unicodePwd".to_vec(),
        HashSet::from([encode_ad_password(&user.password)]),
    ));
    attrs
}

fn update_mods(diff: &AttributeDiff) -> Vec<Mod<String>> {
    diff.changes
        .iter()
        .map(|change| {
            Mod::Replace(
                change.field.ldap_attribute().to_string(),
                HashSet::from([change.new.clone()]),
            )
        })
        .collect()
}

/// Encode a password in the format AD expects for unicodePwd: UTF-16LE of `"password"`.
fn encode_ad_password(password: &str) -> Vec<u8> {
    let quoted = format!("\"{}\"", password);
    quoted
        .encode_utf16()
        .flat_map(|c| c.to_le_bytes())
        .collect()
}

fn user_from_entry(entry: SearchEntry) -> UserAttributes {
    let uac: u32 = first_attr(&entry, "userAccountControl")
        .parse()
        .unwrap_or(UAC_NORMAL_ACCOUNT);

    UserAttributes {
        ou: parent_dn(&entry.dn),
        username: first_attr(&entry, "sAMAccountName"),
        principal_name: optional_attr(&entry, "userPrincipalName"),
        display_name: first_attr(&entry, "displayName"),
        given_name: first_attr(&entry, "givenName"),
        surname: first_attr(&entry, "sn"),
        email: optional_attr(&entry, "mail"),
        department: optional_attr(&entry, "department"),
        job_title: optional_attr(&entry, "title"),
        enabled: uac & UAC_DISABLE_BIT == 0,
        dn: entry.dn,
    }
}

/// Extract the first value of an attribute, returning empty string if missing.
fn first_attr(entry: &SearchEntry, attr: &str) -> String {
    optional_attr(entry, attr).unwrap_or_default()
}

fn optional_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::{AttributeChange, UserField};

    fn entry(dn: &str, attrs: &[(&str, &str)]) -> SearchEntry {
        SearchEntry {
            dn: dn.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
                .collect::<HashMap<_, _>>(),
            bin_attrs: HashMap::new(),
        }
    }

    fn ldap_result(rc: u32, text: &str) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: text.to_string(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    fn new_user() -> NewUser {
        NewUser {
            username: "jdoe".into(),
            display_name: "John Doe".into(),
            given_name: "John".into(),
            surname: "Doe".into(),
            principal_name: "jdoe@corp.local".into(),
            ou_dn: "OU=IT,OU=Users,DC=corp,DC=local".into(),
            email: Some("john.doe@x.local".into()),
            department: Some("IT".into()),
            job_title: None,
            password: "Pa55word!".into(),
            enabled: true,
            must_change_password: true,
            home_directory: Some(r"\\fs01\home\jdoe".into()),
            home_drive: Some("H:".into()),
        }
    }

    fn values<'a>(attrs: &'a AddAttrs, name: &str) -> Option<&'a HashSet<Vec<u8>>> {
        attrs
            .iter()
            .find(|(k, _)| k.as_slice() == name.as_bytes())
            .map(|(_, v)| v)
    }

    #[test]
    fn encode_password_format() {
        let encoded = encode_ad_password("Password1!");
        let expected: Vec<u8> = "\"Password1!\""
            .encode_utf16()
            .flat_map(|c| c.to_le_bytes())
            .collect();
        assert_eq!(encoded, expected);
        assert_eq!(&encoded[..4], &[b'"', 0, b'P', 0]);
    }

    #[test]
    fn result_codes_map_to_error_kinds() {
        assert!(matches!(check(ldap_result(32, "no such object"), "x"), Err(GatewayError::NotFound(_))));
        assert!(matches!(check(ldap_result(49, ""), "x"), Err(GatewayError::PermissionDenied(_))));
        assert!(matches!(check(ldap_result(50, ""), "x"), Err(GatewayError::PermissionDenied(_))));
        assert!(matches!(check(ldap_result(68, ""), "x"), Err(GatewayError::Conflict(_))));
        assert!(matches!(check(ldap_result(20, ""), "x"), Err(GatewayError::Conflict(_))));
        assert!(matches!(check(ldap_result(51, ""), "x"), Err(GatewayError::TransientFailure(_))));
        assert!(check(ldap_result(0, ""), "x").is_ok());
    }

    #[test]
    fn error_message_keeps_server_text() {
        let err = check(
            ldap_result(50, "00002098: SecErr: DSID-03150F94"),
            "LDAP add user rejected",
        )
        .unwrap_err();
        assert_eq!(
            err,
            GatewayError::PermissionDenied(
                "LDAP add user rejected (rc=50): 00002098: SecErr: DSID-03150F94".into()
            )
        );
    }

    #[test]
    fn new_user_attribute_set() {
        let attrs = new_user_attributes(&new_user());

        let sam = values(&attrs, "sAMAccountName").unwrap();
        assert!(sam.contains(b"jdoe".as_slice()));
        let upn = values(&attrs, "userPrincipalName").unwrap();
        assert!(upn.contains(b"jdoe@corp.local".as_slice()));
        let uac = values(&attrs, "userAccountControl").unwrap();
        assert!(uac.contains(b"512".as_slice()));
        let pwd_last_set = values(&attrs, "pwdLastSet").unwrap();
        assert!(pwd_last_set.contains(b"0".as_slice()));
        let pwd = values(&attrs, "unicodePwd").unwrap();
        assert!(pwd.contains(&encode_ad_password("Pa55word!")));
        assert!(values(&attrs, "homeDrive").is_some());
        assert!(values(&attrs, "title").is_none());
    }

    #[test]
    fn disabled_user_without_forced_change() {
        let mut user = new_user();
        user.enabled = false;
        user.must_change_password = false;
        let attrs = new_user_attributes(&user);
        let uac = values(&attrs, "userAccountControl").unwrap();
        assert!(uac.contains(b"514".as_slice()));
        assert!(values(&attrs, "pwdLastSet").is_none());
    }

    #[test]
    fn diff_becomes_replace_mods() {
        let diff = AttributeDiff {
            changes: vec![
                AttributeChange {
                    field: UserField::JobTitle,
                    old: "Dev".into(),
                    new: "Lead Dev".into(),
                },
                AttributeChange {
                    field: UserField::Email,
                    old: String::new(),
                    new: "jd@x.local".into(),
                },
            ],
        };
        let mods = update_mods(&diff);
        assert_eq!(mods.len(), 2);
        match &mods[0] {
            Mod::Replace(name, vals) => {
                assert_eq!(name, "title");
                assert!(vals.contains("Lead Dev"));
            }
            _ => panic!("expected replace"),
        }
    }

    #[test]
    fn user_from_search_entry() {
        let user = user_from_entry(entry(
            "CN=Doe\\, John,OU=IT,OU=Users,DC=corp,DC=local",
            &[
                ("sAMAccountName", "jdoe"),
                ("givenName", "John"),
                ("sn", "Doe"),
                ("displayName", "John Doe"),
                ("title", "Dev"),
                ("userAccountControl", "66050"),
            ],
        ));
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.ou, "OU=IT,OU=Users,DC=corp,DC=local");
        assert_eq!(user.job_title.as_deref(), Some("Dev"));
        assert_eq!(user.email, None);
        assert!(!user.enabled);
    }

    #[test]
    fn missing_uac_means_enabled() {
        let user = user_from_entry(entry("CN=A,DC=corp,DC=local", &[("sAMAccountName", "a")]));
        assert!(user.enabled);
        assert_eq!(user.display_name, "");
    }

    #[test]
    fn client_new_from_config() {
        let config = DirectoryConfig {
            server: "ldaps://dc01.corp.local:636".to_string(),
            bind_dn: "CN=svc,DC=corp,DC=local".to_string(),
            bind_password: "secret".to_string(),
            base_dn: "DC=corp,DC=local".to_string(),
            users_root: None,
            domain: None,
            tls_verify: true,
        };
        let client = AdClient::new(&config);
        assert_eq!(client.server, "ldaps://dc01.corp.local:636");
        assert_eq!(client.base_dn(), "DC=corp,DC=local");
        assert!(client.tls_verify);
    }
}
