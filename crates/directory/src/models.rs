//! DTO structs exchanged with the directory gateway.

use std::fmt;

use onboard_core::models::InputRecord;

use crate::ou::user_dn;

/// An existing user account as read from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserAttributes {
    pub dn: String,
    pub username: String,
    pub principal_name: Option<String>,
    pub display_name: String,
    pub given_name: String,
    pub surname: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    /// DN of the containing OU.
    pub ou: String,
    pub enabled: bool,
}

impl UserAttributes {
    /// Current directory value for a profile field, empty when unset.
    pub fn value(&self, field: UserField) -> &str {
        match field {
            UserField::FirstName => &self.given_name,
            UserField::LastName => &self.surname,
            UserField::Email => self.email.as_deref().unwrap_or(""),
            UserField::Department => self.department.as_deref().unwrap_or(""),
            UserField::JobTitle => self.job_title.as_deref().unwrap_or(""),
        }
    }
}

/// Everything needed to create a user account.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub given_name: String,
    pub surname: String,
    pub principal_name: String,
    /// DN of the OU the account is created in.
    pub ou_dn: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub password: String,
    pub enabled: bool,
    pub must_change_password: bool,
    pub home_directory: Option<String>,
    pub home_drive: Option<String>,
}

impl NewUser {
    /// Full DN the account will get.
    pub fn dn(&self) -> String {
        user_dn(&self.display_name, &self.ou_dn)
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("principal_name", &self.principal_name)
            .field("ou_dn", &self.ou_dn)
            .field("email", &self.email)
            .field("department", &self.department)
            .field("job_title", &self.job_title)
            .field("password", &"<redacted>")
            .field("enabled", &self.enabled)
            .field("must_change_password", &self.must_change_password)
            .field("home_directory", &self.home_directory)
            .finish()
    }
}

/// Profile fields that Modify compares and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    FirstName,
    LastName,
    Email,
    Department,
    JobTitle,
}

impl UserField {
    pub const ALL: [UserField; 5] = [
        UserField::FirstName,
        UserField::LastName,
        UserField::Email,
        UserField::Department,
        UserField::JobTitle,
    ];

    /// LDAP attribute holding this field.
    pub fn ldap_attribute(self) -> &'static str {
        match self {
            UserField::FirstName => "givenName",
            UserField::LastName => "sn",
            UserField::Email => "mail",
            UserField::Department => "department",
            UserField::JobTitle => "title",
        }
    }

    /// Value of this field in an input record.
    pub fn record_value(self, record: &InputRecord) -> &str {
        match self {
            UserField::FirstName => &record.first_name,
            UserField::LastName => &record.last_name,
            UserField::Email => &record.email,
            UserField::Department => &record.department,
            UserField::JobTitle => &record.job_title,
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserField::FirstName => "first name",
            UserField::LastName => "last name",
            UserField::Email => "email",
            UserField::Department => "department",
            UserField::JobTitle => "job title",
        };
        f.write_str(name)
    }
}

/// One changed field: directory value before, record value after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    pub field: UserField,
    pub old: String,
    pub new: String,
}

/// The set of field changes applied by a single update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    pub changes: Vec<AttributeChange>,
}

impl AttributeDiff {
    /// Compare a record against the current directory values.
    ///
    /// Values are compared after trimming, case-sensitively. Blank record
    /// values never clear a directory attribute.
    pub fn between(record: &InputRecord, current: &UserAttributes) -> Self {
        let changes = UserField::ALL
            .into_iter()
            .filter_map(|field| {
                let new = field.record_value(record).trim();
                let old = current.value(field).trim();
                if new.is_empty() || new == old {
                    None
                } else {
                    Some(AttributeChange {
                        field,
                        old: old.to_string(),
                        new: new.to_string(),
                    })
                }
            })
            .collect();
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Comma-separated list of changed field names.
    pub fn describe(&self) -> String {
        self.changes
            .iter()
            .map(|c| c.field.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
