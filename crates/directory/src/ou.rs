//! Distinguished name helpers for Active Directory.

/// Escape special characters in an LDAP DN component value.
///
/// Characters `,`, `+`, `"`, `\`, `<`, `>`, and `;` are escaped with a backslash
/// per RFC 4514 to prevent DN injection or malformed distinguished names.
pub fn escape_dn_value(val: &str) -> String {
    val.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('+', "\\+")
        .replace('"', "\\\"")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace(';', "\\;")
}

/// DN of an OU named `name` directly under `parent_dn`.
pub fn ou_dn(name: &str, parent_dn: &str) -> String {
    format!("OU={},{parent_dn}", escape_dn_value(name.trim()))
}

/// DN of the OU a department's accounts live in.
///
/// A blank department maps to the root itself.
pub fn department_ou_dn(department: &str, users_root: &str) -> String {
    if department.trim().is_empty() {
        users_root.to_string()
    } else {
        ou_dn(department, users_root)
    }
}

/// Build a user's full DN from their common name and OU DN.
///
/// The CN value is DN-escaped to handle special characters in names.
pub fn user_dn(cn: &str, ou_dn: &str) -> String {
    format!("CN={},{ou_dn}", escape_dn_value(cn))
}

/// Extract the OU portion from a DN.
/// E.g. `CN=John Doe,OU=IT,DC=example,DC=com` -> `OU=IT,DC=example,DC=com`
///
/// Escaped commas inside the first component are honored.
pub fn parent_dn(dn: &str) -> String {
    let mut escaped = false;
    for (idx, ch) in dn.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return dn[idx + 1..].to_string(),
            _ => escaped = false,
        }
    }
    String::new()
}
