//! Initial password generation for new accounts.
//!
//! Generated passwords are provisioning placeholders: every account is
//! created with "must change password at next logon" set, so the secret only
//! has to survive until the user's first sign-in.

use rand::seq::SliceRandom;
use rand::Rng;

use onboard_core::config::PasswordStrategy;

/// Uppercase letters without the look-alikes `I` and `O`.
pub const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
/// Lowercase letters without the look-alikes `l` and `o`.
pub const LOWERCASE: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
/// Digits without `0` and `1`.
pub const DIGITS: &[u8] = b"23456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*";

const CLASSES: [&[u8]; 4] = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS];

/// Generate a random password with at least one character from each class.
///
/// Lengths below four are raised to four so every class fits.
pub fn generate_password(length: usize) -> String {
    let length = length.max(CLASSES.len());
    let mut rng = rand::thread_rng();

    let mut chars: Vec<u8> = CLASSES
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    let union: Vec<u8> = CLASSES.concat();
    chars.extend((CLASSES.len()..length).map(|_| union[rng.gen_range(0..union.len())]));
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// Whether a password contains at least one character from every class.
pub fn meets_complexity(password: &str) -> bool {
    CLASSES
        .iter()
        .all(|class| password.bytes().any(|b| class.contains(&b)))
}

/// Choose the initial password for one account.
pub fn initial_password(strategy: &PasswordStrategy) -> String {
    match strategy {
        PasswordStrategy::Fixed { value } => value.clone(),
        PasswordStrategy::Generated { length } => generate_password(*length),
    }
}
