use garde::Validate;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// The minimum password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Why a registration was turned away. The display text is shown to the
/// visitor verbatim as a warning flash.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationWarning {
    #[error("Username can't be empty.")]
    EmptyUsername,
    #[error("Please input a valid email.")]
    InvalidEmail,
    #[error("This email has been registered.")]
    EmailTaken,
    #[error("Password must be 8 characters or longer.")]
    PasswordTooShort,
    #[error("Verify password is unmatched.")]
    PasswordMismatch,
}

#[derive(Validate)]
struct EmailAddress<'a> {
    #[garde(email)]
    value: &'a str,
}

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<(), RegistrationWarning> {
    if username.is_empty() {
        return Err(RegistrationWarning::EmptyUsername);
    }

    Ok(())
}

/// Validates the format of an email address.
///
/// On top of garde's address grammar the domain must end in a top-level
/// domain: at least two labels, the last one alphabetic (or punycode) and
/// two or more characters long. `alice@localhost` is rejected.
pub fn validate_email(email: &str) -> Result<(), RegistrationWarning> {
    EmailAddress { value: email }
        .validate()
        .map_err(|_| RegistrationWarning::InvalidEmail)?;

    let domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .ok_or(RegistrationWarning::InvalidEmail)?;

    if has_top_level_domain(domain) {
        Ok(())
    } else {
        Err(RegistrationWarning::InvalidEmail)
    }
}

fn has_top_level_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return false;
    }

    match labels.last() {
        Some(tld) if tld.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("xn--")) => true,
        Some(tld) => tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic),
        None => false,
    }
}

/// Validates a password.
///
/// Length is counted in characters (Unicode scalar values), not bytes and
/// not UTF-16 units, so `"𝒜𝒜𝒜𝒜"` is four characters long.
pub fn validate_password(password: &str) -> Result<(), RegistrationWarning> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(RegistrationWarning::PasswordTooShort);
    }

    Ok(())
}

/// Checks that the confirmation matches the password exactly.
pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), RegistrationWarning> {
    if bool::from(password.as_bytes().ct_eq(confirmation.as_bytes())) {
        Ok(())
    } else {
        Err(RegistrationWarning::PasswordMismatch)
    }
}

/// A user id taken from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdParam {
    /// A well-formed non-negative integer.
    Valid(i64),
    /// Anything else: empty, signed, fractional, non-numeric or too large.
    Invalid,
}

impl UserIdParam {
    /// Parses the raw path segment. Only ASCII digits are accepted.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return UserIdParam::Invalid;
        }

        raw.parse::<i64>()
            .map(UserIdParam::Valid)
            .unwrap_or(UserIdParam::Invalid)
    }
}
