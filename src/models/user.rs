use zeroize::Zeroizing;

/// A row of the home page listing. Email and password never leave storage here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    /// The unique identifier for the user.
    pub id: i64,
    /// The user's display name.
    pub name: String,
}

/// The fields shown on a user's detail page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDetail {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// A validated user ready to be inserted.
#[derive(Clone, Debug)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The Argon2id PHC string of the user's password.
    pub password_hash: String,
}

/// The raw registration form as submitted by a visitor.
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub verify_password: Zeroizing<String>,
}
