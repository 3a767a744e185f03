use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{AppError, Result};
use crate::models::user::{NewUser, RegistrationForm, UserDetail, UserSummary};
use crate::repositories::user::UserRepository;
use crate::validation::users::{
    validate_confirmation, validate_email, validate_password, validate_username,
    RegistrationWarning,
};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// The outcome of a registration attempt that reached storage without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The user was stored under this id.
    Created(i64),
    /// The first check that failed.
    Rejected(RegistrationWarning),
}

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC string of the hash.
fn hash_password_blocking(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::PasswordHash(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::PasswordHash(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::PasswordHash(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Hashes a password on the blocking pool so the runtime keeps serving
/// other requests meanwhile.
pub async fn hash_password(password: Zeroizing<String>) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Registers a new user.
///
/// Checks run in this order and stop at the first failure:
/// username not blank, email well-formed, email not yet registered,
/// password long enough, confirmation identical. The email lookup runs
/// only once the first two checks pass.
///
/// # Arguments
///
/// * `users` - The user storage.
/// * `form` - The submitted registration form.
///
/// # Returns
///
/// A `Result` containing the `Registration` outcome.
pub async fn register_user(users: &dyn UserRepository, form: RegistrationForm) -> Result<Registration> {
    if let Err(warning) = validate_username(&form.username)
        .and_then(|()| validate_email(&form.email))
    {
        return Ok(Registration::Rejected(warning));
    }

    if users.email_exists(&form.email).await? {
        return Ok(Registration::Rejected(RegistrationWarning::EmailTaken));
    }

    if let Err(warning) = validate_password(&form.password)
        .and_then(|()| validate_confirmation(&form.password, &form.verify_password))
    {
        return Ok(Registration::Rejected(warning));
    }

    tracing::debug!("🔐 Creating user: {}", form.email);
    let password_hash = hash_password(form.password).await?;

    let id = users
        .insert_user(&NewUser {
            name: form.username,
            email: form.email,
            password_hash,
        })
        .await?;

    tracing::info!("✅ User created with ID: {}", id);
    Ok(Registration::Created(id))
}

/// Lists every registered user.
pub async fn list_users(users: &dyn UserRepository) -> Result<Vec<UserSummary>> {
    users.list_users().await
}

/// Finds a user by id.
pub async fn find_user(users: &dyn UserRepository, id: i64) -> Result<Option<UserDetail>> {
    users.find_user(id).await
}

/// Deletes a user by id. Deleting an id that does not exist is not an error.
pub async fn delete_user(users: &dyn UserRepository, id: i64) -> Result<u64> {
    let deleted = users.delete_user(id).await?;
    if deleted == 0 {
        tracing::debug!("Delete for user {} matched no rows", id);
    } else {
        tracing::info!("🗑️ User deleted: {}", id);
    }
    Ok(deleted)
}
