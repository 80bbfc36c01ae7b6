use crate::error::AppResult;

/// Hash a password with bcrypt at the configured cost.
/// Runs on the blocking pool; a hash at the default cost takes ~250ms.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Verify a password against a stored hash. Malformed hashes never verify.
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await?;
    Ok(ok)
}

/// Password policy applied on register, reset and update.
pub fn validate_password(password: &str, email: &str) -> Result<(), String> {
    if password.chars().count() < 3 {
        return Err("Password should be at least 3 characters".into());
    }
    if !email.is_empty() && password.to_lowercase().contains(&email.to_lowercase()) {
        return Err("Password should not contain e-mail".into());
    }
    Ok(())
}

/// Canonical stored form of an address. Shape is checked by `#[validate(email)]`
/// on the request types.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
