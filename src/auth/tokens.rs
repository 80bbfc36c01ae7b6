use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::session::generate_token;

/// What a one-time token may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    ResetPassword,
    Verify,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::ResetPassword => "reset_password",
            TokenPurpose::Verify => "verify",
        }
    }
}

/// Issue a token valid for `minutes`. Earlier tokens for the same purpose
/// are revoked so only the newest one works, and expired tokens of all
/// users are swept.
pub fn issue(
    conn: &Connection,
    user_id: &str,
    purpose: TokenPurpose,
    minutes: u64,
) -> rusqlite::Result<String> {
    let token = generate_token();
    conn.execute(
        "DELETE FROM user_tokens WHERE expires_at <= datetime('now')",
        [],
    )?;
    conn.execute(
        "DELETE FROM user_tokens WHERE user_id = ?1 AND purpose = ?2",
        params![user_id, purpose.as_str()],
    )?;
    conn.execute(
        "INSERT INTO user_tokens (token, user_id, purpose, expires_at) \
         VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![token, user_id, purpose.as_str(), format!("+{} minutes", minutes)],
    )?;
    Ok(token)
}

/// Resolve an unexpired token to its user id without consuming it.
pub fn lookup(
    conn: &Connection,
    token: &str,
    purpose: TokenPurpose,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT user_id FROM user_tokens \
         WHERE token = ?1 AND purpose = ?2 AND expires_at > datetime('now')",
        params![token, purpose.as_str()],
        |row| row.get(0),
    )
    .optional()
}

pub fn revoke(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM user_tokens WHERE token = ?1", params![token])?;
    Ok(())
}
