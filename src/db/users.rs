use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;

const USER_COLUMNS: &str =
    "id, email, password_hash, is_active, is_superuser, is_verified, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        is_active: row.get(3)?,
        is_superuser: row.get(4)?,
        is_verified: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a new active, unverified, non-superuser account.
pub fn insert(conn: &Connection, email: &str, password_hash: &str) -> rusqlite::Result<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, email, password_hash) VALUES (?1, ?2, ?3)",
        params![id, email, password_hash],
    )?;
    find_by_id(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Emails are stored lowercase, so callers pass a normalized address.
pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        from_row,
    )
    .optional()
}

/// Persist every mutable column of `user`.
pub fn save(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET email = ?2, password_hash = ?3, is_active = ?4, \
         is_superuser = ?5, is_verified = ?6 WHERE id = ?1",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.is_active,
            user.is_superuser,
            user.is_verified
        ],
    )?;
    Ok(())
}

/// Delete a user. Posts, sessions and tokens go with it via ON DELETE CASCADE.
pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
