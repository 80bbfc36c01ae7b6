use chrono::{SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{FileType, Post};

impl ToSql for FileType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for FileType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Fields supplied by the caller when creating a post.
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub user_id: &'a str,
    pub caption: &'a str,
    pub url: &'a str,
    pub file_type: FileType,
    pub file_name: &'a str,
}

const POST_COLUMNS: &str = "id, user_id, caption, url, file_type, file_name, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        caption: row.get(2)?,
        url: row.get(3)?,
        file_type: row.get(4)?,
        file_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, new: &NewPost<'_>) -> rusqlite::Result<Post> {
    let post = Post {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: new.user_id.to_string(),
        caption: new.caption.to_string(),
        url: new.url.to_string(),
        file_type: new.file_type,
        file_name: new.file_name.to_string(),
        // Fixed-width UTC timestamps sort lexically in creation order
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    };

    conn.execute(
        &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            post.id,
            post.user_id,
            post.caption,
            post.url,
            post.file_type,
            post.file_name,
            post.created_at
        ],
    )?;

    Ok(post)
}

/// All posts, newest first. UUID v7 ids break ties within one timestamp.
pub fn list_newest_first(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
    ))?;
    let posts = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
