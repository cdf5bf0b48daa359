//! Server-side session store backed by the `sessions` table.
//!
//! A session is created at login, looked up on every authenticated request and
//! removed at logout or the first time it is seen past its expiry.

use super::error::ServiceError;
use crate::models::{NewSession, Session};
use crate::schema::sessions;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use uuid::Uuid;

pub fn create_session(
    conn: &mut SqliteConnection,
    user_id: i32,
    ttl_hours: i64,
) -> Result<Session, ServiceError> {
    let token = Uuid::new_v4().to_string();
    let new_session = NewSession {
        id: &token,
        user_id,
        expires_at: Utc::now().naive_utc() + Duration::hours(ttl_hours),
    };

    let session = diesel::insert_into(sessions::table)
        .values(&new_session)
        .returning(Session::as_returning())
        .get_result(conn)?;
    Ok(session)
}

/// The user a live session token belongs to. Unknown and expired tokens both
/// resolve to `None`; an expired row is deleted on the way out.
pub fn resolve_session(conn: &mut SqliteConnection, token: &str) -> Result<Option<i32>, ServiceError> {
    let session = sessions::table
        .find(token)
        .select(Session::as_select())
        .first(conn)
        .optional()?;

    match session {
        Some(s) if s.expires_at > Utc::now().naive_utc() => Ok(Some(s.user_id)),
        Some(s) => {
            diesel::delete(sessions::table.find(s.id.as_str())).execute(conn)?;
            tracing::debug!(user_id = s.user_id, "dropped expired session");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Returns whether a session row was actually removed.
pub fn invalidate_session(conn: &mut SqliteConnection, token: &str) -> Result<bool, ServiceError> {
    let removed = diesel::delete(sessions::table.find(token)).execute(conn)?;
    Ok(removed > 0)
}

pub fn purge_expired_sessions(conn: &mut SqliteConnection, user_id: i32) -> Result<usize, ServiceError> {
    let removed = diesel::delete(
        sessions::table
            .filter(sessions::user_id.eq(user_id))
            .filter(sessions::expires_at.le(Utc::now().naive_utc())),
    )
    .execute(conn)?;
    Ok(removed)
}
