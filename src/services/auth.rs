use super::error::ServiceError;
use super::{clean_name, sessions, MAX_NAME_LEN};
use crate::models::{LoginRequest, LoginResponse, NewUser, RegisterRequest, User, UserInfo};
use crate::schema::users;
use bcrypt::{hash, verify};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{info, warn};

pub fn register_user(
    conn: &mut SqliteConnection,
    req: &RegisterRequest,
    bcrypt_cost: u32,
) -> Result<UserInfo, ServiceError> {
    let username = clean_name("username", &req.username)?;
    let email = req.email.trim();
    if !email.contains('@') || email.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::Validation("email is not a valid address".to_string()));
    }
    if req.password.is_empty() {
        return Err(ServiceError::Validation("password must not be empty".to_string()));
    }

    // Hash outside the transaction, it is the slow part
    let hashed_password = hash(&req.password, bcrypt_cost)?;

    let user = conn.transaction::<_, ServiceError, _>(|conn| {
        // Check if user already exists
        let taken: i64 = users::table
            .filter(users::username.eq(username).or(users::email.eq(email)))
            .count()
            .get_result(conn)?;
        if taken > 0 {
            return Err(ServiceError::DuplicateUser(
                "Username or email already registered".to_string(),
            ));
        }

        let new_user = NewUser {
            username,
            email,
            password_hash: &hashed_password,
        };

        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)?;
        Ok(user)
    })?;

    info!(user_id = user.id, username = %user.username, "registered user");
    Ok(user.into())
}

pub fn login_user(
    conn: &mut SqliteConnection,
    req: &LoginRequest,
    session_ttl_hours: i64,
) -> Result<LoginResponse, ServiceError> {
    let found_user = users::table
        .filter(users::username.eq(req.username.trim()))
        .select(User::as_select())
        .first(conn)
        .optional()?;

    // Unknown user and wrong password look the same to the caller
    let user = match found_user {
        Some(user) if verify(&req.password, &user.password_hash)? => user,
        _ => {
            warn!(username = %req.username, "failed login attempt");
            return Err(ServiceError::InvalidCredentials);
        }
    };

    let session = conn.transaction::<_, ServiceError, _>(|conn| {
        sessions::purge_expired_sessions(conn, user.id)?;
        sessions::create_session(conn, user.id, session_ttl_hours)
    })?;

    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        session_token: session.id,
        user_id: user.id,
        username: user.username,
    })
}

/// Ends the session behind `token`. Logging out twice is not an error.
pub fn logout_user(conn: &mut SqliteConnection, token: &str) -> Result<(), ServiceError> {
    if sessions::invalidate_session(conn, token)? {
        info!("session closed");
    }
    Ok(())
}

pub fn find_user(conn: &mut SqliteConnection, user_id: i32) -> Result<User, ServiceError> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("User", user_id))
}

/// The user behind a session token, if the session is still live.
pub fn current_user(conn: &mut SqliteConnection, token: &str) -> Result<Option<User>, ServiceError> {
    match sessions::resolve_session(conn, token)? {
        Some(user_id) => Ok(Some(find_user(conn, user_id)?)),
        None => Ok(None),
    }
}
