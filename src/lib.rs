pub mod config;
pub mod db;
pub mod models;
pub mod schema;
pub mod services;
pub mod tree;

use crate::config::AppConfig;
use crate::db::{DbConn, DbPool};
use crate::models::{
    CreateListRequest, CreateTaskRequest, ListView, LoginRequest, LoginResponse, MoveTaskRequest,
    RegisterRequest, TaskView, UpdateListRequest, UpdateTaskRequest, UserInfo,
};
use crate::services::error::ServiceError;
use crate::services::{auth, lists, sessions, tasks};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::{catch, catchers, delete, get, post, put, routes, Responder, State};

pub const SESSION_COOKIE: &str = "session_token";

// Serializable error body shared by handlers and catchers
#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct ErrorDetail {
    pub error: String,
    pub message: String,
}

#[derive(Responder, Debug)]
pub enum ApiError {
    #[response(status = 404)]
    NotFound(Json<ErrorDetail>),
    #[response(status = 401)]
    Unauthorized(Json<ErrorDetail>),
    #[response(status = 409)]
    Conflict(Json<ErrorDetail>),
    #[response(status = 422)]
    Validation(Json<ErrorDetail>),
    #[response(status = 500)]
    InternalError(Json<ErrorDetail>),
}

#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct MessageResponse {
    pub message: String,
}

// Why a request was turned away; the 401/500 catchers read it back
#[derive(Debug, Clone, Copy)]
pub enum AuthError {
    MissingSession,
    InvalidSession,
    StoreUnavailable,
}

/// The raw session token, from `Authorization: Bearer` or the session cookie.
/// The header wins when both are present.
pub struct SessionToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionToken {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Some(header_value) = req.headers().get_one("Authorization") {
            if let Some(token) = header_value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Outcome::Success(SessionToken(token.to_string()));
                }
            }
        }

        match req.cookies().get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => {
                Outcome::Success(SessionToken(cookie.value().to_string()))
            }
            _ => {
                req.local_cache(|| Some(AuthError::MissingSession));
                Outcome::Error((Status::Unauthorized, AuthError::MissingSession))
            }
        }
    }
}

/// Request guard for every list and task endpoint.
pub struct AuthenticatedUser {
    pub user_id: i32,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<SessionToken>().await);

        let pool = match req.rocket().state::<DbPool>() {
            Some(pool) => pool,
            None => {
                req.local_cache(|| Some(AuthError::StoreUnavailable));
                return Outcome::Error((Status::InternalServerError, AuthError::StoreUnavailable));
            }
        };

        let resolved = pool
            .get()
            .map_err(ServiceError::from)
            .and_then(|mut conn| sessions::resolve_session(&mut conn, &token.0));

        match resolved {
            Ok(Some(user_id)) => Outcome::Success(AuthenticatedUser { user_id }),
            Ok(None) => {
                req.local_cache(|| Some(AuthError::InvalidSession));
                Outcome::Error((Status::Unauthorized, AuthError::InvalidSession))
            }
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                req.local_cache(|| Some(AuthError::StoreUnavailable));
                Outcome::Error((Status::InternalServerError, AuthError::StoreUnavailable))
            }
        }
    }
}

fn db_conn(pool: &DbPool) -> Result<DbConn, ApiError> {
    pool.get().map_err(|e| ServiceError::from(e).into())
}

#[get("/")]
fn index() -> &'static str {
    "Task list backend is running."
}

// --- Auth ---

#[post("/register", data = "<req>")]
pub fn register(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    req: Json<RegisterRequest>,
) -> Result<Created<Json<UserInfo>>, ApiError> {
    let mut conn = db_conn(pool)?;
    let user = auth::register_user(&mut conn, &req, config.bcrypt_cost)?;
    Ok(Created::new("/auth/me").body(Json(user)))
}

#[post("/login", data = "<req>")]
pub fn login(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    req: Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut conn = db_conn(pool)?;
    let response = auth::login_user(&mut conn, &req, config.session_ttl_hours)?;

    cookies.add(
        Cookie::build((SESSION_COOKIE, response.session_token.clone()))
            .http_only(true)
            .same_site(SameSite::Lax),
    );
    Ok(Json(response))
}

#[post("/logout")]
pub fn logout(
    pool: &State<DbPool>,
    cookies: &CookieJar<'_>,
    token: Option<SessionToken>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(token) = token {
        let mut conn = db_conn(pool)?;
        auth::logout_user(&mut conn, &token.0)?;
    }
    cookies.remove(Cookie::from(SESSION_COOKIE));

    // Logging out without a live session still ends in a logged-out client
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

#[get("/me")]
pub fn me(pool: &State<DbPool>, token: SessionToken) -> Result<Json<UserInfo>, ApiError> {
    let mut conn = db_conn(pool)?;
    match auth::current_user(&mut conn, &token.0)? {
        Some(user) => Ok(Json(user.into())),
        None => Err(ApiError::Unauthorized(error_body(
            "invalid_session",
            "Session token is invalid or expired.",
        ))),
    }
}

fn auth_routes() -> Vec<rocket::Route> {
    routes![register, login, logout, me]
}

// --- Lists ---

#[get("/")]
pub fn get_lists(pool: &State<DbPool>, user: AuthenticatedUser) -> Result<Json<Vec<ListView>>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(lists::list_lists(&mut conn, user.user_id)?))
}

#[post("/", data = "<req>")]
pub fn create_list(
    pool: &State<DbPool>,
    user: AuthenticatedUser,
    req: Json<CreateListRequest>,
) -> Result<Created<Json<ListView>>, ApiError> {
    let mut conn = db_conn(pool)?;
    let list = lists::create_list(&mut conn, user.user_id, &req.name)?;
    Ok(Created::new(format!("/lists/{}", list.id)).body(Json(list)))
}

#[get("/<id>")]
pub fn get_list(pool: &State<DbPool>, user: AuthenticatedUser, id: i32) -> Result<Json<ListView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(lists::get_list(&mut conn, user.user_id, id)?))
}

#[put("/<id>", data = "<req>")]
pub fn update_list(
    pool: &State<DbPool>,
    user: AuthenticatedUser,
    id: i32,
    req: Json<UpdateListRequest>,
) -> Result<Json<ListView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(lists::update_list(&mut conn, user.user_id, id, &req)?))
}

#[delete("/<id>")]
pub fn delete_list(pool: &State<DbPool>, user: AuthenticatedUser, id: i32) -> Result<Status, ApiError> {
    let mut conn = db_conn(pool)?;
    lists::delete_list(&mut conn, user.user_id, id)?;
    Ok(Status::NoContent)
}

#[post("/<id>/tasks", data = "<req>")]
pub fn create_task(
    pool: &State<DbPool>,
    user: AuthenticatedUser,
    id: i32,
    req: Json<CreateTaskRequest>,
) -> Result<Created<Json<TaskView>>, ApiError> {
    let mut conn = db_conn(pool)?;
    let task = tasks::create_task(&mut conn, user.user_id, id, &req.name, req.parent_id)?;
    Ok(Created::new(format!("/tasks/{}", task.id)).body(Json(task)))
}

fn list_routes() -> Vec<rocket::Route> {
    routes![get_lists, create_list, get_list, update_list, delete_list, create_task]
}

// --- Tasks ---

#[get("/<id>")]
pub fn get_task(pool: &State<DbPool>, user: AuthenticatedUser, id: i32) -> Result<Json<TaskView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(tasks::get_task(&mut conn, user.user_id, id)?))
}

#[put("/<id>", data = "<req>")]
pub fn update_task(
    pool: &State<DbPool>,
    user: AuthenticatedUser,
    id: i32,
    req: Json<UpdateTaskRequest>,
) -> Result<Json<TaskView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(tasks::update_task(&mut conn, user.user_id, id, &req)?))
}

#[post("/<id>/toggle")]
pub fn toggle_task(pool: &State<DbPool>, user: AuthenticatedUser, id: i32) -> Result<Json<TaskView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(tasks::toggle_complete(&mut conn, user.user_id, id)?))
}

#[put("/<id>/move", data = "<req>")]
pub fn move_task(
    pool: &State<DbPool>,
    user: AuthenticatedUser,
    id: i32,
    req: Json<MoveTaskRequest>,
) -> Result<Json<TaskView>, ApiError> {
    let mut conn = db_conn(pool)?;
    Ok(Json(tasks::move_task(&mut conn, user.user_id, id, req.list_id)?))
}

#[delete("/<id>")]
pub fn delete_task(pool: &State<DbPool>, user: AuthenticatedUser, id: i32) -> Result<Status, ApiError> {
    let mut conn = db_conn(pool)?;
    tasks::delete_task(&mut conn, user.user_id, id)?;
    Ok(Status::NoContent)
}

fn task_routes() -> Vec<rocket::Route> {
    routes![get_task, update_task, toggle_task, move_task, delete_task]
}

// --- Catchers ---

fn error_body(error: &str, message: &str) -> Json<ErrorDetail> {
    Json(ErrorDetail {
        error: error.to_string(),
        message: message.to_string(),
    })
}

#[catch(400)]
fn bad_request_catcher() -> Json<ErrorDetail> {
    error_body("bad_request", "The request could not be understood.")
}

#[catch(401)] // Catches Unauthorized
fn unauthorized_catcher(_status: Status, req: &Request<'_>) -> Json<ErrorDetail> {
    match req.local_cache(|| None as Option<AuthError>) {
        Some(AuthError::MissingSession) => error_body(
            "missing_session",
            "No session cookie or bearer token was provided.",
        ),
        Some(AuthError::InvalidSession) => {
            error_body("invalid_session", "Session token is invalid or expired.")
        }
        _ => error_body("unauthorized", "Access denied. A valid session is required."),
    }
}

#[catch(404)]
fn not_found_catcher() -> Json<ErrorDetail> {
    error_body("not_found", "The requested resource does not exist.")
}

#[catch(422)]
fn unprocessable_catcher() -> Json<ErrorDetail> {
    error_body(
        "validation_error",
        "The request body is missing a required field or has a malformed one.",
    )
}

#[catch(500)] // Catches Internal Server Error
fn internal_server_error_catcher(_status: Status, req: &Request<'_>) -> Json<ErrorDetail> {
    match req.local_cache(|| None as Option<AuthError>) {
        Some(AuthError::StoreUnavailable) => {
            error_body("store_unavailable", "The session store could not be reached.")
        }
        _ => error_body("internal_server_error", "An unexpected error occurred on the server."),
    }
}

/// Builds the application on top of `figment`. Tests use this to point the
/// app at a throwaway database.
pub fn rocket_from_figment(figment: Figment) -> rocket::Rocket<rocket::Build> {
    rocket::custom(figment)
        .attach(AdHoc::config::<AppConfig>())
        .attach(db::stage())
        .mount("/", routes![index])
        .mount("/auth", auth_routes())
        .mount("/lists", list_routes())
        .mount("/tasks", task_routes())
        .register(
            "/",
            catchers![
                bad_request_catcher,
                unauthorized_catcher,
                not_found_catcher,
                unprocessable_catcher,
                internal_server_error_catcher
            ],
        )
}

// This function can be used by main.rs to launch the server
// and by tests to get a Rocket instance.
pub fn rocket_instance() -> rocket::Rocket<rocket::Build> {
    rocket_from_figment(config::figment())
}
