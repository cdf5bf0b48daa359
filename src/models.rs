// tasklist_backend/src/models.rs
use crate::schema::{lists, sessions, tasks, users};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Identifiable, Selectable, Serialize, Debug, PartialEq, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(crate = "rocket::serde")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)] // Password hash should not be sent to client
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

// For returning user info without password hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Associations, Debug, PartialEq, Clone)]
#[diesel(belongs_to(User))]
#[diesel(table_name = lists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct List {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub order_index: i32,
}

#[derive(Insertable)]
#[diesel(table_name = lists)]
pub struct NewList<'a> {
    pub user_id: i32,
    pub name: &'a str,
    pub order_index: i32,
}

#[derive(Queryable, QueryableByName, Identifiable, Selectable, Associations, Debug, PartialEq, Clone)]
#[diesel(belongs_to(List))]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Task {
    pub id: i32,
    pub list_id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
    pub task_depth: i32,
    pub is_completed: bool,
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub list_id: i32,
    pub parent_id: Option<i32>,
    pub name: &'a str,
    pub task_depth: i32,
}

#[derive(Queryable, Identifiable, Selectable, Associations, Debug, Clone)]
#[diesel(belongs_to(User))]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Session {
    pub id: String,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub id: &'a str,
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

/// A list as the client sees it: its root tasks, each carrying its subtree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct ListView {
    pub id: i32,
    pub name: String,
    pub order_index: i32,
    pub tasks: Vec<TaskView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct TaskView {
    pub id: i32,
    pub name: String,
    pub list_id: i32,
    pub task_depth: i32,
    pub parent_id: Option<i32>,
    pub is_completed: bool,
    pub subtasks: Vec<TaskView>,
}

impl TaskView {
    /// Number of nodes in this subtree, the task itself included.
    pub fn node_count(&self) -> usize {
        1 + self.subtasks.iter().map(TaskView::node_count).sum::<usize>()
    }
}

// Request bodies

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct LoginResponse {
    pub session_token: String,
    pub user_id: i32,
    pub username: String,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct CreateListRequest {
    pub name: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(crate = "rocket::serde")]
pub struct UpdateListRequest {
    pub name: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct CreateTaskRequest {
    pub name: String,
    pub parent_id: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(crate = "rocket::serde")]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct MoveTaskRequest {
    pub list_id: i32,
}
