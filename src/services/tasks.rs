use super::clean_name;
use super::error::ServiceError;
use super::lists::find_owned_list;
use crate::models::{NewTask, Task, TaskView, UpdateTaskRequest};
use crate::schema::{lists, tasks};
use crate::tree;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Integer;
use diesel::sqlite::SqliteConnection;
use tracing::info;

/// Depth of a task with no parent.
pub const ROOT_DEPTH: i32 = 0;

fn find_owned_task(conn: &mut SqliteConnection, owner: i32, task_id: i32) -> Result<Task, ServiceError> {
    tasks::table
        .inner_join(lists::table)
        .filter(tasks::id.eq(task_id))
        .filter(lists::user_id.eq(owner))
        .select(Task::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Task", task_id))
}

// Ids of every task strictly below the bound root. UNION drops repeats, so a
// corrupted parent cycle still terminates.
const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS ( \
        SELECT id FROM tasks WHERE parent_id = ? \
        UNION \
        SELECT tasks.id FROM tasks JOIN subtree ON tasks.parent_id = subtree.id \
    ) ";

/// Every task below `root_id`, ordered by id. One statement however wide the
/// subtree is, so no id list is ever bound.
pub fn collect_descendants(conn: &mut SqliteConnection, root_id: i32) -> QueryResult<Vec<Task>> {
    sql_query(format!(
        "{SUBTREE_CTE}SELECT * FROM tasks WHERE id IN (SELECT id FROM subtree) ORDER BY id"
    ))
    .bind::<Integer, _>(root_id)
    .load(conn)
}

fn load_view(conn: &mut SqliteConnection, task: Task) -> Result<TaskView, ServiceError> {
    let descendants = collect_descendants(conn, task.id)?;
    Ok(tree::task_subtree(task, descendants))
}

pub fn create_task(
    conn: &mut SqliteConnection,
    owner: i32,
    list_id: i32,
    name: &str,
    parent_id: Option<i32>,
) -> Result<TaskView, ServiceError> {
    let name = clean_name("name", name)?;

    let task = conn.transaction::<_, ServiceError, _>(|conn| {
        let list = find_owned_list(conn, owner, list_id)?;

        let task_depth = match parent_id {
            None => ROOT_DEPTH,
            Some(parent_id) => {
                let parent = find_owned_task(conn, owner, parent_id)?;
                if parent.list_id != list.id {
                    return Err(ServiceError::Validation(format!(
                        "parent task {parent_id} belongs to a different list"
                    )));
                }
                parent.task_depth + 1
            }
        };

        let new_task = NewTask {
            list_id: list.id,
            parent_id,
            name,
            task_depth,
        };

        let task = diesel::insert_into(tasks::table)
            .values(&new_task)
            .returning(Task::as_returning())
            .get_result(conn)?;
        Ok(task)
    })?;

    info!(task_id = task.id, list_id, depth = task.task_depth, "created task");
    Ok(tree::task_subtree(task, Vec::new()))
}

pub fn get_task(conn: &mut SqliteConnection, owner: i32, task_id: i32) -> Result<TaskView, ServiceError> {
    let task = find_owned_task(conn, owner, task_id)?;
    load_view(conn, task)
}

/// Flips `is_completed` on this task only; subtasks keep their own state.
pub fn toggle_complete(conn: &mut SqliteConnection, owner: i32, task_id: i32) -> Result<TaskView, ServiceError> {
    let task = conn.transaction::<_, ServiceError, _>(|conn| {
        let task = find_owned_task(conn, owner, task_id)?;
        let task = diesel::update(tasks::table.find(task.id))
            .set(tasks::is_completed.eq(!task.is_completed))
            .returning(Task::as_returning())
            .get_result(conn)?;
        Ok(task)
    })?;
    load_view(conn, task)
}

/// Applies whichever of `name` and `is_completed` are present.
pub fn update_task(
    conn: &mut SqliteConnection,
    owner: i32,
    task_id: i32,
    req: &UpdateTaskRequest,
) -> Result<TaskView, ServiceError> {
    let name = req.name.as_deref().map(|name| clean_name("name", name)).transpose()?;
    if name.is_none() && req.is_completed.is_none() {
        return Err(ServiceError::Validation(
            "expected at least one of name, is_completed".to_string(),
        ));
    }

    let task = conn.transaction::<_, ServiceError, _>(|conn| {
        let mut task = find_owned_task(conn, owner, task_id)?;
        if let Some(name) = name {
            task = diesel::update(tasks::table.find(task.id))
                .set(tasks::name.eq(name))
                .returning(Task::as_returning())
                .get_result(conn)?;
        }
        if let Some(done) = req.is_completed {
            task = diesel::update(tasks::table.find(task.id))
                .set(tasks::is_completed.eq(done))
                .returning(Task::as_returning())
                .get_result(conn)?;
        }
        Ok(task)
    })?;
    load_view(conn, task)
}

/// Moves a task and its whole subtree into another of the owner's lists. The
/// task becomes a root there and every descendant keeps its relative depth.
pub fn move_task(
    conn: &mut SqliteConnection,
    owner: i32,
    task_id: i32,
    target_list_id: i32,
) -> Result<TaskView, ServiceError> {
    let task = conn.transaction::<_, ServiceError, _>(|conn| {
        let task = find_owned_task(conn, owner, task_id)?;
        let target = find_owned_list(conn, owner, target_list_id)?;

        let shift = task.task_depth - ROOT_DEPTH;
        let carried = sql_query(format!(
            "{SUBTREE_CTE}UPDATE tasks SET list_id = ?, task_depth = task_depth - ? \
             WHERE id IN (SELECT id FROM subtree)"
        ))
        .bind::<Integer, _>(task.id)
        .bind::<Integer, _>(target.id)
        .bind::<Integer, _>(shift)
        .execute(conn)?;

        let moved = diesel::update(tasks::table.find(task.id))
            .set((
                tasks::list_id.eq(target.id),
                tasks::parent_id.eq(None::<i32>),
                tasks::task_depth.eq(ROOT_DEPTH),
            ))
            .returning(Task::as_returning())
            .get_result(conn)?;

        info!(
            task_id,
            from_list = task.list_id,
            to_list = target.id,
            subtasks = carried,
            "moved task"
        );
        Ok(moved)
    })?;
    load_view(conn, task)
}

/// Deletes the task with all of its descendants; siblings and ancestors are
/// untouched. Returns the number of rows removed.
pub fn delete_task(conn: &mut SqliteConnection, owner: i32, task_id: i32) -> Result<usize, ServiceError> {
    let removed = conn.transaction::<_, ServiceError, _>(|conn| {
        let task = find_owned_task(conn, owner, task_id)?;

        // Whole subtree below first, then the task, so no row is left
        // pointing at a deleted parent
        let below = sql_query(format!(
            "{SUBTREE_CTE}DELETE FROM tasks WHERE id IN (SELECT id FROM subtree)"
        ))
        .bind::<Integer, _>(task.id)
        .execute(conn)?;
        let root = diesel::delete(tasks::table.find(task.id)).execute(conn)?;
        let removed = below + root;
        Ok(removed)
    })?;

    info!(task_id, removed, "deleted task");
    Ok(removed)
}
