use super::clean_name;
use super::error::ServiceError;
use crate::models::{List, ListView, NewList, Task, UpdateListRequest};
use crate::schema::{lists, tasks};
use crate::tree;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::info;

/// A list of `owner`'s, or `NotFound` when it is missing or someone else's.
pub(crate) fn find_owned_list(
    conn: &mut SqliteConnection,
    owner: i32,
    list_id: i32,
) -> Result<List, ServiceError> {
    lists::table
        .filter(lists::id.eq(list_id).and(lists::user_id.eq(owner)))
        .select(List::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("List", list_id))
}

fn load_view(conn: &mut SqliteConnection, list: List) -> Result<ListView, ServiceError> {
    let rows = Task::belonging_to(&list)
        .order(tasks::id.asc())
        .select(Task::as_select())
        .load(conn)?;
    Ok(tree::list_view(list, rows))
}

pub fn create_list(conn: &mut SqliteConnection, owner: i32, name: &str) -> Result<ListView, ServiceError> {
    let name = clean_name("name", name)?;

    let list = conn.transaction::<_, ServiceError, _>(|conn| {
        let highest: Option<i32> = lists::table
            .filter(lists::user_id.eq(owner))
            .select(max(lists::order_index))
            .first(conn)?;

        let new_list = NewList {
            user_id: owner,
            name,
            order_index: highest.map_or(0, |index| index + 1),
        };

        let list = diesel::insert_into(lists::table)
            .values(&new_list)
            .returning(List::as_returning())
            .get_result(conn)?;
        Ok(list)
    })?;

    info!(list_id = list.id, user_id = owner, "created list");
    Ok(tree::list_view(list, Vec::new()))
}

/// All of `owner`'s lists by ascending `order_index`, each with its task tree.
pub fn list_lists(conn: &mut SqliteConnection, owner: i32) -> Result<Vec<ListView>, ServiceError> {
    let owned = lists::table
        .filter(lists::user_id.eq(owner))
        .order((lists::order_index.asc(), lists::id.asc()))
        .select(List::as_select())
        .load(conn)?;

    let grouped = Task::belonging_to(&owned)
        .order(tasks::id.asc())
        .select(Task::as_select())
        .load(conn)?
        .grouped_by(&owned);

    Ok(owned
        .into_iter()
        .zip(grouped)
        .map(|(list, rows)| tree::list_view(list, rows))
        .collect())
}

pub fn get_list(conn: &mut SqliteConnection, owner: i32, list_id: i32) -> Result<ListView, ServiceError> {
    let list = find_owned_list(conn, owner, list_id)?;
    load_view(conn, list)
}

/// Moves the list to `new_index` among the owner's lists and renumbers them
/// `0..n`. Indexes past the end land on the last position.
pub fn reorder_list(
    conn: &mut SqliteConnection,
    owner: i32,
    list_id: i32,
    new_index: i32,
) -> Result<List, ServiceError> {
    if new_index < 0 {
        return Err(ServiceError::Validation("order_index must not be negative".to_string()));
    }

    conn.transaction::<_, ServiceError, _>(|conn| {
        let mut ordered = lists::table
            .filter(lists::user_id.eq(owner))
            .order((lists::order_index.asc(), lists::id.asc()))
            .select(List::as_select())
            .load(conn)?;

        let position = ordered
            .iter()
            .position(|list| list.id == list_id)
            .ok_or_else(|| ServiceError::not_found("List", list_id))?;

        let moved = ordered.remove(position);
        let target = (new_index as usize).min(ordered.len());
        ordered.insert(target, moved);

        for (index, list) in ordered.iter_mut().enumerate() {
            let index = index as i32;
            if list.order_index != index {
                diesel::update(lists::table.find(list.id))
                    .set(lists::order_index.eq(index))
                    .execute(conn)?;
                list.order_index = index;
            }
        }

        Ok(ordered.swap_remove(target))
    })
}

pub fn rename_list(
    conn: &mut SqliteConnection,
    owner: i32,
    list_id: i32,
    name: &str,
) -> Result<List, ServiceError> {
    let name = clean_name("name", name)?;
    let list = find_owned_list(conn, owner, list_id)?;

    let list = diesel::update(lists::table.find(list.id))
        .set(lists::name.eq(name))
        .returning(List::as_returning())
        .get_result(conn)?;
    Ok(list)
}

/// Applies whichever of `name` and `order_index` are present.
pub fn update_list(
    conn: &mut SqliteConnection,
    owner: i32,
    list_id: i32,
    req: &UpdateListRequest,
) -> Result<ListView, ServiceError> {
    if req.name.is_none() && req.order_index.is_none() {
        return Err(ServiceError::Validation(
            "expected at least one of name, order_index".to_string(),
        ));
    }

    let list = conn.transaction::<_, ServiceError, _>(|conn| {
        let mut list = find_owned_list(conn, owner, list_id)?;
        if let Some(name) = &req.name {
            list = rename_list(conn, owner, list_id, name)?;
        }
        if let Some(index) = req.order_index {
            list = reorder_list(conn, owner, list_id, index)?;
        }
        Ok(list)
    })?;

    load_view(conn, list)
}

/// Deletes the list and every task in it. Returns the number of tasks removed.
pub fn delete_list(conn: &mut SqliteConnection, owner: i32, list_id: i32) -> Result<usize, ServiceError> {
    let removed = conn.transaction::<_, ServiceError, _>(|conn| {
        let list = find_owned_list(conn, owner, list_id)?;

        // Subtasks always share their root's list, so this takes whole subtrees
        let removed = diesel::delete(tasks::table.filter(tasks::list_id.eq(list.id))).execute(conn)?;
        diesel::delete(lists::table.find(list.id)).execute(conn)?;
        Ok(removed)
    })?;

    info!(list_id, user_id = owner, tasks = removed, "deleted list");
    Ok(removed)
}
