//! Assembles flat task rows into the nested shape returned to clients.
//!
//! Rows are grouped by `parent_id` once, then each group is consumed exactly
//! once while walking down from the roots. A row whose parent is absent from
//! the input is never reached, and a corrupted parent cycle cannot recurse
//! forever because its group has already been taken.

use crate::models::{List, ListView, Task, TaskView};
use std::collections::HashMap;

type ChildIndex = HashMap<Option<i32>, Vec<Task>>;

fn group_by_parent(tasks: Vec<Task>) -> ChildIndex {
    let mut index: ChildIndex = HashMap::new();
    for task in tasks {
        index.entry(task.parent_id).or_default().push(task);
    }
    index
}

fn build(task: Task, index: &mut ChildIndex) -> TaskView {
    let subtasks = index
        .remove(&Some(task.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| build(child, index))
        .collect();

    TaskView {
        id: task.id,
        name: task.name,
        list_id: task.list_id,
        task_depth: task.task_depth,
        parent_id: task.parent_id,
        is_completed: task.is_completed,
        subtasks,
    }
}

/// Every root task (no parent) with its subtree, in input order.
pub fn task_forest(tasks: Vec<Task>) -> Vec<TaskView> {
    let mut index = group_by_parent(tasks);
    index
        .remove(&None)
        .unwrap_or_default()
        .into_iter()
        .map(|root| build(root, &mut index))
        .collect()
}

/// `root` with whichever of `descendants` hang below it.
pub fn task_subtree(root: Task, descendants: Vec<Task>) -> TaskView {
    let mut index = group_by_parent(descendants);
    build(root, &mut index)
}

pub fn list_view(list: List, tasks: Vec<Task>) -> ListView {
    ListView {
        id: list.id,
        name: list.name,
        order_index: list.order_index,
        tasks: task_forest(tasks),
    }
}
