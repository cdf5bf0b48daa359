// Service functions exercised directly against an in-memory database.
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tasklist_backend::db::run_migrations;
use tasklist_backend::models::{NewTask, RegisterRequest, Task, UpdateListRequest};
use tasklist_backend::schema::tasks;
use tasklist_backend::services::error::ServiceError;
use tasklist_backend::services::{auth, lists, sessions, tasks as task_service};

fn connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").expect("in-memory sqlite");
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

fn user(conn: &mut SqliteConnection, name: &str) -> i32 {
    let req = RegisterRequest {
        username: name.to_string(),
        email: format!("{name}@x.com"),
        password: "pw".to_string(),
    };
    auth::register_user(conn, &req, 4).unwrap().id
}

fn all_tasks(conn: &mut SqliteConnection) -> Vec<Task> {
    tasks::table
        .order(tasks::id.asc())
        .select(Task::as_select())
        .load(conn)
        .unwrap()
}

#[test]
fn order_index_increases_per_user() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let bob = user(&mut conn, "bob");

    let indexes: Vec<i32> = (0..4)
        .map(|i| lists::create_list(&mut conn, alice, &format!("list {i}")).unwrap().order_index)
        .collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);

    // Another user's numbering starts over
    assert_eq!(lists::create_list(&mut conn, bob, "first").unwrap().order_index, 0);
}

#[test]
fn reorder_clamps_and_rejects_negative() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let a = lists::create_list(&mut conn, alice, "A").unwrap();
    lists::create_list(&mut conn, alice, "B").unwrap();

    let moved = lists::reorder_list(&mut conn, alice, a.id, 40).unwrap();
    assert_eq!(moved.order_index, 1);

    let err = lists::reorder_list(&mut conn, alice, a.id, -1).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = lists::reorder_list(&mut conn, alice, 999, 0).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn update_list_applies_both_fields() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    lists::create_list(&mut conn, alice, "A").unwrap();
    let b = lists::create_list(&mut conn, alice, "B").unwrap();

    let req = UpdateListRequest {
        name: Some("  First  ".to_string()),
        order_index: Some(0),
    };
    let view = lists::update_list(&mut conn, alice, b.id, &req).unwrap();
    assert_eq!(view.name, "First");
    assert_eq!(view.order_index, 0);
}

#[test]
fn depth_follows_parent() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let list = lists::create_list(&mut conn, alice, "L").unwrap();

    let mut parent = None;
    for expected_depth in 0..5 {
        let task = task_service::create_task(&mut conn, alice, list.id, "t", parent).unwrap();
        assert_eq!(task.task_depth, expected_depth);
        parent = Some(task.id);
    }

    let rows = all_tasks(&mut conn);
    for row in &rows {
        match row.parent_id {
            None => assert_eq!(row.task_depth, task_service::ROOT_DEPTH),
            Some(pid) => {
                let parent = rows.iter().find(|t| t.id == pid).unwrap();
                assert_eq!(row.task_depth, parent.task_depth + 1);
            }
        }
    }
}

#[test]
fn delete_task_removes_exactly_its_subtree() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let list = lists::create_list(&mut conn, alice, "L").unwrap();

    let root = task_service::create_task(&mut conn, alice, list.id, "root", None).unwrap();
    let doomed = task_service::create_task(&mut conn, alice, list.id, "doomed", Some(root.id)).unwrap();
    let sibling = task_service::create_task(&mut conn, alice, list.id, "sibling", Some(root.id)).unwrap();
    let grandchild = task_service::create_task(&mut conn, alice, list.id, "gc", Some(doomed.id)).unwrap();
    task_service::create_task(&mut conn, alice, list.id, "ggc", Some(grandchild.id)).unwrap();

    let removed = task_service::delete_task(&mut conn, alice, doomed.id).unwrap();
    assert_eq!(removed, 3);

    let left: Vec<i32> = all_tasks(&mut conn).into_iter().map(|t| t.id).collect();
    assert_eq!(left, vec![root.id, sibling.id]);
}

#[test]
fn wide_subtree_is_read_moved_and_deleted() {
    // More children than SQLite allows bound variables in one statement
    const CHILDREN: usize = 33_000;

    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let list = lists::create_list(&mut conn, alice, "L").unwrap();
    let other = lists::create_list(&mut conn, alice, "other").unwrap();
    let top = task_service::create_task(&mut conn, alice, list.id, "top", None).unwrap();
    let root = task_service::create_task(&mut conn, alice, list.id, "root", Some(top.id)).unwrap();

    let children: Vec<NewTask> = (0..CHILDREN)
        .map(|_| NewTask {
            list_id: list.id,
            parent_id: Some(root.id),
            name: "child",
            task_depth: root.task_depth + 1,
        })
        .collect();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for chunk in children.chunks(5_000) {
            diesel::insert_into(tasks::table).values(chunk).execute(conn)?;
        }
        Ok(())
    })
    .unwrap();

    let view = task_service::get_task(&mut conn, alice, root.id).unwrap();
    assert_eq!(view.subtasks.len(), CHILDREN);
    assert_eq!(view.node_count(), CHILDREN + 1);

    let moved = task_service::move_task(&mut conn, alice, root.id, other.id).unwrap();
    assert_eq!(moved.node_count(), CHILDREN + 1);
    assert_eq!(moved.task_depth, task_service::ROOT_DEPTH);
    let child = &moved.subtasks[CHILDREN - 1];
    assert_eq!(child.list_id, other.id);
    assert_eq!(child.task_depth, task_service::ROOT_DEPTH + 1);

    let removed = task_service::delete_task(&mut conn, alice, root.id).unwrap();
    assert_eq!(removed, CHILDREN + 1);
    assert!(matches!(
        task_service::get_task(&mut conn, alice, root.id),
        Err(ServiceError::NotFound(_))
    ));
    let left: Vec<i32> = all_tasks(&mut conn).into_iter().map(|t| t.id).collect();
    assert_eq!(left, vec![top.id]);
}

#[test]
fn delete_list_leaves_no_orphans() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let keep = lists::create_list(&mut conn, alice, "keep").unwrap();
    let gone = lists::create_list(&mut conn, alice, "gone").unwrap();

    let kept = task_service::create_task(&mut conn, alice, keep.id, "kept", None).unwrap();
    let root = task_service::create_task(&mut conn, alice, gone.id, "root", None).unwrap();
    let child = task_service::create_task(&mut conn, alice, gone.id, "child", Some(root.id)).unwrap();
    task_service::create_task(&mut conn, alice, gone.id, "leaf", Some(child.id)).unwrap();

    assert_eq!(lists::delete_list(&mut conn, alice, gone.id).unwrap(), 3);

    let rows = all_tasks(&mut conn);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, kept.id);
    assert!(matches!(
        lists::get_list(&mut conn, alice, gone.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn serialized_tree_matches_rows() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let list = lists::create_list(&mut conn, alice, "L").unwrap();
    let a = task_service::create_task(&mut conn, alice, list.id, "a", None).unwrap();
    let b = task_service::create_task(&mut conn, alice, list.id, "b", Some(a.id)).unwrap();
    task_service::create_task(&mut conn, alice, list.id, "c", Some(b.id)).unwrap();
    task_service::create_task(&mut conn, alice, list.id, "d", None).unwrap();

    let first = lists::get_list(&mut conn, alice, list.id).unwrap();
    let second = lists::get_list(&mut conn, alice, list.id).unwrap();
    assert_eq!(first, second);

    let rendered: usize = first.tasks.iter().map(|t| t.node_count()).sum();
    assert_eq!(rendered, all_tasks(&mut conn).len());
}

#[test]
fn tasks_of_other_users_are_not_found() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");
    let bob = user(&mut conn, "bob");
    let list = lists::create_list(&mut conn, alice, "L").unwrap();
    let task = task_service::create_task(&mut conn, alice, list.id, "t", None).unwrap();

    assert!(matches!(
        task_service::toggle_complete(&mut conn, bob, task.id),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        task_service::delete_task(&mut conn, bob, task.id),
        Err(ServiceError::NotFound(_))
    ));
    assert!(!task_service::get_task(&mut conn, alice, task.id).unwrap().is_completed);
}

#[test]
fn sessions_resolve_until_invalidated_or_expired() {
    let mut conn = connection();
    let alice = user(&mut conn, "alice");

    let live = sessions::create_session(&mut conn, alice, 1).unwrap();
    assert_eq!(sessions::resolve_session(&mut conn, &live.id).unwrap(), Some(alice));
    assert_eq!(auth::current_user(&mut conn, &live.id).unwrap().unwrap().id, alice);

    assert!(sessions::invalidate_session(&mut conn, &live.id).unwrap());
    assert_eq!(sessions::resolve_session(&mut conn, &live.id).unwrap(), None);
    assert!(!sessions::invalidate_session(&mut conn, &live.id).unwrap());

    let expired = sessions::create_session(&mut conn, alice, -1).unwrap();
    assert_eq!(sessions::resolve_session(&mut conn, &expired.id).unwrap(), None);
    // The expired row was dropped when it was seen
    assert!(!sessions::invalidate_session(&mut conn, &expired.id).unwrap());
}

#[test]
fn login_checks_password() {
    let mut conn = connection();
    user(&mut conn, "alice");

    let ok = auth::login_user(
        &mut conn,
        &tasklist_backend::models::LoginRequest {
            username: "alice".to_string(),
            password: "pw".to_string(),
        },
        24,
    )
    .unwrap();
    assert_eq!(ok.username, "alice");

    let err = auth::login_user(
        &mut conn,
        &tasklist_backend::models::LoginRequest {
            username: "alice".to_string(),
            password: "nope".to_string(),
        },
        24,
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));
}

#[test]
fn email_length_counts_characters() {
    let mut conn = connection();
    let register = |conn: &mut SqliteConnection, username: &str, email: String| {
        let req = RegisterRequest {
            username: username.to_string(),
            email,
            password: "pw".to_string(),
        };
        auth::register_user(conn, &req, 4)
    };

    // 36 characters but 66 bytes
    let accented = format!("{}@x.com", "é".repeat(30));
    assert!(accented.len() > 50);
    let info = register(&mut conn, "accented", accented.clone()).unwrap();
    assert_eq!(info.email, accented);

    let too_long = format!("{}@x.com", "é".repeat(45));
    assert_eq!(too_long.chars().count(), 51);
    assert!(matches!(
        register(&mut conn, "toolong", too_long),
        Err(ServiceError::Validation(_))
    ));
}
