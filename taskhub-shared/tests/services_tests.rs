/// Model and service tests against a real database
///
/// Skipped when `DATABASE_URL` is not set.
use sqlx::PgPool;
use taskhub_shared::auth::middleware::{AuthContext, AuthMethod};
use taskhub_shared::db::migrations::run_migrations;
use taskhub_shared::db::query::PageRequest;
use taskhub_shared::error::ServiceError;
use taskhub_shared::models::tag::{CreateTag, Tag};
use taskhub_shared::models::task::{NewTask, Task, TaskStatus};
use taskhub_shared::models::user::User;
use taskhub_shared::services::tags::TagInput;
use taskhub_shared::services::tasks::{AssignInput, TaskInput};
use taskhub_shared::services::{TagService, TaskService, WriteMode};
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect");
    run_migrations(&pool).await.expect("migrations");
    Some(pool)
}

fn unique() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn user(pool: &PgPool, superuser: bool) -> (User, AuthContext) {
    let mut conn = pool.acquire().await.unwrap();
    let email = format!("svc-{}@Example.COM", unique());
    let user = if superuser {
        User::create_superuser(&mut conn, &email, "Admin", "pw").await.unwrap()
    } else {
        User::create_user(&mut conn, &email, "Member", None).await.unwrap()
    };
    let auth = AuthContext::from_user(&user, AuthMethod::Header);
    (user, auth)
}

fn titled(title: &str) -> TaskInput {
    TaskInput {
        title: Some(title.to_string()),
        ..TaskInput::default()
    }
}

#[tokio::test]
async fn test_account_helpers() {
    let Some(pool) = pool().await else { return };
    let (member, _) = user(&pool, false).await;
    let (admin, _) = user(&pool, true).await;

    assert!(member.email.ends_with("@example.com"));
    assert!(!member.has_usable_password());
    assert!(member.is_active && !member.is_staff && !member.is_superuser);
    assert!(admin.is_staff && admin.is_superuser && admin.has_usable_password());

    let mut conn = pool.acquire().await.unwrap();
    assert!(User::superuser_exists(&mut conn).await.unwrap());
}

#[tokio::test]
async fn test_mark_completed_twice() {
    let Some(pool) = pool().await else { return };
    let (owner, _) = user(&pool, false).await;

    let mut conn = pool.acquire().await.unwrap();
    let data = NewTask {
        title: "Ship it".to_string(),
        ..NewTask::new(owner.id)
    };
    let mut task = Task::create(&mut conn, data).await.unwrap();

    task.mark_completed(&mut conn).await.unwrap();
    task.mark_completed(&mut conn).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let stored = Task::find_by_id(&mut conn, task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert!(stored.is_completed());
    assert!(!stored.is_overdue());
}

#[tokio::test]
async fn test_creator_only_writes() {
    let Some(pool) = pool().await else { return };
    let (_, alice) = user(&pool, false).await;
    let (bob_user, bob) = user(&pool, false).await;
    let service = TaskService::new(&pool);

    let task = service.create(&alice, titled("Alice's")).await.unwrap();

    let err = service.complete(&bob, task.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = service
        .update(&bob, task.id, titled("x"), WriteMode::Partial)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let task = service
        .assign(&alice, task.id, AssignInput { user_id: Some(bob_user.id) })
        .await
        .unwrap();
    assert_eq!(task.assigned_to, Some(bob_user.id));

    let err = service.delete(&bob, task.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_soft_deleted_task_is_hidden() {
    let Some(pool) = pool().await else { return };
    let (_, alice) = user(&pool, false).await;
    let service = TaskService::new(&pool);

    let task = service.create(&alice, titled("Temporary")).await.unwrap();
    service.delete(&alice, task.id).await.unwrap();

    assert!(matches!(
        service.get(&alice, task.id).await,
        Err(ServiceError::NotFound(_))
    ));

    let mut conn = pool.acquire().await.unwrap();
    let row = Task::find_by_id(&mut conn, task.id).await.unwrap().unwrap();
    assert!(row.is_deleted);

    let page = service.my_tasks(&alice, PageRequest::default()).await.unwrap();
    assert!(page.items.iter().all(|t| t.id != task.id));
}

#[tokio::test]
async fn test_duplicate_tag_name_rejected() {
    let Some(pool) = pool().await else { return };
    let (_, admin) = user(&pool, true).await;
    let service = TagService::new(&pool);
    let name = format!("g{}", unique());

    service
        .create(&admin, TagInput { name: Some(name.clone()), color: None })
        .await
        .unwrap();

    let err = service
        .create(&admin, TagInput { name: Some(name.to_uppercase()), color: None })
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(fields) => assert!(fields.contains("name")),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_tag_create_racing_uncommitted_insert() {
    let Some(pool) = pool().await else { return };
    let (admin_user, admin) = user(&pool, true).await;
    let name = format!("r{}", unique());

    // Uncommitted row: invisible to the pre-check, but held by the unique index
    let mut held = pool.begin().await.unwrap();
    Tag::create(
        &mut held,
        CreateTag { name: name.clone(), color: None, created_by: admin_user.id },
    )
    .await
    .unwrap();

    let service = TagService::new(&pool);
    let input = TagInput { name: Some(name.to_uppercase()), color: None };
    let racing = tokio::spawn(async move { service.create(&admin, input).await });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    held.commit().await.unwrap();

    match racing.await.unwrap() {
        Err(ServiceError::Validation(fields)) => assert!(fields.contains("name")),
        other => panic!("unexpected {:?}", other),
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE LOWER(name) = LOWER($1)")
        .bind(&name)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_user_delete_keeps_tasks() {
    let Some(pool) = pool().await else { return };
    let (owner, auth) = user(&pool, false).await;
    let task = TaskService::new(&pool)
        .create(&auth, titled("Orphan"))
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    User::delete(&mut conn, owner.id).await.unwrap();

    let row = Task::find_by_id(&mut conn, task.id).await.unwrap().unwrap();
    assert_eq!(row.created_by, None);
}
