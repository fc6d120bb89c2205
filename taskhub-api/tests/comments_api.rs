/// Comment endpoint tests
///
/// Require a PostgreSQL database via `DATABASE_URL`; skipped otherwise.
mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use taskhub_shared::models::comment::Comment;

#[tokio::test]
async fn test_comment_lifecycle() {
    let Some(ctx) = TestContext::new().await else { return };
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let task = ctx.create_task(&alice, json!({ "title": "Discuss" })).await;

    let (status, body) = ctx
        .post("/api/comments", &bob, json!({ "task": task, "content": "Looks good" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["task"], task);
    assert_eq!(body["author"]["id"], bob.id());
    let id = body["id"].as_i64().unwrap();
    let uri = format!("/api/comments/{}", id);

    let (status, _) = ctx.patch(&uri, &alice, json!({ "content": "hijacked" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.patch(&uri, &bob, json!({ "content": "Edited" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Edited");

    let (status, _) = ctx.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut conn = ctx.db.acquire().await.unwrap();
    let row = Comment::find_by_id(&mut conn, id).await.unwrap().unwrap();
    assert!(row.is_deleted);
}

#[tokio::test]
async fn test_cannot_comment_on_deleted_task() {
    let Some(ctx) = TestContext::new().await else { return };
    let alice = ctx.user().await;
    let task = ctx.create_task(&alice, json!({ "title": "Gone soon" })).await;
    ctx.delete(&format!("/api/tasks/{}", task), &alice).await;

    let (status, body) = ctx
        .post("/api/comments", &alice, json!({ "task": task, "content": "late" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["task"][0], "Cannot comment on a deleted task.");
}

#[tokio::test]
async fn test_create_requires_fields() {
    let Some(ctx) = TestContext::new().await else { return };
    let alice = ctx.user().await;

    let (status, body) = ctx.post("/api/comments", &alice, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["task"].is_array());
    assert!(body["fields"]["content"].is_array());

    let (status, body) = ctx
        .post("/api/comments", &alice, json!({ "task": i64::MAX, "content": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["task"].is_array());
}

#[tokio::test]
async fn test_list_filtered_by_task() {
    let Some(ctx) = TestContext::new().await else { return };
    let alice = ctx.user().await;
    let first = ctx.create_task(&alice, json!({ "title": "one" })).await;
    let second = ctx.create_task(&alice, json!({ "title": "two" })).await;

    for content in ["a", "b"] {
        ctx.post("/api/comments", &alice, json!({ "task": first, "content": content }))
            .await;
    }
    ctx.post("/api/comments", &alice, json!({ "task": second, "content": "c" }))
        .await;

    let (status, body) = ctx
        .get(&format!("/api/comments?task={}", first), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["content"], "a");

    let (_, body) = ctx
        .get(&format!("/api/comments?task={}&ordering=-created_at", first), &alice)
        .await;
    assert_eq!(body["results"][0]["content"], "b");

    let (status, _) = ctx.get("/api/comments?task=abc", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
