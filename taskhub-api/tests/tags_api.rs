/// Tag endpoint tests
///
/// Require a PostgreSQL database via `DATABASE_URL`; skipped otherwise.
mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_tag_names_unique_ignoring_case() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;
    let name = format!("u{}", common::unique());

    let (status, body) = ctx
        .post("/api/tags", &admin, json!({ "name": name, "color": "#FF0000" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["color"], "#FF0000");

    let (status, body) = ctx
        .post("/api/tags", &admin, json!({ "name": name.to_uppercase() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["name"].is_array(), "{}", body);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE LOWER(name) = LOWER($1)")
        .bind(&name)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_only_admins_create_and_delete() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;
    let alice = ctx.user().await;

    let (status, _) = ctx
        .post("/api/tags", &alice, json!({ "name": format!("n{}", common::unique()) }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = ctx.create_tag(&admin, &format!("d{}", common::unique())).await;
    let uri = format!("/api/tags/{}", id);

    let (status, _) = ctx.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unlinks_from_tasks() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;
    let tag = ctx.create_tag(&admin, &format!("x{}", common::unique())).await;
    let task = ctx
        .create_task(&admin, json!({ "title": "tagged", "tag_ids": [tag] }))
        .await;

    ctx.delete(&format!("/api/tags/{}", tag), &admin).await;

    let (status, body) = ctx.get(&format!("/api/tasks/{}", task), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn test_color_validation() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;

    let (status, body) = ctx
        .post(
            "/api/tags",
            &admin,
            json!({ "name": format!("c{}", common::unique()), "color": "red" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["color"].is_array());

    let (status, body) = ctx
        .post("/api/tags", &admin, json!({ "name": "a-name-well-over-15" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["name"].is_array());
}

#[tokio::test]
async fn test_update_not_allowed() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;
    let id = ctx.create_tag(&admin, &format!("p{}", common::unique())).await;
    let uri = format!("/api/tags/{}", id);

    let (status, body) = ctx
        .send("PUT", &uri, Some(&admin), Some(json!({ "name": "renamed" })))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "Method \"PUT\" not allowed.");

    let (status, _) = ctx.patch(&uri, &admin, json!({ "color": "#000000" })).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_autocomplete_and_search() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;
    let prefix = common::unique();
    ctx.create_tag(&admin, &format!("{}aa", prefix)).await;
    ctx.create_tag(&admin, &format!("{}bb", prefix)).await;

    let (status, body) = ctx
        .get(&format!("/api/tags/autocomplete?q={}AA", prefix.to_uppercase()), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], format!("{}aa", prefix));

    let (_, body) = ctx
        .get(&format!("/api/tags/autocomplete?q={}", prefix), &admin)
        .await;
    assert_eq!(body, json!([]));

    let (status, body) = ctx.get("/api/tags/autocomplete", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());
    assert!(body.as_array().unwrap().len() <= 10);

    let (status, body) = ctx.get("/api/tags/autocomplete?q=", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    let (status, body) = ctx.get("/api/tags/autocomplete?q=%20%20", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (_, body) = ctx.get(&format!("/api/tags?search={}", prefix), &admin).await;
    assert_eq!(body["count"], 2);
}
