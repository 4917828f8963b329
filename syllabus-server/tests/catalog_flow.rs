#![cfg(feature = "e2e")]

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use sqlx::PgPool;

#[path = "support/mod.rs"]
mod support;

use support::build_test_server;

async fn create(server: &TestServer, path: &str, body: Value) -> Value {
    let response = server.post(path).json(&body).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["data"].clone()
}

fn id_of(data: &Value) -> i64 {
    data["id"].as_i64().expect("numeric id")
}

/// Category -> subcategory -> creator -> course.
async fn seed_course(server: &TestServer, title: &str) -> Result<i64> {
    let category = create(server, "/api/v1/categories", json!({ "name": "Programming" })).await;
    let subcategory = create(
        server,
        &format!("/api/v1/categories/{}/subcategories", id_of(&category)),
        json!({ "name": "Rust" }),
    )
    .await;

    let user_id = format!("creator-{}", title.to_lowercase().replace(' ', "-"));
    create(
        server,
        "/api/v1/users",
        json!({ "id": user_id, "name": "Asha Rao", "phone": 9876543210_i64 }),
    )
    .await;

    let course = create(
        server,
        "/api/v1/courses",
        json!({
            "subcategory_id": id_of(&subcategory),
            "user_id": user_id,
            "title": title,
        }),
    )
    .await;
    Ok(id_of(&course))
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn duplicate_names_get_suffixed_slugs(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;

    let first = create(&server, "/api/v1/categories", json!({ "name": "Web Development" })).await;
    let second =
        create(&server, "/api/v1/categories", json!({ "name": "Web Development" })).await;

    assert_eq!(first["slug"], "web-development");
    assert_eq!(second["slug"], "web-development-1");
    assert_eq!(first["subcategories_count"], 0);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn category_crud_round_trip(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;

    let response = server
        .post("/api/v1/categories")
        .json(&json!({ "name": "Design", "description": "Visual work" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Category created successfully");
    let id = id_of(&body["data"]);

    let response = server
        .put(&format!("/api/v1/categories/{id}"))
        .json(&json!({ "name": "Graphic Design", "description": null }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Graphic Design");
    assert!(body["data"]["description"].is_null());

    let response = server.delete(&format!("/api/v1/categories/{id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["data"].is_null());

    let response = server.get(&format!("/api/v1/categories/{id}")).await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn per_page_is_clamped(pool: PgPool) -> Result<()> {
    sqlx::query(
        "INSERT INTO categories (name, slug, position) \
         SELECT 'Topic ' || n, 'topic-' || n, n FROM generate_series(1, 105) AS n",
    )
    .execute(&pool)
    .await?;
    let server = build_test_server(pool)?;

    let response = server
        .get("/api/v1/categories")
        .add_query_param("per_page", 1000)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(100));
    assert_eq!(body["meta"]["per_page"], 100);
    assert_eq!(body["meta"]["total"], 105);
    assert_eq!(body["meta"]["current_page"], 1);
    assert_eq!(body["meta"]["last_page"], 2);

    let response = server
        .get("/api/v1/categories")
        .add_query_param("per_page", 1000)
        .add_query_param("page", 2)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn reorder_rejects_ids_from_another_parent(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;

    let arts = create(&server, "/api/v1/categories", json!({ "name": "Arts" })).await;
    let science = create(&server, "/api/v1/categories", json!({ "name": "Science" })).await;
    let painting = create(
        &server,
        &format!("/api/v1/categories/{}/subcategories", id_of(&arts)),
        json!({ "name": "Painting" }),
    )
    .await;
    let physics = create(
        &server,
        &format!("/api/v1/categories/{}/subcategories", id_of(&science)),
        json!({ "name": "Physics" }),
    )
    .await;

    let response = server
        .post(&format!(
            "/api/v1/categories/{}/subcategories/reorder",
            id_of(&arts)
        ))
        .json(&json!({
            "orders": [
                { "id": id_of(&painting), "position": 1 },
                { "id": id_of(&physics), "position": 0 }
            ]
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing moved.
    let response = server
        .get(&format!("/api/v1/subcategories/{}", id_of(&painting)))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["position"], painting["position"]);

    let response = server
        .post(&format!(
            "/api/v1/categories/{}/subcategories/reorder",
            id_of(&arts)
        ))
        .json(&json!({ "orders": [{ "id": id_of(&painting), "position": 7 }] }))
        .await;
    response.assert_status_ok();
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn media_is_scoped_to_its_course(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    let intro_course = seed_course(&server, "Rust Basics").await?;
    let other_course = seed_course(&server, "Async Rust").await?;

    let video = create(
        &server,
        &format!("/api/v1/courses/{intro_course}/videos"),
        json!({
            "title": "Welcome",
            "playback_url": "https://cdn.example.com/welcome.m3u8",
            "is_free_preview": "1"
        }),
    )
    .await;
    assert_eq!(video["slug"], "welcome");
    assert_eq!(video["is_free_preview"], true);

    let response = server
        .get(&format!("/api/v1/courses/{intro_course}/videos/{}", id_of(&video)))
        .await;
    response.assert_status_ok();

    let response = server
        .get(&format!("/api/v1/courses/{other_course}/videos/{}", id_of(&video)))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Video not found in this course");

    let response = server
        .delete(&format!("/api/v1/courses/{other_course}/videos/{}", id_of(&video)))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn media_section_must_belong_to_course(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    let course = seed_course(&server, "Systems Design").await?;
    let other = seed_course(&server, "Databases").await?;

    let foreign_section = create(
        &server,
        &format!("/api/v1/courses/{other}/sections"),
        json!({ "title": "Storage" }),
    )
    .await;

    let response = server
        .post(&format!("/api/v1/courses/{course}/documents"))
        .json(&json!({
            "title": "Syllabus",
            "file_url": "https://cdn.example.com/syllabus.pdf",
            "section_id": id_of(&foreign_section)
        }))
        .await;
    assert!(
        response.status_code().is_client_error(),
        "foreign section accepted: {}",
        response.status_code()
    );
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn user_creator_profile_can_be_removed(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;

    let user = create(
        &server,
        "/api/v1/users",
        json!({
            "id": "mentor-7",
            "name": "Meera",
            "phone": 9000000001_i64,
            "creator": { "occupation": "Teacher" }
        }),
    )
    .await;
    assert_eq!(user["creator_profile"]["occupation"], "Teacher");

    let response = server.delete("/api/v1/users/mentor-7/creator").await;
    response.assert_status_ok();

    let response = server.get("/api/v1/users/mentor-7").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["data"]["creator_profile"].is_null());

    let response = server.delete("/api/v1/users/mentor-7/creator").await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}
