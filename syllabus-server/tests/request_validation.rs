//! Requests that are answered before any database work happens.

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::offline_server;

#[tokio::test]
async fn create_category_without_name_is_unprocessable() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/categories")
        .json(&json!({ "position": -1 }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
    assert_eq!(
        body["errors"]["position"][0],
        "The position must be at least 0."
    );
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn create_course_reports_every_missing_field() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/courses")
        .json(&json!({ "status": "deleted", "price": -5 }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let errors = body["errors"].as_object().expect("errors object");
    for field in ["subcategory_id", "user_id", "title", "status", "price"] {
        assert!(errors.contains_key(field), "missing error for {field}");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_json_body_is_unprocessable() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/categories")
        .bytes("{\"name\": ".into())
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert!(body["errors"]["body"].is_array());
    Ok(())
}

#[tokio::test]
async fn non_numeric_path_id_is_not_found() -> Result<()> {
    let server = offline_server()?;

    let response = server.get("/api/v1/categories/design").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Resource not found");

    let response = server.get("/api/v1/courses/1/videos/intro").await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() -> Result<()> {
    let server = offline_server()?;

    let response = server.get("/api/v1/lessons").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "error", "message": "Route not found" }));
    Ok(())
}

#[tokio::test]
async fn empty_reorder_is_rejected() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/categories/reorder")
        .json(&json!({ "orders": [] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(
        body["errors"]["orders"][0],
        "The orders must have at least 1 items."
    );

    let response = server
        .post("/api/v1/courses/3/sections/reorder")
        .json(&json!({ "orders": [{ "id": 1 }] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["errors"]["orders.0.position"].is_array());
    Ok(())
}

#[tokio::test]
async fn video_requires_playback_url() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/courses/1/videos")
        .json(&json!({ "title": "Intro", "width": -1 }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["errors"]["playback_url"].is_array());
    assert!(body["errors"]["width"].is_array());
    assert!(body["errors"].get("title").is_none());
    Ok(())
}

#[tokio::test]
async fn user_creator_errors_are_nested() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/users")
        .json(&json!({ "id": "u-1", "creator": { "marital_status": "complicated" } }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let errors = body["errors"].as_object().expect("errors object");
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("phone"));
    assert!(errors.contains_key("creator.marital_status"));
    Ok(())
}

#[tokio::test]
async fn geo_search_needs_two_characters() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .get("/api/v1/geo/search")
        .add_query_param("q", " a ")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["message"], "The q must be at least 2 characters.");
    Ok(())
}

#[tokio::test]
async fn bulk_upsert_without_items_is_rejected() -> Result<()> {
    let server = offline_server()?;

    for body in [json!([]), json!({ "items": [] })] {
        let response = server.post("/api/v1/geo/countries").json(&body).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["errors"]["items"][0], "The items field is required.");
    }

    let response = server
        .post("/api/v1/geo/states")
        .json(&json!({ "country": "IN", "items": "Kerala" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn bulk_row_errors_are_indexed() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .post("/api/v1/geo/countries")
        .json(&json!([
            { "name": "India", "iso2": "IN", "iso3": "IND" },
            { "name": "Nowhere", "iso2": "NWH" }
        ]))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let errors = body["errors"].as_object().expect("errors object");
    assert!(errors.contains_key("items.1.iso2"));
    assert!(errors.contains_key("items.1.iso3"));
    assert!(!errors.keys().any(|key| key.starts_with("items.0.")));
    Ok(())
}

#[tokio::test]
async fn unreachable_database_reports_unhealthy() -> Result<()> {
    let server = offline_server()?;

    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["database"]["status"], "unhealthy");
    Ok(())
}

#[tokio::test]
async fn cors_preflight_allows_any_origin_by_default() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .method(Method::OPTIONS, "/api/v1/categories")
        .add_header("origin", "https://learn.example.com")
        .add_header("access-control-request-method", "POST")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), "*");
    Ok(())
}

#[tokio::test]
async fn cors_headers_reach_error_responses() -> Result<()> {
    let server = offline_server()?;

    let response = server
        .get("/api/v1/lessons")
        .add_header("origin", "https://learn.example.com")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.header("access-control-allow-origin"), "*");
    Ok(())
}
