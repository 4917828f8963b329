#![cfg(feature = "e2e")]

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use sqlx::PgPool;

#[path = "support/mod.rs"]
mod support;

use support::build_test_server;

async fn seed_india(server: &TestServer) {
    let response = server
        .post("/api/v1/geo/countries")
        .json(&json!({
            "name": "India",
            "iso2": "in",
            "iso3": "IND",
            "numeric_code": 356,
            "phonecode": 91,
            "region": "Asia"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/geo/states")
        .json(&json!({
            "country": "IN",
            "items": [
                { "name": "Kerala", "iso2": "KL" },
                { "name": "Karnataka", "iso2": "KA" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn country_upsert_is_keyed_on_iso2(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    seed_india(&server).await;

    let response = server
        .post("/api/v1/geo/countries")
        .json(&json!([
            { "name": "Republic of India", "iso2": "IN", "iso3": "IND" },
            { "name": "India", "iso2": "IN", "iso3": "IND", "capital": "New Delhi" }
        ]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["meta"]["count"], 2);

    let response = server.get("/api/v1/geo/countries").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let countries = body["data"].as_array().expect("countries");
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0]["iso2"], "IN");
    assert_eq!(countries[0]["capital"], "New Delhi");
    // Omitted columns keep their stored values.
    assert_eq!(countries[0]["numeric_code"], 356);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn states_resolve_country_by_code_name_or_number(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    seed_india(&server).await;

    for token in ["IN", "in", "IND", "India", "india", "356"] {
        let response = server
            .get("/api/v1/geo/states")
            .add_query_param("country", token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["meta"]["country"]["iso2"], "IN", "token {token}");
        assert_eq!(body["meta"]["total"], 2, "token {token}");
    }

    let response = server
        .get("/api/v1/geo/states")
        .add_query_param("country", "Atlantis")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn cities_and_towns_inherit_request_placement(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    seed_india(&server).await;

    let response = server
        .post("/api/v1/geo/cities")
        .json(&json!({
            "country": "India",
            "state": "Kerala",
            "items": [{ "name": "Ernakulam" }, { "name": "Thrissur" }]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/geo/towns")
        .json(&json!({
            "country": "IN",
            "state": "KL",
            "items": [{ "name": "Aluva" }]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/v1/geo/cities")
        .add_query_param("state", "Kerala")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 2);

    let response = server
        .get("/api/v1/geo/search")
        .add_query_param("q", "alu")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["towns"][0]["name"], "Aluva");
    assert!(body["data"]["countries"].as_array().is_some());
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn unresolved_state_fails_the_whole_batch(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    seed_india(&server).await;

    let response = server
        .post("/api/v1/geo/cities")
        .json(&json!({
            "country": "IN",
            "items": [
                { "name": "Kochi", "state": "Kerala" },
                { "name": "Nowhere", "state": "Gondor" }
            ]
        }))
        .await;
    assert!(response.status_code().is_client_error());

    let response = server
        .get("/api/v1/geo/cities")
        .add_query_param("country", "IN")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 0);
    Ok(())
}

#[sqlx::test(migrator = "syllabus_core::MIGRATOR")]
async fn state_upsert_matches_on_the_first_key_sent(pool: PgPool) -> Result<()> {
    let server = build_test_server(pool)?;
    seed_india(&server).await;

    // Same iso2: updates Kerala in place.
    let response = server
        .post("/api/v1/geo/states")
        .json(&json!({
            "country": "IN",
            "items": [{ "name": "Kerala", "iso2": "KL" }]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    // A region code that matches nothing inserts, even when the name exists.
    let response = server
        .post("/api/v1/geo/states")
        .json(&json!({
            "country": "IN",
            "items": [{ "name": "Kerala", "iso3166_2": "IN-KX" }]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/v1/geo/states")
        .add_query_param("country", "IN")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 3);
    Ok(())
}
