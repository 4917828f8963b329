use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{
    ChildListQuery, CourseSection, CreateSection, ReorderRequest, UpdateSection,
};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

pub async fn list_sections_handler(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ChildListQuery>,
) -> ApiResult<Vec<CourseSection>> {
    let page = state
        .db
        .sections()
        .list(course_id, &query)
        .await
        .or_fail("retrieve sections")?;
    Ok(ApiResponse::page(page).with_message("Sections retrieved successfully"))
}

pub async fn create_section_handler(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateSection>,
) -> ApiResult<CourseSection> {
    request.validate()?;
    let section = state
        .db
        .sections()
        .create(course_id, &request)
        .await
        .or_fail("create section")?;
    Ok(ApiResponse::created(section).with_message("Section created successfully"))
}

pub async fn reorder_sections_handler(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<()> {
    let placements = request.placements()?;
    state
        .db
        .sections()
        .reorder(course_id, &placements)
        .await
        .or_fail("reorder sections")?;
    Ok(ApiResponse::done("Sections reordered successfully"))
}

pub async fn show_section_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<CourseSection> {
    let section = state
        .db
        .sections()
        .get(course_id, id)
        .await
        .or_fail("retrieve section")?;
    Ok(ApiResponse::success(section).with_message("Section retrieved successfully"))
}

pub async fn update_section_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<UpdateSection>,
) -> ApiResult<CourseSection> {
    patch.validate()?;
    let section = state
        .db
        .sections()
        .update(course_id, id, &patch)
        .await
        .or_fail("update section")?;
    Ok(ApiResponse::success(section).with_message("Section updated successfully"))
}

pub async fn delete_section_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    state
        .db
        .sections()
        .delete(course_id, id)
        .await
        .or_fail("delete section")?;
    Ok(ApiResponse::done("Section deleted successfully"))
}
