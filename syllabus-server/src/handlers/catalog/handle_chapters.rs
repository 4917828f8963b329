use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{ChildListQuery, CourseChapter, CreateChapter, UpdateChapter};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

pub async fn list_chapters_handler(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ChildListQuery>,
) -> ApiResult<Vec<CourseChapter>> {
    let page = state
        .db
        .chapters()
        .list(course_id, &query)
        .await
        .or_fail("retrieve chapters")?;
    Ok(ApiResponse::page(page).with_message("Chapters retrieved successfully"))
}

pub async fn create_chapter_handler(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateChapter>,
) -> ApiResult<CourseChapter> {
    request.validate()?;
    let chapter = state
        .db
        .chapters()
        .create(course_id, &request)
        .await
        .or_fail("create chapter")?;
    Ok(ApiResponse::created(chapter).with_message("Chapter created successfully"))
}

pub async fn show_chapter_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<CourseChapter> {
    let chapter = state
        .db
        .chapters()
        .get(course_id, id)
        .await
        .or_fail("retrieve chapter")?;
    Ok(ApiResponse::success(chapter).with_message("Chapter retrieved successfully"))
}

pub async fn update_chapter_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<UpdateChapter>,
) -> ApiResult<CourseChapter> {
    patch.validate()?;
    let chapter = state
        .db
        .chapters()
        .update(course_id, id, &patch)
        .await
        .or_fail("update chapter")?;
    Ok(ApiResponse::success(chapter).with_message("Chapter updated successfully"))
}

pub async fn delete_chapter_handler(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    state
        .db
        .chapters()
        .delete(course_id, id)
        .await
        .or_fail("delete chapter")?;
    Ok(ApiResponse::done("Chapter deleted successfully"))
}
