use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{
    CourseDetail, CourseListQuery, CourseRelations, CourseShowQuery, CourseSummary,
    CreateCourse, UpdateCourse,
};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

pub async fn list_courses_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CourseListQuery>,
) -> ApiResult<Vec<CourseSummary>> {
    let page = state
        .db
        .courses()
        .list(&query)
        .await
        .or_fail("retrieve courses")?;
    Ok(ApiResponse::page(page).with_message("Courses retrieved successfully"))
}

pub async fn create_course_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCourse>,
) -> ApiResult<CourseSummary> {
    request.validate()?;
    let course = state
        .db
        .courses()
        .create(&request)
        .await
        .or_fail("create course")?;
    Ok(ApiResponse::created(course).with_message("Course created successfully"))
}

/// `?with=sections,chapters,videos,...` loads the named relations.
pub async fn show_course_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CourseShowQuery>,
) -> ApiResult<CourseDetail> {
    let relations = CourseRelations::parse(query.with.as_deref());
    let course = state
        .db
        .courses()
        .show(id, relations)
        .await
        .or_fail("retrieve course")?;
    Ok(ApiResponse::success(course).with_message("Course retrieved successfully"))
}

pub async fn update_course_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateCourse>,
) -> ApiResult<CourseSummary> {
    patch.validate()?;
    let course = state
        .db
        .courses()
        .update(id, &patch)
        .await
        .or_fail("update course")?;
    Ok(ApiResponse::success(course).with_message("Course updated successfully"))
}

pub async fn delete_course_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    state
        .db
        .courses()
        .delete(id)
        .await
        .or_fail("delete course")?;
    Ok(ApiResponse::done("Course deleted successfully"))
}
