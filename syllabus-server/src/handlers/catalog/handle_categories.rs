use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{
    CategoryListQuery, CategoryWithCount, CreateCategory, ReorderRequest, UpdateCategory,
};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

/// `GET /categories`: `q`, `active`, `sort`, paginated.
pub async fn list_categories_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> ApiResult<Vec<CategoryWithCount>> {
    let page = state
        .db
        .categories()
        .list(&query)
        .await
        .or_fail("retrieve categories")?;
    Ok(ApiResponse::page(page).with_message("Categories retrieved successfully"))
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCategory>,
) -> ApiResult<CategoryWithCount> {
    request.validate()?;
    let category = state
        .db
        .categories()
        .create(&request)
        .await
        .or_fail("create category")?;
    Ok(ApiResponse::created(category).with_message("Category created successfully"))
}

pub async fn show_category_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<CategoryWithCount> {
    let category = state
        .db
        .categories()
        .get(id)
        .await
        .or_fail("retrieve category")?;
    Ok(ApiResponse::success(category).with_message("Category retrieved successfully"))
}

pub async fn update_category_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateCategory>,
) -> ApiResult<CategoryWithCount> {
    patch.validate()?;
    let category = state
        .db
        .categories()
        .update(id, &patch)
        .await
        .or_fail("update category")?;
    Ok(ApiResponse::success(category).with_message("Category updated successfully"))
}

pub async fn delete_category_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    state
        .db
        .categories()
        .delete(id)
        .await
        .or_fail("delete category")?;
    Ok(ApiResponse::done("Category deleted successfully"))
}

/// All-or-nothing position update.
pub async fn reorder_categories_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<()> {
    let placements = request.placements()?;
    state
        .db
        .categories()
        .reorder(&placements)
        .await
        .or_fail("reorder categories")?;
    Ok(ApiResponse::done("Categories reordered successfully"))
}
