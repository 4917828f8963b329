use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{
    CategoryListQuery, CreateSubcategory, ReorderRequest, SubcategoryWithCategory,
    UpdateSubcategory,
};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

/// Flat listing across categories, optionally narrowed by `category_id`.
pub async fn list_subcategories_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> ApiResult<Vec<SubcategoryWithCategory>> {
    let page = state
        .db
        .subcategories()
        .list(&query)
        .await
        .or_fail("retrieve subcategories")?;
    Ok(ApiResponse::page(page).with_message("Subcategories retrieved successfully"))
}

pub async fn list_category_subcategories_handler(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> ApiResult<Vec<SubcategoryWithCategory>> {
    let page = state
        .db
        .subcategories()
        .list_for_category(category_id, &query)
        .await
        .or_fail("retrieve subcategories")?;
    Ok(ApiResponse::page(page).with_message("Subcategories retrieved successfully"))
}

pub async fn create_subcategory_handler(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateSubcategory>,
) -> ApiResult<SubcategoryWithCategory> {
    request.validate()?;
    let subcategory = state
        .db
        .subcategories()
        .create(category_id, &request)
        .await
        .or_fail("create subcategory")?;
    Ok(ApiResponse::created(subcategory).with_message("Subcategory created successfully"))
}

pub async fn reorder_subcategories_handler(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<i64>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<()> {
    let placements = request.placements()?;
    state
        .db
        .subcategories()
        .reorder(category_id, &placements)
        .await
        .or_fail("reorder subcategories")?;
    Ok(ApiResponse::done("Subcategories reordered successfully"))
}

pub async fn show_subcategory_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<SubcategoryWithCategory> {
    let subcategory = state
        .db
        .subcategories()
        .get(id)
        .await
        .or_fail("retrieve subcategory")?;
    Ok(ApiResponse::success(subcategory).with_message("Subcategory retrieved successfully"))
}

/// A `category_id` in the body moves the subcategory.
pub async fn update_subcategory_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateSubcategory>,
) -> ApiResult<SubcategoryWithCategory> {
    patch.validate()?;
    let subcategory = state
        .db
        .subcategories()
        .update(id, &patch)
        .await
        .or_fail("update subcategory")?;
    Ok(ApiResponse::success(subcategory).with_message("Subcategory updated successfully"))
}

pub async fn delete_subcategory_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    state
        .db
        .subcategories()
        .delete(id)
        .await
        .or_fail("delete subcategory")?;
    Ok(ApiResponse::done("Subcategory deleted successfully"))
}
