use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::users::{CreateUser, UpdateUser, User, UserListQuery, UserWithCreator};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

pub async fn list_users_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Vec<User>> {
    let page = state
        .db
        .users()
        .list(&query)
        .await
        .or_fail("retrieve users")?;
    Ok(ApiResponse::page(page).with_message("Users retrieved successfully"))
}

/// A non-empty `creator` object also creates the creator profile.
pub async fn create_user_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUser>,
) -> ApiResult<UserWithCreator> {
    request.validate()?;
    let user = state
        .db
        .users()
        .create(&request)
        .await
        .or_fail("create user")?;
    Ok(ApiResponse::created(user).with_message("User created successfully"))
}

pub async fn show_user_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<UserWithCreator> {
    let user = state
        .db
        .users()
        .get(&id)
        .await
        .or_fail("retrieve user")?;
    Ok(ApiResponse::success(user).with_message("User retrieved successfully"))
}

/// Updates the user and updates or creates the creator profile.
pub async fn update_user_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<UpdateUser>,
) -> ApiResult<UserWithCreator> {
    patch.validate()?;
    let user = state
        .db
        .users()
        .update(&id, &patch)
        .await
        .or_fail("update user")?;
    Ok(ApiResponse::success(user).with_message("User updated successfully"))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<()> {
    state
        .db
        .users()
        .delete(&id)
        .await
        .or_fail("delete user")?;
    Ok(ApiResponse::done("User deleted successfully"))
}

pub async fn delete_creator_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<()> {
    state
        .db
        .users()
        .delete_creator(&id)
        .await
        .or_fail("delete creator profile")?;
    Ok(ApiResponse::done("Creator profile deleted successfully"))
}
