//! Course media handlers, written once and mounted per kind:
//! `list_assets_handler::<VideoFields>` serves `/courses/{course}/videos`.

use axum::extract::State;

use syllabus_core::Validate;
use syllabus_core::catalog::{AssetFields, AssetListQuery, CourseAsset, CreateAsset, UpdateAsset};

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
};

fn action<F: AssetFields>(verb: &str) -> String {
    format!("{verb} {}", F::KIND.singular())
}

pub async fn list_assets_handler<F: AssetFields>(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<AssetListQuery>,
) -> ApiResult<Vec<CourseAsset<F>>> {
    let kind = F::KIND;
    let page = state
        .db
        .assets()
        .list::<F>(course_id, &query)
        .await
        .or_fail(&format!("retrieve {}", kind.plural()))?;
    Ok(ApiResponse::page(page).with_message(format!("{}s retrieved successfully", kind.noun())))
}

pub async fn create_asset_handler<F: AssetFields>(
    State(state): State<AppState>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateAsset<F::Input>>,
) -> ApiResult<CourseAsset<F>> {
    request.validate()?;
    let asset = state
        .db
        .assets()
        .create::<F>(course_id, &request)
        .await
        .or_fail(&action::<F>("create"))?;
    Ok(ApiResponse::created(asset)
        .with_message(format!("{} created successfully", F::KIND.noun())))
}

pub async fn show_asset_handler<F: AssetFields>(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<CourseAsset<F>> {
    let asset = state
        .db
        .assets()
        .get::<F>(course_id, id)
        .await
        .or_fail(&action::<F>("retrieve"))?;
    Ok(ApiResponse::success(asset)
        .with_message(format!("{} retrieved successfully", F::KIND.noun())))
}

pub async fn update_asset_handler<F: AssetFields>(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<UpdateAsset<F::Input>>,
) -> ApiResult<CourseAsset<F>> {
    patch.validate()?;
    let asset = state
        .db
        .assets()
        .update::<F>(course_id, id, &patch)
        .await
        .or_fail(&action::<F>("update"))?;
    Ok(ApiResponse::success(asset)
        .with_message(format!("{} updated successfully", F::KIND.noun())))
}

pub async fn delete_asset_handler<F: AssetFields>(
    State(state): State<AppState>,
    ApiPath((course_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    state
        .db
        .assets()
        .delete::<F>(course_id, id)
        .await
        .or_fail(&action::<F>("delete"))?;
    Ok(ApiResponse::done(format!("{} deleted successfully", F::KIND.noun())))
}
