use axum::{
    Router,
    routing::{delete, get, post},
};

use syllabus_core::catalog::{AssetFields, AudioFields, DocumentFields, ImageFields, VideoFields};

use crate::{
    handlers::{
        catalog::{
            handle_assets::{
                create_asset_handler, delete_asset_handler, list_assets_handler,
                show_asset_handler, update_asset_handler,
            },
            handle_categories::{
                create_category_handler, delete_category_handler, list_categories_handler,
                reorder_categories_handler, show_category_handler, update_category_handler,
            },
            handle_chapters::{
                create_chapter_handler, delete_chapter_handler, list_chapters_handler,
                show_chapter_handler, update_chapter_handler,
            },
            handle_courses::{
                create_course_handler, delete_course_handler, list_courses_handler,
                show_course_handler, update_course_handler,
            },
            handle_sections::{
                create_section_handler, delete_section_handler, list_sections_handler,
                reorder_sections_handler, show_section_handler, update_section_handler,
            },
            handle_subcategories::{
                create_subcategory_handler, delete_subcategory_handler,
                list_category_subcategories_handler, list_subcategories_handler,
                reorder_subcategories_handler, show_subcategory_handler,
                update_subcategory_handler,
            },
        },
        geo::handle_geo::{
            list_cities_handler, list_countries_handler, list_states_handler,
            list_towns_handler, search_geo_handler, upsert_cities_handler,
            upsert_countries_handler, upsert_states_handler, upsert_towns_handler,
        },
        users::handle_users::{
            create_user_handler, delete_creator_handler, delete_user_handler,
            list_users_handler, show_user_handler, update_user_handler,
        },
    },
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_catalog_routes())
        .merge(create_course_content_routes())
        .merge(create_asset_routes::<VideoFields>())
        .merge(create_asset_routes::<DocumentFields>())
        .merge(create_asset_routes::<AudioFields>())
        .merge(create_asset_routes::<ImageFields>())
        .merge(create_user_routes())
        .merge(create_geo_routes())
}

fn create_catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route("/categories/reorder", post(reorder_categories_handler))
        .route(
            "/categories/{category}",
            get(show_category_handler)
                .put(update_category_handler)
                .delete(delete_category_handler),
        )
        .route(
            "/categories/{category}/subcategories",
            get(list_category_subcategories_handler).post(create_subcategory_handler),
        )
        .route(
            "/categories/{category}/subcategories/reorder",
            post(reorder_subcategories_handler),
        )
        .route("/subcategories", get(list_subcategories_handler))
        .route(
            "/subcategories/{subcategory}",
            get(show_subcategory_handler)
                .put(update_subcategory_handler)
                .delete(delete_subcategory_handler),
        )
        .route(
            "/courses",
            get(list_courses_handler).post(create_course_handler),
        )
        .route(
            "/courses/{course}",
            get(show_course_handler)
                .put(update_course_handler)
                .delete(delete_course_handler),
        )
}

fn create_course_content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{course}/chapters",
            get(list_chapters_handler).post(create_chapter_handler),
        )
        .route(
            "/courses/{course}/chapters/{chapter}",
            get(show_chapter_handler)
                .put(update_chapter_handler)
                .delete(delete_chapter_handler),
        )
        .route(
            "/courses/{course}/sections",
            get(list_sections_handler).post(create_section_handler),
        )
        .route(
            "/courses/{course}/sections/reorder",
            post(reorder_sections_handler),
        )
        .route(
            "/courses/{course}/sections/{section}",
            get(show_section_handler)
                .put(update_section_handler)
                .delete(delete_section_handler),
        )
}

/// `/courses/{course}/<kind>` and `/courses/{course}/<kind>/{id}` for one media kind.
fn create_asset_routes<F: AssetFields>() -> Router<AppState> {
    let kind = F::KIND.plural();
    Router::new()
        .route(
            &format!("/courses/{{course}}/{kind}"),
            get(list_assets_handler::<F>).post(create_asset_handler::<F>),
        )
        .route(
            &format!("/courses/{{course}}/{kind}/{{id}}"),
            get(show_asset_handler::<F>)
                .put(update_asset_handler::<F>)
                .delete(delete_asset_handler::<F>),
        )
}

fn create_user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{id}",
            get(show_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route("/users/{id}/creator", delete(delete_creator_handler))
}

fn create_geo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/geo/countries",
            get(list_countries_handler).post(upsert_countries_handler),
        )
        .route(
            "/geo/states",
            get(list_states_handler).post(upsert_states_handler),
        )
        .route(
            "/geo/cities",
            get(list_cities_handler).post(upsert_cities_handler),
        )
        .route(
            "/geo/towns",
            get(list_towns_handler).post(upsert_towns_handler),
        )
        .route("/geo/search", get(search_geo_handler))
}
