pub mod handle_assets;
pub mod handle_categories;
pub mod handle_chapters;
pub mod handle_courses;
pub mod handle_sections;
pub mod handle_subcategories;
