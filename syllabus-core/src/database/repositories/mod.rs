pub mod assets;
pub mod categories;
pub mod chapters;
pub mod courses;
pub mod geo;
pub mod sections;
pub mod subcategories;
pub mod users;

pub use assets::PostgresAssetRepository;
pub use categories::PostgresCategoryRepository;
pub use chapters::PostgresChapterRepository;
pub use courses::PostgresCourseRepository;
pub use geo::PostgresGeoRepository;
pub use sections::PostgresSectionRepository;
pub use subcategories::PostgresSubcategoryRepository;
pub use users::PostgresUserRepository;
