//! Catalog domain: categories, subcategories, courses and their content.

pub mod assets;
pub mod category;
pub mod chapter;
pub mod course;
pub mod listing;
pub mod reorder;
pub mod section;
pub mod subcategory;

pub use assets::{
    AssetFields, AssetInput, AssetKind, AudioFields, AudioInput, CourseAsset,
    CourseAudio, CourseDocument, CourseImage, CourseVideo, CreateAsset,
    DocumentFields, DocumentInput, ImageFields, ImageInput, UpdateAsset,
    VideoFields, VideoInput,
};
pub use category::{Category, CategoryWithCount, CreateCategory, UpdateCategory};
pub use chapter::{CourseChapter, CreateChapter, UpdateChapter};
pub use course::{
    Course, CourseDetail, CourseRelations, CourseStatus, CourseSummary,
    CreateCourse, UpdateCourse,
};
pub use listing::{
    AssetListQuery, CategoryListQuery, ChildListQuery, CourseListQuery, CourseShowQuery,
};
pub use reorder::{Placement, PositionUpdate, ReorderRequest};
pub use section::{CourseSection, CreateSection, UpdateSection};
pub use subcategory::{
    CreateSubcategory, Subcategory, SubcategoryWithCategory, UpdateSubcategory,
};
