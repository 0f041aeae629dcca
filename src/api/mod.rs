mod sis;

pub use sis::SisClient;

use crate::error::ApiError;
use crate::models::{CourseSection, Grade, SetGradeRequest};
use std::future::Future;

/// Backend operations the grid needs. Futures are `Send` so loads and
/// grade updates can run on their own tasks.
pub trait GradebookSource {
    /// Course section with its nested marking periods and enrollments.
    fn course_section(
        &self,
        section_id: &str,
    ) -> impl Future<Output = Result<CourseSection, ApiError>> + Send;

    /// All grades whose enrollment belongs to the course section.
    fn grades(&self, section_id: &str) -> impl Future<Output = Result<Vec<Grade>, ApiError>> + Send;

    fn set_grade(
        &self,
        request: &SetGradeRequest,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;
}
