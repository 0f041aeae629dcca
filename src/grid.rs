use crate::api::GradebookSource;
use crate::error::LoadError;
use crate::models::{Column, CourseSection, Grade, GradeGrid, GradeRow};
use indexmap::IndexMap;
use tracing::{info, warn};

/// Fetch the course section and its grades concurrently, then build the grid.
///
/// Both requests must succeed; a failure of either one is returned as a
/// [`LoadError`] and no partial grid is produced.
pub async fn load_grid<S: GradebookSource>(
    source: &S,
    section_id: &str,
) -> Result<GradeGrid, LoadError> {
    info!(section_id, "Loading grade grid");

    let course = async {
        source
            .course_section(section_id)
            .await
            .map_err(|e| LoadError::CourseSection {
                section_id: section_id.to_string(),
                source: e,
            })
    };
    let grades = async {
        source
            .grades(section_id)
            .await
            .map_err(|e| LoadError::Grades {
                section_id: section_id.to_string(),
                source: e,
            })
    };

    let (course, grades) = match tokio::try_join!(course, grades) {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(section_id, error = %e, "Grade grid load failed");
            return Err(e);
        }
    };

    let grid = build_grid(section_id, &course, &grades);
    info!(
        section_id,
        rows = grid.rows.len(),
        columns = grid.columns.len(),
        "Grade grid loaded"
    );
    Ok(grid)
}

/// Left-join grades onto enrollments by student id.
///
/// Rows follow enrollment order and grade columns follow marking period order.
/// When several grades share a student and marking period, the last one wins.
/// Grades for marking periods the section does not list are dropped.
pub fn build_grid(section_id: &str, course: &CourseSection, grades: &[Grade]) -> GradeGrid {
    let mut columns = Vec::with_capacity(course.marking_period.len() + 2);
    columns.push(Column::student());
    columns.extend(course.marking_period.iter().map(Column::marking_period));
    columns.push(Column::final_grade());

    let rows = course
        .enrollments
        .iter()
        .map(|enrollment| {
            let mut row_grades = IndexMap::new();
            for grade in grades.iter().filter(|g| g.student_id == enrollment.id) {
                // Only marking periods with a column take part
                let Some(marking_period) = grade
                    .marking_period
                    .filter(|mp| course.marking_period.iter().any(|known| known.id == *mp))
                else {
                    continue;
                };
                match &grade.grade {
                    Some(value) => {
                        row_grades.insert(marking_period, value.clone());
                    }
                    None => {
                        row_grades.shift_remove(&marking_period);
                    }
                }
            }

            GradeRow {
                id: enrollment.id,
                name: enrollment.display_name(),
                grades: row_grades,
            }
        })
        .collect();

    GradeGrid {
        course_section_id: section_id.to_string(),
        course_name: course.course.fullname.clone(),
        columns,
        rows,
    }
}
