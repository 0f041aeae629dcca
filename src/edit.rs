use crate::models::{grade_field_id, GradeGrid, SetGradeRequest};
use tracing::debug;

/// Where a batch of cell changes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// The grid was (re)populated from the view model.
    LoadData,
    /// The user edited a cell.
    Edit,
}

/// A single changed cell as reported by the grid widget.
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub row: usize,
    pub field: String,
    pub old: Option<String>,
    pub new: String,
}

/// Translate changed cells into grade update requests.
///
/// Changes reported while the grid is being populated are ignored. Every
/// grade cell change yields its own request, even when the value is unchanged.
/// Changes to non-grade fields, malformed grade fields, or rows outside the
/// grid produce nothing.
pub fn handle_changes(
    grid: &GradeGrid,
    changes: &[CellChange],
    source: ChangeSource,
) -> Vec<SetGradeRequest> {
    if source == ChangeSource::LoadData {
        return Vec::new();
    }

    changes
        .iter()
        .filter_map(|change| {
            let marking_period = grade_field_id(&change.field)?;
            let Some(row) = grid.rows.get(change.row) else {
                debug!(row = change.row, "Change for a row outside the grid");
                return None;
            };
            debug!(
                student = row.id,
                marking_period,
                old = ?change.old,
                new = %change.new,
                "Grade cell changed"
            );

            Some(SetGradeRequest {
                student: row.id,
                marking_period: marking_period.to_string(),
                course_section: grid.course_section_id.clone(),
                grade: change.new.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grid;
    use crate::models::{CourseInfo, CourseSection, Enrollment, Grade, MarkingPeriod};
    use serde_json::json;

    fn grid() -> GradeGrid {
        let course = CourseSection {
            id: Some(12),
            course: CourseInfo {
                fullname: "Biology 101".to_string(),
            },
            marking_period: vec![
                MarkingPeriod {
                    id: 1,
                    name: "Q1".to_string(),
                },
                MarkingPeriod {
                    id: 2,
                    name: "Q2".to_string(),
                },
            ],
            enrollments: vec![
                Enrollment {
                    id: 5,
                    first_name: "Ana".to_string(),
                    last_name: "Lee".to_string(),
                },
                Enrollment {
                    id: 8,
                    first_name: "Bo".to_string(),
                    last_name: "Kim".to_string(),
                },
            ],
        };
        let grades = vec![Grade {
            student_id: 5,
            marking_period: Some(1),
            course_section_id: Some(12),
            grade: Some("B".to_string()),
        }];
        build_grid("12", &course, &grades)
    }

    fn change(row: usize, field: &str, old: Option<&str>, new: &str) -> CellChange {
        CellChange {
            row,
            field: field.to_string(),
            old: old.map(str::to_string),
            new: new.to_string(),
        }
    }

    #[test]
    fn test_user_edit_issues_one_request() {
        let requests = handle_changes(
            &grid(),
            &[change(0, "grade_2", None, "A")],
            ChangeSource::Edit,
        );

        assert_eq!(requests.len(), 1);
        assert_eq!(
            serde_json::to_value(&requests[0]).unwrap(),
            json!({ "student": 5, "marking_period": "2", "course_section": "12", "grade": "A" })
        );
    }

    #[test]
    fn test_load_data_changes_are_ignored() {
        let requests = handle_changes(
            &grid(),
            &[change(0, "grade_1", None, "B"), change(1, "grade_2", Some("C"), "A")],
            ChangeSource::LoadData,
        );

        assert!(requests.is_empty());
    }

    #[test]
    fn test_name_and_final_edits_are_ignored() {
        let requests = handle_changes(
            &grid(),
            &[
                change(0, "name", Some("Ana Lee"), "Ann Lee"),
                change(0, "", None, "95"),
                change(0, "final", None, "95"),
            ],
            ChangeSource::Edit,
        );

        assert!(requests.is_empty());
    }

    #[test]
    fn test_malformed_grade_fields_are_ignored() {
        let requests = handle_changes(
            &grid(),
            &[
                change(0, "grade_", None, "A"),
                change(0, "grade_x", None, "A"),
                change(0, "grade_-1", None, "A"),
                change(7, "grade_1", None, "A"),
            ],
            ChangeSource::Edit,
        );

        assert!(requests.is_empty());
    }

    #[test]
    fn test_marking_period_is_sent_in_canonical_form() {
        let requests = handle_changes(
            &grid(),
            &[change(0, "grade_02", None, "A"), change(0, "grade_+2", None, "A")],
            ChangeSource::Edit,
        );

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].marking_period, "2");
    }

    #[test]
    fn test_unchanged_value_is_still_submitted() {
        let requests = handle_changes(
            &grid(),
            &[change(0, "grade_1", Some("B"), "B")],
            ChangeSource::Edit,
        );

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].grade, "B");
    }

    #[test]
    fn test_each_change_gets_its_own_request() {
        let requests = handle_changes(
            &grid(),
            &[
                change(0, "grade_1", Some("B"), "A"),
                change(1, "grade_2", None, "C"),
            ],
            ChangeSource::Edit,
        );

        assert_eq!(requests.len(), 2);
        assert_eq!((requests[0].student, requests[0].marking_period.as_str()), (5, "1"));
        assert_eq!((requests[1].student, requests[1].marking_period.as_str()), (8, "2"));
        assert!(requests.iter().all(|r| r.course_section == "12"));
    }
}
