use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Field name of the student name column at the grid boundary.
pub const NAME_FIELD: &str = "name";

/// Prefix of grade column field names; the suffix is the marking period id.
pub const GRADE_FIELD_PREFIX: &str = "grade_";

pub const FINAL_COLUMN_TITLE: &str = "Final";

// ============================================================================
// SIS API Models
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseSection {
    #[serde(default)]
    pub id: Option<u64>,
    pub course: CourseInfo,
    #[serde(default)]
    pub marking_period: Vec<MarkingPeriod>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseInfo {
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarkingPeriod {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Enrollment {
    /// Student id.
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

impl Enrollment {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Grade {
    pub student_id: u64,
    pub marking_period: Option<u64>,
    #[serde(default)]
    pub course_section_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_grade_value")]
    pub grade: Option<String>,
}

/// Body of `POST /api/set_grade/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetGradeRequest {
    pub student: u64,
    pub marking_period: String,
    pub course_section: String,
    pub grade: String,
}

/// Grades come back as decimal strings, bare numbers or letters.
fn deserialize_grade_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// ============================================================================
// Grid View Models
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    /// Flat field name used by the grid widget; `None` for display-only columns.
    pub data: Option<String>,
    pub read_only: bool,
    pub width: u16,
}

impl Column {
    pub fn student() -> Self {
        Self {
            title: "Student".to_string(),
            data: Some(NAME_FIELD.to_string()),
            read_only: true,
            width: 20,
        }
    }

    pub fn marking_period(mp: &MarkingPeriod) -> Self {
        Self {
            title: mp.name.clone(),
            data: Some(grade_field(mp.id)),
            read_only: false,
            width: 10,
        }
    }

    pub fn final_grade() -> Self {
        Self {
            title: FINAL_COLUMN_TITLE.to_string(),
            data: None,
            read_only: true,
            width: 10,
        }
    }
}

pub fn grade_field(marking_period_id: u64) -> String {
    format!("{}{}", GRADE_FIELD_PREFIX, marking_period_id)
}

/// Marking period id of a grade field (`grade_<id>`), if the field is one.
/// The suffix must be all digits.
pub fn grade_field_id(field: &str) -> Option<u64> {
    let suffix = field.strip_prefix(GRADE_FIELD_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// One student's row: enrollment id, derived name, and grades keyed by marking period id.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRow {
    pub id: u64,
    pub name: String,
    pub grades: IndexMap<u64, String>,
}

impl GradeRow {
    pub fn grade(&self, marking_period_id: u64) -> Option<&str> {
        self.grades.get(&marking_period_id).map(String::as_str)
    }

    /// Text shown for this row under `column`.
    pub fn cell_text(&self, column: &Column) -> String {
        match column.data.as_deref() {
            None => self.final_display(),
            Some(NAME_FIELD) => self.name.clone(),
            Some(field) => grade_field_id(field)
                .and_then(|mp| self.grade(mp))
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Final column text for this row.
    pub fn final_display(&self) -> String {
        mean_display(self.grades.values().map(String::as_str))
    }
}

/// Mean of the numeric grades formatted to two decimals.
/// Letter grades do not contribute; blank when nothing is numeric.
pub fn mean_display<'a>(grades: impl IntoIterator<Item = &'a str>) -> String {
    let numeric: Vec<f64> = grades
        .into_iter()
        .filter_map(|g| g.trim().parse::<f64>().ok())
        .filter(|g| g.is_finite())
        .collect();

    if numeric.is_empty() {
        String::new()
    } else {
        format!("{:.2}", numeric.iter().sum::<f64>() / numeric.len() as f64)
    }
}

#[derive(Debug, Clone)]
pub struct GradeGrid {
    pub course_section_id: String,
    pub course_name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<GradeRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_course_section_deserializes() {
        let section: CourseSection = serde_json::from_value(json!({
            "id": 12,
            "course": { "fullname": "Biology 101" },
            "marking_period": [{ "id": 1, "name": "Q1" }],
            "enrollments": [{ "id": 5, "first_name": "Ana", "last_name": "Lee" }]
        }))
        .unwrap();

        assert_eq!(section.course.fullname, "Biology 101");
        assert_eq!(section.marking_period[0].name, "Q1");
        assert_eq!(section.enrollments[0].display_name(), "Ana Lee");
    }

    #[test]
    fn test_grade_value_accepts_strings_numbers_and_null() {
        let grades: Vec<Grade> = serde_json::from_value(json!([
            { "student_id": 5, "marking_period": 1, "grade": "B" },
            { "student_id": 5, "marking_period": 2, "grade": 91.5 },
            { "student_id": 6, "marking_period": null, "grade": null },
            { "student_id": 7, "marking_period": 1 }
        ]))
        .unwrap();

        assert_eq!(grades[0].grade.as_deref(), Some("B"));
        assert_eq!(grades[1].grade.as_deref(), Some("91.5"));
        assert_eq!(grades[2].marking_period, None);
        assert_eq!(grades[2].grade, None);
        assert_eq!(grades[3].grade, None);
    }

    #[test]
    fn test_set_grade_request_body() {
        let request = SetGradeRequest {
            student: 5,
            marking_period: "2".to_string(),
            course_section: "12".to_string(),
            grade: "A".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "student": 5, "marking_period": "2", "course_section": "12", "grade": "A" })
        );
    }

    #[test]
    fn test_final_display_averages_numeric_grades() {
        let mut grades = IndexMap::new();
        grades.insert(1, "90".to_string());
        grades.insert(2, "85.5".to_string());
        grades.insert(3, "P".to_string());
        let row = GradeRow {
            id: 5,
            name: "Ana Lee".to_string(),
            grades,
        };

        assert_eq!(row.final_display(), "87.75");
    }

    #[test]
    fn test_final_display_blank_without_numeric_grades() {
        let mut grades = IndexMap::new();
        grades.insert(1, "B".to_string());
        let row = GradeRow {
            id: 5,
            name: "Ana Lee".to_string(),
            grades,
        };

        assert_eq!(row.final_display(), "");
    }

    #[test]
    fn test_grade_field_id() {
        assert_eq!(grade_field_id("grade_12"), Some(12));
        assert_eq!(grade_field_id("grade_007"), Some(7));
        assert_eq!(grade_field_id("grade_+1"), None);
        assert_eq!(grade_field_id("grade_"), None);
        assert_eq!(grade_field_id("grade_q1"), None);
        assert_eq!(grade_field_id("name"), None);
    }

    #[test]
    fn test_cell_text_per_column() {
        let mut grades = IndexMap::new();
        grades.insert(1, "90".to_string());
        let row = GradeRow {
            id: 5,
            name: "Ana Lee".to_string(),
            grades,
        };
        let q1 = MarkingPeriod {
            id: 1,
            name: "Q1".to_string(),
        };
        let q2 = MarkingPeriod {
            id: 2,
            name: "Q2".to_string(),
        };

        assert_eq!(row.cell_text(&Column::student()), "Ana Lee");
        assert_eq!(row.cell_text(&Column::marking_period(&q1)), "90");
        assert_eq!(row.cell_text(&Column::marking_period(&q2)), "");
        assert_eq!(row.cell_text(&Column::final_grade()), "90.00");
    }

    #[test]
    fn test_columns_use_flat_field_names() {
        let mp = MarkingPeriod {
            id: 7,
            name: "Q3".to_string(),
        };

        assert_eq!(Column::marking_period(&mp).data.as_deref(), Some("grade_7"));
        assert_eq!(Column::student().data.as_deref(), Some("name"));
        assert!(Column::final_grade().read_only);
        assert_eq!(Column::final_grade().data, None);
    }
}
