use crate::edit::CellChange;
use crate::models::{grade_field, mean_display, Column, GradeGrid, GRADE_FIELD_PREFIX};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Editable grid widget state.
///
/// Rows are flat `field -> value` maps, the same shape the view model is
/// rendered into. Edits land here and are reported as [`CellChange`]s; the
/// view model itself is not written back.
#[derive(Debug, Clone, Default)]
pub struct GridTable {
    columns: Vec<Column>,
    row_ids: Vec<u64>,
    data: Vec<IndexMap<String, String>>,
    selected: (usize, usize),
    editor: Option<String>,
    failed: HashSet<(usize, String)>,
}

impl GridTable {
    /// Replace the table contents with `grid`, reporting every populated cell.
    pub fn load_data(&mut self, grid: &GradeGrid) -> Vec<CellChange> {
        let mut changes = Vec::new();
        let mut data = Vec::with_capacity(grid.rows.len());

        for (row_index, row) in grid.rows.iter().enumerate() {
            let mut fields = IndexMap::new();
            for column in &grid.columns {
                let Some(field) = column.data.as_deref() else {
                    continue;
                };
                let value = row.cell_text(column);
                if value.is_empty() {
                    continue;
                }
                changes.push(CellChange {
                    row: row_index,
                    field: field.to_string(),
                    old: self.value(row_index, field).map(str::to_string),
                    new: value.clone(),
                });
                fields.insert(field.to_string(), value);
            }
            data.push(fields);
        }

        self.columns = grid.columns.clone();
        self.row_ids = grid.rows.iter().map(|r| r.id).collect();
        self.data = data;
        self.editor = None;
        self.failed.clear();
        self.selected = (
            self.selected.0.min(self.data.len().saturating_sub(1)),
            self.selected.1.min(self.columns.len().saturating_sub(1)),
        );

        changes
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn selected(&self) -> (usize, usize) {
        self.selected
    }

    pub fn editor(&self) -> Option<&str> {
        self.editor.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    fn value(&self, row: usize, field: &str) -> Option<&str> {
        self.data.get(row)?.get(field).map(String::as_str)
    }

    /// Text shown in a cell; the Final column is computed from the row's grades.
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        let Some(column) = self.columns.get(col) else {
            return String::new();
        };
        match column.data.as_deref() {
            Some(field) => self.value(row, field).unwrap_or_default().to_string(),
            None => self
                .data
                .get(row)
                .map(|fields| {
                    mean_display(
                        fields
                            .iter()
                            .filter(|(field, _)| field.starts_with(GRADE_FIELD_PREFIX))
                            .map(|(_, value)| value.as_str()),
                    )
                })
                .unwrap_or_default(),
        }
    }

    pub fn is_failed(&self, row: usize, col: usize) -> bool {
        self.columns
            .get(col)
            .and_then(|c| c.data.as_ref())
            .is_some_and(|field| self.failed.contains(&(row, field.clone())))
    }

    /// Flag the cell for `student` / `marking_period` as failed to save.
    pub fn mark_failed(&mut self, student: u64, marking_period: &str) -> bool {
        match self.grade_cell(student, marking_period) {
            Some(cell) => self.failed.insert(cell),
            None => false,
        }
    }

    pub fn clear_failed(&mut self, student: u64, marking_period: &str) {
        if let Some(cell) = self.grade_cell(student, marking_period) {
            self.failed.remove(&cell);
        }
    }

    fn grade_cell(&self, student: u64, marking_period: &str) -> Option<(usize, String)> {
        let row = self.row_ids.iter().position(|id| *id == student)?;
        let field = grade_field(marking_period.parse().ok()?);
        Some((row, field))
    }

    pub fn move_selection(&mut self, rows: isize, cols: isize) {
        if self.editor.is_some() || self.data.is_empty() || self.columns.is_empty() {
            return;
        }
        let (row, col) = self.selected;
        self.selected = (
            row.saturating_add_signed(rows).min(self.data.len() - 1),
            col.saturating_add_signed(cols).min(self.columns.len() - 1),
        );
    }

    /// Start editing the selected cell. Read-only cells cannot be edited.
    pub fn begin_edit(&mut self) -> bool {
        let (row, col) = self.selected;
        let editable = row < self.data.len()
            && self
                .columns
                .get(col)
                .is_some_and(|c| !c.read_only && c.data.is_some());
        if editable {
            self.editor = Some(self.cell_text(row, col));
        }
        editable
    }

    pub fn input(&mut self, c: char) {
        if let Some(editor) = self.editor.as_mut() {
            editor.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    /// Write the editor contents into the selected cell and report the change.
    pub fn commit_edit(&mut self) -> Option<CellChange> {
        let new = self.editor.take()?;
        let (row, col) = self.selected;
        let field = self.columns.get(col)?.data.clone()?;
        let fields = self.data.get_mut(row)?;

        let old = if new.is_empty() {
            fields.shift_remove(&field)
        } else {
            fields.insert(field.clone(), new.clone())
        };
        self.failed.remove(&(row, field.clone()));

        Some(CellChange {
            row,
            field,
            old,
            new,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grid;
    use crate::models::{CourseInfo, CourseSection, Enrollment, Grade, MarkingPeriod};

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
            enrollments: vec![Enrollment {
                id: 5,
                first_name: "Ana".to_string(),
                last_name: "Lee".to_string(),
            }],
        };
        let grades = vec![Grade {
            student_id: 5,
            marking_period: Some(1),
            course_section_id: Some(12),
            grade: Some("80".to_string()),
        }];
        build_grid("12", &course, &grades)
    }

    #[test]
    fn test_load_data_reports_populated_cells() {
        let mut table = GridTable::default();
        let changes = table.load_data(&grid());

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "name");
        assert_eq!(changes[1].field, "grade_1");
        assert_eq!(changes[1].new, "80");
        assert_eq!(table.cell_text(0, 0), "Ana Lee");
        assert_eq!(table.cell_text(0, 3), "80.00");
    }

    #[test]
    fn test_reload_reports_previous_values() {
        let mut table = GridTable::default();
        table.load_data(&grid());
        table.move_selection(0, 2);
        assert!(table.begin_edit());
        table.input('9');
        table.commit_edit();

        let changes = table.load_data(&grid());

        assert!(changes.iter().all(|c| c.field != "grade_2"));
        assert_eq!(table.cell_text(0, 2), "");
        assert_eq!(changes[1].old.as_deref(), Some("80"));
    }

    #[test]
    fn test_read_only_cells_cannot_be_edited() {
        let mut table = GridTable::default();
        table.load_data(&grid());

        assert!(!table.begin_edit());
        table.move_selection(0, 3);
        assert_eq!(table.selected(), (0, 3));
        assert!(!table.begin_edit());
        assert!(table.commit_edit().is_none());
    }

    #[test]
    fn test_commit_edit_reports_change_and_updates_final() {
        let mut table = GridTable::default();
        table.load_data(&grid());
        table.move_selection(0, 2);

        assert!(table.begin_edit());
        assert_eq!(table.editor(), Some(""));
        table.input('9');
        table.input('1');
        table.backspace();
        table.input('0');
        let change = table.commit_edit().unwrap();

        assert_eq!(
            change,
            CellChange {
                row: 0,
                field: "grade_2".to_string(),
                old: None,
                new: "90".to_string(),
            }
        );
        assert!(!table.is_editing());
        assert_eq!(table.cell_text(0, 3), "85.00");
    }

    #[test]
    fn test_cancel_edit_keeps_value() {
        let mut table = GridTable::default();
        table.load_data(&grid());
        table.move_selection(0, 1);
        table.begin_edit();
        table.input('5');
        table.cancel_edit();

        assert_eq!(table.cell_text(0, 1), "80");
        assert!(table.commit_edit().is_none());
    }

    #[test]
    fn test_failed_cells_are_tracked_by_student_and_period() {
        let mut table = GridTable::default();
        table.load_data(&grid());

        assert!(table.mark_failed(5, "2"));
        assert!(table.is_failed(0, 2));
        assert!(!table.mark_failed(99, "2"));
        assert!(!table.mark_failed(5, "x"));

        table.clear_failed(5, "2");
        assert!(!table.is_failed(0, 2));
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut table = GridTable::default();
        table.load_data(&grid());

        table.move_selection(-3, -3);
        assert_eq!(table.selected(), (0, 0));
        table.move_selection(5, 10);
        assert_eq!(table.selected(), (0, 3));
        assert_eq!(table.row_count(), 1);
    }
}
