use crate::models::GradeGrid;
use crate::ui::table::GridTable;

const MAX_STATUS_MESSAGES: usize = 20;

#[derive(Debug, Clone)]
pub enum AppState {
    Loading {
        section_id: String,
        /// Table being replaced; its values become the `old` side of reload changes.
        previous: Option<GridTable>,
    },
    Grid {
        grid: GradeGrid,
        table: GridTable,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    pub pending_updates: usize,
    pub failed_updates: usize,
    pub messages: Vec<String>,
}

impl StatusLog {
    pub fn add_status(&mut self, message: String) {
        self.messages.push(message);
        // Keep only the most recent messages
        if self.messages.len() > MAX_STATUS_MESSAGES {
            self.messages.remove(0);
        }
    }

    pub fn latest(&self, count: usize) -> &[String] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }
}
