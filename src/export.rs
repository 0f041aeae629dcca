use crate::ui::GridTable;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Export the grid, as currently displayed (including unsaved or failed edits),
/// to a CSV file in `dir`
pub fn export_grid_to_csv(table: &GridTable, section_id: &str, dir: &Path) -> Result<PathBuf> {
    if table.row_count() == 0 {
        anyhow::bail!("No students to export");
    }

    // Generate filename with timestamp
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("grades_{}_{}.csv", section_id, timestamp);
    let filepath = dir.join(filename);

    let headers: Vec<&str> = table.columns().iter().map(|c| c.title.as_str()).collect();

    let mut wtr = csv::Writer::from_path(&filepath).context("Failed to create CSV file")?;

    wtr.write_record(&headers)
        .context("Failed to write CSV headers")?;

    for row in 0..table.row_count() {
        let record: Vec<String> = (0..table.columns().len())
            .map(|col| table.cell_text(row, col))
            .collect();

        wtr.write_record(&record)
            .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;

    Ok(filepath)
}
