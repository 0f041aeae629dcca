use crate::api::GradebookSource;
use crate::edit::{self, CellChange, ChangeSource};
use crate::error::{ApiError, LoadError};
use crate::export;
use crate::grid;
use crate::models::{GradeGrid, SetGradeRequest};
use crate::ui::render::render_ui;
use crate::ui::state::{AppState, StatusLog};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Result of one grade update, sent back from its task.
#[derive(Debug)]
struct UpdateOutcome {
    seq: u64,
    request: SetGradeRequest,
    result: Result<serde_json::Value, ApiError>,
}

/// Result of one grid load, sent back from its task.
#[derive(Debug)]
struct LoadOutcome {
    generation: u64,
    result: Result<GradeGrid, LoadError>,
}

pub struct App<S> {
    source: S,
    section_id: String,
    export_dir: PathBuf,
    state: AppState,
    status: StatusLog,
    updates_tx: UnboundedSender<UpdateOutcome>,
    updates_rx: UnboundedReceiver<UpdateOutcome>,
    loads_tx: UnboundedSender<LoadOutcome>,
    loads_rx: UnboundedReceiver<LoadOutcome>,
    load_generation: u64,
    next_seq: u64,
    /// Latest submission per (student, marking period) cell
    latest_submission: HashMap<(u64, String), u64>,
}

impl<S> App<S>
where
    S: GradebookSource + Clone + Send + Sync + 'static,
{
    pub fn new(source: S, section_id: String) -> Self {
        let (updates_tx, updates_rx) = unbounded_channel();
        let (loads_tx, loads_rx) = unbounded_channel();
        Self {
            source,
            state: AppState::Loading {
                section_id: section_id.clone(),
                previous: None,
            },
            section_id,
            export_dir: PathBuf::from("."),
            status: StatusLog::default(),
            updates_tx,
            updates_rx,
            loads_tx,
            loads_rx,
            load_generation: 0,
            next_seq: 0,
            latest_submission: HashMap::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.start_load();

        // Main event loop
        let result = self.event_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            while let Ok(outcome) = self.loads_rx.try_recv() {
                self.apply_load(outcome);
            }
            while let Ok(outcome) = self.updates_rx.try_recv() {
                self.apply_outcome(outcome);
            }

            terminal.draw(|f| render_ui(f, &self.state, &self.status))?;

            // Check for keyboard events with a short timeout
            if event::poll(std::time::Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key_event(key) {
                        break; // User quit
                    }
                }
            }

            // Small yield to allow load and update tasks to run
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        Ok(())
    }

    /// Show the loading screen and fetch the grid on its own task.
    ///
    /// A load started later supersedes any load still in flight.
    fn start_load(&mut self) {
        let previous = match &mut self.state {
            AppState::Grid { table, .. } => Some(std::mem::take(table)),
            AppState::Loading { previous, .. } => previous.take(),
            AppState::Error { .. } => None,
        };
        self.state = AppState::Loading {
            section_id: self.section_id.clone(),
            previous,
        };

        self.load_generation += 1;
        let generation = self.load_generation;
        let source = self.source.clone();
        let section_id = self.section_id.clone();
        let tx = self.loads_tx.clone();

        tokio::spawn(async move {
            let result = grid::load_grid(&source, &section_id).await;
            let _ = tx.send(LoadOutcome { generation, result });
        });
    }

    /// Populate the grid from a finished load. Either fetch failing leaves it unpopulated.
    fn apply_load(&mut self, outcome: LoadOutcome) {
        if outcome.generation != self.load_generation {
            debug!(generation = outcome.generation, "Ignoring superseded load");
            return;
        }
        let AppState::Loading { previous, .. } = &mut self.state else {
            return;
        };

        match outcome.result {
            Ok(grid) => {
                let mut table = previous.take().unwrap_or_default();
                let changes = table.load_data(&grid);
                self.status.add_status(format!(
                    "Loaded {} students, {} marking periods",
                    grid.rows.len(),
                    grid.columns.len().saturating_sub(2)
                ));
                self.state = AppState::Grid { grid, table };
                self.on_after_change(changes, ChangeSource::LoadData);
            }
            Err(e) => {
                self.state = AppState::Error {
                    message: format!("Failed to load grades: {}", e),
                };
            }
        }
    }

    /// Route changed cells to the edit handler and submit each resulting update.
    fn on_after_change(&mut self, changes: Vec<CellChange>, source: ChangeSource) {
        let AppState::Grid { grid, .. } = &self.state else {
            return;
        };
        for request in edit::handle_changes(grid, &changes, source) {
            self.submit(request);
        }
    }

    fn submit(&mut self, request: SetGradeRequest) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest_submission
            .insert((request.student, request.marking_period.clone()), seq);

        info!(
            seq,
            student = request.student,
            marking_period = %request.marking_period,
            course_section = %request.course_section,
            "Submitting grade"
        );
        self.status.pending_updates += 1;

        let source = self.source.clone();
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            let result = source.set_grade(&request).await;
            let _ = tx.send(UpdateOutcome {
                seq,
                request,
                result,
            });
        });
    }

    /// Apply a finished update. Only the latest submission for a cell may
    /// change its failed mark or report to the status log.
    fn apply_outcome(&mut self, outcome: UpdateOutcome) {
        let UpdateOutcome {
            seq,
            request,
            result,
        } = outcome;
        self.status.pending_updates = self.status.pending_updates.saturating_sub(1);

        let cell = (request.student, request.marking_period.clone());
        let is_latest = self.latest_submission.get(&cell) == Some(&seq);
        if is_latest {
            self.latest_submission.remove(&cell);
        }

        match &result {
            Ok(response) => {
                info!(seq, student = request.student, %response, "Grade saved");
            }
            Err(e) => {
                warn!(seq, student = request.student, marking_period = %request.marking_period, error = %e, "Grade update failed");
            }
        }
        if !is_latest {
            debug!(seq, student = request.student, "Outcome superseded by a newer edit");
            return;
        }

        let table = match &mut self.state {
            AppState::Grid { table, .. } => Some(table),
            _ => None,
        };
        match result {
            Ok(_) => {
                if let Some(table) = table {
                    table.clear_failed(request.student, &request.marking_period);
                }
            }
            Err(e) => {
                self.status.failed_updates += 1;
                if let Some(table) = table {
                    table.mark_failed(request.student, &request.marking_period);
                }
                self.status.add_status(format!(
                    "✗ Grade '{}' for student {} (marking period {}) not saved: {}",
                    request.grade, request.student, request.marking_period, e
                ));
            }
        }
    }

    /// Returns true when the user asked to quit.
    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match &mut self.state {
            AppState::Grid { table, .. } if table.is_editing() => match key.code {
                KeyCode::Esc => table.cancel_edit(),
                KeyCode::Backspace => table.backspace(),
                KeyCode::Char(c) => table.input(c),
                KeyCode::Enter => {
                    if let Some(change) = table.commit_edit() {
                        self.on_after_change(vec![change], ChangeSource::Edit);
                    }
                }
                _ => {}
            },
            AppState::Grid { table, .. } => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Up => table.move_selection(-1, 0),
                KeyCode::Down => table.move_selection(1, 0),
                KeyCode::Left => table.move_selection(0, -1),
                KeyCode::Right | KeyCode::Tab => table.move_selection(0, 1),
                KeyCode::BackTab => table.move_selection(0, -1),
                KeyCode::Enter | KeyCode::F(2) => {
                    if !table.begin_edit() {
                        self.status
                            .add_status("This column is read-only".to_string());
                    }
                }
                KeyCode::Char('x') => {
                    match export::export_grid_to_csv(table, &self.section_id, &self.export_dir) {
                        Ok(path) => {
                            info!(path = %path.display(), "Exported grid");
                            self.status
                                .add_status(format!("✓ Exported to {}", path.display()));
                        }
                        Err(e) => {
                            warn!(error = %e, "Export failed");
                            self.status.add_status(format!("✗ Export failed: {}", e));
                        }
                    }
                }
                KeyCode::Char('r') => self.reload(),
                _ => {}
            },
            AppState::Error { .. } => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Enter | KeyCode::Char('r') => self.reload(),
                _ => {}
            },
            AppState::Loading { .. } => {
                if key.code == KeyCode::Char('q') {
                    return true;
                }
            }
        }

        false
    }

    fn reload(&mut self) {
        self.status.add_status("Reloading...".to_string());
        self.start_load();
    }
}
