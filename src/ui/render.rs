use crate::models::GradeGrid;
use crate::ui::state::{AppState, StatusLog};
use crate::ui::table::GridTable;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

const STATUS_LINES: usize = 4;

pub fn render_ui(frame: &mut Frame, state: &AppState, status: &StatusLog) {
    match state {
        AppState::Loading { section_id, .. } => render_loading(
            frame,
            &format!("Loading course section {}...", section_id),
        ),
        AppState::Grid { grid, table } => render_grid(frame, grid, table, status),
        AppState::Error { message } => render_error(frame, message),
    }
}

fn render_loading(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let block = Block::default()
        .title("Gradebook")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(message)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_grid(frame: &mut Frame, grid: &GradeGrid, table: &GridTable, status: &StatusLog) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(STATUS_LINES as u16 + 2),
            Constraint::Length(3),
        ])
        .split(area);

    // Course header
    let header = Paragraph::new(Line::from(vec![
        Span::styled("Course: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(&grid.course_name),
        Span::raw(format!("  (section {})", grid.course_section_id)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(header, chunks[0]);

    // Grade grid
    let (selected_row, selected_col) = table.selected();
    let header_row = Row::new(table.columns().iter().map(|column| {
        let style = if column.read_only {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        Cell::from(column.title.clone()).style(style)
    }));

    let rows: Vec<Row> = (0..table.row_count())
        .map(|row| {
            Row::new((0..table.columns().len()).map(|col| {
                let is_selected = row == selected_row && col == selected_col;
                let text = match table.editor() {
                    Some(buffer) if is_selected => format!("{}_", buffer),
                    _ => table.cell_text(row, col),
                };

                let mut style = Style::default();
                if table.columns()[col].read_only {
                    style = style.fg(Color::DarkGray);
                }
                if table.is_failed(row, col) {
                    style = style.fg(Color::Red).add_modifier(Modifier::BOLD);
                }
                if is_selected {
                    style = if table.is_editing() {
                        style.bg(Color::Blue).fg(Color::White)
                    } else {
                        style.fg(Color::Yellow).add_modifier(Modifier::REVERSED)
                    };
                }
                Cell::from(text).style(style)
            }))
        })
        .collect();

    let widths: Vec<Constraint> = table
        .columns()
        .iter()
        .map(|c| Constraint::Length(c.width))
        .collect();

    let grid_widget = Table::new(rows, widths).header(header_row).block(
        Block::default()
            .title(format!("Grades - {} student(s)", table.row_count()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    let mut table_state = TableState::default().with_selected(Some(selected_row));
    frame.render_stateful_widget(grid_widget, chunks[1], &mut table_state);

    // Status messages
    let status_items: Vec<ListItem> = status
        .latest(STATUS_LINES)
        .iter()
        .map(|msg| {
            let color = if msg.starts_with('✗') {
                Color::Red
            } else {
                Color::Green
            };
            ListItem::new(format!("• {}", msg)).style(Style::default().fg(color))
        })
        .collect();

    let status_list = List::new(status_items).block(
        Block::default()
            .title(format!(
                "Status | {} pending | {} failed",
                status.pending_updates, status.failed_updates
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    frame.render_widget(status_list, chunks[2]);

    let help_text = if table.is_editing() {
        "[Type grade | Enter: Save | Esc: Cancel]"
    } else {
        "[←↑↓→: Navigate | Enter: Edit | x: Export CSV | r: Reload | q: Quit]"
    };
    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(help, chunks[3]);
}

fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let text = vec![
        Line::from(vec![
            Span::styled("Error", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(message),
    ];

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, chunks[0]);

    let help = Paragraph::new("[Enter: Retry | q: Quit]")
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(help, chunks[1]);
}
