use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell as TableCell, Clear, List, ListItem, Paragraph, Row, Table},
};

use crate::tui::app::{BrowseFocus, BrowsePrompt, BrowseState};

const MIN_COL_WIDTH: u16 = 6;
const MAX_COL_WIDTH: u16 = 28;

pub fn draw(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header line
            Constraint::Length(3), // Filter bar
            Constraint::Min(5),    // Table
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    draw_header(frame, chunks[0], state);
    draw_filter_bar(frame, chunks[1], state);
    draw_table(frame, chunks[2], state);
    draw_status_bar(frame, chunks[3], state);
    draw_help_bar(frame, chunks[4], state);

    match &state.prompt {
        Some(BrowsePrompt::Selection {
            col,
            values,
            selected,
        }) => draw_selection_popup(frame, area, state, *col, values, *selected),
        Some(BrowsePrompt::CorruptCache(path)) => draw_confirm_popup(
            frame,
            area,
            " Corrupted data file ",
            &[
                format!("The cached file does not parse: {}", path.display()),
                String::new(),
                "Download it again from the server?".to_string(),
            ],
            "y Re-download  n Cancel",
        ),
        Some(BrowsePrompt::Exhausted(message)) => draw_confirm_popup(
            frame,
            area,
            " Could not load data ",
            &[
                "No data source was reachable.".to_string(),
                String::new(),
                message.clone(),
            ],
            "r Retry  Esc Cancel",
        ),
        None => {}
    }
}

fn draw_header(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let user = state
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| {
            if state.offline {
                "offline".to_string()
            } else {
                "user".to_string()
            }
        });

    let mut spans = vec![
        Span::styled("User: ", Style::default().fg(Color::DarkGray)),
        Span::styled(user, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(
            Local::now().format("%d/%m/%Y %H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(source) = state.source {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("Data: {}", source.label()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(path) = &state.data_path
        && let Some(name) = path.file_name()
    {
        spans.push(Span::styled(
            format!(" [{}]", name.to_string_lossy()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if state.offline {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            "OFFLINE",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_filter_bar(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let focused = state.focus == BrowseFocus::FilterBar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let mut spans: Vec<Span> = Vec::new();
    let columns = state.view.columns();
    if columns.is_empty() {
        spans.push(Span::styled(
            "no columns",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (idx, column) in columns.iter().enumerate().skip(state.col_offset) {
        if idx > state.col_offset {
            spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
        }
        let active = focused && idx == state.active_filter_col;
        let name_style = if active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{}:", column.trim()), name_style));

        let filter = state.view.filter_at(idx);
        let value_style = if active {
            Style::default().fg(Color::White)
        } else {
            Style::default()
        };
        spans.push(Span::styled(filter.to_string(), value_style));
        if active {
            spans.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
        }
        if state.view.is_selection_column(idx) {
            spans.push(Span::styled("▾", Style::default().fg(Color::DarkGray)));
        }
    }

    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Filters (/) "),
    );
    frame.render_widget(bar, area);
}

fn draw_table(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if state.focus == BrowseFocus::Table {
            Color::Cyan
        } else {
            Color::DarkGray
        }));

    let columns = state.view.columns();
    if columns.is_empty() || state.loading {
        let text = if state.loading {
            format!("{} Loading data...", state.spinner.current())
        } else {
            "No data loaded. Press r to reload.".to_string()
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    // Vertical window over the filtered rows.
    let height = area.height.saturating_sub(3).max(1) as usize; // borders + header row
    let mut start = state.scroll_offset.min(state.selected);
    if state.selected >= start + height {
        start = state.selected + 1 - height;
    }
    let end = (start + height).min(state.visible_rows.len());
    let window = &state.visible_rows[start..end];

    // Horizontal window: fit as many columns as the width allows.
    let avail = area.width.saturating_sub(2);
    let mut visible_cols: Vec<(usize, u16)> = Vec::new();
    let mut used: u16 = 0;
    for (idx, column) in columns.iter().enumerate().skip(state.col_offset) {
        let mut width = column.trim().chars().count() as u16;
        for &row in window {
            let len = state.view.display_cell(row, idx).chars().count() as u16;
            width = width.max(len);
        }
        let width = width.clamp(MIN_COL_WIDTH, MAX_COL_WIDTH);
        if used + width + 1 > avail && !visible_cols.is_empty() {
            break;
        }
        used += width + 1;
        visible_cols.push((idx, width));
    }

    let header = Row::new(
        visible_cols
            .iter()
            .map(|(idx, _)| TableCell::from(columns[*idx].trim().to_string()))
            .collect::<Vec<_>>(),
    )
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = window
        .iter()
        .enumerate()
        .map(|(offset, &row_idx)| {
            let cells: Vec<TableCell> = visible_cols
                .iter()
                .map(|(col, _)| TableCell::from(state.view.display_cell(row_idx, *col)))
                .collect();
            let row = Row::new(cells);
            if start + offset == state.selected {
                row.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                row
            }
        })
        .collect();

    let widths: Vec<Constraint> = visible_cols
        .iter()
        .map(|(_, w)| Constraint::Length(*w))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);
    frame.render_widget(table, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let left = if state.loading {
        format!("{} {}", state.spinner.current(), state.status)
    } else {
        state.status.clone()
    };
    let right = format!(
        "{}/{} rows",
        state.visible_rows.len(),
        state.view.dataset().len()
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right.len() as u16 + 1)])
        .split(area);

    frame.render_widget(
        Paragraph::new(left).style(Style::default().fg(Color::DarkGray)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn draw_help_bar(frame: &mut Frame, area: Rect, state: &BrowseState) {
    let help = match state.focus {
        BrowseFocus::Table => "q Quit  / Filter  r Reload  ↑↓ Rows  ←→ Columns  Esc Clear filters",
        BrowseFocus::FilterBar => "Type to filter  ←→ Column  Enter Pick/Done  Esc Clear  Tab Table",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn draw_selection_popup(
    frame: &mut Frame,
    area: Rect,
    state: &BrowseState,
    col: usize,
    values: &[String],
    selected: usize,
) {
    let title = state
        .view
        .columns()
        .get(col)
        .map(|c| format!(" {} ", c.trim()))
        .unwrap_or_else(|| " Select ".to_string());

    let height = (values.len() as u16 + 2).min(area.height.saturating_sub(2)).max(3);
    let max_width = area.width.saturating_sub(4).max(1);
    let width = values
        .iter()
        .map(|v| v.chars().count() as u16)
        .max()
        .unwrap_or(10)
        .saturating_add(4)
        .max(20)
        .min(max_width);
    let popup = centered_rect(width, height, area);

    frame.render_widget(Clear, popup);

    let visible = (height.saturating_sub(2)) as usize;
    let start = if selected >= visible && visible > 0 {
        selected + 1 - visible
    } else {
        0
    };

    let items: Vec<ListItem> = values
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, value)| {
            let item = ListItem::new(value.clone());
            if i == selected {
                item.style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                item
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title),
    );
    frame.render_widget(list, popup);
}

fn draw_confirm_popup(frame: &mut Frame, area: Rect, title: &str, lines: &[String], hint: &str) {
    let max_width = area.width.saturating_sub(4).max(1);
    let width = lines
        .iter()
        .map(|l| l.chars().count() as u16)
        .max()
        .unwrap_or(20)
        .max(hint.chars().count() as u16)
        .saturating_add(4)
        .max(30)
        .min(max_width);
    let height = (lines.len() as u16 + 4).min(area.height.saturating_sub(2));
    let popup = centered_rect(width, height, area);

    frame.render_widget(Clear, popup);

    let mut text: Vec<Line> = lines.iter().map(|l| Line::from(l.clone())).collect();
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));

    let body = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(title.to_string()),
        );
    frame.render_widget(body, popup);
}
