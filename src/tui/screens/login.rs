use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::tui::app::{LoginField, LoginState};

pub fn draw(frame: &mut Frame, area: Rect, state: &LoginState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(2), // Spacer
            Constraint::Length(3), // Username field
            Constraint::Length(3), // Password field
            Constraint::Length(2), // Spacer
            Constraint::Min(3),    // Status/error
        ])
        .split(area);

    let title = Paragraph::new("Sign in to browse product prices")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    let field_width = area
        .width
        .saturating_sub(10)
        .max(20)
        .min(48)
        .min(area.width.max(1));
    let field_x = area.x + (area.width.saturating_sub(field_width)) / 2;

    let username_area = Rect::new(field_x, chunks[2].y, field_width, 3);
    let password_area = Rect::new(field_x, chunks[3].y, field_width, 3);

    draw_field(
        frame,
        username_area,
        " Username ",
        &state.username,
        state.focus == LoginField::Username,
        state.loading,
    );

    let masked = "*".repeat(state.password.chars().count());
    draw_field(
        frame,
        password_area,
        " Password ",
        &masked,
        state.focus == LoginField::Password,
        state.loading,
    );

    // Cursor on the focused field
    if !state.loading {
        let (field_area, len) = match state.focus {
            LoginField::Username => (username_area, state.username.chars().count()),
            LoginField::Password => (password_area, masked.chars().count()),
        };
        let cursor_x = field_area.x + 1 + (len as u16).min(field_width.saturating_sub(2));
        frame.set_cursor_position((cursor_x, field_area.y + 1));
    }

    let status_text = if let Some(ref error) = state.error {
        vec![Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ))]
    } else if state.loading {
        vec![Line::from(vec![
            Span::raw(state.spinner.current()),
            Span::raw(" Signing in..."),
        ])]
    } else {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                "Tab Switch field  Enter Sign in  Esc Quit",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    };
    let status = Paragraph::new(status_text).alignment(Alignment::Center);
    frame.render_widget(status, chunks[5]);
}

fn draw_field(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    focused: bool,
    loading: bool,
) {
    let border_color = if loading {
        Color::DarkGray
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let style = if loading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let field = Paragraph::new(value.to_string()).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(title.to_string()),
    );
    frame.render_widget(field, area);
}
