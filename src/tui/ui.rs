use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders},
};

use super::app::{App, Screen};
use super::screens;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0)])
        .split(area);

    // Outer frame
    let main_block = Block::default()
        .title(" Product Price Viewer ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner_area = main_block.inner(chunks[0]);
    frame.render_widget(main_block, chunks[0]);

    // Draw current screen
    match app.screen {
        Screen::Login => screens::login::draw(frame, inner_area, &app.login_state),
        Screen::Browse => screens::browse::draw(frame, inner_area, &app.browse_state),
    }
}
