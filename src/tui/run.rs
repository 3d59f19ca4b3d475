use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use crate::core::client::ApiClient;
use crate::core::config::AppConfig;
use crate::core::paths;
use crate::tui::app::{App, BrowseFocus, BrowsePrompt, Screen};
use crate::tui::async_bridge::{AsyncBridge, AsyncRequest, AsyncResponse};
use crate::tui::ui;

const TICK_RATE: Duration = Duration::from_millis(100);

pub fn run(config: AppConfig) -> Result<()> {
    let (request_tx, request_rx) = mpsc::channel::<AsyncRequest>(32);
    let (response_tx, response_rx) = mpsc::channel::<AsyncResponse>(32);

    let client = ApiClient::new(config.clone())?;
    let bridge = AsyncBridge::new(request_rx, response_tx, client, config.clone());
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
        rt.block_on(bridge.run());
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, request_tx);
    let mut response_rx = response_rx;

    let result = run_loop(&mut terminal, &mut app, &mut response_rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    paths::cleanup_temp_dir();

    if let Some(notice) = &app.blocked_notice {
        eprintln!("{notice}");
    }

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    response_rx: &mut mpsc::Receiver<AsyncResponse>,
) -> Result<()> {
    while !app.should_quit {
        // Draw
        terminal.draw(|f| ui::draw(f, app))?;

        // Check for async responses (non-blocking)
        while let Ok(response) = response_rx.try_recv() {
            app.handle_async_response(response);
        }

        // Handle events
        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) => handle_key_event(app, key),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        // Schedules run off the tick even while keys are held down.
        app.tick();
    }

    Ok(())
}

fn handle_key_event(app: &mut App, key: crossterm::event::KeyEvent) {
    use crossterm::event::KeyCode::*;

    // Global quit with Ctrl+C
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == Char('c') {
        app.quit();
        return;
    }

    match app.screen {
        Screen::Login => handle_login_keys(app, key),
        Screen::Browse => handle_browse_keys(app, key),
    }
}

fn handle_login_keys(app: &mut App, key: crossterm::event::KeyEvent) {
    use crossterm::event::KeyCode::*;

    if app.login_state.loading {
        return; // Ignore input while loading
    }

    match key.code {
        Esc => app.quit(),
        Tab | Up | Down => app.login_toggle_field(),
        Char(c) => app.login_input_char(c),
        Backspace => app.login_delete_char(),
        Enter => app.login_submit(),
        _ => {}
    }
}

fn handle_browse_keys(app: &mut App, key: crossterm::event::KeyEvent) {
    use crossterm::event::KeyCode::*;

    // Prompts take over the keyboard while visible.
    match &app.browse_state.prompt {
        Some(BrowsePrompt::Selection { .. }) => {
            match key.code {
                Down | Char('j') => app.selection_move_down(),
                Up | Char('k') => app.selection_move_up(),
                Enter => app.selection_confirm(),
                Esc | Char('q') => app.close_prompt(),
                _ => {}
            }
            return;
        }
        Some(BrowsePrompt::CorruptCache(_)) => {
            match key.code {
                Char('y') | Enter => app.corrupt_redownload(),
                Char('n') | Esc => app.corrupt_cancel(),
                _ => {}
            }
            return;
        }
        Some(BrowsePrompt::Exhausted(_)) => {
            match key.code {
                Char('r') | Enter => app.exhausted_retry(),
                Char('c') | Char('q') | Esc => app.exhausted_cancel(),
                _ => {}
            }
            return;
        }
        None => {}
    }

    if app.browse_state.loading {
        return; // Ignore input while loading
    }

    if key.code == Tab {
        app.browse_toggle_focus();
        return;
    }

    match app.browse_state.focus {
        BrowseFocus::FilterBar => match key.code {
            Left => app.filter_prev_column(),
            Right => app.filter_next_column(),
            Char(c) => app.filter_input_char(c),
            Backspace => app.filter_backspace(),
            Esc => app.filter_clear(),
            Enter => app.filter_confirm(),
            Down => app.browse_focus_table(),
            _ => {}
        },
        BrowseFocus::Table => match key.code {
            Char('q') => app.quit(),
            Down | Char('j') => app.browse_move_down(),
            Up | Char('k') => app.browse_move_up(),
            Left | Char('h') => app.browse_scroll_left(),
            Right | Char('l') => app.browse_scroll_right(),
            Char('/') | Char('f') => app.browse_focus_filter(),
            Char('r') => app.browse_reload(),
            Esc => app.browse_clear_filters(),
            _ => {}
        },
    }
}
