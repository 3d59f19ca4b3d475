use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::core::auth::{Credentials, LoginOutcome, UserRecord};
use crate::core::config::AppConfig;
use crate::core::fetch::DataSource;
use crate::core::table::TableView;
use crate::tui::async_bridge::{AcquireFailure, AsyncRequest, AsyncResponse};
use crate::tui::widgets::spinner::Spinner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Browse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

/// Login screen state
pub struct LoginState {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub loading: bool,
    pub spinner: Spinner,
    pub error: Option<String>,
}

impl Default for LoginState {
    fn default() -> Self {
        // Pre-fill from PRECOVIEW_USER env var if available
        let username = std::env::var("PRECOVIEW_USER").unwrap_or_default();
        let focus = if username.is_empty() {
            LoginField::Username
        } else {
            LoginField::Password
        };
        Self {
            username,
            password: String::new(),
            focus,
            loading: false,
            spinner: Spinner::default(),
            error: None,
        }
    }
}

/// Which element has focus in the browse screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowseFocus {
    #[default]
    Table,
    FilterBar,
}

/// Modal prompt layered over the browse screen
pub enum BrowsePrompt {
    /// Pick a filter value for a designated selection column
    Selection {
        col: usize,
        values: Vec<String>,
        selected: usize,
    },
    /// The cached file does not parse; offer re-download or cancel
    CorruptCache(PathBuf),
    /// Every acquisition stage failed; offer retry or cancel
    Exhausted(String),
}

/// Table browser state
pub struct BrowseState {
    pub view: TableView,
    pub source: Option<DataSource>,
    pub data_path: Option<PathBuf>,
    /// Dataset row indices passing the active filters, in dataset order
    pub visible_rows: Vec<usize>,
    /// Current position within `visible_rows`
    pub selected: usize,
    pub scroll_offset: usize,
    /// First visible column (horizontal scroll)
    pub col_offset: usize,
    pub focus: BrowseFocus,
    /// Column whose filter is being edited
    pub active_filter_col: usize,
    pub prompt: Option<BrowsePrompt>,
    pub loading: bool,
    pub spinner: Spinner,
    pub status: String,
    pub user: Option<UserRecord>,
    pub offline: bool,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self {
            view: TableView::empty(),
            source: None,
            data_path: None,
            visible_rows: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            col_offset: 0,
            focus: BrowseFocus::Table,
            active_filter_col: 0,
            prompt: None,
            loading: false,
            spinner: Spinner::default(),
            status: String::new(),
            user: None,
            offline: false,
        }
    }
}

impl BrowseState {
    /// Recompute the visible row set after a filter or dataset change.
    pub fn refresh_rows(&mut self) {
        self.visible_rows = self.view.render();
        if self.visible_rows.is_empty() {
            self.selected = 0;
            self.scroll_offset = 0;
        } else if self.selected >= self.visible_rows.len() {
            self.selected = self.visible_rows.len() - 1;
            self.scroll_offset = self.scroll_offset.min(self.selected);
        }
    }

    pub fn column_count(&self) -> usize {
        self.view.columns().len()
    }
}

pub struct App {
    pub screen: Screen,
    pub should_quit: bool,
    pub config: AppConfig,

    /// Original credentials, kept for the status poll. Never persisted.
    pub credentials: Option<Credentials>,

    // Screen states
    pub login_state: LoginState,
    pub browse_state: BrowseState,

    // Async communication
    pub async_tx: mpsc::Sender<AsyncRequest>,

    // Schedule deadlines. A deadline is taken (set to None) when its request
    // is dispatched and re-armed only when the response arrives, so two runs
    // of the same schedule can never overlap.
    status_poll_due: Option<Instant>,
    refresh_due: Option<Instant>,

    /// Fatal notification shown after the terminal is restored.
    pub blocked_notice: Option<String>,
}

impl App {
    pub fn new(config: AppConfig, async_tx: mpsc::Sender<AsyncRequest>) -> Self {
        let mut app = Self {
            screen: Screen::Login,
            should_quit: false,
            config,
            credentials: None,
            login_state: LoginState::default(),
            browse_state: BrowseState::default(),
            async_tx,
            status_poll_due: None,
            refresh_due: None,
            blocked_notice: None,
        };
        if app.config.offline {
            app.enter_browse_offline("Offline mode");
        }
        app
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // Spinner progressing and schedule dispatch
    pub fn tick(&mut self) {
        if self.login_state.loading {
            self.login_state.spinner.tick();
        }
        if self.browse_state.loading {
            self.browse_state.spinner.tick();
        }

        let now = Instant::now();
        if let Some(due) = self.status_poll_due
            && now >= due
            && let Some(credentials) = self.credentials.clone()
        {
            match self.async_tx.try_send(AsyncRequest::PollStatus(credentials)) {
                Ok(()) => self.status_poll_due = None,
                Err(_) => self.status_poll_due = Some(now + Duration::from_secs(1)),
            }
        }
        if let Some(due) = self.refresh_due
            && now >= due
        {
            match self.async_tx.try_send(AsyncRequest::RefreshRemote) {
                Ok(()) => self.refresh_due = None,
                Err(_) => self.refresh_due = Some(now + Duration::from_secs(1)),
            }
        }
    }

    fn arm_status_poll(&mut self) {
        self.status_poll_due = Some(Instant::now() + self.config.status_poll_interval);
    }

    fn arm_refresh(&mut self) {
        self.refresh_due = Some(Instant::now() + self.config.refresh_interval);
    }

    fn start_acquire(&mut self) {
        self.browse_state.loading = true;
        self.browse_state.status = "Loading data...".to_string();
        let _ = self.async_tx.try_send(AsyncRequest::Acquire);
    }

    fn enter_browse_offline(&mut self, status: &str) {
        self.screen = Screen::Browse;
        self.browse_state.offline = true;
        self.browse_state.status = status.to_string();
        self.start_acquire();
        self.arm_refresh();
    }

    /// Handle async response from the bridge
    pub fn handle_async_response(&mut self, response: AsyncResponse) {
        match response {
            AsyncResponse::LoginFinished(result) => {
                self.login_state.loading = false;
                match result {
                    Ok(LoginOutcome::Authenticated(user)) => {
                        self.login_state.error = None;
                        self.screen = Screen::Browse;
                        self.browse_state.user = Some(user);
                        self.start_acquire();
                        self.arm_status_poll();
                        self.arm_refresh();
                    }
                    Ok(LoginOutcome::Blocked) => {
                        self.blocked_notice =
                            Some(crate::PrecoError::AccountBlocked.to_string());
                        self.quit();
                    }
                    Ok(LoginOutcome::InvalidCredentials) => {
                        self.login_state.error =
                            Some("Invalid credentials. Try again.".to_string());
                    }
                    Ok(LoginOutcome::ServerError(status)) => {
                        self.login_state.error =
                            Some(format!("Server error (HTTP {status}). Try again."));
                    }
                    Ok(LoginOutcome::Unreachable) => {
                        self.enter_browse_offline("Offline mode: server unreachable");
                    }
                    Err(e) => {
                        self.login_state.error = Some(e);
                    }
                }
            }
            AsyncResponse::DatasetReady(result) => {
                self.browse_state.loading = false;
                match result {
                    Ok(acquired) => {
                        self.browse_state.view.replace_dataset(acquired.dataset);
                        self.browse_state.source = Some(acquired.source);
                        self.browse_state.data_path = Some(acquired.path);
                        self.browse_state.selected = 0;
                        self.browse_state.scroll_offset = 0;
                        self.browse_state.col_offset = 0;
                        self.browse_state.active_filter_col = 0;
                        self.browse_state.refresh_rows();
                        self.browse_state.status = format!(
                            "Loaded {} rows from {}",
                            self.browse_state.view.dataset().len(),
                            acquired.source.label()
                        );
                    }
                    Err(AcquireFailure::Corrupt(path)) => {
                        self.browse_state.prompt = Some(BrowsePrompt::CorruptCache(path));
                    }
                    Err(AcquireFailure::Failed(message)) => {
                        self.browse_state.prompt = Some(BrowsePrompt::Exhausted(message));
                    }
                }
            }
            AsyncResponse::RefreshFinished(result) => {
                self.arm_refresh();
                if let Some(acquired) = result {
                    self.browse_state.view.replace_dataset(acquired.dataset);
                    self.browse_state.source = Some(acquired.source);
                    self.browse_state.data_path = Some(acquired.path);
                    self.browse_state.refresh_rows();
                    self.browse_state.status = format!(
                        "Data refreshed: {} rows",
                        self.browse_state.view.dataset().len()
                    );
                }
                // On failure the previous dataset stays untouched.
            }
            AsyncResponse::StatusPolled(outcome) => {
                if let Some(LoginOutcome::Blocked) = outcome {
                    self.blocked_notice =
                        Some(crate::PrecoError::AccountBlocked.to_string());
                    self.quit();
                } else {
                    // Transient failures and healthy outcomes both just
                    // reschedule the next poll.
                    self.arm_status_poll();
                }
            }
        }
    }

    // Login screen actions
    pub fn login_input_char(&mut self, c: char) {
        match self.login_state.focus {
            LoginField::Username => self.login_state.username.push(c),
            LoginField::Password => self.login_state.password.push(c),
        }
    }

    pub fn login_delete_char(&mut self) {
        match self.login_state.focus {
            LoginField::Username => self.login_state.username.pop(),
            LoginField::Password => self.login_state.password.pop(),
        };
    }

    pub fn login_toggle_field(&mut self) {
        self.login_state.focus = match self.login_state.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub fn login_submit(&mut self) {
        let credentials = Credentials::new(
            self.login_state.username.clone(),
            self.login_state.password.clone(),
        );
        if !credentials.is_complete() {
            self.login_state.error = Some("Fill in both username and password.".to_string());
            return;
        }
        self.login_state.loading = true;
        self.login_state.error = None;
        self.credentials = Some(credentials.clone());
        let _ = self.async_tx.try_send(AsyncRequest::Login(credentials));
    }

    // Browse screen actions - table focus
    pub fn browse_move_up(&mut self) {
        if self.browse_state.selected > 0 {
            self.browse_state.selected -= 1;
            if self.browse_state.selected < self.browse_state.scroll_offset {
                self.browse_state.scroll_offset = self.browse_state.selected;
            }
        }
    }

    pub fn browse_move_down(&mut self) {
        let max = self.browse_state.visible_rows.len().saturating_sub(1);
        if self.browse_state.selected < max {
            self.browse_state.selected += 1;
        }
    }

    pub fn browse_scroll_left(&mut self) {
        self.browse_state.col_offset = self.browse_state.col_offset.saturating_sub(1);
    }

    pub fn browse_scroll_right(&mut self) {
        let max = self.browse_state.column_count().saturating_sub(1);
        if self.browse_state.col_offset < max {
            self.browse_state.col_offset += 1;
        }
    }

    /// Manual reload: re-run the whole acquisition chain.
    pub fn browse_reload(&mut self) {
        if !self.browse_state.loading {
            self.start_acquire();
        }
    }

    // Focus actions
    pub fn browse_focus_filter(&mut self) {
        if self.browse_state.column_count() > 0 {
            self.browse_state.focus = BrowseFocus::FilterBar;
        }
    }

    pub fn browse_focus_table(&mut self) {
        self.browse_state.focus = BrowseFocus::Table;
    }

    pub fn browse_toggle_focus(&mut self) {
        self.browse_state.focus = match self.browse_state.focus {
            BrowseFocus::Table => BrowseFocus::FilterBar,
            BrowseFocus::FilterBar => BrowseFocus::Table,
        };
    }

    // Filter bar actions
    pub fn filter_prev_column(&mut self) {
        self.browse_state.active_filter_col =
            self.browse_state.active_filter_col.saturating_sub(1);
    }

    pub fn filter_next_column(&mut self) {
        let max = self.browse_state.column_count().saturating_sub(1);
        if self.browse_state.active_filter_col < max {
            self.browse_state.active_filter_col += 1;
        }
    }

    pub fn filter_input_char(&mut self, c: char) {
        let col = self.browse_state.active_filter_col;
        self.browse_state.view.push_filter_char(col, c);
        self.browse_state.refresh_rows();
    }

    pub fn filter_backspace(&mut self) {
        let col = self.browse_state.active_filter_col;
        self.browse_state.view.pop_filter_char(col);
        self.browse_state.refresh_rows();
    }

    /// Esc on the filter bar clears the active column's filter.
    pub fn filter_clear(&mut self) {
        let col = self.browse_state.active_filter_col;
        self.browse_state.view.clear_filter_at(col);
        self.browse_state.refresh_rows();
        self.browse_state.focus = BrowseFocus::Table;
    }

    /// Esc on the table clears every filter at once.
    pub fn browse_clear_filters(&mut self) {
        for col in 0..self.browse_state.column_count() {
            self.browse_state.view.clear_filter_at(col);
        }
        self.browse_state.refresh_rows();
    }

    /// Enter on the filter bar: selection columns open the value list,
    /// anything else returns focus to the table.
    pub fn filter_confirm(&mut self) {
        let col = self.browse_state.active_filter_col;
        if self.browse_state.view.is_selection_column(col) {
            let mut values = vec!["(all)".to_string()];
            values.extend(self.browse_state.view.selection_values(col));
            self.browse_state.prompt = Some(BrowsePrompt::Selection {
                col,
                values,
                selected: 0,
            });
        } else {
            self.browse_state.focus = BrowseFocus::Table;
        }
    }

    // Selection prompt actions
    pub fn selection_move_up(&mut self) {
        if let Some(BrowsePrompt::Selection { selected, .. }) = &mut self.browse_state.prompt
            && *selected > 0
        {
            *selected -= 1;
        }
    }

    pub fn selection_move_down(&mut self) {
        if let Some(BrowsePrompt::Selection {
            values, selected, ..
        }) = &mut self.browse_state.prompt
            && *selected + 1 < values.len()
        {
            *selected += 1;
        }
    }

    pub fn selection_confirm(&mut self) {
        if let Some(BrowsePrompt::Selection {
            col,
            values,
            selected,
        }) = self.browse_state.prompt.take()
        {
            let value = if selected == 0 {
                String::new()
            } else {
                values[selected].clone()
            };
            self.browse_state.view.set_filter_at(col, value);
            self.browse_state.refresh_rows();
            self.browse_state.focus = BrowseFocus::Table;
        }
    }

    pub fn close_prompt(&mut self) {
        self.browse_state.prompt = None;
    }

    // Corruption prompt actions
    pub fn corrupt_redownload(&mut self) {
        if let Some(BrowsePrompt::CorruptCache(path)) = self.browse_state.prompt.take() {
            self.browse_state.loading = true;
            self.browse_state.status = "Downloading data again...".to_string();
            let _ = self
                .async_tx
                .try_send(AsyncRequest::RedownloadCorrupt(path));
        }
    }

    pub fn corrupt_cancel(&mut self) {
        self.browse_state.prompt = None;
        self.browse_state.status = "Load cancelled.".to_string();
    }

    // Exhausted prompt actions
    pub fn exhausted_retry(&mut self) {
        self.browse_state.prompt = None;
        self.start_acquire();
    }

    pub fn exhausted_cancel(&mut self) {
        self.browse_state.prompt = None;
        if self.browse_state.view.dataset().is_empty() {
            // Nothing to show and the user declined to retry.
            self.quit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Dataset;
    use crate::core::fetch::Acquired;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        App::new(AppConfig::default(), tx)
    }

    fn loaded_app() -> App {
        let mut app = test_app();
        app.handle_async_response(AsyncResponse::DatasetReady(Ok(Acquired {
            dataset: Dataset::placeholder(),
            source: DataSource::Cache,
            path: std::env::temp_dir().join("dados.csv"),
        })));
        app
    }

    #[test]
    fn blocked_poll_terminates_the_app() {
        let mut app = test_app();
        app.handle_async_response(AsyncResponse::StatusPolled(Some(LoginOutcome::Blocked)));
        assert!(app.should_quit);
        assert!(app.blocked_notice.is_some());
    }

    #[test]
    fn transient_poll_failure_only_reschedules() {
        let mut app = test_app();
        app.handle_async_response(AsyncResponse::StatusPolled(None));
        assert!(!app.should_quit);
        assert!(app.status_poll_due.is_some());

        app.handle_async_response(AsyncResponse::StatusPolled(Some(
            LoginOutcome::Unreachable,
        )));
        assert!(!app.should_quit);
    }

    #[test]
    fn failed_refresh_keeps_the_previous_dataset() {
        let mut app = loaded_app();
        assert_eq!(app.browse_state.view.dataset().len(), 3);

        app.handle_async_response(AsyncResponse::RefreshFinished(None));
        assert_eq!(app.browse_state.view.dataset().len(), 3);
        assert!(app.refresh_due.is_some());
    }

    #[test]
    fn successful_refresh_replaces_the_dataset_wholesale() {
        let mut app = loaded_app();
        let csv = "PRODUTO,Preço\nCadeira,120\n";
        let dataset = Dataset::from_csv_bytes(csv.as_bytes()).unwrap();
        app.handle_async_response(AsyncResponse::RefreshFinished(Some(Acquired {
            dataset,
            source: DataSource::Remote,
            path: std::env::temp_dir().join("dados.csv"),
        })));
        assert_eq!(app.browse_state.view.dataset().len(), 1);
        assert_eq!(app.browse_state.source, Some(DataSource::Remote));
    }

    #[test]
    fn unreachable_login_degrades_to_offline_browsing() {
        let mut app = test_app();
        app.handle_async_response(AsyncResponse::LoginFinished(Ok(
            LoginOutcome::Unreachable,
        )));
        assert_eq!(app.screen, Screen::Browse);
        assert!(app.browse_state.offline);
        assert!(!app.should_quit);
        // No session, so the status poll is never armed.
        assert!(app.status_poll_due.is_none());
    }

    #[test]
    fn blocked_login_quits_with_a_notice() {
        let mut app = test_app();
        app.handle_async_response(AsyncResponse::LoginFinished(Ok(LoginOutcome::Blocked)));
        assert!(app.should_quit);
        assert!(app.blocked_notice.is_some());
    }

    #[test]
    fn empty_login_fields_are_rejected_locally() {
        let mut app = test_app();
        app.login_submit();
        assert!(app.login_state.error.is_some());
        assert!(!app.login_state.loading);
    }

    #[test]
    fn exhausted_cancel_quits_only_without_data() {
        let mut app = loaded_app();
        app.browse_state.prompt = Some(BrowsePrompt::Exhausted("no source".into()));
        app.exhausted_cancel();
        assert!(!app.should_quit);

        let mut app = test_app();
        app.browse_state.prompt = Some(BrowsePrompt::Exhausted("no source".into()));
        app.exhausted_cancel();
        assert!(app.should_quit);
    }
}
