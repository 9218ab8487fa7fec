//! Application state and core logic.

use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::api::{ApiMessage, ApiRequest, ApiResponse, ComposePromptRequest, Practice, Snippet};
use crate::config::{Config, Theme, save_theme};
use crate::pages::{
    DownloadStatus, GenerationPage, GenerationState, Loadable, PreviewPage, Selectable, SelectionPage,
    UploadPage,
};
use crate::project::{Project, Route};

const UPLOAD_FAILED: &str = "Failed to upload file";
const SNIPPETS_FAILED: &str = "Failed to load snippets";
const PRACTICES_FAILED: &str = "Failed to load practices";
const COMPOSE_FAILED: &str = "Failed to compose prompt";
const GENERATE_FAILED: &str = "Failed to generate code";
const DOWNLOAD_FAILED: &str = "Failed to download project";

/// Main application state.
pub struct App {
    pub route: Route,
    pub project: Project,
    pub config: Config,
    /// Path to the global configuration file (theme is saved there).
    pub config_path: PathBuf,
    pub theme: Theme,
    pub upload: UploadPage,
    pub snippets: SelectionPage<Snippet>,
    pub practices: SelectionPage<Practice>,
    pub preview: PreviewPage,
    pub generation: GenerationPage,
    /// Requests waiting to be spawned by the event loop.
    outbox: Vec<(u64, ApiRequest)>,
    /// Ticket of the request whose answer the current screen is waiting for.
    in_flight: Option<u64>,
    next_ticket: u64,
    /// Result of the start-up health probe, `None` until it answers.
    pub api_online: Option<bool>,
    pub api_url: String,
    /// Session ID for this run.
    pub session_id: Option<String>,
    /// Directory where logs are written.
    pub log_directory: Option<PathBuf>,
    pub logging_error: Option<String>,
    /// Why the config file could not be used, when defaults are in effect.
    pub config_error: Option<String>,
    /// Transient footer message (e.g. a failed theme save).
    pub notice: Option<String>,
    /// Frame counter for animations.
    pub frame_count: u64,
    /// Height of the screen body from the last draw, for paging.
    pub body_height: u16,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        initial_file: Option<String>,
        session_id: Option<String>,
        log_directory: Option<PathBuf>,
        logging_error: Option<String>,
    ) -> Self {
        let theme = config.ui.theme;
        let api_url = config.server.base_url.clone();
        Self {
            route: Route::Home,
            project: Project::default(),
            config,
            config_path,
            theme,
            upload: UploadPage::new(initial_file.as_deref().unwrap_or("")),
            snippets: SelectionPage::default(),
            practices: SelectionPage::default(),
            preview: PreviewPage::default(),
            generation: GenerationPage::default(),
            outbox: Vec::new(),
            in_flight: None,
            next_ticket: 1,
            api_online: None,
            api_url,
            session_id,
            log_directory,
            logging_error,
            config_error: None,
            notice: None,
            frame_count: 0,
            body_height: 0,
            should_quit: false,
        }
    }

    fn enqueue(&mut self, request: ApiRequest) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        debug!(ticket, request = request.name(), "request_queued");
        self.outbox.push((ticket, request));
        ticket
    }

    /// Queue a request the current screen waits on. Supersedes any earlier one.
    fn submit(&mut self, request: ApiRequest) {
        let ticket = self.enqueue(request);
        self.in_flight = Some(ticket);
    }

    /// Queue the health probe. Its answer is accepted whenever it arrives.
    pub fn probe_health(&mut self) {
        self.enqueue(ApiRequest::Health);
    }

    /// Drain queued requests for the event loop to spawn.
    pub fn take_requests(&mut self) -> Vec<(u64, ApiRequest)> {
        std::mem::take(&mut self.outbox)
    }

    /// Navigate to `target`, applying route guards, and run its entry action.
    pub fn navigate(&mut self, target: Route) {
        let landed = target.guard(&self.project);
        if landed != target {
            info!(requested = %target, redirected = %landed, "route_guard_redirect");
        }
        self.in_flight = None;
        self.route = landed;
        info!(route = %landed, "route_entered");
        self.enter();
    }

    fn enter(&mut self) {
        match self.route {
            Route::Home => {}
            Route::Upload => {
                let typed = self.upload.input.value().to_string();
                self.upload = UploadPage::new(&typed);
            }
            Route::Snippets => {
                self.snippets = SelectionPage::new(self.project.selected_snippets.clone());
                self.submit(ApiRequest::ListSnippets);
            }
            Route::Practices => {
                self.practices = SelectionPage::new(self.project.selected_practices.clone());
                self.submit(ApiRequest::ListPractices);
            }
            Route::Preview => {
                self.preview = PreviewPage::default();
                self.compose_prompt();
            }
            Route::Generation => {
                self.generation = GenerationPage::default();
                self.submit(ApiRequest::GenerateCode {
                    prompt: self.project.prompt.clone(),
                });
            }
        }
    }

    fn compose_prompt(&mut self) {
        let Some(document_id) = self.project.document_id.clone() else {
            return;
        };
        self.submit(ApiRequest::ComposePrompt(ComposePromptRequest {
            document_id,
            snippet_ids: self.project.selected_snippets.clone(),
            practice_ids: self.project.selected_practices.clone(),
        }));
    }

    /// Reset the project and return to the landing screen.
    pub fn go_home(&mut self) {
        info!("project_reset");
        self.project.reset();
        self.upload = UploadPage::default();
        self.navigate(Route::Home);
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
        self.config.ui.theme = self.theme;
        info!(theme = self.theme.label(), "theme_toggled");
        match save_theme(self.theme, &self.config_path) {
            Ok(()) => self.notice = None,
            Err(e) => {
                warn!(error = %e, "theme_save_failed");
                self.notice = Some(e.to_string());
            }
        }
    }

    /// Periodic housekeeping: animation frame and the upload auto-advance.
    pub fn tick(&mut self, now: Instant) {
        self.frame_count = self.frame_count.wrapping_add(1);
        if self.route == Route::Upload && self.upload.ready_to_advance(self.config.redirect_delay(), now) {
            self.navigate(Route::Snippets);
        }
    }

    /// Apply a backend answer. Answers for superseded requests are dropped.
    pub fn handle_response(&mut self, message: ApiMessage) {
        let ApiMessage { ticket, response } = message;

        if let ApiResponse::Health(online) = response {
            info!(online, url = %self.api_url, "api_health");
            self.api_online = Some(online);
            return;
        }

        if self.in_flight != Some(ticket) {
            debug!(ticket, in_flight = ?self.in_flight, "stale_response_dropped");
            return;
        }
        self.in_flight = None;

        match response {
            ApiResponse::Health(_) => {}
            ApiResponse::Uploaded(result) => {
                let result = result.map_err(|e| {
                    warn!(error = %e, "upload_failed");
                    e.detail_or(UPLOAD_FAILED)
                });
                if let Ok(uploaded) = &result {
                    let filename = uploaded.filename.clone().unwrap_or_else(|| {
                        self.upload
                            .selected
                            .as_ref()
                            .map(|f| f.name.clone())
                            .unwrap_or_default()
                    });
                    self.project.set_document(uploaded.document_id.clone(), filename);
                }
                self.upload.finish_upload(result, Instant::now());
            }
            ApiResponse::Snippets(result) => match result {
                Ok(items) => self.snippets.set_items(items),
                Err(e) => {
                    warn!(error = %e, "snippets_load_failed");
                    self.snippets.fail(e.detail_or(SNIPPETS_FAILED));
                }
            },
            ApiResponse::Practices(result) => match result {
                Ok(items) => self.practices.set_items(items),
                Err(e) => {
                    warn!(error = %e, "practices_load_failed");
                    self.practices.fail(e.detail_or(PRACTICES_FAILED));
                }
            },
            ApiResponse::Prompt(result) => match result {
                Ok(prompt) => self.preview.prompt = Loadable::Ready(prompt),
                Err(e) => {
                    warn!(error = %e, "compose_prompt_failed");
                    self.preview.prompt = Loadable::Failed(e.detail_or(COMPOSE_FAILED));
                }
            },
            ApiResponse::Generated(result) => match result {
                Ok(generated) => {
                    self.generation
                        .finish(&generated, &self.config.generation.instructions_marker);
                    self.project.set_generated(generated);
                }
                Err(e) => {
                    warn!(error = %e, "generate_code_failed");
                    self.generation.fail(e.detail_or(GENERATE_FAILED));
                }
            },
            ApiResponse::Downloaded(result) => {
                self.generation.download = Some(match result {
                    Ok(path) => DownloadStatus::Saved(path),
                    Err(e) => {
                        warn!(error = %e, "download_failed");
                        DownloadStatus::Failed(e.detail_or(DOWNLOAD_FAILED))
                    }
                });
            }
        }
    }

    /// True while keystrokes go into a text field rather than to shortcuts.
    pub fn is_text_entry(&self) -> bool {
        match self.route {
            Route::Upload => {
                self.upload.selected.is_none()
                    && !self.upload.uploading
                    && self.upload.completed.is_none()
            }
            Route::Preview => self.preview.is_editing(),
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('t') if ctrl => {
                self.toggle_theme();
                return;
            }
            _ => {}
        }

        if !self.is_text_entry() && !ctrl {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('h') => {
                    self.go_home();
                    return;
                }
                KeyCode::Char('t') => {
                    self.toggle_theme();
                    return;
                }
                _ => {}
            }
        }

        match self.route {
            Route::Home => {
                if key.code == KeyCode::Enter {
                    self.navigate(Route::Upload);
                }
            }
            Route::Upload => self.handle_upload_key(key),
            Route::Snippets => self.handle_snippets_key(key),
            Route::Practices => self.handle_practices_key(key),
            Route::Preview => self.handle_preview_key(key),
            Route::Generation => self.handle_generation_key(key),
        }
    }

    /// Pasted text goes to whichever text field is active.
    pub fn handle_paste(&mut self, text: &str) {
        if !self.is_text_entry() {
            return;
        }
        match self.route {
            Route::Upload => self.upload.input.insert_str(text),
            Route::Preview => {
                if let Some(editor) = self.preview.editor.as_mut() {
                    for c in text.chars().filter(|c| *c != '\r') {
                        editor.insert_char(c);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        match self.route {
            Route::Snippets => self.snippets.scroll_details_up(amount),
            Route::Practices => self.practices.scroll_details_up(amount),
            Route::Preview if !self.preview.is_editing() => {
                self.preview.scroll = self.preview.scroll.saturating_sub(amount);
            }
            Route::Generation => self.generation.scroll_up(amount),
            _ => {}
        }
    }

    pub fn scroll_down(&mut self, amount: u16) {
        match self.route {
            Route::Snippets => self.snippets.scroll_details_down(amount),
            Route::Practices => self.practices.scroll_details_down(amount),
            Route::Preview if !self.preview.is_editing() => {
                self.preview.scroll = self.preview.scroll.saturating_add(amount);
            }
            Route::Generation => self.generation.scroll_down(amount),
            _ => {}
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        let page = &mut self.upload;
        if page.uploading {
            return;
        }
        if page.completed.is_some() {
            if key.code == KeyCode::Enter {
                self.navigate(Route::Snippets);
            }
            return;
        }
        if page.selected.is_some() {
            match key.code {
                KeyCode::Enter => {
                    if let Some(path) = page.start_upload() {
                        info!(path = ?path, "upload_started");
                        self.submit(ApiRequest::Upload { path });
                    }
                }
                KeyCode::Esc => page.clear_selection(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Enter => {
                if page.select_file() {
                    debug!(file = ?page.selected, "file_selected");
                }
            }
            KeyCode::Esc => self.navigate(Route::Home),
            KeyCode::Backspace => page.input.delete_char_before(),
            KeyCode::Delete => page.input.delete_char_at(),
            KeyCode::Left => page.input.cursor_left(),
            KeyCode::Right => page.input.cursor_right(),
            KeyCode::Home => page.input.cursor_home(),
            KeyCode::End => page.input.cursor_end(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                page.input.insert_char(c);
                page.error = None;
            }
            _ => {}
        }
    }

    fn handle_snippets_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') | KeyCode::Right => {
                if self.snippets.items.ready().is_some() {
                    let ids = self.snippets.selected_ids.clone();
                    info!(count = ids.len(), "snippets_committed");
                    self.project.set_selected_snippets(ids);
                    self.navigate(Route::Practices);
                }
            }
            KeyCode::Char('b') | KeyCode::Left => self.navigate(Route::Upload),
            KeyCode::Char('r') if self.snippets.items.is_failed() => {
                self.snippets.retry();
                self.submit(ApiRequest::ListSnippets);
            }
            _ => handle_selection_key(&mut self.snippets, key, self.body_height),
        }
    }

    fn handle_practices_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') | KeyCode::Right => {
                if self.practices.items.ready().is_some() {
                    let ids = self.practices.selected_ids.clone();
                    info!(count = ids.len(), "practices_committed");
                    self.project.set_selected_practices(ids);
                    self.navigate(Route::Preview);
                }
            }
            KeyCode::Char('b') | KeyCode::Left => self.navigate(Route::Snippets),
            KeyCode::Char('r') if self.practices.items.is_failed() => {
                self.practices.retry();
                self.submit(ApiRequest::ListPractices);
            }
            _ => handle_selection_key(&mut self.practices, key, self.body_height),
        }
    }

    fn handle_preview_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let page_size = self.body_height.max(1);

        if let Some(editor) = self.preview.editor.as_mut() {
            match key.code {
                KeyCode::Char('s') if ctrl => {
                    self.preview.save_edit();
                    debug!("prompt_edit_saved");
                }
                KeyCode::Esc => self.preview.cancel_edit(),
                KeyCode::Enter => editor.insert_newline(),
                KeyCode::Tab => {
                    for _ in 0..4 {
                        editor.insert_char(' ');
                    }
                }
                KeyCode::Backspace => editor.delete_char_before(),
                KeyCode::Delete => editor.delete_char_at(),
                KeyCode::Left => editor.cursor_left(),
                KeyCode::Right => editor.cursor_right(),
                KeyCode::Up => editor.cursor_up(),
                KeyCode::Down => editor.cursor_down(),
                KeyCode::Home => editor.cursor_home(),
                KeyCode::End => editor.cursor_end(),
                KeyCode::Char(c) if !ctrl => editor.insert_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('e') => self.preview.start_edit(),
            KeyCode::Char('g') | KeyCode::Enter => {
                if let Some(prompt) = self.preview.final_prompt() {
                    let prompt = prompt.to_string();
                    info!(prompt_len = prompt.len(), "prompt_accepted");
                    self.project.set_prompt(prompt);
                    self.navigate(Route::Generation);
                }
            }
            KeyCode::Char('b') | KeyCode::Left => self.navigate(Route::Practices),
            KeyCode::Char('r') if self.preview.prompt.is_failed() => {
                self.preview.prompt = Loadable::Loading;
                self.compose_prompt();
            }
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(1),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(1),
            KeyCode::Char('u') if ctrl => self.scroll_up(page_size / 2),
            KeyCode::Char('d') if ctrl => self.scroll_down(page_size / 2),
            KeyCode::PageUp => self.scroll_up(page_size),
            KeyCode::PageDown => self.scroll_down(page_size),
            _ => {}
        }
    }

    fn handle_generation_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let page_size = self.body_height.max(1);

        match self.generation.state {
            GenerationState::Generating => {}
            GenerationState::Failed(_) => match key.code {
                KeyCode::Char('r') => {
                    self.generation.retry();
                    self.submit(ApiRequest::GenerateCode {
                        prompt: self.project.prompt.clone(),
                    });
                }
                KeyCode::Char('b') | KeyCode::Left => self.navigate(Route::Preview),
                KeyCode::Char('n') => self.go_home(),
                _ => {}
            },
            GenerationState::Done => match key.code {
                KeyCode::Char('k') | KeyCode::Up => self.generation.select_prev(),
                KeyCode::Char('j') | KeyCode::Down => {
                    let count = self.result_item_count();
                    self.generation.select_next(count);
                }
                KeyCode::Char('u') if ctrl => self.scroll_up(page_size / 2),
                KeyCode::Char('d') if ctrl => self.scroll_down(page_size / 2),
                KeyCode::PageUp => self.scroll_up(page_size),
                KeyCode::PageDown => self.scroll_down(page_size),
                KeyCode::Tab => {
                    let raw_mode = self
                        .project
                        .generated
                        .as_ref()
                        .is_some_and(|g| !g.has_files());
                    self.generation.toggle_focus(raw_mode);
                }
                KeyCode::Char('d') => self.start_download(),
                KeyCode::Char('w') => self.save_code_block(),
                KeyCode::Char('b') | KeyCode::Left => self.navigate(Route::Preview),
                KeyCode::Char('n') => self.go_home(),
                _ => {}
            },
        }
    }

    /// Files in files mode, code blocks in raw mode.
    fn result_item_count(&self) -> usize {
        match &self.project.generated {
            Some(generated) if generated.has_files() => generated.files.len(),
            Some(_) => self.generation.code_blocks.len(),
            None => 0,
        }
    }

    fn start_download(&mut self) {
        if self.generation.download == Some(DownloadStatus::InProgress) {
            return;
        }
        let Some(generated) = self.project.generated.as_ref() else {
            return;
        };
        let request = ApiRequest::Download {
            download_url: generated.download_url.clone(),
            project_id: generated.project_id.clone(),
            directory: self.config.download_dir(),
        };
        info!(project_id = %generated.project_id, "download_started");
        self.generation.download = Some(DownloadStatus::InProgress);
        self.submit(request);
    }

    fn save_code_block(&mut self) {
        let Some(generated) = self.project.generated.as_ref() else {
            return;
        };
        if generated.has_files() {
            return;
        }
        let result = self
            .generation
            .save_selected_block(&generated.project_id, &self.config.download_dir());
        let notice = match result {
            Ok(path) => {
                info!(path = ?path, "code_block_saved");
                Ok(path)
            }
            Err(e) => {
                warn!(error = %e, "code_block_save_failed");
                Err(e.to_string())
            }
        };
        self.generation.notice = Some(notice);
    }
}

/// List movement, toggling and paging through the details pane.
fn handle_selection_key<T: Selectable>(page: &mut SelectionPage<T>, key: KeyEvent, body_height: u16) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page_size = body_height.max(1);
    match key.code {
        KeyCode::Char('u') if ctrl => page.scroll_details_up(page_size / 2),
        KeyCode::Char('d') if ctrl => page.scroll_details_down(page_size / 2),
        KeyCode::PageUp => page.scroll_details_up(page_size),
        KeyCode::PageDown => page.scroll_details_down(page_size),
        KeyCode::Char('k') | KeyCode::Up => page.cursor_up(),
        KeyCode::Char('j') | KeyCode::Down => page.cursor_down(),
        KeyCode::Char(' ') => page.toggle_current(),
        KeyCode::Enter => page.toggle_expanded(),
        _ => {}
    }
}
