//! Per-screen state.
//!
//! Screens never touch the network. They hold what is on screen and expose
//! small state transitions that `App` drives from key presses and responses.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::api::{GeneratedProject, Practice, Snippet, UploadResponse};
use crate::config::Config;
use crate::markdown::{CodeBlock, InstructionLine, extract_code_blocks, extract_instructions};
use crate::project::toggle_selection;
use crate::text_input::{TextArea, TextInput};
use crate::validators::validate_upload_path;

/// Data fetched on screen entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Loadable<T> {
    #[default]
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Loadable::Failed(_))
    }
}

/// A document chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl SelectedFile {
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.size as f64 / 1024.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadPage {
    pub input: TextInput,
    pub selected: Option<SelectedFile>,
    pub uploading: bool,
    /// When the upload finished and what the server said about the document.
    pub completed: Option<(Instant, UploadResponse)>,
    pub error: Option<String>,
}

impl UploadPage {
    pub fn new(initial_path: &str) -> Self {
        Self {
            input: TextInput::new(initial_path),
            ..Self::default()
        }
    }

    /// Validate the typed path and select it. Returns whether a file is now selected.
    pub fn select_file(&mut self) -> bool {
        let raw = self.input.value().trim().to_string();
        if let Some(message) = validate_upload_path(&raw) {
            self.error = Some(message);
            return false;
        }

        let path = Config::expand_tilde(&raw);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.clone());

        self.selected = Some(SelectedFile { path, name, size });
        self.error = None;
        true
    }

    /// "Change file": drop the selection but keep the typed path for editing.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.error = None;
    }

    pub fn start_upload(&mut self) -> Option<PathBuf> {
        if self.uploading || self.completed.is_some() {
            return None;
        }
        let path = self.selected.as_ref()?.path.clone();
        self.uploading = true;
        self.error = None;
        Some(path)
    }

    pub fn finish_upload(&mut self, result: Result<UploadResponse, String>, now: Instant) {
        self.uploading = false;
        match result {
            Ok(response) => self.completed = Some((now, response)),
            Err(message) => self.error = Some(message),
        }
    }

    /// True once the success panel has been shown for `delay`.
    pub fn ready_to_advance(&self, delay: Duration, now: Instant) -> bool {
        self.completed
            .as_ref()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) >= delay)
    }
}

/// Something the user can opt into on a selection screen.
pub trait Selectable {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    /// Short line shown under the title.
    fn summary(&self) -> &str;
    fn content(&self) -> &str;
}

impl Selectable for Snippet {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn summary(&self) -> &str {
        &self.description
    }

    fn content(&self) -> &str {
        &self.content
    }
}

impl Selectable for Practice {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn summary(&self) -> &str {
        &self.excerpt
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Snippets and practices screens.
#[derive(Debug, Clone)]
pub struct SelectionPage<T> {
    pub items: Loadable<Vec<T>>,
    /// Working copy; only written to the project on "next".
    pub selected_ids: Vec<String>,
    pub cursor: usize,
    /// Whether the full content of the item under the cursor is shown.
    pub expanded: bool,
    /// First visible row of the details pane.
    pub detail_scroll: u16,
}

impl<T> Default for SelectionPage<T> {
    fn default() -> Self {
        Self {
            items: Loadable::Loading,
            selected_ids: Vec::new(),
            cursor: 0,
            expanded: false,
            detail_scroll: 0,
        }
    }
}

impl<T: Selectable> SelectionPage<T> {
    pub fn new(selected_ids: Vec<String>) -> Self {
        Self {
            selected_ids,
            ..Self::default()
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.cursor = self.cursor.min(items.len().saturating_sub(1));
        self.items = Loadable::Ready(items);
    }

    pub fn fail(&mut self, message: String) {
        self.items = Loadable::Failed(message);
    }

    pub fn retry(&mut self) {
        self.items = Loadable::Loading;
    }

    pub fn items(&self) -> &[T] {
        self.items.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current(&self) -> Option<&T> {
        self.items().get(self.cursor)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.iter().any(|s| s == id)
    }

    pub fn toggle_current(&mut self) {
        let Some(id) = self.current().map(|item| item.id().to_string()) else {
            return;
        };
        toggle_selection(&mut self.selected_ids, &id);
    }

    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.expanded = false;
            self.detail_scroll = 0;
        }
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.items().len() {
            self.cursor += 1;
            self.expanded = false;
            self.detail_scroll = 0;
        }
    }

    pub fn toggle_expanded(&mut self) {
        if self.current().is_some() {
            self.expanded = !self.expanded;
            self.detail_scroll = 0;
        }
    }

    pub fn scroll_details_up(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_sub(amount);
    }

    pub fn scroll_details_down(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_add(amount);
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreviewPage {
    pub prompt: Loadable<String>,
    /// Present while editing.
    pub editor: Option<TextArea>,
    pub scroll: u16,
    pub editor_scroll: usize,
}

impl PreviewPage {
    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn start_edit(&mut self) {
        if let Some(prompt) = self.prompt.ready() {
            self.editor = Some(TextArea::from_text(prompt));
            self.editor_scroll = 0;
        }
    }

    pub fn save_edit(&mut self) {
        if let Some(editor) = self.editor.take() {
            self.prompt = Loadable::Ready(editor.text());
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    /// Prompt to generate from; `None` while loading, failed or editing.
    pub fn final_prompt(&self) -> Option<&str> {
        if self.is_editing() {
            return None;
        }
        self.prompt.ready().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Generating,
    Failed(String),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    InProgress,
    Saved(PathBuf),
    Failed(String),
}

/// Pane that scroll keys move on the generation screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPane {
    #[default]
    Content,
    /// Raw mode only.
    Instructions,
}

/// Why a code block could not be written to disk.
#[derive(Debug, Error)]
pub enum SaveBlockError {
    #[error("no code block selected")]
    NothingSelected,

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct GenerationPage {
    pub state: GenerationState,
    /// Selected file (files mode) or code block (raw mode).
    pub selected: usize,
    pub content_scroll: u16,
    pub instructions_scroll: u16,
    pub focus: GenerationPane,
    pub download: Option<DownloadStatus>,
    /// Outcome of the last "save block" action.
    pub notice: Option<Result<PathBuf, String>>,
    pub code_blocks: Vec<CodeBlock>,
    pub instructions: Vec<InstructionLine>,
}

impl Default for GenerationPage {
    fn default() -> Self {
        Self {
            state: GenerationState::Generating,
            selected: 0,
            content_scroll: 0,
            instructions_scroll: 0,
            focus: GenerationPane::Content,
            download: None,
            notice: None,
            code_blocks: Vec::new(),
            instructions: Vec::new(),
        }
    }
}

impl GenerationPage {
    pub fn is_generating(&self) -> bool {
        self.state == GenerationState::Generating
    }

    pub fn retry(&mut self) {
        *self = Self::default();
    }

    pub fn fail(&mut self, message: String) {
        self.state = GenerationState::Failed(message);
    }

    /// Record a finished generation. Raw answers are scraped once here.
    pub fn finish(&mut self, generated: &GeneratedProject, instructions_marker: &str) {
        self.state = GenerationState::Done;
        self.selected = 0;
        self.content_scroll = 0;
        self.instructions_scroll = 0;
        self.focus = GenerationPane::Content;
        if generated.has_files() {
            self.code_blocks.clear();
            self.instructions.clear();
        } else {
            self.code_blocks = extract_code_blocks(generated.raw_text());
            self.instructions = extract_instructions(generated.raw_text(), instructions_marker);
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.content_scroll = 0;
        }
    }

    pub fn select_next(&mut self, count: usize) {
        if self.selected + 1 < count {
            self.selected += 1;
            self.content_scroll = 0;
        }
    }

    /// Switch scrolling between code and instructions. Files mode has one pane.
    pub fn toggle_focus(&mut self, raw_mode: bool) {
        self.focus = match self.focus {
            GenerationPane::Content if raw_mode => GenerationPane::Instructions,
            _ => GenerationPane::Content,
        };
    }

    fn focused_scroll(&mut self) -> &mut u16 {
        match self.focus {
            GenerationPane::Content => &mut self.content_scroll,
            GenerationPane::Instructions => &mut self.instructions_scroll,
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        let scroll = self.focused_scroll();
        *scroll = scroll.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let scroll = self.focused_scroll();
        *scroll = scroll.saturating_add(amount);
    }

    /// Write the selected code block to `directory`.
    pub fn save_selected_block(
        &self,
        project_id: &str,
        directory: &Path,
    ) -> Result<PathBuf, SaveBlockError> {
        let block = self
            .code_blocks
            .get(self.selected)
            .ok_or(SaveBlockError::NothingSelected)?;
        std::fs::create_dir_all(directory).map_err(|source| SaveBlockError::Io {
            action: "create",
            path: directory.to_path_buf(),
            source,
        })?;
        let target = directory.join(block_file_name(project_id, self.selected, &block.lang));
        std::fs::write(&target, &block.code).map_err(|source| SaveBlockError::Io {
            action: "write",
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

fn block_file_name(project_id: &str, index: usize, lang: &str) -> String {
    let safe_id: String = project_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_block_{}.{}", safe_id, index + 1, lang)
}
