//! UI rendering functions.

use std::path::Path;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::config::Theme;
use crate::pages::GenerationState;
use crate::project::{Project, Route, STEPS};
use crate::views::draw_body;

/// Braille spinner frames.
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub dim: Color,
    pub accent: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    /// Background of the row under the cursor.
    pub highlight: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Reset,
                fg: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                success: Color::Green,
                error: Color::Red,
                warning: Color::Yellow,
                highlight: Color::Rgb(40, 44, 52),
            },
            Theme::Light => Self {
                bg: Color::Rgb(250, 250, 250),
                fg: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                success: Color::Rgb(0, 128, 0),
                error: Color::Rgb(180, 0, 0),
                warning: Color::Rgb(160, 110, 0),
                highlight: Color::Rgb(220, 225, 235),
            },
        }
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn bold_accent(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Rounded bordered block in the theme colors.
    pub fn block<'a>(&self, title: impl Into<Line<'a>>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.accent))
            .style(self.text())
            .title(title)
    }
}

/// Current spinner glyph for the given frame.
pub fn spinner(frame_count: u64) -> &'static str {
    SPINNER[(frame_count % SPINNER.len() as u64) as usize]
}

/// Truncates a string to the given display width, appending "..." if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    // Replace newlines with spaces for single-line display
    let single_line: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

    if single_line.width() <= max_width {
        return single_line;
    }

    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in single_line.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Replace the home directory prefix with `~`.
pub fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Current,
    Pending,
}

/// State of every wizard step as seen from `route`.
pub fn step_states(route: Route, project: &Project) -> [StepState; 5] {
    let current = route.step_index();
    let mut states = [StepState::Pending; 5];
    for (i, step) in STEPS.iter().enumerate() {
        let done_by_position = current.is_some_and(|c| i < c);
        let done_by_result = *step == Route::Generation && project.generated.is_some();
        states[i] = if done_by_position || done_by_result {
            StepState::Completed
        } else if current == Some(i) {
            StepState::Current
        } else {
            StepState::Pending
        };
    }
    states
}

fn step_line(app: &App, palette: &Palette) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, (step, state)) in STEPS
        .iter()
        .zip(step_states(app.route, &app.project))
        .enumerate()
    {
        if i > 0 {
            spans.push(Span::styled(" ── ", palette.muted()));
        }
        let (marker, style) = match state {
            StepState::Completed => ("✓", Style::default().fg(palette.success)),
            StepState::Current => ("●", palette.bold_accent()),
            StepState::Pending => ("○", palette.muted()),
        };
        spans.push(Span::styled(format!("{} {}. {}", marker, i + 1, step.title()), style));
    }
    Line::from(spans).centered()
}

/// Key hints for the current screen.
pub fn shortcuts(app: &App) -> &'static str {
    match app.route {
        Route::Home => "[Enter] Start  [t] Theme  [q] Quit",
        Route::Upload => {
            if app.upload.uploading {
                "Uploading...  [Ctrl+C] Quit"
            } else if app.upload.completed.is_some() {
                "[Enter] Continue"
            } else if app.upload.selected.is_some() {
                "[Enter] Upload  [Esc] Change file  [h] Home  [q] Quit"
            } else {
                "[Enter] Select  [Esc] Back  [Ctrl+T] Theme  [Ctrl+C] Quit"
            }
        }
        Route::Snippets | Route::Practices => {
            "[↑↓] Move  [Space] Toggle  [Enter] Details  [PgUp/PgDn] Scroll  [n] Next  [b] Back  [h] Home  [q] Quit"
        }
        Route::Preview => {
            if app.preview.is_editing() {
                "[Ctrl+S] Save  [Esc] Cancel  [Ctrl+C] Quit"
            } else {
                "[e] Edit  [g] Generate  [↑↓] Scroll  [b] Back  [r] Retry  [h] Home  [q] Quit"
            }
        }
        Route::Generation => match app.generation.state {
            GenerationState::Generating => "Generating...  [q] Quit",
            GenerationState::Failed(_) => "[r] Retry  [b] Back  [n] New project  [q] Quit",
            GenerationState::Done => {
                if app.project.generated.as_ref().is_some_and(|g| g.has_files()) {
                    "[↑↓] File  [PgUp/PgDn] Scroll  [d] Download  [b] Back  [n] New project  [q] Quit"
                } else {
                    "[↑↓] Block  [Tab] Pane  [w] Save block  [d] Download  [b] Back  [n] New project  [q] Quit"
                }
            }
        },
    }
}

fn api_status(app: &App, palette: &Palette) -> (String, Color) {
    match app.api_online {
        None => (format!("API {} {}", spinner(app.frame_count), app.api_url), palette.dim),
        Some(true) => (format!("● API online  {}", app.api_url), palette.success),
        Some(false) => (format!("● API offline  {}", app.api_url), palette.error),
    }
}

/// Draw the main UI.
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    let palette = Palette::for_theme(app.theme);
    let area = f.area();
    f.render_widget(Block::default().style(palette.text()), area);

    let steps_height = if app.route.step_index().is_some() { 1 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Length(steps_height), // Step indicator
            Constraint::Min(0),               // Screen body
            Constraint::Length(3),            // Command panel
        ])
        .split(area);

    app.body_height = chunks[2].height.saturating_sub(2);

    // Header: product name (left), current screen and theme (right)
    let header_block = palette
        .block(Line::from(" PromptCodeGen ").left_aligned())
        .title(Line::from(format!(" {} · {} ", app.route.title(), app.theme.label())).right_aligned());
    let mut header_spans = vec![Span::styled(
        "Requirements in, code out",
        palette.muted(),
    )];
    if let Some(session_id) = &app.session_id {
        header_spans.push(Span::raw("    Session: "));
        header_spans.push(Span::styled(
            session_id.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(error) = &app.config_error {
        header_spans.push(Span::raw("    "));
        header_spans.push(Span::styled(
            format!("⚠ Config: {}", error),
            Style::default().fg(palette.warning),
        ));
    }
    if let Some(error) = &app.logging_error {
        header_spans.push(Span::raw("    "));
        header_spans.push(Span::styled(
            format!("⚠ {}", error),
            Style::default().fg(palette.warning),
        ));
    } else if let Some(log_dir) = &app.log_directory {
        header_spans.push(Span::raw("    Logs: "));
        header_spans.push(Span::styled(contract_path(log_dir), palette.muted()));
    }
    f.render_widget(Paragraph::new(Line::from(header_spans)).block(header_block), chunks[0]);

    if steps_height > 0 {
        f.render_widget(Paragraph::new(step_line(app, &palette)), chunks[1]);
    }

    draw_body(f, chunks[2], app, &palette);

    // Command panel with keyboard shortcuts (left) and API status (right)
    let (status_text, status_color) = match &app.notice {
        Some(notice) => (format!("⚠ {}", notice), palette.warning),
        None => api_status(app, &palette),
    };
    let hints = shortcuts(app);
    let inner_width = chunks[3].width.saturating_sub(2) as usize;
    let spacing = inner_width.saturating_sub(hints.width() + status_text.width());

    let command_line = Line::from(vec![
        Span::styled(hints, palette.muted()),
        Span::raw(" ".repeat(spacing)),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]);
    f.render_widget(Paragraph::new(command_line).block(palette.block("")), chunks[3]);
}
