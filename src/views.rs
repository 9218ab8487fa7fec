//! Screen renderers. Each draws into the body area between the step
//! indicator and the command panel.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};

use crate::app::App;
use crate::markdown::{Inline, InstructionLine, LineKind};
use crate::pages::{
    DownloadStatus, GenerationPane, GenerationState, Loadable, Selectable, SelectionPage,
};
use crate::project::Route;
use crate::text_input::{TextArea, TextInput};
use crate::ui::{Palette, centered_rect, contract_path, spinner, truncate_str};
use crate::validators::ALLOWED_EXTENSIONS;

/// Lines of the server's content preview shown after an upload.
const PREVIEW_LINES: usize = 6;

pub fn draw_body(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    match app.route {
        Route::Home => draw_home(f, area, palette),
        Route::Upload => draw_upload(f, area, app, palette),
        Route::Snippets => draw_selection(
            f,
            area,
            &mut app.snippets,
            "Snippets",
            "Prompt-engineering snippets to add to the prompt",
            app.frame_count,
            palette,
        ),
        Route::Practices => draw_selection(
            f,
            area,
            &mut app.practices,
            "Practices",
            "Best practices the generated code should follow",
            app.frame_count,
            palette,
        ),
        Route::Preview => draw_preview(f, area, app, palette),
        Route::Generation => draw_generation(f, area, app, palette),
    }
}

/// Largest useful scroll offset for `content_lines` in a viewport of `viewport` rows.
pub fn clamp_scroll(scroll: u16, content_lines: usize, viewport: u16) -> u16 {
    let max = content_lines.saturating_sub(viewport as usize);
    scroll.min(u16::try_from(max).unwrap_or(u16::MAX))
}

fn loading_line(label: &str, frame_count: u64, palette: &Palette) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} ", spinner(frame_count)), palette.bold_accent()),
        Span::raw(label.to_string()),
    ]))
    .alignment(Alignment::Center)
}

fn error_lines(message: &str, hint: &str, palette: &Palette) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            format!("✗ {}", message),
            Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(hint.to_string(), palette.muted())),
    ]
}

fn draw_home(f: &mut Frame, area: Rect, palette: &Palette) {
    let formats = ALLOWED_EXTENSIONS.join(", ");
    let lines = vec![
        Line::from(Span::styled("Turn a requirements document into a project", palette.bold_accent())),
        Line::from(""),
        Line::from("Upload a requirements document, enrich the prompt with snippets and"),
        Line::from("best practices, review it, and let the backend generate the code."),
        Line::from(""),
        Line::from(vec![
            Span::styled("1. Upload    ", palette.bold_accent()),
            Span::raw("send the document to be parsed"),
        ]),
        Line::from(vec![
            Span::styled("2. Configure ", palette.bold_accent()),
            Span::raw("pick snippets and practices, review the prompt"),
        ]),
        Line::from(vec![
            Span::styled("3. Generate  ", palette.bold_accent()),
            Span::raw("browse the generated files and download the zip"),
        ]),
        Line::from(""),
        Line::from(Span::styled(format!("Supported formats: {}", formats), palette.muted())),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to start",
            Style::default().fg(palette.success).add_modifier(Modifier::BOLD),
        )),
    ];
    let height = lines.len() as u16 + 2;
    let panel = centered_rect(76, height, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(palette.block(" Welcome ")),
        panel,
    );
}

/// Spans for a single-line input with a block cursor.
fn input_line(input: &TextInput, focused: bool, palette: &Palette) -> Line<'static> {
    if !focused {
        return Line::from(Span::raw(input.value().to_string()));
    }
    let (before, at, after) = input.split_at_cursor();
    Line::from(vec![
        Span::raw(before.to_string()),
        Span::styled(at, Style::default().fg(palette.bg).bg(palette.fg)),
        Span::raw(after.to_string()),
    ])
}

fn draw_upload(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let focused = app.is_text_entry();
    let page = &app.upload;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input_block = palette.block(" Document path ").title_bottom(
        Line::from(format!(" {} ", ALLOWED_EXTENSIONS.join(" "))).right_aligned(),
    );
    f.render_widget(
        Paragraph::new(input_line(&page.input, focused, palette)).block(input_block),
        chunks[0],
    );

    let mut lines: Vec<Line> = Vec::new();
    if let Some((_, uploaded)) = &page.completed {
        lines.push(Line::from(Span::styled(
            "✓ Upload complete",
            Style::default().fg(palette.success).add_modifier(Modifier::BOLD),
        )));
        let name = uploaded
            .filename
            .clone()
            .or_else(|| page.selected.as_ref().map(|s| s.name.clone()))
            .unwrap_or_default();
        lines.push(Line::from(format!("File: {}", name)));
        lines.push(Line::from(format!("Document: {}", uploaded.document_id)));
        if let Some(length) = uploaded.content_length {
            lines.push(Line::from(format!("Extracted: {} characters", length)));
        }
        if let Some(preview) = uploaded.content_preview.as_deref().filter(|p| !p.is_empty()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Content preview", palette.bold_accent())));
            for line in preview.lines().take(PREVIEW_LINES) {
                lines.push(Line::from(Span::styled(line.to_string(), palette.muted())));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} Continuing to snippets... [Enter] to skip", spinner(app.frame_count)),
            palette.muted(),
        )));
    } else if page.uploading {
        let name = page.selected.as_ref().map(|s| s.name.as_str()).unwrap_or("");
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", spinner(app.frame_count)), palette.bold_accent()),
            Span::raw(format!("Uploading {}...", name)),
        ]));
    } else if let Some(selected) = &page.selected {
        lines.push(Line::from(vec![
            Span::styled("Selected: ", palette.bold_accent()),
            Span::raw(selected.name.clone()),
            Span::styled(format!("  ({})", selected.size_label()), palette.muted()),
        ]));
        lines.push(Line::from(Span::styled(contract_path(&selected.path), palette.muted())));
        lines.push(Line::from(""));
        lines.push(Line::from("[Enter] Upload  [Esc] Change file"));
    } else {
        lines.push(Line::from("Type the path of your requirements document and press Enter."));
        lines.push(Line::from(Span::styled(
            format!("Accepted: {}", ALLOWED_EXTENSIONS.join(", ")),
            palette.muted(),
        )));
    }

    if let Some(error) = &page.error {
        lines.push(Line::from(""));
        lines.extend(error_lines(
            error,
            if page.selected.is_some() {
                "[Enter] Try again"
            } else {
                "Fix the path and press Enter"
            },
            palette,
        ));
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(palette.block(" Upload ")),
        chunks[1],
    );
}

fn draw_selection<T: Selectable>(
    f: &mut Frame,
    area: Rect,
    page: &mut SelectionPage<T>,
    title: &str,
    subtitle: &str,
    frame_count: u64,
    palette: &Palette,
) {
    let items = match &page.items {
        Loadable::Loading => {
            let block = palette.block(format!(" {} ", title));
            let inner = block.inner(area);
            f.render_widget(block, area);
            let label = format!("Loading {}...", title.to_lowercase());
            f.render_widget(loading_line(&label, frame_count, palette), centered_rect(inner.width, 1, inner));
            return;
        }
        Loadable::Failed(message) => {
            f.render_widget(
                Paragraph::new(error_lines(message, "[r] Retry  [b] Back", palette))
                    .block(palette.block(format!(" {} ", title))),
                area,
            );
            return;
        }
        Loadable::Ready(items) => items,
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let list_block = palette
        .block(format!(" {} ", title))
        .title_bottom(Line::from(format!(" {} selected ", page.selected_ids.len())).right_aligned());

    if items.is_empty() {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(subtitle.to_string(), palette.muted())),
                Line::from(""),
                Line::from("Nothing available. [n] continues without a selection."),
            ])
            .block(list_block),
            chunks[0],
        );
        return;
    }

    let width = chunks[0].width.saturating_sub(4) as usize;
    let list_items: Vec<ListItem> = items
        .iter()
        .map(|item| {
            let checked = page.is_selected(item.id());
            let (mark, style) = if checked {
                ("[x] ", Style::default().fg(palette.success).add_modifier(Modifier::BOLD))
            } else {
                ("[ ] ", Style::default().fg(palette.fg))
            };
            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(mark, style),
                    Span::styled(item.title().to_string(), style),
                ]),
                Line::from(Span::styled(
                    format!("    {}", truncate_str(item.summary(), width.saturating_sub(4))),
                    palette.muted(),
                )),
            ]))
        })
        .collect();

    let list = List::new(list_items)
        .block(list_block)
        .highlight_style(Style::default().bg(palette.highlight));
    let mut state = ListState::default().with_selected(Some(page.cursor));
    f.render_stateful_widget(list, chunks[0], &mut state);

    let mut detail: Vec<Line> = Vec::new();
    if let Some(item) = page.current() {
        detail.push(Line::from(Span::styled(item.title().to_string(), palette.bold_accent())));
        detail.push(Line::from(Span::styled(item.id().to_string(), palette.muted())));
        detail.push(Line::from(""));
        detail.push(Line::from(item.summary().to_string()));
        detail.push(Line::from(""));
        if page.expanded {
            detail.extend(item.content().lines().map(|l| Line::from(l.to_string())));
        } else {
            detail.push(Line::from(Span::styled("[Enter] Show full content", palette.muted())));
        }
    }
    let block = palette.block(" Details ");
    let inner = block.inner(chunks[1]);
    let paragraph = Paragraph::new(detail).wrap(Wrap { trim: false });
    page.detail_scroll = clamp_scroll(page.detail_scroll, paragraph.line_count(inner.width), inner.height);
    f.render_widget(paragraph.block(block).scroll((page.detail_scroll, 0)), chunks[1]);
}

/// "N selected" or "None selected".
pub fn selection_summary(count: usize) -> String {
    if count == 0 {
        "None selected".to_string()
    } else {
        format!("{} selected", count)
    }
}

/// Editor lines between `scroll` and `scroll + height`, with the cursor drawn.
fn editor_lines(editor: &TextArea, scroll: usize, height: usize, palette: &Palette) -> Vec<Line<'static>> {
    let (cursor_row, cursor_col) = editor.cursor();
    editor
        .lines()
        .iter()
        .enumerate()
        .skip(scroll)
        .take(height)
        .map(|(row, line)| {
            if row != cursor_row {
                return Line::from(line.clone());
            }
            let mut input = TextInput::new(line.clone());
            input.cursor_home();
            for _ in 0..cursor_col {
                input.cursor_right();
            }
            input_line(&input, true, palette)
        })
        .collect()
}

fn draw_preview(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let document = app
        .project
        .filename
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Uploaded document".to_string());
    let summary = vec![
        Line::from(vec![Span::styled("Document:  ", palette.bold_accent()), Span::raw(document)]),
        Line::from(vec![
            Span::styled("Snippets:  ", palette.bold_accent()),
            Span::raw(selection_summary(app.project.selected_snippets.len())),
        ]),
        Line::from(vec![
            Span::styled("Practices: ", palette.bold_accent()),
            Span::raw(selection_summary(app.project.selected_practices.len())),
        ]),
    ];
    f.render_widget(Paragraph::new(summary).block(palette.block(" Summary ")), chunks[0]);

    let frame_count = app.frame_count;
    let page = &mut app.preview;
    match &page.prompt {
        Loadable::Loading => {
            let block = palette.block(" Prompt ");
            let inner = block.inner(chunks[1]);
            f.render_widget(block, chunks[1]);
            f.render_widget(
                loading_line("Composing prompt...", frame_count, palette),
                centered_rect(inner.width, 1, inner),
            );
        }
        Loadable::Failed(message) => {
            f.render_widget(
                Paragraph::new(error_lines(message, "[r] Retry  [b] Back", palette))
                    .block(palette.block(" Prompt ")),
                chunks[1],
            );
        }
        Loadable::Ready(prompt) => {
            if let Some(editor) = &page.editor {
                let block = palette
                    .block(" Prompt (editing) ")
                    .border_style(Style::default().fg(palette.warning));
                let height = block.inner(chunks[1]).height as usize;
                page.editor_scroll = editor.scroll_for(height, page.editor_scroll);
                let lines = editor_lines(editor, page.editor_scroll, height, palette);
                f.render_widget(Paragraph::new(lines).block(block), chunks[1]);
            } else {
                let block = palette
                    .block(" Prompt ")
                    .title_bottom(Line::from(format!(" {} chars ", prompt.chars().count())).right_aligned());
                let inner = block.inner(chunks[1]);
                let paragraph = Paragraph::new(prompt.clone()).wrap(Wrap { trim: false });
                let total = paragraph.line_count(inner.width);
                page.scroll = clamp_scroll(page.scroll, total, inner.height);
                f.render_widget(paragraph.block(block).scroll((page.scroll, 0)), chunks[1]);
            }
        }
    }
}

fn styled_spans(spans: &[Inline], base: Style) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|span| match span {
            Inline::Plain(text) => Span::styled(text.clone(), base),
            Inline::Strong(text) => Span::styled(text.clone(), base.add_modifier(Modifier::BOLD)),
            Inline::Emphasis(text) => Span::styled(text.clone(), base.add_modifier(Modifier::ITALIC)),
        })
        .collect()
}

/// Formatted instruction prose.
pub fn instruction_lines(lines: &[InstructionLine], palette: &Palette) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for line in lines {
        match line.kind {
            LineKind::Heading => {
                if !out.is_empty() {
                    out.push(Line::from(""));
                }
                let style = palette.bold_accent().add_modifier(Modifier::UNDERLINED);
                out.push(Line::from(styled_spans(&line.spans, style)));
            }
            LineKind::Subheading => {
                out.push(Line::from(styled_spans(&line.spans, palette.bold_accent())));
            }
            LineKind::ListItem => {
                let mut spans = vec![Span::styled("  • ", Style::default().fg(palette.accent))];
                spans.extend(styled_spans(&line.spans, Style::default().fg(palette.fg)));
                out.push(Line::from(spans));
            }
            LineKind::Paragraph => {
                out.push(Line::from(styled_spans(&line.spans, Style::default().fg(palette.fg))));
            }
        }
    }
    out
}

fn status_line(app: &App, project_id: &str, palette: &Palette) -> Line<'static> {
    let mut spans = vec![
        Span::styled("Project ", palette.muted()),
        Span::styled(project_id.to_string(), palette.bold_accent()),
        Span::raw("   "),
    ];
    match &app.generation.download {
        None => {}
        Some(DownloadStatus::InProgress) => spans.push(Span::styled(
            format!("{} Downloading...", spinner(app.frame_count)),
            palette.muted(),
        )),
        Some(DownloadStatus::Saved(path)) => spans.push(Span::styled(
            format!("✓ Saved {}", contract_path(path)),
            Style::default().fg(palette.success),
        )),
        Some(DownloadStatus::Failed(message)) => spans.push(Span::styled(
            format!("✗ {}", message),
            Style::default().fg(palette.error),
        )),
    }
    match &app.generation.notice {
        None => {}
        Some(Ok(path)) => spans.push(Span::styled(
            format!("   ✓ Block written to {}", contract_path(path)),
            Style::default().fg(palette.success),
        )),
        Some(Err(message)) => spans.push(Span::styled(
            format!("   ✗ {}", message),
            Style::default().fg(palette.error),
        )),
    }
    Line::from(spans)
}

/// Rows for the code block list: one per block plus borders, at most 8.
fn code_list_height(blocks: usize) -> u16 {
    u16::try_from(blocks)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(8)
}

fn draw_generation(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    match &app.generation.state {
        GenerationState::Generating => {
            let block = palette.block(" Generation ");
            let inner = block.inner(area);
            f.render_widget(block, area);
            let centre = centered_rect(inner.width, 3, inner);
            f.render_widget(
                Paragraph::new(vec![
                    Line::from(vec![
                        Span::styled(format!("{} ", spinner(app.frame_count)), palette.bold_accent()),
                        Span::raw("Generating code..."),
                    ]),
                    Line::from(""),
                    Line::from(Span::styled("This can take a few minutes.", palette.muted())),
                ])
                .alignment(Alignment::Center),
                centre,
            );
            return;
        }
        GenerationState::Failed(message) => {
            f.render_widget(
                Paragraph::new(error_lines(message, "[r] Retry  [b] Back  [n] New project", palette))
                    .block(palette.block(" Generation ")),
                area,
            );
            return;
        }
        GenerationState::Done => {}
    }

    let Some(generated) = app.project.generated.clone() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    f.render_widget(Paragraph::new(status_line(app, &generated.project_id, palette)), rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    let page = &mut app.generation;
    if generated.has_files() {
        let items: Vec<ListItem> = generated
            .files
            .iter()
            .map(|file| ListItem::new(Line::from(format!("📄 {}", file.path))))
            .collect();
        let list = List::new(items)
            .block(palette.block(format!(" Files ({}) ", generated.files.len())))
            .highlight_style(Style::default().bg(palette.highlight).add_modifier(Modifier::BOLD));
        let mut state = ListState::default().with_selected(Some(page.selected));
        f.render_stateful_widget(list, columns[0], &mut state);

        let Some(file) = generated.files.get(page.selected) else {
            return;
        };
        let block = palette.block(format!(" {} ", file.path));
        let viewport = block.inner(columns[1]).height;
        page.content_scroll = clamp_scroll(page.content_scroll, file.content.lines().count(), viewport);
        f.render_widget(
            Paragraph::new(file.content.clone())
                .block(block)
                .scroll((page.content_scroll, 0)),
            columns[1],
        );
        return;
    }

    // Raw answer: scraped code blocks on the left, instructions on the right.
    if page.code_blocks.is_empty() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled("No code blocks found in the answer.", palette.muted())))
                .block(palette.block(" Code ")),
            columns[0],
        );
    } else {
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(code_list_height(page.code_blocks.len())),
                Constraint::Min(0),
            ])
            .split(columns[0]);
        let items: Vec<ListItem> = page
            .code_blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                ListItem::new(Line::from(format!(
                    "Block {} · {} ({} lines)",
                    i + 1,
                    block.lang,
                    block.code.lines().count()
                )))
            })
            .collect();
        let list = List::new(items)
            .block(palette.block(" Code blocks "))
            .highlight_style(Style::default().bg(palette.highlight).add_modifier(Modifier::BOLD));
        let mut state = ListState::default().with_selected(Some(page.selected));
        f.render_stateful_widget(list, left[0], &mut state);

        if let Some(block) = page.code_blocks.get(page.selected) {
            let mut frame = palette.block(format!(" {} ", block.lang));
            if page.focus == GenerationPane::Content {
                frame = frame.border_style(Style::default().fg(palette.warning));
            }
            let viewport = frame.inner(left[1]).height;
            page.content_scroll = clamp_scroll(page.content_scroll, block.code.lines().count(), viewport);
            f.render_widget(
                Paragraph::new(block.code.clone())
                    .block(frame)
                    .scroll((page.content_scroll, 0)),
                left[1],
            );
        }
    }

    let instructions = if !page.instructions.is_empty() {
        instruction_lines(&page.instructions, palette)
    } else if let Some(text) = generated.instructions.as_deref().filter(|t| !t.trim().is_empty()) {
        text.lines().map(|l| Line::from(l.to_string())).collect()
    } else {
        vec![Line::from(Span::styled("No project instructions in the answer.", palette.muted()))]
    };
    let mut block = palette
        .block(" Instructions ")
        .title_bottom(Line::from(" [Tab] Switch pane ").right_aligned());
    if page.focus == GenerationPane::Instructions {
        block = block.border_style(Style::default().fg(palette.warning));
    }
    let inner = block.inner(columns[1]);
    let paragraph = Paragraph::new(instructions).wrap(Wrap { trim: false });
    page.instructions_scroll =
        clamp_scroll(page.instructions_scroll, paragraph.line_count(inner.width), inner.height);
    f.render_widget(
        paragraph.block(block).scroll((page.instructions_scroll, 0)),
        columns[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::api::{GeneratedProject, Practice};
    use crate::config::{Config, Theme};
    use crate::markdown::extract_instructions;
    use crate::pages::GenerationPane;
    use crate::ui::draw_ui;

    fn test_app(dir: &std::path::Path) -> App {
        App::new(Config::default(), dir.join("config.toml"), None, None, None, None)
    }

    /// Draw one frame and return the screen as a single string.
    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw_ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_expanded_details_scroll_to_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.route = Route::Practices;
        app.practices.set_items(vec![Practice {
            id: "clean-code".to_string(),
            title: "Clean Code".to_string(),
            excerpt: "Small functions".to_string(),
            content: (1..=80).map(|n| format!("line {n:02}")).collect::<Vec<_>>().join("\n"),
        }]);
        app.practices.toggle_expanded();

        let screen = render(&mut app);
        assert!(screen.contains("line 01"));
        assert!(!screen.contains("line 80"));

        app.scroll_down(500);
        let screen = render(&mut app);
        assert!(screen.contains("line 80"));
        // 85 detail lines in a 21-row pane.
        assert_eq!(app.practices.detail_scroll, 64);
    }

    #[test]
    fn test_instructions_pane_scrolls_when_focused() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let steps: Vec<String> = (1..=80).map(|n| format!("- STEP {n:02}")).collect();
        let generated = GeneratedProject {
            project_id: "p-9".to_string(),
            files: Vec::new(),
            download_url: "/api/download/p-9".to_string(),
            raw_text: Some(format!(
                "```python\nprint(1)\n```\n### Estrutura do projeto\n{}",
                steps.join("\n")
            )),
            instructions: None,
        };
        app.generation
            .finish(&generated, &app.config.generation.instructions_marker);
        app.project.set_prompt("p".to_string());
        app.project.set_generated(generated);
        app.route = Route::Generation;
        assert_eq!(app.generation.instructions.len(), 81);

        app.scroll_down(500);
        let screen = render(&mut app);
        assert!(!screen.contains("STEP 80"), "code pane has focus");

        app.generation.focus = GenerationPane::Instructions;
        app.scroll_down(500);
        let screen = render(&mut app);
        assert!(screen.contains("STEP 80"));
        // 81 lines in a 20-row pane.
        assert_eq!(app.generation.instructions_scroll, 61);
    }

    #[test]
    fn test_clamp_scroll() {
        assert_eq!(clamp_scroll(10, 30, 25), 5);
        assert_eq!(clamp_scroll(3, 30, 25), 3);
        assert_eq!(clamp_scroll(4, 2, 25), 0);
    }

    #[test]
    fn test_code_list_height_is_bounded() {
        assert_eq!(code_list_height(1), 3);
        assert_eq!(code_list_height(6), 8);
        assert_eq!(code_list_height(70_000), 8);
        assert_eq!(code_list_height(usize::MAX), 8);
    }

    #[test]
    fn test_selection_summary() {
        assert_eq!(selection_summary(0), "None selected");
        assert_eq!(selection_summary(3), "3 selected");
    }

    #[test]
    fn test_instruction_lines_styles() {
        let palette = Palette::for_theme(Theme::Dark);
        let parsed = extract_instructions(
            "### Estrutura do projeto\n## Setup\n- **app.py**: entry\nplain",
            "### estrutura do projeto",
        );
        let lines = instruction_lines(&parsed, &palette);
        // Heading after content gets a blank separator.
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2].spans[0].content, "Setup");
        assert!(lines[2].spans[0].style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(lines[3].spans[0].content, "  • ");
        assert!(lines[3].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[4].spans[0].content, "plain");
    }

    #[test]
    fn test_editor_lines_mark_cursor() {
        let palette = Palette::for_theme(Theme::Light);
        let editor = TextArea::from_text("one\ntwo");
        let lines = editor_lines(&editor, 0, 10, &palette);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content, "one");
        // Cursor sits after "two".
        assert_eq!(lines[1].spans[0].content, "two");
        assert_eq!(lines[1].spans[1].content, " ");
    }
}
