//! Scraping of raw model answers.
//!
//! When the backend cannot split an answer into files it hands back the whole
//! markdown text. The generation screen then shows the fenced code blocks on
//! one side and the project instructions on the other.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// A fence is three backticks and a language tag, then the body up to the next fence.
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([0-9A-Za-z_]+)[\r\n]+(.*?)```").expect("static regex is valid")
});

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\*|-|\d+\.)\s+(.*)$").expect("static regex is valid"));

static INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*|\*(.*?)\*").expect("static regex is valid"));

/// Languages that are setup commands rather than project code.
const SHELL_LANGUAGES: [&str; 3] = ["bash", "sh", "shell"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lower-cased language tag.
    pub lang: String,
    pub code: String,
}

/// Every fenced block with a language tag, shell blocks excluded.
pub fn extract_code_blocks(raw: &str) -> Vec<CodeBlock> {
    CODE_BLOCK_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let lang = caps[1].to_lowercase();
            if SHELL_LANGUAGES.contains(&lang.as_str()) {
                return None;
            }
            Some(CodeBlock {
                lang,
                code: caps[2].to_string(),
            })
        })
        .collect()
}

/// The text with every fenced block (of any language) removed.
pub fn strip_code_blocks(raw: &str) -> String {
    CODE_BLOCK_RE.replace_all(raw, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Plain(String),
    Strong(String),
    Emphasis(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `## ...`
    Heading,
    /// `### ...` and deeper
    Subheading,
    ListItem,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionLine {
    pub kind: LineKind,
    pub spans: Vec<Inline>,
}

/// Split `**strong**` and `*emphasis*` runs out of a line.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in INLINE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Inline::Plain(text[last..whole.start()].to_string()));
        }
        if let Some(strong) = caps.get(1) {
            if !strong.as_str().is_empty() {
                spans.push(Inline::Strong(strong.as_str().to_string()));
            }
        } else if let Some(em) = caps.get(2)
            && !em.as_str().is_empty()
        {
            spans.push(Inline::Emphasis(em.as_str().to_string()));
        }
        last = whole.end();
    }
    if last < text.len() {
        spans.push(Inline::Plain(text[last..].to_string()));
    }
    spans
}

fn classify_line(line: &str) -> InstructionLine {
    let (kind, text) = if line.starts_with("###") {
        (LineKind::Subheading, line.trim_start_matches('#').trim_start())
    } else if line.starts_with("##") {
        (LineKind::Heading, line.trim_start_matches('#').trim_start())
    } else if let Some(caps) = LIST_ITEM_RE.captures(line.trim()) {
        let item = caps.get(1).map_or("", |m| m.as_str());
        (LineKind::ListItem, item)
    } else {
        (LineKind::Paragraph, line.trim_end())
    };
    InstructionLine {
        kind,
        spans: parse_inline(text),
    }
}

/// Byte offset of the first case-insensitive occurrence of `marker`.
fn find_marker(raw: &str, marker: &str) -> Option<usize> {
    let re = RegexBuilder::new(&regex::escape(marker))
        .case_insensitive(true)
        .build()
        .ok()?;
    re.find(raw).map(|m| m.start())
}

/// Prose from the instructions marker onwards, code removed, one entry per
/// non-blank line. Empty when the marker does not occur.
pub fn extract_instructions(raw: &str, marker: &str) -> Vec<InstructionLine> {
    let Some(start) = find_marker(raw, marker) else {
        return Vec::new();
    };
    strip_code_blocks(&raw[start..])
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(classify_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "### estrutura do projeto";

    const ANSWER: &str = "Aqui está o projeto.\n\
\n\
```bash\n\
pip install flask\n\
```\n\
\n\
```Python\n\
from flask import Flask\n\
app = Flask(__name__)\n\
```\n\
\n\
```sh\n\
python app.py\n\
```\n\
\n\
### Estrutura do Projeto\n\
\n\
- **app.py**: servidor *principal*\n\
1. Rode os testes\n\
```json\n\
{\"debug\": true}\n\
```\n\
## Execução\n\
Use o comando abaixo.\n";

    #[test]
    fn test_extracts_only_non_shell_blocks() {
        let blocks = extract_code_blocks(ANSWER);
        assert_eq!(
            blocks,
            vec![
                CodeBlock {
                    lang: "python".to_string(),
                    code: "from flask import Flask\napp = Flask(__name__)\n".to_string(),
                },
                CodeBlock {
                    lang: "json".to_string(),
                    code: "{\"debug\": true}\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_shell_variants_are_skipped_case_insensitively() {
        let raw = "```SHELL\nls\n```\n```Bash\necho\n```\n```rust\nfn main() {}\n```";
        let blocks = extract_code_blocks(raw);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lang, "rust");
    }

    #[test]
    fn test_fence_without_language_or_closing_is_ignored() {
        assert!(extract_code_blocks("```\nplain fence\n```").is_empty());
        assert!(extract_code_blocks("```python\nnever closed").is_empty());
        assert!(extract_code_blocks("no code at all").is_empty());
    }

    #[test]
    fn test_crlf_after_language_tag() {
        let blocks = extract_code_blocks("```js\r\nconsole.log(1)\r\n```");
        assert_eq!(blocks[0].lang, "js");
        assert_eq!(blocks[0].code, "console.log(1)\r\n");
    }

    #[test]
    fn test_strip_code_blocks_removes_all_languages() {
        let stripped = strip_code_blocks("before\n```bash\nls\n```\nafter");
        assert_eq!(stripped, "before\n\nafter");
    }

    #[test]
    fn test_closing_fence_is_consumed_with_block() {
        let raw = "intro\n```python\nprint(1)```word\n```js\nx()\n```";
        let blocks = extract_code_blocks(raw);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].code, "print(1)");
        assert_eq!(blocks[1].lang, "js");
        // Text glued to the closing fence stays; the fence does not.
        assert_eq!(strip_code_blocks(raw), "intro\nword\n");
    }

    #[test]
    fn test_instructions_start_at_marker() {
        let lines = extract_instructions(ANSWER, MARKER);
        let kinds: Vec<LineKind> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Subheading,
                LineKind::ListItem,
                LineKind::ListItem,
                LineKind::Heading,
                LineKind::Paragraph,
            ]
        );
        assert_eq!(
            lines[0].spans,
            vec![Inline::Plain("Estrutura do Projeto".to_string())]
        );
        assert_eq!(
            lines[1].spans,
            vec![
                Inline::Strong("app.py".to_string()),
                Inline::Plain(": servidor ".to_string()),
                Inline::Emphasis("principal".to_string()),
            ]
        );
        assert_eq!(
            lines[2].spans,
            vec![Inline::Plain("Rode os testes".to_string())]
        );
        assert_eq!(lines[3].spans, vec![Inline::Plain("Execução".to_string())]);
    }

    #[test]
    fn test_instructions_without_marker_are_empty() {
        assert!(extract_instructions("## Setup\n- run it", MARKER).is_empty());
        assert!(extract_instructions("", MARKER).is_empty());
    }

    #[test]
    fn test_instructions_marker_is_literal() {
        let raw = "intro\n## Setup (dev)\n- step";
        let lines = extract_instructions(raw, "## setup (DEV)");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].kind, LineKind::ListItem);
    }

    #[test]
    fn test_parse_inline_plain_text() {
        assert_eq!(
            parse_inline("nothing special"),
            vec![Inline::Plain("nothing special".to_string())]
        );
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_bold_line_is_not_a_list_item() {
        let line = classify_line("**Note**: keep secrets out of git");
        assert_eq!(line.kind, LineKind::Paragraph);
        assert_eq!(line.spans[0], Inline::Strong("Note".to_string()));
    }
}
