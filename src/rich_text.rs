//! Markdown-ish formatting for club notes and help text.
//!
//! Only the small subset staff actually type is recognised: `#` headings, `-`/`*`
//! bullets, `1.` numbered items, `**bold**` and `*italic*` / `_italic_`. Anything
//! else, including unmatched markers, is kept literally.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Bullet(Vec<Span>),
    Numbered { number: u32, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    Blank,
}

pub fn parse(input: &str) -> Vec<Block> {
    input.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Block {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Block::Blank;
    }

    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if (1..=3).contains(&hashes) {
        if let Some(text) = trimmed[hashes..].strip_prefix(' ') {
            return Block::Heading {
                level: hashes as u8,
                spans: parse_inline(text.trim()),
            };
        }
    }

    if let Some(text) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return Block::Bullet(parse_inline(text.trim()));
    }

    if let Some((digits, text)) = trimmed.split_once(". ") {
        if !digits.is_empty() && digits.len() <= 3 && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(number) = digits.parse::<u32>() {
                return Block::Numbered {
                    number,
                    spans: parse_inline(text.trim()),
                };
            }
        }
    }

    Block::Paragraph(parse_inline(trimmed))
}

pub fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut buf = String::new();
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**").filter(|end| *end > 0) {
                flush(&mut spans, &mut buf);
                spans.push(Span {
                    text: after[..end].to_string(),
                    bold: true,
                    italic: false,
                });
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(marker) = ['*', '_'].into_iter().find(|m| rest.starts_with(*m)) {
            let after = &rest[1..];
            let opens_word = buf.chars().last().is_none_or(char::is_whitespace)
                && !after.starts_with(char::is_whitespace);
            if opens_word {
                if let Some(end) = after.find(marker).filter(|end| *end > 0) {
                    flush(&mut spans, &mut buf);
                    spans.push(Span {
                        text: after[..end].to_string(),
                        bold: false,
                        italic: true,
                    });
                    rest = &after[end + 1..];
                    continue;
                }
            }
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            buf.push(ch);
        }
        rest = chars.as_str();
    }

    flush(&mut spans, &mut buf);
    spans
}

fn flush(spans: &mut Vec<Span>, buf: &mut String) {
    if !buf.is_empty() {
        spans.push(Span::plain(std::mem::take(buf)));
    }
}

pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Flattens blocks back to unstyled text, one line per block.
pub fn plain_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Heading { spans, .. } | Block::Paragraph(spans) => spans_text(spans),
            Block::Bullet(spans) => format!("• {}", spans_text(spans)),
            Block::Numbered { number, spans } => format!("{number}. {}", spans_text(spans)),
            Block::Blank => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
