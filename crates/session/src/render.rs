//! Message → display bubble mapping with an allow-listed inline formatter.
//!
//! Agent text supports exactly two styles, `**bold**` and line breaks. The
//! output is a list of structured spans, never markup, so whatever the
//! backend sends is displayed as text.

use proto::{Message, Role};
use serde::Serialize;

/// One inline piece of a rendered bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Inline {
    /// Plain text.
    Text(String),
    /// Emphasized text from a `**...**` pair.
    Strong(String),
    /// A newline in agent text.
    LineBreak,
}

/// A rendered transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bubble {
    /// Author, drives alignment and avatar.
    pub role: Role,
    /// Inline content in display order.
    pub spans: Vec<Inline>,
}

/// Renders one message. User text is never formatted.
pub fn render(message: &Message) -> Bubble {
    let spans = match message.role {
        Role::Ai => format_agent_text(&message.text),
        Role::User => vec![Inline::Text(message.text.clone())],
    };
    Bubble {
        role: message.role,
        spans,
    }
}

/// Renders a whole transcript in order.
pub fn render_all(messages: &[Message]) -> Vec<Bubble> {
    messages.iter().map(render).collect()
}

/// Splits agent text into text, strong and line-break spans.
///
/// Bold pairs are matched non-greedily and never span a newline; an
/// unmatched `**` stays literal.
pub fn format_agent_text(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            spans.push(Inline::LineBreak);
        }
        push_line(line, &mut spans);
    }
    spans
}

fn push_line(line: &str, spans: &mut Vec<Inline>) {
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        push_text(&rest[..open], spans);
        if close > 0 {
            spans.push(Inline::Strong(after[..close].to_string()));
        }
        rest = &after[close + 2..];
    }
    push_text(rest, spans);
}

fn push_text(text: &str, spans: &mut Vec<Inline>) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(prev)) = spans.last_mut() {
        prev.push_str(text);
    } else {
        spans.push(Inline::Text(text.to_string()));
    }
}
