// Text cleanup before extraction
use super::message::Message;

/// A message after cleanup, tagged with its position in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMessage {
    /// Zero-based sequence id
    pub seq: usize,
    pub message: Message,
}

/// Normalizes message text and assigns sequence ids
#[derive(Debug, Default, Clone)]
pub struct TextPreprocessor;

impl TextPreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean every message, keeping input order. Empty input yields empty output.
    pub fn prepare(&self, messages: &[Message]) -> Vec<PreparedMessage> {
        messages
            .iter()
            .enumerate()
            .map(|(seq, msg)| {
                let mut message = msg.clone();
                message.content = clean_text(&msg.content);
                PreparedMessage { seq, message }
            })
            .collect()
    }
}

/// Collapse whitespace and normalize line breaks.
///
/// Line breaks survive (sentence splitting uses them); runs of 3+ newlines become a
/// single blank line, runs of spaces/tabs become one space, each line is trimmed.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = normalized
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    let joined = lines.join("\n");
    collapse_blank_lines(&joined).trim().to_string()
}

// 3行以上の改行は空行1つに
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }
    out
}
