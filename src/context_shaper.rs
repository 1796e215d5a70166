//! Pure transforms that keep the conversation and loop transcript bounded.

use crate::config::EngineConfig;
use crate::types::{ContentPart, Message, MessageRole};

const TRUNCATION_SUFFIX: &str = "\n…[truncated]";

/// Walks `idx` back to the nearest char boundary at or before it, so a byte
/// cutoff landing mid-codepoint doesn't panic on truncation.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut end = idx;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Keeps the earliest user message plus the most recent window, avoiding
/// duplication when the earliest user message already falls in the tail.
#[must_use]
pub fn truncate_history(messages: Vec<Message>, max_messages: usize) -> Vec<Message> {
    if messages.len() <= max_messages || max_messages == 0 {
        return messages;
    }

    let first_user_idx = messages.iter().position(|m| m.role == MessageRole::User);
    let tail_start = messages.len().saturating_sub(max_messages.saturating_sub(1));

    match first_user_idx {
        Some(idx) if idx < tail_start => {
            let mut kept = Vec::with_capacity(max_messages);
            kept.push(messages[idx].clone());
            kept.extend(messages[tail_start..].iter().cloned());
            kept
        }
        _ => messages[messages.len().saturating_sub(max_messages)..].to_vec(),
    }
}

/// Truncates any single message's text past `max_chars`.
#[must_use]
pub fn trim_message(mut message: Message, max_chars: usize) -> Message {
    for part in &mut message.content {
        if let ContentPart::Text { text } = part
            && text.len() > max_chars
        {
            let end = floor_char_boundary(text, max_chars);
            text.truncate(end);
            text.push_str(TRUNCATION_SUFFIX);
        }
    }
    message
}

/// Which family of tool an output came from, for compression purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutputKind {
    Write,
    Exec,
    ReadOrSearch,
}

/// Compresses a tool's feedback text before it is appended to the transcript.
#[must_use]
pub fn compress_tool_output(kind: ToolOutputKind, path_hint: Option<&str>, output: &str) -> String {
    match kind {
        ToolOutputKind::Write => {
            let lines = output.lines().count().max(output.matches('\n').count() + 1);
            match path_hint {
                Some(path) => format!("✓ Written: {path} ({lines} lines)"),
                None => format!("✓ Written ({lines} lines)"),
            }
        }
        ToolOutputKind::Exec if output.len() > 4000 => {
            let tail_lines: Vec<&str> = output.lines().rev().take(100).collect();
            let mut tail: String = tail_lines.into_iter().rev().collect::<Vec<_>>().join("\n");
            if tail.len() > 4000 {
                let start = floor_char_boundary(&tail, tail.len() - 4000);
                tail = tail[start..].to_string();
            }
            tail
        }
        ToolOutputKind::Exec => output.to_string(),
        ToolOutputKind::ReadOrSearch => {
            if output.len() > 8000 {
                let end = floor_char_boundary(output, 8000);
                format!("{}{TRUNCATION_SUFFIX}", &output[..end])
            } else {
                output.to_string()
            }
        }
    }
}

/// Compresses an error body to the error cap.
#[must_use]
pub fn compress_error(error: &str) -> String {
    if error.len() > 2000 {
        let end = floor_char_boundary(error, 2000);
        format!("{}{TRUNCATION_SUFFIX}", &error[..end])
    } else {
        error.to_string()
    }
}

/// Keeps the first 4 loop messages plus the most recent window once the
/// transcript grows past `max_messages`.
#[must_use]
pub fn trim_loop_messages(messages: Vec<Message>, max_messages: usize) -> Vec<Message> {
    if messages.len() <= max_messages {
        return messages;
    }
    const HEAD: usize = 4;
    let head = &messages[..HEAD.min(messages.len())];
    let tail_len = max_messages.saturating_sub(HEAD);
    let tail_start = messages.len().saturating_sub(tail_len);
    let mut result = head.to_vec();
    result.extend(messages[tail_start.max(HEAD)..].iter().cloned());
    result
}

/// Convenience bundle applying every shaping step driven by [`EngineConfig`].
pub fn shape_initial_history(messages: Vec<Message>, config: &EngineConfig) -> Vec<Message> {
    let truncated = truncate_history(messages, config.max_context_messages);
    truncated.into_iter().map(|m| trim_message(m, config.max_msg_chars)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_earliest_user_message_and_tail() {
        let mut messages = vec![Message::user("first")];
        for i in 0..20 {
            messages.push(Message::assistant(format!("reply {i}"), vec![]));
        }
        let shaped = truncate_history(messages, 5);
        assert_eq!(shaped.len(), 5);
        assert_eq!(shaped[0].text(), "first");
    }

    #[test]
    fn trims_oversize_message() {
        let message = Message::user("a".repeat(100));
        let trimmed = trim_message(message, 10);
        assert!(trimmed.text().starts_with("aaaaaaaaaa"));
        assert!(trimmed.text().contains("truncated"));
    }

    #[test]
    fn write_output_compressed_to_line_count() {
        let out = compress_tool_output(ToolOutputKind::Write, Some("src/a.rs"), "line1\nline2\nline3");
        assert_eq!(out, "✓ Written: src/a.rs (3 lines)");
    }

    #[test]
    fn loop_trimming_keeps_head_and_tail() {
        let messages: Vec<Message> = (0..40).map(|i| Message::user(format!("m{i}"))).collect();
        let trimmed = trim_loop_messages(messages, 30);
        assert_eq!(trimmed.len(), 30);
        assert_eq!(trimmed[0].text(), "m0");
        assert_eq!(trimmed.last().unwrap().text(), "m39");
    }
}
