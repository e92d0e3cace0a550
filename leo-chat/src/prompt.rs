//! Prompt assembly for the upstream model.

use crate::session::Turn;
use std::fmt::Write;

/// Build the single text prompt sent upstream.
///
/// Layout: system instruction, the last `max_turns` turns as `role: content`
/// lines, then the new user message and an `assistant:` cue.
pub fn build_prompt(system_instruction: &str, history: &[Turn], message: &str, max_turns: usize) -> String {
    let mut prompt = String::with_capacity(system_instruction.len() + message.len() + 256);
    prompt.push_str(system_instruction.trim());
    prompt.push_str("\n\n");

    let start = history.len().saturating_sub(max_turns);
    let recent = &history[start..];
    if !recent.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for turn in recent {
            let _ = writeln!(prompt, "{}: {}", turn.role, turn.content);
        }
        prompt.push('\n');
    }

    let _ = writeln!(prompt, "user: {message}");
    prompt.push_str("assistant:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_history() {
        let prompt = build_prompt("You are Leo.", &[], "What is a Leo Club?", 10);
        assert_eq!(prompt, "You are Leo.\n\nuser: What is a Leo Club?\nassistant:");
        assert!(!prompt.contains("Previous conversation"));
    }

    #[test]
    fn test_prompt_with_history() {
        let history = vec![Turn::user("hi"), Turn::assistant("Hello, Leo!")];
        let prompt = build_prompt("System", &history, "next", 10);
        assert_eq!(
            prompt,
            "System\n\nPrevious conversation:\nuser: hi\nassistant: Hello, Leo!\n\nuser: next\nassistant:"
        );
    }

    #[test]
    fn test_prompt_keeps_only_recent_turns() {
        let history: Vec<Turn> = (0..10)
            .flat_map(|i| [Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}"))])
            .collect();
        let prompt = build_prompt("System", &history, "latest", 10);

        let lines: Vec<&str> = prompt
            .lines()
            .filter(|l| l.starts_with("user: q") || l.starts_with("assistant: a"))
            .collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "user: q5");
        assert_eq!(lines[9], "assistant: a9");
        assert!(!prompt.contains("q4"));
        assert!(prompt.ends_with("user: latest\nassistant:"));
    }

    #[test]
    fn test_zero_turns_drops_history() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        let prompt = build_prompt("System", &history, "again", 0);
        assert!(!prompt.contains("hello"));
    }
}
