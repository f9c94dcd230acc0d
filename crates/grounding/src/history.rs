//! Conversation history formatting.

use crate::types::ConversationTurn;

/// Serializes prior turns into the transcript the condense prompt expects.
#[derive(Debug, Clone, Default)]
pub struct HistoryFormatter {
    max_turns: Option<usize>,
}

impl HistoryFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the most recent `max_turns` turns.
    pub fn with_max_turns(max_turns: Option<usize>) -> Self {
        Self { max_turns }
    }

    /// Format turns oldest first as `Human: q\nAssistant: a`, one pair per turn.
    pub fn format(&self, turns: &[ConversationTurn]) -> String {
        let start = match self.max_turns {
            Some(max) => turns.len().saturating_sub(max),
            None => 0,
        };

        turns[start..]
            .iter()
            .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_turns() {
        let turns = vec![
            ConversationTurn::new("a", "b"),
            ConversationTurn::new("c", "d"),
        ];
        assert_eq!(
            HistoryFormatter::new().format(&turns),
            "Human: a\nAssistant: b\nHuman: c\nAssistant: d"
        );
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(HistoryFormatter::new().format(&[]), "");
    }

    #[test]
    fn test_max_turns_keeps_most_recent() {
        let turns = vec![
            ConversationTurn::new("1", "one"),
            ConversationTurn::new("2", "two"),
            ConversationTurn::new("3", "three"),
        ];

        let formatter = HistoryFormatter::with_max_turns(Some(2));
        assert_eq!(
            formatter.format(&turns),
            "Human: 2\nAssistant: two\nHuman: 3\nAssistant: three"
        );

        let zero = HistoryFormatter::with_max_turns(Some(0));
        assert_eq!(zero.format(&turns), "");

        let large = HistoryFormatter::with_max_turns(Some(10));
        assert_eq!(large.format(&turns), HistoryFormatter::new().format(&turns));
    }
}
