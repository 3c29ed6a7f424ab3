//! Terminal reduction of a finished transcript.
//!
//! Pure functions: the runner hands them the accumulated transcript after
//! stream exhaustion and gets back either the result payload or the error
//! that explains why there is none.

use crate::agent::loop_events::AgentResultData;
use crate::ai::types::{ContentBlock, EntryKind, TranscriptEntry, Usage};
use crate::error::AgentError;

/// Validate the last entry of an exhausted stream.
///
/// A sentinel assistant entry means the turn was interrupted or the provider
/// reported a failure; anything other than an assistant entry means the
/// model never completed. Both abort the run before any result exists.
pub fn check_terminal(
    transcript: &[TranscriptEntry],
    agent_index: usize,
    synthesis: bool,
) -> Result<&TranscriptEntry, AgentError> {
    let Some(last) = transcript.last() else {
        return Err(AgentError::IncompleteTurn {
            label: AgentError::agent_label(agent_index, synthesis),
        });
    };

    if last.is_error_sentinel() {
        return Err(AgentError::KnownStreamFailure {
            sentinel: last.leading_text().unwrap_or_default().to_string(),
        });
    }

    if last.kind != EntryKind::Assistant {
        return Err(AgentError::IncompleteTurn {
            label: AgentError::agent_label(agent_index, synthesis),
        });
    }

    Ok(last)
}

/// Reduce the final assistant entry to the result payload.
///
/// `tokens` is the four-field usage total; `content` keeps text blocks only,
/// in their original order.
pub fn aggregate(
    final_entry: &TranscriptEntry,
    agent_index: usize,
    tool_use_count: usize,
) -> AgentResultData {
    let usage = final_entry.usage.clone().unwrap_or_default();
    let content: Vec<ContentBlock> = final_entry
        .content
        .iter()
        .filter(|block| matches!(block, ContentBlock::Text { .. }))
        .cloned()
        .collect();

    AgentResultData {
        agent_index,
        content,
        tool_use_count,
        tokens: usage.total(),
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::INTERRUPT_SENTINEL;
    use serde_json::json;

    fn final_assistant() -> TranscriptEntry {
        TranscriptEntry::assistant(
            vec![
                ContentBlock::text("Done"),
                ContentBlock::ToolUse {
                    id: "toolu_09".to_string(),
                    name: "read".to_string(),
                    input: json!({}),
                },
                ContentBlock::text("really"),
            ],
            Usage {
                input_tokens: 100,
                output_tokens: 50,
                cache_creation_input_tokens: 25,
                cache_read_input_tokens: 10,
            },
        )
    }

    #[test]
    fn tokens_are_the_four_field_sum() {
        let result = aggregate(&final_assistant(), 0, 3);
        assert_eq!(result.tokens, 185);
        assert_eq!(result.usage.input_tokens, 100);
        assert_eq!(result.tool_use_count, 3);
    }

    #[test]
    fn content_keeps_text_blocks_only() {
        let result = aggregate(&final_assistant(), 0, 0);
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0], ContentBlock::text("Done"));
        assert_eq!(result.content[1], ContentBlock::text("really"));
    }

    #[test]
    fn missing_usage_counts_as_zero() {
        let entry = TranscriptEntry {
            kind: EntryKind::Assistant,
            content: vec![ContentBlock::text("ok")],
            usage: None,
        };
        let result = aggregate(&entry, 1, 0);
        assert_eq!(result.tokens, 0);
        assert_eq!(result.usage, Usage::default());
    }

    #[test]
    fn assistant_terminal_passes_the_check() {
        let transcript = vec![TranscriptEntry::user("hi"), final_assistant()];
        let last = check_terminal(&transcript, 0, false).unwrap();
        assert_eq!(last.kind, EntryKind::Assistant);
    }

    #[test]
    fn sentinel_terminal_is_a_known_failure() {
        let transcript = vec![
            TranscriptEntry::user("hi"),
            TranscriptEntry::assistant(
                vec![ContentBlock::text(INTERRUPT_SENTINEL)],
                Usage::default(),
            ),
        ];
        match check_terminal(&transcript, 0, false) {
            Err(AgentError::KnownStreamFailure { sentinel }) => {
                assert_eq!(sentinel, INTERRUPT_SENTINEL);
            }
            other => panic!("expected known stream failure, got {other:?}"),
        }
    }

    #[test]
    fn api_error_terminal_is_a_known_failure() {
        let transcript = vec![TranscriptEntry::assistant(
            vec![ContentBlock::text("API Error: 529 overloaded")],
            Usage::default(),
        )];
        assert!(matches!(
            check_terminal(&transcript, 0, false),
            Err(AgentError::KnownStreamFailure { .. })
        ));
    }

    #[test]
    fn non_assistant_terminal_names_the_agent() {
        let transcript = vec![TranscriptEntry::user("hi")];
        match check_terminal(&transcript, 2, false) {
            Err(AgentError::IncompleteTurn { label }) => assert_eq!(label, "agent 3"),
            other => panic!("expected incomplete turn, got {other:?}"),
        }
        match check_terminal(&transcript, 2, true) {
            Err(AgentError::IncompleteTurn { label }) => assert_eq!(label, "synthesis agent"),
            other => panic!("expected incomplete turn, got {other:?}"),
        }
    }

    #[test]
    fn empty_transcript_is_incomplete() {
        assert!(matches!(
            check_terminal(&[], 0, false),
            Err(AgentError::IncompleteTurn { .. })
        ));
    }
}
