//! Transcript normalization.
//!
//! Provider transcripts pack several content blocks into one entry. Progress
//! consumers want one block per row, so entries fan out into
//! [`NormalizedEntry`] views. The runner recomputes the whole transcript's
//! normalization every time it emits progress; views are never patched
//! incrementally.

use serde::Serialize;

use crate::ai::types::{ContentBlock, EntryKind, TranscriptEntry, Usage};

/// Single-block view of one transcript entry.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub block: ContentBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Fan one entry out into per-block views, preserving block order. An entry
/// with no content normalizes to nothing.
pub fn normalize_entry(entry: &TranscriptEntry) -> Vec<NormalizedEntry> {
    entry
        .content
        .iter()
        .map(|block| NormalizedEntry {
            kind: entry.kind,
            block: block.clone(),
            usage: entry.usage.clone(),
        })
        .collect()
}

/// Normalize a whole transcript, entry order first, block order within.
pub fn normalize_transcript(entries: &[TranscriptEntry]) -> Vec<NormalizedEntry> {
    entries.iter().flat_map(normalize_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multi_block_entries_fan_out_in_order() {
        let entry = TranscriptEntry::assistant(
            vec![
                ContentBlock::text("looking"),
                ContentBlock::ToolUse {
                    id: "toolu_01".to_string(),
                    name: "read".to_string(),
                    input: json!({"file_path": "a.txt"}),
                },
            ],
            Usage {
                input_tokens: 3,
                output_tokens: 4,
                ..Usage::default()
            },
        );

        let normalized = normalize_entry(&entry);
        assert_eq!(normalized.len(), 2);
        assert!(matches!(normalized[0].block, ContentBlock::Text { .. }));
        assert!(matches!(normalized[1].block, ContentBlock::ToolUse { .. }));
        // Usage rides along on every view of the entry.
        assert_eq!(normalized[1].usage.as_ref().unwrap().output_tokens, 4);
    }

    #[test]
    fn empty_entries_normalize_to_nothing() {
        let entry = TranscriptEntry::user_blocks(vec![]);
        assert!(normalize_entry(&entry).is_empty());
    }

    #[test]
    fn transcript_normalization_preserves_entry_order() {
        let transcript = vec![
            TranscriptEntry::user("List files"),
            TranscriptEntry::assistant(
                vec![
                    ContentBlock::ToolUse {
                        id: "toolu_01".to_string(),
                        name: "ls".to_string(),
                        input: json!({}),
                    },
                    ContentBlock::text("done soon"),
                ],
                Usage::default(),
            ),
            TranscriptEntry::user_blocks(vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_01".to_string(),
                output: json!("a.txt"),
                is_error: None,
            }]),
        ];

        let normalized = normalize_transcript(&transcript);
        let kinds: Vec<EntryKind> = normalized.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::User,
                EntryKind::Assistant,
                EntryKind::Assistant,
                EntryKind::User,
            ]
        );
    }
}
