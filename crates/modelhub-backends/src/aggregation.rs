//! Entity grouping for token-classification output.
//!
//! Follows the "simple" strategy: adjacent tokens that share an entity type
//! merge into one group unless the later token opens a new entity with a
//! `B-` tag. Tokens tagged `O` never form groups.

use modelhub_core::RawValue;

/// Per-token prediction with character offsets into the input text
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrediction {
    /// Raw label, e.g. `B-PER`, `I-ORG` or `O`
    pub label: String,
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

/// A merged entity span
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    pub entity_group: String,
    pub score: f32,
    pub word: String,
    pub start: usize,
    pub end: usize,
}

impl From<EntityGroup> for RawValue {
    fn from(group: EntityGroup) -> Self {
        RawValue::map([
            ("entity_group", RawValue::from(group.entity_group)),
            ("score", RawValue::F32(group.score)),
            ("word", RawValue::from(group.word)),
            ("start", RawValue::from(group.start)),
            ("end", RawValue::from(group.end)),
        ])
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Position {
    Begin,
    Inside,
    Outside,
}

fn split_tag(label: &str) -> (Position, &str) {
    if label == "O" {
        return (Position::Outside, "O");
    }
    if let Some(tag) = label.strip_prefix("B-") {
        (Position::Begin, tag)
    } else if let Some(tag) = label.strip_prefix("I-") {
        (Position::Inside, tag)
    } else {
        // Untagged labels behave like continuations
        (Position::Inside, label)
    }
}

/// Group token predictions into entity spans.
///
/// Offsets are character offsets into `text`; `word` is the slice of `text`
/// covered by the group.
pub fn aggregate_simple(text: &str, tokens: &[TokenPrediction]) -> Vec<EntityGroup> {
    let mut groups: Vec<(String, Vec<&TokenPrediction>)> = Vec::new();

    for token in tokens {
        let (position, tag) = split_tag(&token.label);
        match groups.last_mut() {
            Some((current, members)) if current == tag && position != Position::Begin => {
                members.push(token);
            }
            _ => groups.push((tag.to_string(), vec![token])),
        }
    }

    groups
        .into_iter()
        .filter(|(tag, _)| tag != "O")
        .filter_map(|(tag, members)| {
            let first = members.first()?;
            let last = members.last()?;
            let score = members.iter().map(|t| t.score).sum::<f32>() / members.len() as f32;
            Some(EntityGroup {
                word: char_slice(text, first.start, last.end),
                entity_group: tag,
                score,
                start: first.start,
                end: last.end,
            })
        })
        .collect()
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
