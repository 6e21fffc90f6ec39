//! Structural diff between an original and a replayed output.
//!
//! Buckets are keyed by path (`a.b[0].c`, `root[0]` inside a root array,
//! or `root` for the whole value) and keep the order in which the differ
//! visited them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scalar that changed value but kept its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    /// Value in the original output
    pub old: Value,
    /// Value in the replay output
    pub new: Value,
}

/// A value whose type changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeChange {
    /// Type name in the original output
    pub old_type: String,
    /// Type name in the replay output
    pub new_type: String,
    /// Value in the original output
    pub old_value: Value,
    /// Value in the replay output
    pub new_value: Value,
}

/// Result of comparing two structured values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    /// Whether any bucket is non-empty
    pub has_changes: bool,
    /// Paths present only in the replay output
    pub added: Vec<String>,
    /// Paths present only in the original output
    pub removed: Vec<String>,
    /// Same-type values that differ
    pub changed: IndexMap<String, ValueChange>,
    /// Values whose type differs
    pub type_changes: IndexMap<String, TypeChange>,
    /// Human-readable counts
    pub summary: String,
}

impl Diff {
    /// Summary text when nothing differs
    pub const NO_CHANGES: &'static str = "No changes detected";

    /// Assemble a diff, deriving `has_changes` and `summary` from the buckets
    #[must_use]
    pub fn from_parts(
        added: Vec<String>,
        removed: Vec<String>,
        changed: IndexMap<String, ValueChange>,
        type_changes: IndexMap<String, TypeChange>,
    ) -> Self {
        let parts: Vec<String> = [
            (added.len(), "field", "added"),
            (removed.len(), "field", "removed"),
            (changed.len(), "value", "changed"),
            (type_changes.len(), "type change", ""),
        ]
        .into_iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, noun, verb)| {
            let plural = if count == 1 { "" } else { "s" };
            format!("{count} {noun}{plural} {verb}").trim_end().to_string()
        })
        .collect();

        let has_changes = !parts.is_empty();
        let summary = if has_changes {
            parts.join(", ")
        } else {
            Self::NO_CHANGES.to_string()
        };

        Self {
            has_changes,
            added,
            removed,
            changed,
            type_changes,
            summary,
        }
    }

    /// A diff with no changes
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), IndexMap::new(), IndexMap::new())
    }

    /// Total number of differences across buckets
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len() + self.type_changes.len()
    }
}

impl Default for Diff {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_summary() {
        let diff = Diff::empty();
        assert!(!diff.has_changes);
        assert_eq!(diff.summary, "No changes detected");
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_summary_order() {
        let mut changed = IndexMap::new();
        changed.insert(
            "answer".to_string(),
            ValueChange {
                old: json!("a"),
                new: json!("b"),
            },
        );
        let diff = Diff::from_parts(
            vec!["x".into(), "y".into()],
            vec!["z".into()],
            changed,
            IndexMap::new(),
        );
        assert!(diff.has_changes);
        assert_eq!(diff.summary, "2 fields added, 1 field removed, 1 value changed");
        assert_eq!(diff.change_count(), 4);
    }

    #[test]
    fn test_serialized_shape() {
        let diff = Diff::empty();
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value["changed"], json!({}));
        assert_eq!(value["added"], json!([]));
        assert_eq!(value["has_changes"], json!(false));
    }
}
