//! Order-insensitive structural diff of replay outputs.
//!
//! Arrays compare as multisets: elements are matched by a fingerprint that
//! ignores array order at every depth, so reordering a list is not a
//! change. Elements left unmatched on both sides are paired in order and
//! compared recursively when both are containers of the same kind; any
//! other leftover is reported as removed (original index) or added
//! (replay index).

use agentrace_core::{Diff, TypeChange, ValueChange};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

const ROOT: &str = "root";

/// Compare `original` against `replay`
#[must_use]
pub fn compute_diff(original: &Value, replay: &Value) -> Diff {
    let mut walker = Walker::default();
    walker.compare(String::new(), original, replay);
    Diff::from_parts(walker.added, walker.removed, walker.changed, walker.type_changes)
}

/// Type name used in type-change records
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Walker {
    added: Vec<String>,
    removed: Vec<String>,
    changed: IndexMap<String, ValueChange>,
    type_changes: IndexMap<String, TypeChange>,
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        ROOT.to_string()
    } else {
        path.to_string()
    }
}

fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Elements of a root array are written `root[i]`
fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{index}]", display_path(parent))
}

fn same_container(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

impl Walker {
    fn compare(&mut self, path: String, original: &Value, replay: &Value) {
        if original == replay {
            return;
        }

        let (old_type, new_type) = (type_name(original), type_name(replay));
        if old_type != new_type {
            self.type_changes.insert(
                display_path(&path),
                TypeChange {
                    old_type: old_type.to_string(),
                    new_type: new_type.to_string(),
                    old_value: original.clone(),
                    new_value: replay.clone(),
                },
            );
            return;
        }

        match (original, replay) {
            (Value::Object(old), Value::Object(new)) => {
                let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
                keys.sort();
                keys.dedup();
                for key in keys {
                    let child = key_path(&path, key);
                    match (old.get(key), new.get(key)) {
                        (Some(a), Some(b)) => self.compare(child, a, b),
                        (Some(_), None) => self.removed.push(child),
                        (None, Some(_)) => self.added.push(child),
                        (None, None) => {}
                    }
                }
            }
            (Value::Array(old), Value::Array(new)) => self.compare_arrays(&path, old, new),
            _ => {
                self.changed.insert(
                    display_path(&path),
                    ValueChange {
                        old: original.clone(),
                        new: replay.clone(),
                    },
                );
            }
        }
    }

    fn compare_arrays(&mut self, path: &str, old: &[Value], new: &[Value]) {
        let mut pool: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (i, item) in old.iter().enumerate() {
            pool.entry(fingerprint(item)).or_default().push_back(i);
        }

        let mut matched = vec![false; old.len()];
        let mut new_left = Vec::new();
        for (j, item) in new.iter().enumerate() {
            match pool.get_mut(&fingerprint(item)).and_then(VecDeque::pop_front) {
                Some(i) => matched[i] = true,
                None => new_left.push(j),
            }
        }
        let old_left: Vec<usize> = (0..old.len()).filter(|&i| !matched[i]).collect();

        let mut old_rest = Vec::new();
        let mut new_rest = Vec::new();
        for (pos, &i) in old_left.iter().enumerate() {
            match new_left.get(pos) {
                Some(&j) if same_container(&old[i], &new[j]) => {
                    self.compare(index_path(path, i), &old[i], &new[j]);
                }
                Some(&j) => {
                    old_rest.push(i);
                    new_rest.push(j);
                }
                None => old_rest.push(i),
            }
        }
        new_rest.extend(new_left.iter().skip(old_left.len()).copied());
        new_rest.sort_unstable();

        self.removed.extend(old_rest.into_iter().map(|i| index_path(path, i)));
        self.added.extend(new_rest.into_iter().map(|j| index_path(path, j)));
    }
}

/// Order-insensitive canonical text of a value
fn fingerprint(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let mut parts: Vec<String> = items.iter().map(fingerprint).collect();
            parts.sort();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), fingerprint(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        scalar => scalar.to_string(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a diff as indented text blocks, one per non-empty bucket
#[must_use]
pub fn format_diff_for_display(diff: &Diff) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Summary: {}", diff.summary);
    out.push('\n');

    if !diff.added.is_empty() {
        out.push_str("Added fields:\n");
        for path in &diff.added {
            let _ = writeln!(out, "  + {path}");
        }
        out.push('\n');
    }

    if !diff.removed.is_empty() {
        out.push_str("Removed fields:\n");
        for path in &diff.removed {
            let _ = writeln!(out, "  - {path}");
        }
        out.push('\n');
    }

    if !diff.changed.is_empty() {
        out.push_str("Changed values:\n");
        for (path, change) in &diff.changed {
            let _ = writeln!(out, "  ~ {path}");
            let _ = writeln!(out, "    old: {}", render(&change.old));
            let _ = writeln!(out, "    new: {}", render(&change.new));
        }
        out.push('\n');
    }

    if !diff.type_changes.is_empty() {
        out.push_str("Type changes:\n");
        for (path, change) in &diff.type_changes {
            let _ = writeln!(out, "  ! {path}");
            let _ = writeln!(out, "    {} -> {}", change.old_type, change.new_type);
        }
        out.push('\n');
    }

    out
}
