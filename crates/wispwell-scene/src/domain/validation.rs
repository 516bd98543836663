//! Structural validation of scene documents.
//!
//! Works on the raw document rather than the typed graph so every problem in
//! a file is reported, not just the first one that stops parsing.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::Serialize;
use serde_json::Value;
use wispwell_core::repository::SceneDocument;

use super::graph::{CONTINUE_CHOICE, START_NODE};

/// Waits above this many seconds are reported as suspicious.
const LONG_WAIT_SECS: f64 = 86_400.0;

/// Outcome of validating one scene.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty.
    pub valid: bool,
    /// Problems that make the scene unplayable or inconsistent.
    pub errors: Vec<String>,
    /// Problems that still let the scene run.
    pub warnings: Vec<String>,
    /// Number of nodes in the document.
    pub nodes: usize,
    /// Every distinct declared speaker.
    pub speakers: BTreeSet<String>,
}

impl ValidationReport {
    /// A report for a scene that could not be loaded at all.
    #[must_use]
    pub fn unloadable(reason: &str) -> Self {
        Self {
            errors: vec![format!("Scene file not found or invalid JSON: {reason}")],
            ..Self::default()
        }
    }
}

/// Validates `document` and collects every error and warning.
#[must_use]
pub fn validate_document(document: &SceneDocument) -> ValidationReport {
    let mut report = ValidationReport {
        nodes: document.len(),
        ..ValidationReport::default()
    };

    if !document.contains_key(START_NODE) {
        report.errors.push(format!("Missing '{START_NODE}' node"));
    }

    for (node_id, value) in document {
        let Value::Object(node) = value else {
            report
                .errors
                .push(format!("Node '{node_id}' is not an object"));
            continue;
        };

        match node.get("speaker") {
            None => report
                .errors
                .push(format!("Node '{node_id}' missing 'speaker' field")),
            Some(Value::String(speaker)) if speaker.trim().is_empty() => report
                .errors
                .push(format!("Node '{node_id}' has an empty 'speaker'")),
            Some(Value::String(speaker)) => {
                report.speakers.insert(speaker.clone());
            }
            Some(_) => report
                .errors
                .push(format!("Node '{node_id}' 'speaker' must be a string")),
        }

        match node.get("text") {
            None => report
                .errors
                .push(format!("Node '{node_id}' missing 'text' field")),
            Some(Value::String(text)) if text.trim().is_empty() => report
                .warnings
                .push(format!("Node '{node_id}' has empty text")),
            Some(Value::String(_)) => {}
            Some(_) => report
                .errors
                .push(format!("Node '{node_id}' 'text' must be a string")),
        }

        match node.get("wait") {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) if n.as_f64().is_some_and(|w| w < 0.0) => report
                .warnings
                .push(format!("Node '{node_id}' has a negative wait; it will not pause")),
            Some(Value::Number(n)) if n.as_f64().is_some_and(|w| w > LONG_WAIT_SECS) => report
                .warnings
                .push(format!("Node '{node_id}' waits longer than a day after its line")),
            Some(Value::Number(_)) => {}
            Some(_) => report
                .errors
                .push(format!("Node '{node_id}' 'wait' must be a number")),
        }

        check_next(node_id, node.get("next"), document, &mut report);
    }

    for node_id in unreachable_nodes(document) {
        report
            .warnings
            .push(format!("Node '{node_id}' is unreachable from '{START_NODE}'"));
    }

    report.valid = report.errors.is_empty();
    report
}

fn check_next(
    node_id: &str,
    next: Option<&Value>,
    document: &SceneDocument,
    report: &mut ValidationReport,
) {
    match next {
        None | Some(Value::Null) => {}
        Some(Value::String(target)) => {
            if !document.contains_key(target) {
                report.errors.push(format!(
                    "Node '{node_id}' references non-existent next node '{target}'"
                ));
            }
        }
        Some(Value::Object(choices)) => {
            if choices.is_empty() {
                report
                    .errors
                    .push(format!("Node '{node_id}' has an empty choice mapping"));
                return;
            }
            for (choice, target) in choices {
                match target {
                    Value::String(target) if document.contains_key(target) => {}
                    Value::String(target) => report.errors.push(format!(
                        "Node '{node_id}' choice '{choice}' references non-existent node '{target}'"
                    )),
                    _ => report.errors.push(format!(
                        "Node '{node_id}' choice '{choice}' target must be a string"
                    )),
                }
            }
            if choices.len() > 1 && !choices.contains_key(CONTINUE_CHOICE) {
                if let Some(first) = choices.keys().next() {
                    report.warnings.push(format!(
                        "Node '{node_id}' has no '{CONTINUE_CHOICE}' choice; advancing always takes '{first}'"
                    ));
                }
            }
        }
        Some(_) => report.errors.push(format!(
            "Node '{node_id}' 'next' must be a node id or a choice mapping"
        )),
    }
}

/// Node ids that cannot be reached from the start node, in document order.
/// Empty when there is no start node, since that is already an error.
fn unreachable_nodes(document: &SceneDocument) -> Vec<&str> {
    if !document.contains_key(START_NODE) {
        return Vec::new();
    }

    let mut seen: HashSet<&str> = HashSet::from([START_NODE]);
    let mut queue: VecDeque<&str> = VecDeque::from([START_NODE]);
    while let Some(node_id) = queue.pop_front() {
        let targets: Vec<&str> = match document.get(node_id).and_then(|n| n.get("next")) {
            Some(Value::String(target)) => vec![target.as_str()],
            Some(Value::Object(choices)) => choices.values().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        for target in targets {
            if document.contains_key(target) && seen.insert(target) {
                queue.push_back(target);
            }
        }
    }

    document
        .keys()
        .map(String::as_str)
        .filter(|id| !seen.contains(id))
        .collect()
}
