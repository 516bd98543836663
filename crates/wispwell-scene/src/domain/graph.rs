//! Scene graph model.
//!
//! A scene is a mapping from node id to node content. Graphs are immutable
//! once built and are rebuilt from their document whenever needed.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use wispwell_core::error::SceneError;
use wispwell_core::repository::SceneDocument;

/// Node id every scene is entered through by default.
pub const START_NODE: &str = "start";

/// Choice label preferred when a node branches.
pub const CONTINUE_CHOICE: &str = "continue";

/// Pause after a line when the node gives no `wait`.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// One labelled branch of a choice node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// The choice label, e.g. `continue` or `yes`.
    pub label: String,
    /// The node id the choice leads to.
    pub target: String,
}

/// How a node continues once its line has been spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRule {
    /// Unconditional continuation to a single node.
    Goto(String),
    /// Branch keyed by choice label, in document order.
    Choice(Vec<Choice>),
}

impl NextRule {
    /// Picks the node the scene moves to.
    ///
    /// A choice prefers the `continue` label and otherwise falls back to the
    /// first entry; there is no interactive choice selection. Returns `None`
    /// for an empty choice mapping.
    #[must_use]
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::Goto(target) => Some(target),
            Self::Choice(choices) => choices
                .iter()
                .find(|c| c.label == CONTINUE_CHOICE)
                .or_else(|| choices.first())
                .map(|c| c.target.as_str()),
        }
    }

    /// Every node id this rule can lead to.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Goto(target) => vec![target.as_str()],
            Self::Choice(choices) => choices.iter().map(|c| c.target.as_str()).collect(),
        }
    }
}

/// A single line of dialogue in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Participant expected to speak this line.
    pub speaker: Option<String>,
    /// The line itself.
    pub text: Option<String>,
    /// Pause after the line, in seconds; `None` uses the host default.
    pub wait: Option<f64>,
    /// Continuation rule; `None` marks a terminal node.
    pub next: Option<NextRule>,
}

impl Node {
    /// The declared speaker, treating a blank name as no speaker.
    #[must_use]
    pub fn declared_speaker(&self) -> Option<&str> {
        self.speaker.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The post-line pause, or `default` when the node gives none.
    ///
    /// Negative and NaN waits are zero; waits too large for a `Duration`
    /// saturate to `Duration::MAX`.
    #[must_use]
    pub fn wait_duration(&self, default: Duration) -> Duration {
        match self.wait {
            None => default,
            Some(wait) if wait.is_nan() || wait <= 0.0 => Duration::ZERO,
            Some(wait) => Duration::try_from_secs_f64(wait).unwrap_or(Duration::MAX),
        }
    }

    /// Whether the scene ends after this node.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Deserialize)]
struct RawNode {
    speaker: Option<String>,
    text: Option<String>,
    wait: Option<f64>,
    next: Option<RawNext>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNext {
    Goto(String),
    Choice(serde_json::Map<String, Value>),
}

impl RawNode {
    fn into_node(self, node_id: &str) -> Result<Node, SceneError> {
        let next = match self.next {
            None => None,
            Some(RawNext::Goto(target)) => Some(NextRule::Goto(target)),
            Some(RawNext::Choice(map)) => {
                let mut choices = Vec::with_capacity(map.len());
                for (label, target) in map {
                    let Value::String(target) = target else {
                        return Err(SceneError::MalformedGraph(format!(
                            "node '{node_id}' choice '{label}' target is not a string"
                        )));
                    };
                    choices.push(Choice { label, target });
                }
                Some(NextRule::Choice(choices))
            }
        };
        Ok(Node {
            speaker: self.speaker,
            text: self.text,
            wait: self.wait,
            next,
        })
    }
}

/// A parsed dialogue graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    name: String,
    order: Vec<String>,
    nodes: HashMap<String, Node>,
}

impl SceneGraph {
    /// Builds a graph from a raw scene document.
    ///
    /// Nodes may omit `speaker` or `text`; those gaps are reported by
    /// validation and by the transitions that need them. Target references
    /// are not checked here.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::MalformedGraph` if any node is not an object or
    /// has a field of the wrong type. No partial graph is ever returned.
    pub fn from_document(name: &str, document: &SceneDocument) -> Result<Self, SceneError> {
        let mut order = Vec::with_capacity(document.len());
        let mut nodes = HashMap::with_capacity(document.len());
        for (node_id, value) in document {
            let raw: RawNode = RawNode::deserialize(value).map_err(|e| {
                SceneError::MalformedGraph(format!("{name}: node '{node_id}': {e}"))
            })?;
            nodes.insert(node_id.clone(), raw.into_node(node_id)?);
            order.push(node_id.clone());
        }
        Ok(Self {
            name: name.to_owned(),
            order,
            nodes,
        })
    }

    /// The scene name the graph was loaded under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Node ids in document order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> SceneDocument {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_from_document_applies_defaults() {
        // Arrange
        let doc = document(json!({
            "start": { "speaker": "Orlin", "text": "Welcome.", "next": "end" },
            "end": { "speaker": "CloudBelle", "text": "Farewell.", "wait": 0.5 }
        }));

        // Act
        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        // Assert
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec!["start", "end"]);
        let start = graph.node("start").unwrap();
        assert_eq!(start.speaker.as_deref(), Some("Orlin"));
        assert_eq!(start.wait_duration(DEFAULT_WAIT), Duration::from_secs(2));
        assert_eq!(start.wait_duration(Duration::from_secs(7)), Duration::from_secs(7));
        assert_eq!(start.next, Some(NextRule::Goto("end".into())));
        let end = graph.node("end").unwrap();
        assert!(end.is_terminal());
        assert_eq!(end.wait_duration(DEFAULT_WAIT), Duration::from_millis(500));
    }

    #[test]
    fn test_choice_prefers_continue_over_earlier_labels() {
        let doc = document(json!({
            "start": { "speaker": "A", "text": "?", "next": { "yes": "nodeY", "continue": "nodeC" } }
        }));

        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        let next = graph.node("start").unwrap().next.as_ref().unwrap();
        assert_eq!(next.resolve(), Some("nodeC"));
        assert_eq!(next.targets(), vec!["nodeY", "nodeC"]);
    }

    #[test]
    fn test_choice_without_continue_takes_first_in_document_order() {
        let doc = document(json!({
            "start": { "speaker": "A", "text": "?", "next": { "zeta": "z", "alpha": "a" } }
        }));

        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        let next = graph.node("start").unwrap().next.as_ref().unwrap();
        assert_eq!(next.resolve(), Some("z"));
    }

    #[test]
    fn test_empty_choice_resolves_to_nothing() {
        assert_eq!(NextRule::Choice(Vec::new()).resolve(), None);
    }

    #[test]
    fn test_null_next_is_terminal() {
        let doc = document(json!({ "start": { "speaker": "A", "text": "bye", "next": null } }));

        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        assert!(graph.node("start").unwrap().is_terminal());
    }

    #[test]
    fn test_missing_speaker_is_tolerated_at_load() {
        let doc = document(json!({ "start": { "text": "who said that?" } }));

        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        assert!(graph.node("start").unwrap().speaker.is_none());
    }

    #[test]
    fn test_non_object_node_is_malformed() {
        let doc = document(json!({ "start": "just a string" }));

        let err = SceneGraph::from_document("g.json", &doc).unwrap_err();

        assert!(matches!(err, SceneError::MalformedGraph(_)));
    }

    #[test]
    fn test_numeric_next_is_malformed() {
        let doc = document(json!({ "start": { "speaker": "A", "text": "x", "next": 7 } }));

        let err = SceneGraph::from_document("g.json", &doc).unwrap_err();

        assert!(matches!(err, SceneError::MalformedGraph(_)));
    }

    #[test]
    fn test_non_string_choice_target_is_malformed() {
        let doc = document(json!({ "start": { "speaker": "A", "text": "x", "next": { "yes": 1 } } }));

        let err = SceneGraph::from_document("g.json", &doc).unwrap_err();

        assert!(matches!(err, SceneError::MalformedGraph(_)));
    }

    #[test]
    fn test_negative_wait_clamps_to_zero() {
        let node = Node {
            speaker: Some("A".into()),
            text: Some("x".into()),
            wait: Some(-3.0),
            next: None,
        };

        assert_eq!(node.wait_duration(DEFAULT_WAIT), Duration::ZERO);
    }

    #[test]
    fn test_huge_and_infinite_waits_saturate() {
        let node = |wait: f64| Node {
            speaker: Some("A".into()),
            text: Some("x".into()),
            wait: Some(wait),
            next: None,
        };

        assert_eq!(node(1e20).wait_duration(DEFAULT_WAIT), Duration::MAX);
        assert_eq!(node(f64::INFINITY).wait_duration(DEFAULT_WAIT), Duration::MAX);
        assert_eq!(node(f64::NAN).wait_duration(DEFAULT_WAIT), Duration::ZERO);
    }

    #[test]
    fn test_blank_speaker_is_not_declared() {
        let doc = document(json!({
            "start": { "speaker": "", "text": "x", "next": "b" },
            "b": { "speaker": "   ", "text": "y" },
            "c": { "speaker": "Orlin", "text": "z" }
        }));

        let graph = SceneGraph::from_document("g.json", &doc).unwrap();

        assert_eq!(graph.node("start").unwrap().declared_speaker(), None);
        assert_eq!(graph.node("b").unwrap().declared_speaker(), None);
        assert_eq!(graph.node("c").unwrap().declared_speaker(), Some("Orlin"));
    }
}
