use serde::{Deserialize, Serialize};

/// A main topic and its ordered subtopic names.
///
/// Serialized as `{"topic": ..., "subtopics": [...]}`, the shape the topic
/// search returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNode {
    #[serde(rename = "topic")]
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

impl TopicNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtopics: Vec::new(),
        }
    }

    pub fn with_subtopics<I, S>(name: impl Into<String>, subtopics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            subtopics: subtopics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_subtopic(&self, name: &str) -> bool {
        self.subtopics.iter().any(|s| s == name)
    }
}

pub fn find_topic<'a>(hierarchy: &'a [TopicNode], name: &str) -> Option<&'a TopicNode> {
    hierarchy.iter().find(|n| n.name == name)
}

pub fn find_topic_mut<'a>(hierarchy: &'a mut [TopicNode], name: &str) -> Option<&'a mut TopicNode> {
    hierarchy.iter_mut().find(|n| n.name == name)
}

/// The main topic that lists `subtopic`, if any.
pub fn parent_of<'a>(hierarchy: &'a [TopicNode], subtopic: &str) -> Option<&'a str> {
    hierarchy
        .iter()
        .find(|n| n.has_subtopic(subtopic))
        .map(|n| n.name.as_str())
}

/// True when `name` appears anywhere in the tree.
pub fn contains(hierarchy: &[TopicNode], name: &str) -> bool {
    hierarchy
        .iter()
        .any(|n| n.name == name || n.has_subtopic(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_topic_key() {
        let node = TopicNode::with_subtopics("Intro", ["History"]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"topic": "Intro", "subtopics": ["History"]})
        );
    }

    #[test]
    fn missing_subtopics_default_to_empty() {
        let node: TopicNode = serde_json::from_str(r#"{"topic":"Solo"}"#).unwrap();
        assert!(node.subtopics.is_empty());
    }

    #[test]
    fn lookups() {
        let h = vec![
            TopicNode::with_subtopics("A", ["a1", "a2"]),
            TopicNode::new("B"),
        ];
        assert_eq!(parent_of(&h, "a2"), Some("A"));
        assert_eq!(parent_of(&h, "B"), None);
        assert!(contains(&h, "B"));
        assert!(contains(&h, "a1"));
        assert!(!contains(&h, "zzz"));
        assert!(find_topic(&h, "A").is_some());
    }
}
