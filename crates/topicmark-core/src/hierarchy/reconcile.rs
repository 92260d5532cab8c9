//! Conversion between the topic tree and the flat records stored in a plan.
//!
//! The tree is authoritative for structure and order when saving; the flat
//! records are authoritative for content. `order` values written here are
//! `i` for the main topic at index `i` and `i * 100 + j` for its subtopic at
//! index `j`.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use topicmark_db::models::{FlatTopicRecord, TopicRole};

use super::model::{self, TopicNode};

/// Topic name to MDX content, as edited in the current session.
pub type ContentMap = BTreeMap<String, String>;

const SUBTOPIC_STRIDE: i64 = 100;

/// Flatten `hierarchy` into the records to persist.
///
/// Content for each node comes from `session_content`, then from the
/// matching record in `existing_plan`, then defaults to empty. Records with
/// content that the tree no longer mentions are carried over after the
/// ordered ones, as is session content for unknown nodes.
pub fn flatten_for_save(
    hierarchy: &[TopicNode],
    session_content: &ContentMap,
    existing_plan: Option<&[FlatTopicRecord]>,
    main_topic: &str,
) -> Vec<FlatTopicRecord> {
    let existing = existing_plan.unwrap_or_default();

    let mut persisted: HashMap<&str, &FlatTopicRecord> = HashMap::new();
    for record in existing {
        persisted.entry(record.topic.as_str()).or_insert(record);
    }
    let resolve = |name: &str| -> String {
        session_content
            .get(name)
            .or_else(|| persisted.get(name).map(|r| &r.mdx_content))
            .cloned()
            .unwrap_or_default()
    };

    let mut records = Vec::new();
    let mut emitted: HashSet<&str> = HashSet::new();

    for (i, node) in (0_i64..).zip(hierarchy) {
        if emitted.insert(&node.name) {
            records.push(
                FlatTopicRecord::root(&node.name, resolve(&node.name))
                    .with_main_topic(main_topic)
                    .with_order(i),
            );
        }
        for (j, sub) in (0_i64..).zip(&node.subtopics) {
            if !emitted.insert(sub) {
                continue;
            }
            records.push(
                FlatTopicRecord::child(sub, &node.name, resolve(sub))
                    .with_main_topic(main_topic)
                    .with_order(i * SUBTOPIC_STRIDE + j),
            );
        }
    }

    for record in existing {
        if !record.has_content() || emitted.contains(record.topic.as_str()) {
            continue;
        }
        emitted.insert(&record.topic);
        records.push(carry_over(record, hierarchy, main_topic));
    }

    for (name, content) in session_content {
        if content.trim().is_empty() || emitted.contains(name.as_str()) {
            continue;
        }
        emitted.insert(name);
        let record = if name == main_topic {
            FlatTopicRecord::root(name, content.clone())
        } else {
            warn!(topic = %name, main_topic, "content for a topic outside the hierarchy; attaching to main topic");
            FlatTopicRecord::child(name, main_topic, content.clone())
        };
        records.push(record.with_main_topic(main_topic));
    }

    // Unordered records keep their relative position after the ordered ones.
    records.sort_by_key(|r| (r.order.is_none(), r.order));
    records
}

fn carry_over(record: &FlatTopicRecord, hierarchy: &[TopicNode], main_topic: &str) -> FlatTopicRecord {
    let mut out = record.clone();
    out.order = None;
    out.main_topic = Some(main_topic.to_owned());
    match record.role() {
        TopicRole::Root => out.parent_topic = Some(record.topic.clone()),
        TopicRole::Child { parent } if model::find_topic(hierarchy, parent).is_some() => {}
        TopicRole::Child { parent } => {
            warn!(topic = %record.topic, parent, main_topic, "parent not in hierarchy; attaching to main topic");
            out.parent_topic = Some(main_topic.to_owned());
        }
        TopicRole::Orphan => out.parent_topic = Some(main_topic.to_owned()),
    }
    out
}

/// Rebuild the topic tree from stored records.
///
/// Main topics are the root records. With no root records, every distinct
/// `parentTopic` becomes a main topic; with no parents at all, every record
/// does. Subtopics are grouped under their parent in input order, and a
/// parent that is referenced but never stored is appended as a main topic.
/// When every record carries `order`, records are sorted by it first.
pub fn reconstruct_hierarchy(records: &[FlatTopicRecord]) -> Vec<TopicNode> {
    let mut sorted: Vec<&FlatTopicRecord> = records.iter().collect();
    if sorted.iter().all(|r| r.order.is_some()) {
        sorted.sort_by_key(|r| r.order);
    }

    let mut tree = TreeBuilder::default();

    for record in sorted.iter().filter(|r| r.role() == TopicRole::Root) {
        tree.ensure(&record.topic, record.order);
    }

    if tree.is_empty() {
        for parent in sorted.iter().filter_map(|r| r.parent_topic.as_deref()) {
            let order = sorted
                .iter()
                .find(|r| r.topic == parent)
                .and_then(|r| r.order);
            tree.ensure(parent, order);
        }
    }

    if tree.is_empty() {
        for record in &sorted {
            tree.ensure(&record.topic, record.order);
        }
        return tree.finish();
    }

    for record in &sorted {
        match record.role() {
            TopicRole::Root => {}
            TopicRole::Child { parent } => {
                if tree.has_parent(&record.topic) {
                    continue;
                }
                let idx = tree.ensure(parent, None);
                tree.add_subtopic(idx, &record.topic);
            }
            TopicRole::Orphan => {
                warn!(topic = %record.topic, "subtopic without parent skipped");
            }
        }
    }

    tree.finish()
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<(TopicNode, Option<i64>)>,
}

impl TreeBuilder {
    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn has_parent(&self, name: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n.name == name)
    }

    fn ensure(&mut self, name: &str, order: Option<i64>) -> usize {
        if let Some(idx) = self.nodes.iter().position(|(n, _)| n.name == name) {
            return idx;
        }
        self.nodes.push((TopicNode::new(name), order));
        self.nodes.len() - 1
    }

    fn add_subtopic(&mut self, idx: usize, name: &str) {
        let node = &mut self.nodes[idx].0;
        if !node.has_subtopic(name) {
            node.subtopics.push(name.to_owned());
        }
    }

    fn finish(mut self) -> Vec<TopicNode> {
        if self.nodes.iter().all(|(_, order)| order.is_some()) {
            self.nodes.sort_by_key(|(_, order)| *order);
        }
        self.nodes.into_iter().map(|(node, _)| node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(h: &[TopicNode]) -> Vec<(&str, Vec<&str>)> {
        h.iter()
            .map(|n| {
                (
                    n.name.as_str(),
                    n.subtopics.iter().map(String::as_str).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn flatten_assigns_orders_and_parents() {
        let h = vec![TopicNode::with_subtopics("Intro", ["History", "Basics"])];
        let mut content = ContentMap::new();
        content.insert("History".into(), "Hello".into());

        let flat = flatten_for_save(&h, &content, None, "Intro");

        assert_eq!(
            flat,
            vec![
                FlatTopicRecord::root("Intro", "")
                    .with_main_topic("Intro")
                    .with_order(0),
                FlatTopicRecord::child("History", "Intro", "Hello")
                    .with_main_topic("Intro")
                    .with_order(0),
                FlatTopicRecord::child("Basics", "Intro", "")
                    .with_main_topic("Intro")
                    .with_order(1),
            ]
        );
    }

    #[test]
    fn flatten_second_topic_uses_stride() {
        let h = vec![
            TopicNode::with_subtopics("A", ["a1"]),
            TopicNode::with_subtopics("B", ["b1", "b2"]),
        ];
        let flat = flatten_for_save(&h, &ContentMap::new(), None, "Main");
        let orders: Vec<(&str, Option<i64>)> =
            flat.iter().map(|r| (r.topic.as_str(), r.order)).collect();
        assert_eq!(
            orders,
            vec![
                ("A", Some(0)),
                ("a1", Some(0)),
                ("B", Some(1)),
                ("b1", Some(100)),
                ("b2", Some(101)),
            ]
        );
    }

    #[test]
    fn session_content_beats_persisted_content() {
        let h = vec![TopicNode::with_subtopics("A", ["a1", "a2"])];
        let existing = vec![
            FlatTopicRecord::child("a1", "A", "old"),
            FlatTopicRecord::child("a2", "A", "kept"),
        ];
        let mut content = ContentMap::new();
        content.insert("a1".into(), "new".into());

        let flat = flatten_for_save(&h, &content, Some(&existing), "A");
        let a1 = flat.iter().find(|r| r.topic == "a1").unwrap();
        let a2 = flat.iter().find(|r| r.topic == "a2").unwrap();
        assert_eq!(a1.mdx_content, "new");
        assert_eq!(a2.mdx_content, "kept");
    }

    #[test]
    fn carried_over_records_follow_ordered_ones() {
        let h = vec![TopicNode::new("A")];
        let existing = vec![
            FlatTopicRecord::child("Lost", "Gone", "body").with_order(3),
            FlatTopicRecord::child("Empty", "A", "  "),
            FlatTopicRecord::child("Stray", "A", "text"),
        ];

        let flat = flatten_for_save(&h, &ContentMap::new(), Some(&existing), "Main");

        let topics: Vec<&str> = flat.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["A", "Lost", "Stray"]);

        let lost = &flat[1];
        assert_eq!(lost.order, None);
        assert_eq!(lost.parent_topic.as_deref(), Some("Main"));
        assert_eq!(lost.main_topic.as_deref(), Some("Main"));

        let stray = &flat[2];
        assert_eq!(stray.parent_topic.as_deref(), Some("A"));
    }

    #[test]
    fn session_only_content_is_appended_under_main_topic() {
        let h = vec![TopicNode::new("A")];
        let mut content = ContentMap::new();
        content.insert("Extra".into(), "x".into());
        content.insert("Blank".into(), "".into());

        let flat = flatten_for_save(&h, &content, None, "A");
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].topic, "Extra");
        assert!(flat[1].is_subtopic);
        assert_eq!(flat[1].parent_topic.as_deref(), Some("A"));
    }

    #[test]
    fn duplicate_names_are_emitted_once() {
        let h = vec![
            TopicNode::with_subtopics("A", ["x", "x"]),
            TopicNode::new("A"),
        ];
        let flat = flatten_for_save(&h, &ContentMap::new(), None, "A");
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn membership_round_trips() {
        let h = vec![
            TopicNode::with_subtopics("Intro", ["History", "Basics"]),
            TopicNode::new("Lone"),
            TopicNode::with_subtopics("Advanced", ["Fields", "Waves", "Quanta"]),
        ];
        let flat = flatten_for_save(&h, &ContentMap::new(), None, "Physics");
        assert_eq!(reconstruct_hierarchy(&flat), h);
    }

    #[test]
    fn order_round_trips_from_shuffled_records() {
        let h = vec![
            TopicNode::with_subtopics("B", ["b2", "b1"]),
            TopicNode::with_subtopics("A", ["a1"]),
        ];
        let mut flat = flatten_for_save(&h, &ContentMap::new(), None, "M");
        flat.reverse();
        assert_eq!(reconstruct_hierarchy(&flat), h);
    }

    #[test]
    fn synthesizes_parent_when_no_roots() {
        let records = vec![
            FlatTopicRecord::child("one", "X", "1"),
            FlatTopicRecord::child("two", "X", "2"),
            FlatTopicRecord::child("three", "X", "3"),
        ];
        let h = reconstruct_hierarchy(&records);
        assert_eq!(names(&h), vec![("X", vec!["one", "two", "three"])]);
    }

    #[test]
    fn degenerate_records_become_their_own_parents() {
        let orphan = |name: &str| FlatTopicRecord {
            parent_topic: None,
            ..FlatTopicRecord::child(name, "", "")
        };
        let h = reconstruct_hierarchy(&[orphan("p"), orphan("q"), orphan("p")]);
        assert_eq!(names(&h), vec![("p", vec![]), ("q", vec![])]);
    }

    #[test]
    fn unknown_parent_is_appended_and_orphans_dropped() {
        let records = vec![
            FlatTopicRecord::root("A", ""),
            FlatTopicRecord::child("z", "Elsewhere", ""),
            FlatTopicRecord {
                parent_topic: None,
                ..FlatTopicRecord::child("orphan", "", "")
            },
            FlatTopicRecord::child("a1", "A", ""),
            FlatTopicRecord::child("a1", "A", "dup"),
        ];
        let h = reconstruct_hierarchy(&records);
        assert_eq!(names(&h), vec![("A", vec!["a1"]), ("Elsewhere", vec!["z"])]);
    }

    #[test]
    fn parents_keep_input_order_when_orders_are_sparse() {
        let records = vec![
            FlatTopicRecord::root("Second", "").with_order(1),
            FlatTopicRecord::root("First", ""),
        ];
        let h = reconstruct_hierarchy(&records);
        assert_eq!(names(&h), vec![("Second", vec![]), ("First", vec![])]);
    }

    #[test]
    fn reconstruct_of_empty_is_empty() {
        assert!(reconstruct_hierarchy(&[]).is_empty());
    }
}
