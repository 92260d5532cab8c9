//! The two-level topic tree and its conversion to and from flat records.

pub mod extract;
pub mod model;
pub mod reconcile;

pub use extract::{ExtractError, extract_hierarchy, strip_frontmatter};
pub use model::TopicNode;
pub use reconcile::{ContentMap, flatten_for_save, reconstruct_hierarchy};
