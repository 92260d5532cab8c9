//! Who may edit a lesson plan.

/// How a viewer may interact with a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    /// Someone else's public plan.
    ReadOnly,
    /// Someone else's private plan.
    Denied,
}

/// Classify a viewer against a plan's owner and visibility.
///
/// Ownership is only granted on a positive match. An unknown viewer or an
/// unknown owner never owns the plan.
pub fn access_mode(viewer: Option<&str>, owner: Option<&str>, is_public: bool) -> Access {
    match (viewer, owner) {
        (Some(v), Some(o)) if v == o => Access::Owner,
        _ if is_public => Access::ReadOnly,
        _ => Access::Denied,
    }
}

/// Read-only iff the viewer does not own the plan, whatever its visibility.
pub fn is_read_only(viewer: Option<&str>, owner: Option<&str>, is_public: bool) -> bool {
    access_mode(viewer, owner, is_public) != Access::Owner
}
