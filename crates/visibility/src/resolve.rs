//! Visibility resolution.

use crate::PropertySet;

/// Outcome of resolving what a requester may see of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Nothing may be revealed, not even that the record exists.
    Absent,
    /// The properties that may be revealed, in whitelist order.
    Visible(PropertySet),
}

impl Visibility {
    /// Intersect the role whitelist with the optional context whitelist.
    ///
    /// The result never contains a name missing from `role_visible`, and never
    /// one missing from `context_visible` when that is supplied. An empty
    /// intersection is [`Visibility::Absent`].
    pub fn resolve(role_visible: &PropertySet, context_visible: Option<&PropertySet>) -> Self {
        let visible = match context_visible {
            Some(context) => role_visible.intersect(context),
            None => role_visible.clone(),
        };
        if visible.is_empty() {
            Visibility::Absent
        } else {
            Visibility::Visible(visible)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Visibility::Absent)
    }

    pub fn properties(&self) -> Option<&PropertySet> {
        match self {
            Visibility::Absent => None,
            Visibility::Visible(set) => Some(set),
        }
    }
}
