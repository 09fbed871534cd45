use crate::{
    resource::{ResourceId, ResourceInfo, Subresource},
    types::ResourceState,
};

/// A fully resolved barrier, ready to be recorded into a native command stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Barrier {
    /// The subresource(s) of `resource` move from `before` to `after`.
    Transition {
        resource: ResourceId,
        subresource: Subresource,
        before: ResourceState,
        after: ResourceState,
    },
    /// All unordered access writes to `resource` must complete before any following access.
    /// `None` synchronizes every unordered access.
    UnorderedAccess { resource: Option<ResourceId> },
    /// `after` is about to use memory previously used by `before`. `None` means "any resource
    /// placed in the same memory".
    Aliasing {
        before: Option<ResourceId>,
        after: Option<ResourceId>,
    },
}

/// A transition requested on the first touch of a resource within a command list. The state
/// before the transition is not known until the list is submitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PendingTransition {
    pub resource: ResourceInfo,
    pub subresource: Subresource,
    pub after: ResourceState,
}

impl Barrier {
    #[inline(always)]
    pub fn transition(
        resource: ResourceId,
        subresource: Subresource,
        before: ResourceState,
        after: ResourceState,
    ) -> Self {
        Barrier::Transition {
            resource,
            subresource,
            before,
            after,
        }
    }

    /// The resources this barrier refers to.
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> {
        let (a, b) = match *self {
            Barrier::Transition { resource, .. } => (Some(resource), None),
            Barrier::UnorderedAccess { resource } => (resource, None),
            Barrier::Aliasing { before, after } => (before, after),
        };
        a.into_iter().chain(b)
    }
}
