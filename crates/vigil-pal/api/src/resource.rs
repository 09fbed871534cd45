use std::{
    num::NonZeroU64,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::types::TextureType;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a GPU allocation. Two ids are equal iff they refer to the same allocation.
///
/// Ids are unique for the lifetime of the process and never reused, so a stale id can never
/// alias a newer resource in any state table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    #[inline(always)]
    pub fn new() -> Self {
        ResourceId(next_id(&NEXT_RESOURCE_ID).expect("resource ids are exhausted"))
    }

    #[inline(always)]
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

/// Takes the next value of `counter`. Returns `None` once the counter is exhausted, it never
/// wraps back to a value that was already handed out.
#[inline(always)]
fn next_id(counter: &AtomicU64) -> Option<NonZeroU64> {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
        .ok()
        .and_then(NonZeroU64::new)
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects which part of a resource a transition applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subresource {
    All,
    Index(u32),
}

/// The parts of a resource description that matter for state tracking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture {
        ty: TextureType,
        mip_levels: u32,
        array_layers: u32,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceInfo {
    pub id: ResourceId,
    pub kind: ResourceKind,
}

impl ResourceKind {
    /// Number of individually trackable subresources.
    #[inline(always)]
    pub fn subresource_count(&self) -> u32 {
        match self {
            ResourceKind::Buffer => 1,
            ResourceKind::Texture {
                mip_levels,
                array_layers,
                ..
            } => mip_levels * array_layers,
        }
    }
}

impl ResourceInfo {
    #[inline(always)]
    pub fn buffer(id: ResourceId) -> Self {
        Self {
            id,
            kind: ResourceKind::Buffer,
        }
    }

    #[inline(always)]
    pub fn texture(id: ResourceId, ty: TextureType, mip_levels: u32, array_layers: u32) -> Self {
        Self {
            id,
            kind: ResourceKind::Texture {
                ty,
                mip_levels,
                array_layers,
            },
        }
    }

    #[inline(always)]
    pub fn subresource_count(&self) -> u32 {
        self.kind.subresource_count()
    }

    /// Computes the flat subresource index of a mip level within an array layer. Flattened
    /// like so: L0M0 -> L0M1 -> L0M2 ... L1M0 -> L1M1 -> ...
    ///
    /// # Panics
    /// - If `mip_level` or `array_layer` is out of bounds, or the resource is a buffer and either
    /// is non-zero.
    #[inline(always)]
    pub fn subresource(&self, mip_level: u32, array_layer: u32) -> Subresource {
        match self.kind {
            ResourceKind::Buffer => {
                assert!(
                    mip_level == 0 && array_layer == 0,
                    "buffers only have one subresource"
                );
                Subresource::Index(0)
            }
            ResourceKind::Texture {
                mip_levels,
                array_layers,
                ..
            } => {
                assert!(mip_level < mip_levels, "`mip_level` is out of bounds");
                assert!(array_layer < array_layers, "`array_layer` is out of bounds");
                Subresource::Index(mip_level + array_layer * mip_levels)
            }
        }
    }

    /// Returns `true` if `subresource` names a subresource that exists on this resource.
    #[inline(always)]
    pub fn contains(&self, subresource: Subresource) -> bool {
        match subresource {
            Subresource::All => true,
            Subresource::Index(idx) => idx < self.subresource_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = ResourceId::new();
        let b = ResourceId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn exhausted_counter_never_wraps() {
        let counter = AtomicU64::new(u64::MAX - 1);
        assert_eq!(next_id(&counter).map(NonZeroU64::get), Some(u64::MAX - 1));
        assert_eq!(next_id(&counter), None);
        assert_eq!(next_id(&counter), None);
        assert_eq!(counter.load(Ordering::Relaxed), u64::MAX);
    }

    #[test]
    fn texture_subresource_indexing() {
        let info = ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, 4, 3);
        assert_eq!(info.subresource_count(), 12);
        assert_eq!(info.subresource(0, 0), Subresource::Index(0));
        assert_eq!(info.subresource(3, 0), Subresource::Index(3));
        assert_eq!(info.subresource(1, 2), Subresource::Index(9));
        assert!(info.contains(Subresource::Index(11)));
        assert!(!info.contains(Subresource::Index(12)));
    }

    #[test]
    #[should_panic]
    fn buffer_has_one_subresource() {
        let info = ResourceInfo::buffer(ResourceId::new());
        info.subresource(1, 0);
    }
}
