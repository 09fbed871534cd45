use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use super::{
    barrier::{Barrier, PendingTransition},
    subresource::SubresourceState,
};
use crate::{
    resource::{ResourceId, ResourceInfo, Subresource},
    types::ResourceState,
};

/// Records the barriers a single command list needs without ever looking at global state.
///
/// The first time a subresource is touched, the state it is in is unknown because it depends on
/// every list submitted before this one. Those transitions are kept `pending` and resolved
/// against the [`GlobalStateTable`](super::global::GlobalStateTable) at submission time. Every
/// following transition of the same subresource is resolved locally.
#[derive(Debug, Default)]
pub struct LocalStateTracker {
    pub(super) pending: Vec<PendingTransition>,
    resolved: Vec<Barrier>,
    pub(super) final_state: FxHashMap<ResourceId, TouchedResource>,
    /// Resources in the order they were first touched.
    pub(super) touched: Vec<ResourceId>,
}

#[derive(Debug)]
pub(super) struct TouchedResource {
    pub state: SubresourceState,
    /// `false` while only individual subresources have been touched. In that case, only the
    /// overrides of `state` are meaningful.
    pub uniform_known: bool,
}

impl LocalStateTracker {
    /// Clears everything for a new recording session.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.resolved.clear();
        self.final_state.clear();
        self.touched.clear();
    }

    /// Requests that `subresource` of `resource` be in `after` for the next command.
    ///
    /// # Panics
    /// - In debug builds, if `subresource` does not exist on `resource`.
    pub fn request_transition(
        &mut self,
        resource: &ResourceInfo,
        subresource: Subresource,
        after: ResourceState,
    ) {
        debug_assert!(
            resource.contains(subresource),
            "subresource {subresource:?} is out of bounds for {:?}",
            resource.id
        );

        let touched = match self.final_state.entry(resource.id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                // First touch of this resource in the list
                self.pending.push(PendingTransition {
                    resource: *resource,
                    subresource,
                    after,
                });
                self.touched.push(resource.id);

                let mut state = SubresourceState::new(after);
                state.set(subresource, after);
                entry.insert(TouchedResource {
                    state,
                    uniform_known: subresource == Subresource::All,
                });
                return;
            }
        };

        match subresource {
            Subresource::All if touched.uniform_known && touched.state.is_uniform() => {
                let before = touched.state.uniform();
                if before != after {
                    self.resolved.push(Barrier::transition(
                        resource.id,
                        Subresource::All,
                        before,
                        after,
                    ));
                }
            }
            Subresource::All => {
                // Subresources have diverged (or some were never touched), so every subresource
                // must be handled individually.
                let state = &touched.state;
                for (idx, before) in state.each(resource.subresource_count()) {
                    let known = touched.uniform_known || state.is_overridden(idx);

                    if !known {
                        self.pending.push(PendingTransition {
                            resource: *resource,
                            subresource: Subresource::Index(idx),
                            after,
                        });
                    } else if before != after {
                        self.resolved.push(Barrier::transition(
                            resource.id,
                            Subresource::Index(idx),
                            before,
                            after,
                        ));
                    }
                }
                touched.uniform_known = true;
            }
            Subresource::Index(idx) => {
                let known = touched.uniform_known || touched.state.is_overridden(idx);

                if !known {
                    self.pending.push(PendingTransition {
                        resource: *resource,
                        subresource,
                        after,
                    });
                } else {
                    let before = touched.state.get(subresource);
                    if before != after {
                        self.resolved
                            .push(Barrier::transition(resource.id, subresource, before, after));
                    }
                }
            }
        }

        touched.state.set(subresource, after);
    }

    /// Requests a UAV barrier. `None` synchronizes all unordered access.
    #[inline(always)]
    pub fn uav_barrier(&mut self, resource: Option<ResourceId>) {
        self.resolved.push(Barrier::UnorderedAccess { resource });
    }

    /// Requests an aliasing barrier between two resources sharing memory.
    #[inline(always)]
    pub fn aliasing_barrier(&mut self, before: Option<ResourceId>, after: Option<ResourceId>) {
        self.resolved.push(Barrier::Aliasing { before, after });
    }

    /// Hands all resolved barriers to `record` as a single batch and clears them. Does nothing
    /// if there are no resolved barriers. Returns the number of barriers flushed.
    ///
    /// Pending barriers are untouched. They are handled at submission.
    pub fn flush(&mut self, record: impl FnOnce(&[Barrier])) -> usize {
        if self.resolved.is_empty() {
            return 0;
        }

        let count = self.resolved.len();
        record(&self.resolved);
        self.resolved.clear();
        count
    }

    #[inline(always)]
    pub fn pending(&self) -> &[PendingTransition] {
        &self.pending
    }

    #[inline(always)]
    pub fn resolved(&self) -> &[Barrier] {
        &self.resolved
    }

    #[inline(always)]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Resources touched by this tracker, in the order they were first touched.
    #[inline(always)]
    pub fn touched(&self) -> &[ResourceId] {
        &self.touched
    }

    /// The state `subresource` of `resource` will be in once every recorded command has
    /// executed. `None` if the subresource was never touched by this list.
    pub fn final_state(
        &self,
        resource: ResourceId,
        subresource: Subresource,
    ) -> Option<ResourceState> {
        let touched = self.final_state.get(&resource)?;
        match subresource {
            Subresource::All if touched.uniform_known && touched.state.is_uniform() => {
                Some(touched.state.uniform())
            }
            Subresource::All => None,
            Subresource::Index(idx) => {
                if touched.uniform_known || touched.state.is_overridden(idx) {
                    Some(touched.state.get(subresource))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resource::ResourceId, types::TextureType};

    fn buffer() -> ResourceInfo {
        ResourceInfo::buffer(ResourceId::new())
    }

    fn texture(mips: u32) -> ResourceInfo {
        ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, mips, 1)
    }

    #[test]
    fn first_touch_is_deferred() {
        let mut tracker = LocalStateTracker::default();
        let r = buffer();

        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_DEST);

        assert!(tracker.resolved().is_empty());
        assert_eq!(
            tracker.pending(),
            &[PendingTransition {
                resource: r,
                subresource: Subresource::All,
                after: ResourceState::COPY_DEST,
            }]
        );
        assert_eq!(
            tracker.final_state(r.id, Subresource::All),
            Some(ResourceState::COPY_DEST)
        );
    }

    #[test]
    fn repeated_request_is_elided() {
        let mut tracker = LocalStateTracker::default();
        let r = texture(1);

        for _ in 0..3 {
            tracker.request_transition(&r, Subresource::Index(0), ResourceState::RENDER_TARGET);
        }
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);

        assert_eq!(tracker.pending().len(), 1);
        assert_eq!(
            tracker.resolved(),
            &[Barrier::transition(
                r.id,
                Subresource::Index(0),
                ResourceState::RENDER_TARGET,
                ResourceState::COPY_SOURCE
            )]
        );
    }

    #[test]
    fn second_touch_resolves_locally() {
        let mut tracker = LocalStateTracker::default();
        let r = buffer();

        tracker.request_transition(&r, Subresource::All, ResourceState::RENDER_TARGET);
        tracker.request_transition(&r, Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);

        assert_eq!(tracker.pending().len(), 1);
        assert_eq!(
            tracker.resolved(),
            &[Barrier::transition(
                r.id,
                Subresource::All,
                ResourceState::RENDER_TARGET,
                ResourceState::PIXEL_SHADER_RESOURCE
            )]
        );
        assert_eq!(
            tracker.final_state(r.id, Subresource::All),
            Some(ResourceState::PIXEL_SHADER_RESOURCE)
        );
    }

    #[test]
    fn all_fans_out_over_divergent_subresources() {
        let mut tracker = LocalStateTracker::default();
        let r = texture(3);

        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_DEST);
        tracker.request_transition(&r, Subresource::Index(0), ResourceState::COPY_SOURCE);
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_DEST);

        assert_eq!(
            tracker.resolved(),
            &[
                Barrier::transition(
                    r.id,
                    Subresource::Index(0),
                    ResourceState::COPY_DEST,
                    ResourceState::COPY_SOURCE
                ),
                Barrier::transition(
                    r.id,
                    Subresource::Index(0),
                    ResourceState::COPY_SOURCE,
                    ResourceState::COPY_DEST
                ),
            ]
        );
        assert_eq!(
            tracker.final_state(r.id, Subresource::All),
            Some(ResourceState::COPY_DEST)
        );
    }

    #[test]
    fn untouched_subresources_stay_pending() {
        let mut tracker = LocalStateTracker::default();
        let r = texture(3);

        tracker.request_transition(&r, Subresource::Index(1), ResourceState::RENDER_TARGET);
        assert_eq!(tracker.final_state(r.id, Subresource::Index(0)), None);

        tracker.request_transition(&r, Subresource::Index(2), ResourceState::RENDER_TARGET);
        assert_eq!(tracker.pending().len(), 2);
        assert!(tracker.resolved().is_empty());

        tracker.request_transition(&r, Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);

        // Subresource 0 was never touched, so its transition must wait for submission
        let pending: Vec<_> = tracker.pending().iter().map(|p| p.subresource).collect();
        assert_eq!(
            pending,
            vec![
                Subresource::Index(1),
                Subresource::Index(2),
                Subresource::Index(0)
            ]
        );
        assert_eq!(tracker.resolved().len(), 2);
        assert_eq!(
            tracker.final_state(r.id, Subresource::All),
            Some(ResourceState::PIXEL_SHADER_RESOURCE)
        );
    }

    #[test]
    fn sync_barriers_skip_resolution() {
        let mut tracker = LocalStateTracker::default();
        let a = buffer();
        let b = buffer();

        tracker.uav_barrier(Some(a.id));
        tracker.aliasing_barrier(Some(a.id), Some(b.id));

        assert!(tracker.pending().is_empty());
        assert_eq!(
            tracker.resolved(),
            &[
                Barrier::UnorderedAccess {
                    resource: Some(a.id)
                },
                Barrier::Aliasing {
                    before: Some(a.id),
                    after: Some(b.id)
                },
            ]
        );
        assert!(tracker.touched().is_empty());
    }

    #[test]
    fn flush_drains_resolved_only() {
        let mut tracker = LocalStateTracker::default();
        let r = buffer();

        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_DEST);
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);

        let mut batches = Vec::new();
        assert_eq!(tracker.flush(|barriers| batches.push(barriers.to_vec())), 1);
        assert_eq!(tracker.flush(|barriers| batches.push(barriers.to_vec())), 0);

        assert_eq!(batches.len(), 1);
        assert!(tracker.resolved().is_empty());
        assert!(tracker.has_pending());
    }

    #[test]
    fn reset_forgets_everything() {
        let mut tracker = LocalStateTracker::default();
        let r = buffer();

        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_DEST);
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);
        tracker.reset();

        assert!(!tracker.has_pending());
        assert!(tracker.resolved().is_empty());
        assert!(tracker.touched().is_empty());

        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);
        assert_eq!(tracker.pending().len(), 1);
    }
}
