use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use vigil_log::{trace, warn, TRACKING_TARGET};

use super::{barrier::Barrier, local::LocalStateTracker, subresource::SubresourceState};
use crate::{
    config::MissingStatePolicy,
    resource::{ResourceId, Subresource},
    types::ResourceState,
};

/// The last published state of every tracked resource.
///
/// The table is only written when a resource is created or destroyed and when a command list is
/// submitted, so a single lock over the whole table is enough.
#[derive(Debug, Default)]
pub struct GlobalStateTable {
    states: Mutex<FxHashMap<ResourceId, SubresourceState>>,
}

/// Exclusive access to a [`GlobalStateTable`]. Pending resolution and final state commits can
/// only be performed through a guard so that both happen under the same lock.
pub struct GlobalStateGuard<'a> {
    states: MutexGuard<'a, FxHashMap<ResourceId, SubresourceState>>,
}

impl GlobalStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn lock(&self) -> GlobalStateGuard<'_> {
        GlobalStateGuard {
            // Nothing in the table can be left half written by a panic, so poisoning is ignored.
            states: self.states.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// The published state of `subresource`, or `None` if the resource was never published.
    #[inline(always)]
    pub fn try_get_state(
        &self,
        resource: ResourceId,
        subresource: Subresource,
    ) -> Option<ResourceState> {
        self.lock().get(resource).map(|state| state.get(subresource))
    }

    /// A copy of the full published record of `resource`.
    #[inline(always)]
    pub fn try_get(&self, resource: ResourceId) -> Option<SubresourceState> {
        self.lock().get(resource).cloned()
    }

    /// Overwrites the published state of `subresource`, creating the entry if needed.
    #[inline(always)]
    pub fn set_state(&self, resource: ResourceId, subresource: Subresource, state: ResourceState) {
        self.lock().set_state(resource, subresource, state);
    }

    /// Stops tracking `resource`. Returns `true` if there was an entry to remove.
    #[inline(always)]
    pub fn remove_entry(&self, resource: ResourceId) -> bool {
        self.lock().remove_entry(resource)
    }

    #[inline(always)]
    pub fn contains(&self, resource: ResourceId) -> bool {
        self.lock().get(resource).is_some()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> GlobalStateGuard<'a> {
    #[inline(always)]
    pub fn get(&self, resource: ResourceId) -> Option<&SubresourceState> {
        self.states.get(&resource)
    }

    #[inline(always)]
    pub fn set_state(
        &mut self,
        resource: ResourceId,
        subresource: Subresource,
        state: ResourceState,
    ) {
        self.states
            .entry(resource)
            .or_insert_with(|| SubresourceState::new(state))
            .set(subresource, state);
    }

    #[inline(always)]
    pub fn remove_entry(&mut self, resource: ResourceId) -> bool {
        self.states.remove(&resource).is_some()
    }

    /// Determines the before state of every pending transition of `tracker` and returns the
    /// barriers that are actually needed, in recording order. Clears the pending transitions.
    ///
    /// Must be called before [`commit_final_state`](GlobalStateGuard::commit_final_state) for
    /// the same list, and before the list's commands execute.
    pub fn resolve_pending(
        &self,
        tracker: &mut LocalStateTracker,
        policy: MissingStatePolicy,
    ) -> Vec<Barrier> {
        puffin::profile_function!();

        let mut barriers = Vec::with_capacity(tracker.pending.len());

        for pending in tracker.pending.drain(..) {
            let id = pending.resource.id;
            let global = match self.states.get(&id) {
                Some(global) => global,
                None => {
                    match policy {
                        MissingStatePolicy::Ignore => {}
                        MissingStatePolicy::Warn => warn!(
                            target: TRACKING_TARGET,
                            "resource {id:?} was used without a published state; skipping \
                            transition to {:?}",
                            pending.after
                        ),
                        MissingStatePolicy::Panic => {
                            panic!("resource {id:?} was used without a published state")
                        }
                    }
                    continue;
                }
            };

            match pending.subresource {
                Subresource::All if !global.is_uniform() => {
                    let count = pending.resource.subresource_count();
                    barriers.extend(
                        global
                            .each(count)
                            .filter(|(_, before)| *before != pending.after)
                            .map(|(idx, before)| {
                                Barrier::transition(
                                    id,
                                    Subresource::Index(idx),
                                    before,
                                    pending.after,
                                )
                            }),
                    );
                }
                subresource => {
                    let before = global.get(subresource);
                    if before != pending.after {
                        barriers.push(Barrier::transition(id, subresource, before, pending.after));
                    }
                }
            }
        }

        trace!(
            target: TRACKING_TARGET,
            "resolved {} pending barrier(s)",
            barriers.len()
        );

        barriers
    }

    /// Publishes the final state of every subresource touched by `tracker`, replacing whatever
    /// was published before. Clears the tracked final states.
    pub fn commit_final_state(&mut self, tracker: &mut LocalStateTracker) {
        puffin::profile_function!();

        for id in tracker.touched.drain(..) {
            let touched = match tracker.final_state.remove(&id) {
                Some(touched) => touched,
                None => continue,
            };

            if touched.uniform_known {
                self.states.insert(id, touched.state);
                continue;
            }

            // Only some subresources were used, the rest keep their published state. Without a
            // published entry the state of the others is unknown, so nothing is published.
            match self.states.get_mut(&id) {
                Some(global) => {
                    for (idx, state) in touched.state.overrides() {
                        global.set(Subresource::Index(idx), state);
                    }
                }
                None => trace!(
                    target: TRACKING_TARGET,
                    "resource {id:?} has no published state; partial use is not published"
                ),
            }
        }
        tracker.final_state.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resource::ResourceInfo, types::TextureType};

    fn published(table: &GlobalStateTable, state: ResourceState) -> ResourceInfo {
        let info = ResourceInfo::buffer(ResourceId::new());
        table.set_state(info.id, Subresource::All, state);
        info
    }

    #[test]
    fn unpublished_resource_has_no_state() {
        let table = GlobalStateTable::new();
        assert_eq!(
            table.try_get_state(ResourceId::new(), Subresource::All),
            None
        );
        assert!(table.is_empty());
    }

    #[test]
    fn set_and_remove() {
        let table = GlobalStateTable::new();
        let r = published(&table, ResourceState::COPY_DEST);

        assert_eq!(
            table.try_get_state(r.id, Subresource::Index(0)),
            Some(ResourceState::COPY_DEST)
        );
        assert!(table.remove_entry(r.id));
        assert!(!table.remove_entry(r.id));
        assert!(!table.contains(r.id));
    }

    #[test]
    fn resolution_elides_matching_state() {
        let table = GlobalStateTable::new();
        let r = published(&table, ResourceState::RENDER_TARGET);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::RENDER_TARGET);

        let barriers = table
            .lock()
            .resolve_pending(&mut tracker, MissingStatePolicy::Panic);
        assert!(barriers.is_empty());
        assert!(!tracker.has_pending());
    }

    #[test]
    fn resolution_uses_global_before_state() {
        let table = GlobalStateTable::new();
        let r = published(&table, ResourceState::COMMON);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);

        let barriers = table
            .lock()
            .resolve_pending(&mut tracker, MissingStatePolicy::Panic);
        assert_eq!(
            barriers,
            vec![Barrier::transition(
                r.id,
                Subresource::All,
                ResourceState::COMMON,
                ResourceState::COPY_SOURCE
            )]
        );
    }

    #[test]
    fn resolution_fans_out_over_divergent_global_state() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, 4, 1);
        table.set_state(r.id, Subresource::All, ResourceState::COPY_DEST);
        table.set_state(r.id, Subresource::Index(1), ResourceState::COPY_SOURCE);
        table.set_state(r.id, Subresource::Index(3), ResourceState::PIXEL_SHADER_RESOURCE);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);

        let barriers = table
            .lock()
            .resolve_pending(&mut tracker, MissingStatePolicy::Panic);
        assert_eq!(
            barriers,
            vec![
                Barrier::transition(
                    r.id,
                    Subresource::Index(0),
                    ResourceState::COPY_DEST,
                    ResourceState::PIXEL_SHADER_RESOURCE
                ),
                Barrier::transition(
                    r.id,
                    Subresource::Index(1),
                    ResourceState::COPY_SOURCE,
                    ResourceState::PIXEL_SHADER_RESOURCE
                ),
                Barrier::transition(
                    r.id,
                    Subresource::Index(2),
                    ResourceState::COPY_DEST,
                    ResourceState::PIXEL_SHADER_RESOURCE
                ),
            ]
        );
    }

    #[test]
    fn missing_entry_fails_open() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::buffer(ResourceId::new());

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);

        let barriers = table
            .lock()
            .resolve_pending(&mut tracker, MissingStatePolicy::Ignore);
        assert!(barriers.is_empty());
        assert!(!tracker.has_pending());
    }

    #[test]
    #[should_panic]
    fn missing_entry_can_panic() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::buffer(ResourceId::new());

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::COPY_SOURCE);
        table
            .lock()
            .resolve_pending(&mut tracker, MissingStatePolicy::Panic);
    }

    #[test]
    fn commit_overwrites() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, 2, 1);
        table.set_state(r.id, Subresource::All, ResourceState::COMMON);
        table.set_state(r.id, Subresource::Index(1), ResourceState::UNORDERED_ACCESS);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::All, ResourceState::RENDER_TARGET);
        tracker.request_transition(&r, Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);

        let mut guard = table.lock();
        guard.resolve_pending(&mut tracker, MissingStatePolicy::Panic);
        guard.commit_final_state(&mut tracker);
        std::mem::drop(guard);

        let global = table.try_get(r.id).unwrap();
        assert!(global.is_uniform());
        assert_eq!(global.uniform(), ResourceState::PIXEL_SHADER_RESOURCE);
        assert!(tracker.touched().is_empty());
        assert_eq!(tracker.final_state(r.id, Subresource::All), None);
    }

    #[test]
    fn partial_commit_keeps_untouched_subresources() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, 3, 1);
        table.set_state(r.id, Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::Index(2), ResourceState::RENDER_TARGET);

        let mut guard = table.lock();
        guard.resolve_pending(&mut tracker, MissingStatePolicy::Panic);
        guard.commit_final_state(&mut tracker);
        std::mem::drop(guard);

        assert_eq!(
            table.try_get_state(r.id, Subresource::Index(0)),
            Some(ResourceState::PIXEL_SHADER_RESOURCE)
        );
        assert_eq!(
            table.try_get_state(r.id, Subresource::Index(2)),
            Some(ResourceState::RENDER_TARGET)
        );
    }

    #[test]
    fn partial_commit_without_entry_publishes_nothing() {
        let table = GlobalStateTable::new();
        let r = ResourceInfo::texture(ResourceId::new(), TextureType::Type2D, 3, 1);

        let mut tracker = LocalStateTracker::default();
        tracker.request_transition(&r, Subresource::Index(1), ResourceState::COPY_DEST);

        let mut guard = table.lock();
        guard.resolve_pending(&mut tracker, MissingStatePolicy::Ignore);
        guard.commit_final_state(&mut tracker);
        std::mem::drop(guard);

        assert!(!table.contains(r.id));
        assert!(tracker.touched().is_empty());
    }
}
