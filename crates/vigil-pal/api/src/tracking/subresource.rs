use std::collections::BTreeMap;

use crate::{resource::Subresource, types::ResourceState};

/// The state of every subresource of a single resource.
///
/// Most resources are only ever used as a whole, so the state is stored as one uniform value.
/// Individual subresources (e.g. mip levels during mip generation) get an override entry when
/// they diverge. Setting [`Subresource::All`] collapses back to the uniform representation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubresourceState {
    uniform: ResourceState,
    /// Sorted so that fan-out over divergent subresources is deterministic.
    overrides: BTreeMap<u32, ResourceState>,
}

impl SubresourceState {
    #[inline(always)]
    pub fn new(state: ResourceState) -> Self {
        Self {
            uniform: state,
            overrides: BTreeMap::default(),
        }
    }

    #[inline(always)]
    pub fn set(&mut self, subresource: Subresource, state: ResourceState) {
        match subresource {
            Subresource::All => {
                self.uniform = state;
                self.overrides.clear();
            }
            Subresource::Index(idx) => {
                self.overrides.insert(idx, state);
            }
        }
    }

    #[inline(always)]
    pub fn get(&self, subresource: Subresource) -> ResourceState {
        match subresource {
            Subresource::All => self.uniform,
            Subresource::Index(idx) => self.overrides.get(&idx).copied().unwrap_or(self.uniform),
        }
    }

    /// The state of every subresource without an override.
    #[inline(always)]
    pub fn uniform(&self) -> ResourceState {
        self.uniform
    }

    /// `true` if no subresource has diverged from the uniform state.
    #[inline(always)]
    pub fn is_uniform(&self) -> bool {
        self.overrides.is_empty()
    }

    /// `true` if subresource `idx` has its own state.
    #[inline(always)]
    pub fn is_overridden(&self, idx: u32) -> bool {
        self.overrides.contains_key(&idx)
    }

    #[inline(always)]
    pub fn overrides(&self) -> impl Iterator<Item = (u32, ResourceState)> + '_ {
        self.overrides.iter().map(|(idx, state)| (*idx, *state))
    }

    /// Iterates over the state of every subresource in `0..count`, in index order.
    #[inline(always)]
    pub fn each(&self, count: u32) -> impl Iterator<Item = (u32, ResourceState)> + '_ {
        (0..count).map(move |idx| (idx, self.get(Subresource::Index(idx))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_overwrites_and_collapses() {
        let mut state = SubresourceState::new(ResourceState::COMMON);
        state.set(Subresource::Index(2), ResourceState::COPY_DEST);
        assert!(!state.is_uniform());

        state.set(Subresource::All, ResourceState::RENDER_TARGET);
        assert!(state.is_uniform());
        for i in 0..8 {
            assert_eq!(
                state.get(Subresource::Index(i)),
                ResourceState::RENDER_TARGET
            );
        }
    }

    #[test]
    fn overrides_fall_back_to_uniform() {
        let mut state = SubresourceState::default();
        state.set(Subresource::All, ResourceState::PIXEL_SHADER_RESOURCE);
        state.set(Subresource::Index(3), ResourceState::UNORDERED_ACCESS);

        assert_eq!(
            state.get(Subresource::Index(3)),
            ResourceState::UNORDERED_ACCESS
        );
        assert_eq!(
            state.get(Subresource::Index(5)),
            ResourceState::PIXEL_SHADER_RESOURCE
        );
        assert_eq!(state.get(Subresource::All), ResourceState::PIXEL_SHADER_RESOURCE);
    }

    #[test]
    fn each_walks_every_subresource() {
        let mut state = SubresourceState::new(ResourceState::COPY_SOURCE);
        state.set(Subresource::Index(1), ResourceState::COPY_DEST);

        let states: Vec<_> = state.each(3).collect();
        assert_eq!(
            states,
            vec![
                (0, ResourceState::COPY_SOURCE),
                (1, ResourceState::COPY_DEST),
                (2, ResourceState::COPY_SOURCE),
            ]
        );
    }
}
