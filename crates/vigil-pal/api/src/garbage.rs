use std::sync::{Mutex, PoisonError};

use crate::{types::QueueType, Backend};

/// Native objects whose last handle has dropped but which may still be in use by the GPU.
pub(crate) enum Garbage<B: Backend> {
    Buffer(B::Buffer),
    Texture(B::Texture),
}

/// A fence value for every queue.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct TimelineValues {
    pub main: u64,
    pub transfer: u64,
    pub compute: u64,
}

struct ToDestroy<B: Backend> {
    garbage: Garbage<B>,
    /// Every queue must reach these values before the object can be destroyed.
    values: TimelineValues,
}

/// Defers destruction of native objects until every queue has finished the work submitted
/// before they were dropped.
///
/// Only native objects are kept here, never resource handles, so nothing in the collector
/// refers back to the context that owns it.
pub(crate) struct GarbageCollector<B: Backend> {
    to_destroy: Mutex<Vec<ToDestroy<B>>>,
}

impl TimelineValues {
    #[inline(always)]
    pub fn set(&mut self, queue: QueueType, value: u64) {
        match queue {
            QueueType::Main => self.main = value,
            QueueType::Transfer => self.transfer = value,
            QueueType::Compute => self.compute = value,
        }
    }

    /// `true` if every value of `self` has been reached by `current`.
    #[inline(always)]
    pub fn reached_by(&self, current: &TimelineValues) -> bool {
        self.main <= current.main
            && self.transfer <= current.transfer
            && self.compute <= current.compute
    }
}

impl<B: Backend> GarbageCollector<B> {
    pub fn new() -> Self {
        Self {
            to_destroy: Mutex::new(Vec::default()),
        }
    }

    pub fn push(&self, garbage: Garbage<B>, values: TimelineValues) {
        self.to_destroy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ToDestroy { garbage, values });
    }

    /// Destroys everything the queues are done with. Returns the number of objects destroyed.
    pub fn cleanup(&self, backend: &B, current: TimelineValues) -> usize {
        let ready = {
            let mut to_destroy = self.to_destroy.lock().unwrap_or_else(PoisonError::into_inner);
            let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut *to_destroy)
                .into_iter()
                .partition(|entry| entry.values.reached_by(&current));
            *to_destroy = waiting;
            ready
        };

        let count = ready.len();
        for entry in ready {
            destroy(backend, entry.garbage);
        }
        count
    }

    /// Destroys everything regardless of queue progress. The caller must have waited for every
    /// queue to go idle.
    pub fn cleanup_all(&mut self, backend: &B) {
        let to_destroy = self
            .to_destroy
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in to_destroy.drain(..) {
            destroy(backend, entry.garbage);
        }
    }

    pub fn len(&self) -> usize {
        self.to_destroy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[inline(always)]
fn destroy<B: Backend>(backend: &B, garbage: Garbage<B>) {
    match garbage {
        Garbage::Buffer(mut buffer) => unsafe { backend.destroy_buffer(&mut buffer) },
        Garbage::Texture(mut texture) => unsafe { backend.destroy_texture(&mut texture) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_must_all_be_reached() {
        let target = TimelineValues {
            main: 3,
            transfer: 1,
            compute: 0,
        };

        let mut current = TimelineValues {
            main: 3,
            transfer: 0,
            compute: 7,
        };
        assert!(!target.reached_by(&current));

        current.set(QueueType::Transfer, 1);
        assert_eq!(current.transfer, 1);
        assert!(target.reached_by(&current));
    }
}
