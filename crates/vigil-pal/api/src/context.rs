use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rustc_hash::FxHashMap;
use vigil_log::{debug, trace};

use crate::{
    command_list::TrackedResource,
    config::TrackingConfig,
    garbage::{Garbage, GarbageCollector, TimelineValues},
    queue::Queue,
    resource::ResourceId,
    tracking::{GlobalStateTable, LocalStateTracker},
    types::QueueType,
    Backend, DeviceProperties,
};

/// The context is the entry point for Pal. It is used to create all other Pal objects.
///
/// A context drives one device. Multi-adapter setups create one context per device, which may
/// share a single [`GlobalStateTable`] since resource ids never collide.
pub struct Context<B: Backend>(pub(crate) Arc<ContextInner<B>>);

pub struct ContextCreateInfo {
    /// The context *should* use the provided debug name in diagnostics.
    pub debug_name: Option<String>,
    pub tracking: TrackingConfig,
    /// Table to publish resource states into. A new table is created when `None`.
    pub state_table: Option<Arc<GlobalStateTable>>,
}

pub(crate) struct ContextInner<B: Backend> {
    pub backend: B,
    pub states: Arc<GlobalStateTable>,
    pub config: TrackingConfig,
    pub debug_name: Option<String>,
    queues: [Mutex<QueueState<B>>; 3],
    garbage: GarbageCollector<B>,
}

/// Submission state of a single queue. Held for the entire submission so that pending
/// resolution and final state commits happen in submission order.
pub(crate) struct QueueState<B: Backend> {
    /// The last fence value handed to the backend.
    pub last_value: u64,
    /// Lists waiting for their submission to complete before they can be reused.
    in_flight: VecDeque<RecycledList<B>>,
    /// Total number of native lists allocated for this queue.
    list_count: usize,
}

/// The reusable parts of a submitted command list.
pub(crate) struct RecycledList<B: Backend> {
    pub native: B::CommandList,
    pub tracker: LocalStateTracker,
    /// Resources referenced by the list while it is recorded. Released on submission, after
    /// which the garbage collector keeps their native objects alive until the GPU is done.
    pub resources: FxHashMap<ResourceId, TrackedResource<B>>,
    /// Fence value that must be reached before this list can be reused.
    pub target: u64,
}

impl<B: Backend> Context<B> {
    /// Creates a new Pal instance with a default configuration.
    ///
    /// # Arguments
    ///
    /// - `backend` - A backend object selected based on your system. See `/backends/` for a
    /// selection to choose from.
    #[inline(always)]
    pub fn new(backend: B) -> Self {
        Self::with_create_info(
            backend,
            ContextCreateInfo {
                debug_name: None,
                tracking: TrackingConfig::default(),
                state_table: None,
            },
        )
    }

    pub fn with_create_info(backend: B, create_info: ContextCreateInfo) -> Self {
        let states = create_info.state_table.unwrap_or_default();
        debug!(
            "creating context {:?} on device `{}`",
            create_info.debug_name,
            unsafe { backend.properties() }.name
        );

        Self(Arc::new(ContextInner {
            backend,
            states,
            config: create_info.tracking,
            debug_name: create_info.debug_name,
            queues: [
                Mutex::new(QueueState::new()),
                Mutex::new(QueueState::new()),
                Mutex::new(QueueState::new()),
            ],
            garbage: GarbageCollector::new(),
        }))
    }

    /// Gets a reference to the main queue.
    #[inline(always)]
    pub fn main(&self) -> Queue<B> {
        Queue::new(self.clone(), QueueType::Main)
    }

    /// Gets a reference to the async transfer queue. Lists recorded for this queue may only
    /// use copy states.
    #[inline(always)]
    pub fn transfer(&self) -> Queue<B> {
        Queue::new(self.clone(), QueueType::Transfer)
    }

    /// Gets a reference to the async compute queue.
    #[inline(always)]
    pub fn compute(&self) -> Queue<B> {
        Queue::new(self.clone(), QueueType::Compute)
    }

    #[inline(always)]
    pub fn queue(&self, ty: QueueType) -> Queue<B> {
        Queue::new(self.clone(), ty)
    }

    /// The table every resource created from this context publishes its state to.
    #[inline(always)]
    pub fn state_table(&self) -> &Arc<GlobalStateTable> {
        &self.0.states
    }

    #[inline(always)]
    pub fn config(&self) -> &TrackingConfig {
        &self.0.config
    }

    #[inline(always)]
    pub fn backend(&self) -> &B {
        &self.0.backend
    }

    #[inline(always)]
    pub fn properties(&self) -> &DeviceProperties {
        unsafe { self.0.backend.properties() }
    }

    #[inline(always)]
    pub fn debug_name(&self) -> Option<&str> {
        self.0.debug_name.as_deref()
    }

    /// Blocks until every queue has finished all submitted work and destroys every dropped
    /// resource.
    pub fn wait_idle(&self) {
        for ty in QueueType::ALL {
            self.queue(ty).wait_idle();
        }
    }

    /// Returns `true` if both contexts refer to the same device.
    #[inline(always)]
    pub fn same_device(&self, other: &Context<B>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline(always)]
    pub(crate) fn queue_state(&self, ty: QueueType) -> MutexGuard<'_, QueueState<B>> {
        self.0.queues[ty.as_idx()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of dropped resources whose native objects are waiting for the GPU.
    #[inline(always)]
    pub fn pending_destruction(&self) -> usize {
        self.0.garbage.len()
    }

    /// Called when the last handle to a resource drops. The state entry is removed right away
    /// and the native object is destroyed once every queue has finished the work submitted so
    /// far.
    ///
    /// Must not be called while holding a queue state lock or the global table lock.
    pub(crate) fn release(&self, id: ResourceId, garbage: Garbage<B>) {
        self.0.states.remove_entry(id);

        let mut values = TimelineValues::default();
        for ty in QueueType::ALL {
            values.set(ty, self.queue_state(ty).last_value);
        }
        self.0.garbage.push(garbage, values);
        self.collect_garbage();
    }

    /// Destroys every dropped resource the GPU is done with.
    pub(crate) fn collect_garbage(&self) {
        let mut current = TimelineValues::default();
        for ty in QueueType::ALL {
            current.set(ty, unsafe { self.0.backend.completed_value(ty) });
        }

        let destroyed = self.0.garbage.cleanup(&self.0.backend, current);
        if destroyed > 0 {
            trace!("destroyed {destroyed} dropped resource(s)");
        }
    }
}

impl<B: Backend> Drop for ContextInner<B> {
    fn drop(&mut self) {
        for ty in QueueType::ALL {
            let last_value = self.queues[ty.as_idx()]
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .last_value;
            unsafe {
                self.backend.wait_on(ty, last_value, None);
            }
        }
        self.garbage.cleanup_all(&self.backend);
    }
}

impl<B: Backend> Clone for Context<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: Backend> QueueState<B> {
    fn new() -> Self {
        Self {
            last_value: 0,
            in_flight: VecDeque::default(),
            list_count: 0,
        }
    }

    /// Gets a list whose previous submission has completed, or allocates a new one.
    pub fn acquire(&mut self, backend: &B, ty: QueueType, completed: u64) -> RecycledList<B> {
        let recycled = match self.in_flight.front() {
            Some(front) if front.target <= completed => self.in_flight.pop_front(),
            _ => None,
        };

        match recycled {
            Some(mut list) => {
                debug_assert!(list.resources.is_empty());
                list.tracker.reset();
                list
            }
            None => {
                self.list_count += 1;
                debug!("allocating command list #{} for {ty:?} queue", self.list_count);

                RecycledList {
                    native: unsafe { backend.create_command_list(ty) },
                    tracker: LocalStateTracker::default(),
                    resources: FxHashMap::default(),
                    target: 0,
                }
            }
        }
    }

    /// Returns a submitted list to the pool.
    #[inline(always)]
    pub fn retire(&mut self, list: RecycledList<B>) {
        debug_assert!(list.target <= self.last_value);
        self.in_flight.push_back(list);
    }

    /// Number of native lists allocated for this queue so far.
    #[inline(always)]
    pub fn list_count(&self) -> usize {
        self.list_count
    }
}
