use std::time::Duration;

use smallvec::SmallVec;
use vigil_log::{trace, TRACKING_TARGET};

use crate::{
    command_list::CommandList,
    context::{Context, RecycledList},
    types::{JobStatus, QueueType},
    Backend,
};

/// A queue is used to [`submit`](Queue::submit) command lists to the GPU.
///
/// # Synchronization
///
/// Lists submitted to the same queue execute in submission order. Submission is also the moment
/// a list's pending transitions are resolved against the global state table and its final states
/// are published, so the table always reflects the states resources will be in once everything
/// submitted so far has executed.
///
/// Queues do not synchronize with each other. A resource written on one queue and read on
/// another requires a [`wait_for`](Queue::wait_for) on the writer's [`Job`].
pub struct Queue<B: Backend> {
    ctx: Context<B>,
    ty: QueueType,
}

/// A job represents an in-flight set of command lists. It *can* be polled from the CPU for the
/// status of the commands.
pub struct Job<B: Backend> {
    ctx: Context<B>,
    queue: QueueType,
    value: u64,
}

impl<B: Backend> Queue<B> {
    pub(crate) fn new(ctx: Context<B>, ty: QueueType) -> Self {
        Self { ctx, ty }
    }

    /// Returns the type of queue `self` is.
    #[inline(always)]
    pub fn ty(&self) -> QueueType {
        self.ty
    }

    /// Begins recording a new command list for this queue.
    ///
    /// # Arguments
    /// - `debug_name` - The backend *should* use the provided debug name for easy identification.
    pub fn command_list(&self, debug_name: Option<&str>) -> CommandList<B> {
        let backend = &self.ctx.0.backend;
        self.ctx.collect_garbage();

        let list = {
            let mut state = self.ctx.queue_state(self.ty);
            let completed = unsafe { backend.completed_value(self.ty) };
            state.acquire(backend, self.ty, completed)
        };

        CommandList::new(self.ctx.clone(), self.ty, list, debug_name)
    }

    /// Closes and submits a single command list.
    #[inline(always)]
    pub fn submit(&self, list: CommandList<B>) -> Job<B> {
        self.submit_batch(std::iter::once(list))
    }

    /// Closes and submits `lists` in order as a single batch.
    ///
    /// The pending transitions of every list are resolved against the global state table, in
    /// order, each followed by the list's final state commit. When resolution produces barriers,
    /// they are recorded into a fixup list which is executed right before the list it belongs to.
    ///
    /// # Panics
    /// - If a list was recorded for a different queue or device.
    pub fn submit_batch(&self, lists: impl IntoIterator<Item = CommandList<B>>) -> Job<B> {
        puffin::profile_function!();

        let backend = &self.ctx.0.backend;
        let config = &self.ctx.0.config;
        let mut released = Vec::default();

        let mut lists: Vec<RecycledList<B>> = lists
            .into_iter()
            .map(|mut list| {
                assert_eq!(
                    list.queue_type(),
                    self.ty,
                    "command list was recorded for a different queue"
                );
                assert!(
                    list.context().same_device(&self.ctx),
                    "command list was recorded for a different device"
                );
                list.close();
                list.into_recycled()
            })
            .collect();

        // The queue state lock is held until the batch is executed so that lists are resolved
        // in the same order they reach the GPU.
        let mut state = self.ctx.queue_state(self.ty);
        let completed = unsafe { backend.completed_value(self.ty) };

        let mut fixups = Vec::with_capacity(lists.len());
        {
            puffin::profile_scope!("resolve_and_commit");
            let mut global = self.ctx.0.states.lock();

            for list in &mut lists {
                let barriers = global.resolve_pending(&mut list.tracker, config.missing_state);
                global.commit_final_state(&mut list.tracker);

                if barriers.is_empty() {
                    fixups.push(None);
                    continue;
                }

                let mut fixup = state.acquire(backend, self.ty, completed);
                unsafe {
                    backend.begin_command_list(&mut fixup.native, Some("fixup"));
                    backend.record_barriers(&mut fixup.native, &barriers);
                    backend.end_command_list(&mut fixup.native);
                }
                fixups.push(Some(fixup));
            }
        }

        let value = state.last_value + 1;
        {
            let natives: SmallVec<[&B::CommandList; 8]> = fixups
                .iter()
                .zip(lists.iter())
                .flat_map(|(fixup, list)| {
                    fixup
                        .iter()
                        .map(|fixup| &fixup.native)
                        .chain(std::iter::once(&list.native))
                })
                .collect();

            trace!(
                target: TRACKING_TARGET,
                "submitting {} list(s) ({} with fixups) to {:?} queue, signalling {value}",
                lists.len(),
                natives.len() - lists.len(),
                self.ty
            );

            unsafe {
                backend.execute(self.ty, &natives, value);
            }
        }
        state.last_value = value;

        for mut list in fixups.into_iter().flatten().chain(lists) {
            list.target = value;
            released.extend(list.resources.drain().map(|(_, resource)| resource));
            state.retire(list);
        }

        // Dropping the last handle to a resource locks the queue states and the global table
        std::mem::drop(state);
        std::mem::drop(released);
        self.ctx.collect_garbage();

        Job {
            ctx: self.ctx.clone(),
            queue: self.ty,
            value,
        }
    }

    /// Makes every list submitted to this queue afterwards wait on the GPU until `job` is
    /// complete.
    pub fn wait_for(&self, job: &Job<B>) {
        if job.queue == self.ty {
            return;
        }

        let _state = self.ctx.queue_state(self.ty);
        unsafe {
            self.ctx.0.backend.queue_wait(self.ty, job.queue, job.value);
        }
    }

    /// Blocks until every list submitted to this queue has finished executing, then destroys
    /// the dropped resources no queue is using anymore.
    pub fn wait_idle(&self) {
        let value = self.ctx.queue_state(self.ty).last_value;
        unsafe {
            self.ctx.0.backend.wait_on(self.ty, value, None);
        }
        self.ctx.collect_garbage();
    }

    /// Number of native command lists allocated for this queue so far, fixup lists included.
    #[inline(always)]
    pub fn allocated_lists(&self) -> usize {
        self.ctx.queue_state(self.ty).list_count()
    }
}

impl<B: Backend> Job<B> {
    /// Wait's for the job to complete with the given timeout. If `None` is provided, then this
    /// call *must* block as long as possible for the job is finished. Returns the status of the
    /// job by the time the timeout is reached.
    ///
    /// # Arguments
    /// - `timeout` - The time to wait, or `None` if there should be no timeout.
    #[inline(always)]
    pub fn wait_on(&self, timeout: Option<Duration>) -> JobStatus {
        unsafe { self.ctx.0.backend.wait_on(self.queue, self.value, timeout) }
    }

    /// Polls the current status of the job without blocking.
    #[inline(always)]
    pub fn poll_status(&self) -> JobStatus {
        if unsafe { self.ctx.0.backend.completed_value(self.queue) } >= self.value {
            JobStatus::Complete
        } else {
            JobStatus::Running
        }
    }

    #[inline(always)]
    pub fn queue_type(&self) -> QueueType {
        self.queue
    }

    /// The fence value signalled once the job is complete.
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.value
    }
}
