use std::{mem::ManuallyDrop, sync::Arc};

use thiserror::Error;

use crate::{
    context::Context,
    garbage::Garbage,
    resource::{ResourceId, ResourceInfo, Subresource},
    types::{MemoryUsage, ResourceState},
    Backend,
};

#[derive(Debug, Clone)]
pub struct BufferCreateInfo {
    /// The size in bytes of the buffer to create.
    pub size: u64,
    /// Describes what memory operations are supported by this buffer.
    pub memory_usage: MemoryUsage,
    /// The state the buffer is created in. This is published to the global state table as
    /// soon as the buffer exists.
    pub initial_state: ResourceState,
    /// The backend *should* use the provided debug name for easy identification.
    pub debug_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum BufferCreateError {
    #[error("out of device memory")]
    OutOfMemory,
    #[error("an error has occured: {0}")]
    Other(String),
}

/// A GPU memory buffer. For the purposes of synchronization, this is considered a resource.
///
/// Buffers are reference counted handles. Once every handle (including those held by lists that
/// are still being recorded) has dropped, the buffer's state is forgotten and the allocation is
/// destroyed as soon as the GPU has finished the work submitted before the drop.
pub struct Buffer<B: Backend>(Arc<BufferInner<B>>);

struct BufferInner<B: Backend> {
    ctx: Context<B>,
    info: ResourceInfo,
    size: u64,
    memory_usage: MemoryUsage,
    debug_name: Option<String>,
    id: ManuallyDrop<B::Buffer>,
}

impl<B: Backend> Buffer<B> {
    /// Creates a new buffer and publishes its initial state.
    ///
    /// # Panics
    /// - If `create_info.size` is `0`.
    pub fn new(ctx: Context<B>, create_info: BufferCreateInfo) -> Result<Self, BufferCreateError> {
        assert_ne!(create_info.size, 0, "buffer size cannot be zero");
        let resource = ResourceId::new();
        let id = unsafe { ctx.0.backend.create_buffer(resource, &create_info)? };
        Ok(Self::from_raw(ctx, resource, id, create_info))
    }

    /// Wraps a native buffer that already exists in `create_info.initial_state`.
    pub(crate) fn from_raw(
        ctx: Context<B>,
        resource: ResourceId,
        id: B::Buffer,
        create_info: BufferCreateInfo,
    ) -> Self {
        ctx.0
            .states
            .set_state(resource, Subresource::All, create_info.initial_state);

        Self(Arc::new(BufferInner {
            ctx,
            info: ResourceInfo::buffer(resource),
            size: create_info.size,
            memory_usage: create_info.memory_usage,
            debug_name: create_info.debug_name,
            id: ManuallyDrop::new(id),
        }))
    }

    #[inline(always)]
    pub fn internal(&self) -> &B::Buffer {
        &self.0.id
    }

    #[inline(always)]
    pub fn info(&self) -> &ResourceInfo {
        &self.0.info
    }

    #[inline(always)]
    pub fn id(&self) -> ResourceId {
        self.0.info.id
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.0.size
    }

    #[inline(always)]
    pub fn memory_usage(&self) -> MemoryUsage {
        self.0.memory_usage
    }

    #[inline(always)]
    pub fn debug_name(&self) -> Option<&str> {
        self.0.debug_name.as_deref()
    }

    #[inline(always)]
    pub fn context(&self) -> &Context<B> {
        &self.0.ctx
    }

    /// The last state published for this buffer. Lists that have been recorded but not yet
    /// submitted are not taken into account.
    #[inline(always)]
    pub fn published_state(&self) -> Option<ResourceState> {
        self.0
            .ctx
            .state_table()
            .try_get_state(self.id(), Subresource::All)
    }
}

impl<B: Backend> Clone for Buffer<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: Backend> Drop for BufferInner<B> {
    fn drop(&mut self) {
        // SAFETY: `id` is never used again.
        let id = unsafe { ManuallyDrop::take(&mut self.id) };
        self.ctx.release(self.info.id, Garbage::Buffer(id));
    }
}

impl Default for BufferCreateInfo {
    fn default() -> Self {
        Self {
            size: 0,
            memory_usage: MemoryUsage::GpuOnly,
            initial_state: ResourceState::COMMON,
            debug_name: None,
        }
    }
}
