use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    buffer::Buffer,
    context::{Context, RecycledList},
    pass::{DispatchDescriptor, DrawDescriptor},
    resource::{ResourceId, ResourceInfo, Subresource},
    texture::Texture,
    tracking::LocalStateTracker,
    types::{ClearColor, PipelineHandle, QueueType, ResourceState},
    Backend,
};

pub struct CopyBufferToBuffer<'a, B: Backend> {
    /// The source buffer to read from.
    pub src: &'a Buffer<B>,
    /// The offset within the source buffer to read from.
    pub src_offset: u64,
    /// The destination buffer to write to.
    pub dst: &'a Buffer<B>,
    /// The offset within the destination buffer to write to.
    pub dst_offset: u64,
    /// The number of bytes to copy.
    pub len: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferTextureCopy {
    /// Offset from the start of the buffer to begin read/write.
    pub buffer_offset: u64,
    /// In combination with `buffer_image_height`, this defines (in texels) a subregion of a
    /// larger texture in buffer memory. If either value is zero, the buffer memory is
    /// considered tightly packed.
    pub buffer_row_length: u32,
    /// See `buffer_row_length`.
    pub buffer_image_height: u32,
    /// The width, height, and depth offsets within the texture to read/write.
    pub texture_offset: (u32, u32, u32),
    /// The width, height, and depth sizes within the texture to read/write.
    pub texture_extent: (u32, u32, u32),
    /// The mip level of the texture to read/write.
    pub texture_mip_level: u32,
    /// The array layer of the texture to read/write.
    pub texture_array_layer: u32,
}

/// A command as handed to the backend. Every resource it references is already in the state
/// the command requires.
pub enum Command<'a, B: Backend> {
    CopyBufferToBuffer {
        src: &'a B::Buffer,
        src_offset: u64,
        dst: &'a B::Buffer,
        dst_offset: u64,
        len: u64,
    },
    CopyBufferToTexture {
        buffer: &'a B::Buffer,
        texture: &'a B::Texture,
        subresource: u32,
        copy: BufferTextureCopy,
    },
    CopyTextureToBuffer {
        texture: &'a B::Texture,
        subresource: u32,
        buffer: &'a B::Buffer,
        copy: BufferTextureCopy,
    },
    CopyTextureToTexture {
        src: &'a B::Texture,
        dst: &'a B::Texture,
    },
    ClearRenderTarget {
        texture: &'a B::Texture,
        subresource: u32,
        color: ClearColor,
    },
    ClearDepthStencil {
        texture: &'a B::Texture,
        subresource: u32,
        depth: f32,
        stencil: u8,
    },
    Draw {
        pipeline: PipelineHandle,
        color_attachments: SmallVec<[(&'a B::Texture, u32); 4]>,
        /// Texture, subresource and whether the attachment is read only.
        depth_stencil_attachment: Option<(&'a B::Texture, u32, bool)>,
        sampled_textures: SmallVec<[&'a B::Texture; 8]>,
        vertex_buffers: SmallVec<[&'a B::Buffer; 8]>,
        index_buffer: Option<&'a B::Buffer>,
        vertex_count: u32,
        instance_count: u32,
    },
    Dispatch {
        pipeline: PipelineHandle,
        storage_buffers: SmallVec<[&'a B::Buffer; 8]>,
        storage_textures: SmallVec<[&'a B::Texture; 8]>,
        sampled_textures: SmallVec<[&'a B::Texture; 8]>,
        constant_buffers: SmallVec<[&'a B::Buffer; 8]>,
        groups: (u32, u32, u32),
    },
    /// Filters one subresource of a texture into another (usually the next mip level).
    Downsample {
        texture: &'a B::Texture,
        src_subresource: u32,
        dst_subresource: u32,
    },
    ResolveTexture {
        src: &'a B::Texture,
        dst: &'a B::Texture,
    },
}

/// Any resource a command list can transition.
pub enum ResourceRef<'a, B: Backend> {
    Buffer(&'a Buffer<B>),
    Texture(&'a Texture<B>),
}

/// Keeps a resource alive while a list referencing it is in flight.
pub(crate) enum TrackedResource<B: Backend> {
    Buffer(Buffer<B>),
    Texture(Texture<B>),
}

/// A list of commands recorded for a single [`Queue`](crate::queue::Queue).
///
/// Recording never takes any locks, so lists may be recorded on many threads at once. Every
/// command requests the states it needs from the list's [`LocalStateTracker`] and flushes the
/// resulting barriers right before it is recorded. Barriers whose before state depends on other
/// lists are resolved when the list is submitted.
pub struct CommandList<B: Backend> {
    ctx: Context<B>,
    queue_ty: QueueType,
    pub(crate) list: RecycledList<B>,
    closed: bool,
}

impl<'a, B: Backend> ResourceRef<'a, B> {
    #[inline(always)]
    pub fn info(&self) -> &ResourceInfo {
        match self {
            ResourceRef::Buffer(buffer) => buffer.info(),
            ResourceRef::Texture(texture) => texture.info(),
        }
    }

    #[inline(always)]
    pub fn id(&self) -> ResourceId {
        self.info().id
    }

    #[inline(always)]
    pub fn context(&self) -> &Context<B> {
        match self {
            ResourceRef::Buffer(buffer) => buffer.context(),
            ResourceRef::Texture(texture) => texture.context(),
        }
    }

    #[inline(always)]
    fn to_tracked(&self) -> TrackedResource<B> {
        match self {
            ResourceRef::Buffer(buffer) => TrackedResource::Buffer((*buffer).clone()),
            ResourceRef::Texture(texture) => TrackedResource::Texture((*texture).clone()),
        }
    }
}

impl<'a, B: Backend> From<&'a Buffer<B>> for ResourceRef<'a, B> {
    fn from(value: &'a Buffer<B>) -> Self {
        ResourceRef::Buffer(value)
    }
}

impl<'a, B: Backend> From<&'a Texture<B>> for ResourceRef<'a, B> {
    fn from(value: &'a Texture<B>) -> Self {
        ResourceRef::Texture(value)
    }
}

impl<B: Backend> CommandList<B> {
    pub(crate) fn new(
        ctx: Context<B>,
        queue_ty: QueueType,
        mut list: RecycledList<B>,
        debug_name: Option<&str>,
    ) -> Self {
        unsafe {
            ctx.0.backend.begin_command_list(&mut list.native, debug_name);
        }

        Self {
            ctx,
            queue_ty,
            list,
            closed: false,
        }
    }

    #[inline(always)]
    pub fn queue_type(&self) -> QueueType {
        self.queue_ty
    }

    #[inline(always)]
    pub fn context(&self) -> &Context<B> {
        &self.ctx
    }

    #[inline(always)]
    pub fn tracker(&self) -> &LocalStateTracker {
        &self.list.tracker
    }

    #[inline(always)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Requests that `subresource` of `resource` be in `state` for the following commands.
    ///
    /// # Panics
    /// - If the list is closed.
    /// - If queue state validation is enabled and the list's queue cannot use `state`.
    pub fn transition<'r>(
        &mut self,
        resource: impl Into<ResourceRef<'r, B>>,
        subresource: Subresource,
        state: ResourceState,
    ) {
        self.request(resource.into(), subresource, state);
    }

    /// Waits for all unordered access writes to `resource` before any following access.
    pub fn uav_barrier<'r>(&mut self, resource: impl Into<ResourceRef<'r, B>>) {
        let resource = resource.into();
        self.check_open();
        self.keep(&resource);
        self.list.tracker.uav_barrier(Some(resource.id()));
    }

    /// Waits for every unordered access write before any following access.
    pub fn global_uav_barrier(&mut self) {
        self.check_open();
        self.list.tracker.uav_barrier(None);
    }

    /// Signals that `after` is about to use memory previously used by `before`. `None` on either
    /// side means any resource placed in that memory.
    pub fn aliasing_barrier(
        &mut self,
        before: Option<ResourceRef<'_, B>>,
        after: Option<ResourceRef<'_, B>>,
    ) {
        self.check_open();
        if let Some(before) = &before {
            self.keep(before);
        }
        if let Some(after) = &after {
            self.keep(after);
        }
        self.list.tracker.aliasing_barrier(
            before.as_ref().map(|resource| resource.id()),
            after.as_ref().map(|resource| resource.id()),
        );
    }

    /// Records every resolved barrier into the native list as a single batch.
    pub fn flush_barriers(&mut self) {
        let backend = &self.ctx.0.backend;
        let native = &mut self.list.native;
        self.list.tracker.flush(|barriers| unsafe {
            backend.record_barriers(native, barriers);
        });
    }

    /// # Panics
    /// - If `src` and `dst` are the same buffer.
    /// - If either range is out of bounds.
    pub fn copy_buffer_to_buffer(&mut self, copy: CopyBufferToBuffer<'_, B>) {
        assert_ne!(copy.src.id(), copy.dst.id(), "cannot copy a buffer to itself");
        assert!(
            in_bounds(copy.src_offset, copy.len, copy.src.size()),
            "source range is out of bounds"
        );
        assert!(
            in_bounds(copy.dst_offset, copy.len, copy.dst.size()),
            "destination range is out of bounds"
        );

        self.request(copy.src.into(), Subresource::All, ResourceState::COPY_SOURCE);
        self.request(copy.dst.into(), Subresource::All, ResourceState::COPY_DEST);
        self.record(Command::CopyBufferToBuffer {
            src: copy.src.internal(),
            src_offset: copy.src_offset,
            dst: copy.dst.internal(),
            dst_offset: copy.dst_offset,
            len: copy.len,
        });
    }

    pub fn copy_buffer_to_texture(
        &mut self,
        buffer: &Buffer<B>,
        texture: &Texture<B>,
        copy: BufferTextureCopy,
    ) {
        let subresource = texture.subresource(copy.texture_mip_level, copy.texture_array_layer);
        self.request(buffer.into(), Subresource::All, ResourceState::COPY_SOURCE);
        self.request(texture.into(), subresource, ResourceState::COPY_DEST);
        self.record(Command::CopyBufferToTexture {
            buffer: buffer.internal(),
            texture: texture.internal(),
            subresource: flat(subresource),
            copy,
        });
    }

    pub fn copy_texture_to_buffer(
        &mut self,
        texture: &Texture<B>,
        buffer: &Buffer<B>,
        copy: BufferTextureCopy,
    ) {
        let subresource = texture.subresource(copy.texture_mip_level, copy.texture_array_layer);
        self.request(texture.into(), subresource, ResourceState::COPY_SOURCE);
        self.request(buffer.into(), Subresource::All, ResourceState::COPY_DEST);
        self.record(Command::CopyTextureToBuffer {
            texture: texture.internal(),
            subresource: flat(subresource),
            buffer: buffer.internal(),
            copy,
        });
    }

    /// Copies every subresource of `src` into `dst`.
    ///
    /// # Panics
    /// - If the textures do not have identical dimensions and subresource layouts.
    pub fn copy_texture_to_texture(&mut self, src: &Texture<B>, dst: &Texture<B>) {
        assert_ne!(src.id(), dst.id(), "cannot copy a texture to itself");
        assert_eq!(src.dims(), dst.dims(), "texture dimensions must match");
        assert_eq!(
            src.info().kind,
            dst.info().kind,
            "texture subresource layouts must match"
        );

        self.request(src.into(), Subresource::All, ResourceState::COPY_SOURCE);
        self.request(dst.into(), Subresource::All, ResourceState::COPY_DEST);
        self.record(Command::CopyTextureToTexture {
            src: src.internal(),
            dst: dst.internal(),
        });
    }

    pub fn clear_render_target(
        &mut self,
        texture: &Texture<B>,
        mip_level: u32,
        array_layer: u32,
        color: ClearColor,
    ) {
        let subresource = texture.subresource(mip_level, array_layer);
        self.request(texture.into(), subresource, ResourceState::RENDER_TARGET);
        self.record(Command::ClearRenderTarget {
            texture: texture.internal(),
            subresource: flat(subresource),
            color,
        });
    }

    /// # Panics
    /// - If `texture` does not have a depth format.
    pub fn clear_depth_stencil(
        &mut self,
        texture: &Texture<B>,
        mip_level: u32,
        array_layer: u32,
        depth: f32,
        stencil: u8,
    ) {
        assert!(texture.format().is_depth(), "texture is not a depth texture");
        let subresource = texture.subresource(mip_level, array_layer);
        self.request(texture.into(), subresource, ResourceState::DEPTH_WRITE);
        self.record(Command::ClearDepthStencil {
            texture: texture.internal(),
            subresource: flat(subresource),
            depth,
            stencil,
        });
    }

    /// Records a draw, clearing any color attachment that requests it first.
    ///
    /// A read only depth attachment may also be sampled. Any other overlap between attachments
    /// and sampled textures is an error.
    pub fn draw(&mut self, descriptor: &DrawDescriptor<'_, B>) {
        let depth = descriptor.depth_stencil_attachment.as_ref().map(|attachment| {
            let subresource = attachment
                .texture
                .subresource(attachment.mip_level, attachment.array_layer);
            let sampled = descriptor
                .sampled_textures
                .iter()
                .any(|texture| texture.id() == attachment.texture.id());
            let state = match (attachment.read_only, sampled) {
                (false, false) => ResourceState::DEPTH_WRITE,
                (true, false) => ResourceState::DEPTH_READ,
                (true, true) => ResourceState::DEPTH_READ | ResourceState::PIXEL_SHADER_RESOURCE,
                (false, true) => panic!("a writable depth attachment cannot be sampled"),
            };
            (attachment, subresource, state, sampled)
        });

        let mut color_attachments = SmallVec::new();
        for attachment in descriptor.color_attachments {
            debug_assert!(
                !descriptor
                    .sampled_textures
                    .iter()
                    .any(|texture| texture.id() == attachment.texture.id()),
                "a color attachment cannot be sampled"
            );
            let subresource = attachment
                .texture
                .subresource(attachment.mip_level, attachment.array_layer);
            self.request(
                attachment.texture.into(),
                subresource,
                ResourceState::RENDER_TARGET,
            );
            color_attachments.push((attachment.texture.internal(), flat(subresource)));
        }

        let mut depth_stencil_attachment = None;
        if let Some((attachment, subresource, state, sampled)) = depth {
            // Sampling a read only depth attachment reads every subresource
            let requested = if sampled { Subresource::All } else { subresource };
            self.request(attachment.texture.into(), requested, state);
            depth_stencil_attachment = Some((
                attachment.texture.internal(),
                flat(subresource),
                attachment.read_only,
            ));
        }
        let depth_id = descriptor
            .depth_stencil_attachment
            .as_ref()
            .map(|attachment| attachment.texture.id());

        let mut sampled_textures = SmallVec::new();
        for texture in descriptor.sampled_textures {
            if Some(texture.id()) != depth_id {
                self.request(
                    (*texture).into(),
                    Subresource::All,
                    ResourceState::PIXEL_SHADER_RESOURCE,
                );
            }
            sampled_textures.push(texture.internal());
        }

        let mut vertex_buffers = SmallVec::new();
        for buffer in descriptor.vertex_buffers {
            self.request(
                (*buffer).into(),
                Subresource::All,
                ResourceState::VERTEX_AND_CONSTANT_BUFFER,
            );
            vertex_buffers.push(buffer.internal());
        }

        if let Some(buffer) = descriptor.index_buffer {
            self.request(buffer.into(), Subresource::All, ResourceState::INDEX_BUFFER);
        }

        // Clears need the attachments in their final state as well, so they go after the flush
        // performed by `record`.
        for attachment in descriptor.color_attachments {
            if let Some(color) = attachment.clear {
                let subresource = attachment
                    .texture
                    .subresource(attachment.mip_level, attachment.array_layer);
                self.record(Command::ClearRenderTarget {
                    texture: attachment.texture.internal(),
                    subresource: flat(subresource),
                    color,
                });
            }
        }

        self.record(Command::Draw {
            pipeline: descriptor.pipeline,
            color_attachments,
            depth_stencil_attachment,
            sampled_textures,
            vertex_buffers,
            index_buffer: descriptor.index_buffer.map(|buffer| buffer.internal()),
            vertex_count: descriptor.vertex_count,
            instance_count: descriptor.instance_count,
        });
    }

    /// Records a compute dispatch. Storage resources are put into unordered access. If a later
    /// command reads what this dispatch writes without a state change in between, a
    /// [`uav_barrier`](CommandList::uav_barrier) is required.
    pub fn dispatch(&mut self, descriptor: &DispatchDescriptor<'_, B>) {
        let mut storage_buffers = SmallVec::new();
        for buffer in descriptor.storage_buffers {
            self.request(
                (*buffer).into(),
                Subresource::All,
                ResourceState::UNORDERED_ACCESS,
            );
            storage_buffers.push(buffer.internal());
        }

        let mut storage_textures = SmallVec::new();
        for texture in descriptor.storage_textures {
            self.request(
                (*texture).into(),
                Subresource::All,
                ResourceState::UNORDERED_ACCESS,
            );
            storage_textures.push(texture.internal());
        }

        let mut sampled_textures = SmallVec::new();
        for texture in descriptor.sampled_textures {
            self.request(
                (*texture).into(),
                Subresource::All,
                ResourceState::NON_PIXEL_SHADER_RESOURCE,
            );
            sampled_textures.push(texture.internal());
        }

        let mut constant_buffers = SmallVec::new();
        for buffer in descriptor.constant_buffers {
            self.request(
                (*buffer).into(),
                Subresource::All,
                ResourceState::VERTEX_AND_CONSTANT_BUFFER,
            );
            constant_buffers.push(buffer.internal());
        }

        self.record(Command::Dispatch {
            pipeline: descriptor.pipeline,
            storage_buffers,
            storage_textures,
            sampled_textures,
            constant_buffers,
            groups: descriptor.groups,
        });
    }

    /// Fills every mip level of `texture` from the one above it, then transitions the whole
    /// texture into `final_state`.
    ///
    /// Each level is read as a shader resource while the next is written through unordered
    /// access, so mid-sequence the texture's subresources are in different states.
    pub fn generate_mips(&mut self, texture: &Texture<B>, final_state: ResourceState) {
        for layer in 0..texture.array_layers() {
            for mip in 1..texture.mip_count() {
                let src = texture.subresource(mip - 1, layer);
                let dst = texture.subresource(mip, layer);
                self.request(
                    texture.into(),
                    src,
                    ResourceState::NON_PIXEL_SHADER_RESOURCE,
                );
                self.request(texture.into(), dst, ResourceState::UNORDERED_ACCESS);
                self.record(Command::Downsample {
                    texture: texture.internal(),
                    src_subresource: flat(src),
                    dst_subresource: flat(dst),
                });
                self.list.tracker.uav_barrier(Some(texture.id()));
            }
        }

        self.request(texture.into(), Subresource::All, final_state);
    }

    /// Resolves a multisampled texture into a single sampled one.
    ///
    /// # Panics
    /// - If `src` is not multisampled or `dst` is.
    pub fn resolve_texture(&mut self, src: &Texture<B>, dst: &Texture<B>) {
        assert!(src.sample_count().0 > 1, "resolve source must be multisampled");
        assert_eq!(dst.sample_count().0, 1, "resolve destination must not be multisampled");

        self.request(src.into(), Subresource::All, ResourceState::RESOLVE_SOURCE);
        self.request(dst.into(), Subresource::All, ResourceState::RESOLVE_DEST);
        self.record(Command::ResolveTexture {
            src: src.internal(),
            dst: dst.internal(),
        });
    }

    /// Flushes all resolved barriers and finishes recording. Closing twice does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        self.flush_barriers();
        unsafe {
            self.ctx.0.backend.end_command_list(&mut self.list.native);
        }
        self.closed = true;
    }

    pub(crate) fn into_recycled(self) -> RecycledList<B> {
        debug_assert!(self.closed);
        self.list
    }

    fn request(&mut self, resource: ResourceRef<'_, B>, subresource: Subresource, state: ResourceState) {
        self.check_open();
        if self.ctx.0.config.validate_queue_states {
            assert!(
                self.queue_ty.supports_state(state),
                "{:?} queue cannot transition {:?} into {state:?}",
                self.queue_ty,
                resource.id()
            );
        }
        debug_assert!(
            Arc::ptr_eq(resource.context().state_table(), self.ctx.state_table()),
            "resource is tracked by a different state table"
        );

        self.keep(&resource);
        self.list
            .tracker
            .request_transition(resource.info(), subresource, state);

        if let Some(threshold) = self.ctx.0.config.flush_threshold {
            if self.list.tracker.resolved().len() >= threshold {
                self.flush_barriers();
            }
        }
    }

    fn record(&mut self, command: Command<'_, B>) {
        self.check_open();
        self.flush_barriers();
        unsafe {
            self.ctx.0.backend.record_command(&mut self.list.native, command);
        }
    }

    #[inline(always)]
    fn keep(&mut self, resource: &ResourceRef<'_, B>) {
        self.list
            .resources
            .entry(resource.id())
            .or_insert_with(|| resource.to_tracked());
    }

    #[inline(always)]
    fn check_open(&self) {
        assert!(!self.closed, "command list is closed");
    }
}

#[inline(always)]
fn flat(subresource: Subresource) -> u32 {
    match subresource {
        Subresource::Index(idx) => idx,
        Subresource::All => unreachable!("expected a single subresource"),
    }
}

#[inline(always)]
fn in_bounds(offset: u64, len: u64, size: u64) -> bool {
    offset.checked_add(len).is_some_and(|end| end <= size)
}
