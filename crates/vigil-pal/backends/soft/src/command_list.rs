use api::{
    command_list::Command,
    resource::{ResourceId, Subresource},
    tracking::Barrier,
    types::{QueueType, ResourceState},
};
use smallvec::{smallvec, SmallVec};

use crate::{shared::SharedAllocation, SoftBackend};

/// A native command list. Commands are converted into owned operations while recording and
/// replayed against the device on execution.
pub struct CommandList {
    pub(crate) queue: QueueType,
    pub(crate) debug_name: Option<String>,
    pub(crate) recording: bool,
    pub(crate) ops: Vec<Op>,
}

pub(crate) enum Op {
    Barriers(Vec<Barrier>),
    Command(SoftCommand),
}

pub(crate) struct SoftCommand {
    pub name: &'static str,
    pub accesses: SmallVec<[Access; 8]>,
    pub copy: Option<BufferCopy>,
}

/// A state a command requires a subresource to be in.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Access {
    pub resource: ResourceId,
    pub subresource: Subresource,
    pub required: ResourceState,
}

pub(crate) struct BufferCopy {
    pub src: SharedAllocation,
    pub src_offset: usize,
    pub dst: SharedAllocation,
    pub dst_offset: usize,
    pub len: usize,
}

impl CommandList {
    pub(crate) fn new(queue: QueueType) -> Self {
        Self {
            queue,
            debug_name: None,
            recording: false,
            ops: Vec::default(),
        }
    }

    #[inline(always)]
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    #[inline(always)]
    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    /// Number of barrier batches and commands recorded.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Access {
    #[inline(always)]
    fn new(resource: ResourceId, subresource: Subresource, required: ResourceState) -> Self {
        Self {
            resource,
            subresource,
            required,
        }
    }

    #[inline(always)]
    fn all(resource: ResourceId, required: ResourceState) -> Self {
        Self::new(resource, Subresource::All, required)
    }
}

impl SoftCommand {
    pub(crate) fn from_command(command: Command<'_, SoftBackend>) -> Self {
        match command {
            Command::CopyBufferToBuffer {
                src,
                src_offset,
                dst,
                dst_offset,
                len,
            } => SoftCommand {
                name: "copy_buffer_to_buffer",
                accesses: smallvec![
                    Access::all(src.id, ResourceState::COPY_SOURCE),
                    Access::all(dst.id, ResourceState::COPY_DEST),
                ],
                copy: Some(BufferCopy {
                    src: src.memory.clone(),
                    src_offset: src_offset as usize,
                    dst: dst.memory.clone(),
                    dst_offset: dst_offset as usize,
                    len: len as usize,
                }),
            },
            Command::CopyBufferToTexture {
                buffer,
                texture,
                subresource,
                ..
            } => SoftCommand {
                name: "copy_buffer_to_texture",
                accesses: smallvec![
                    Access::all(buffer.id, ResourceState::COPY_SOURCE),
                    Access::new(
                        texture.id,
                        Subresource::Index(subresource),
                        ResourceState::COPY_DEST
                    ),
                ],
                copy: None,
            },
            Command::CopyTextureToBuffer {
                texture,
                subresource,
                buffer,
                ..
            } => SoftCommand {
                name: "copy_texture_to_buffer",
                accesses: smallvec![
                    Access::new(
                        texture.id,
                        Subresource::Index(subresource),
                        ResourceState::COPY_SOURCE
                    ),
                    Access::all(buffer.id, ResourceState::COPY_DEST),
                ],
                copy: None,
            },
            Command::CopyTextureToTexture { src, dst } => SoftCommand {
                name: "copy_texture_to_texture",
                accesses: smallvec![
                    Access::all(src.id, ResourceState::COPY_SOURCE),
                    Access::all(dst.id, ResourceState::COPY_DEST),
                ],
                copy: None,
            },
            Command::ClearRenderTarget {
                texture,
                subresource,
                ..
            } => SoftCommand {
                name: "clear_render_target",
                accesses: smallvec![Access::new(
                    texture.id,
                    Subresource::Index(subresource),
                    ResourceState::RENDER_TARGET
                )],
                copy: None,
            },
            Command::ClearDepthStencil {
                texture,
                subresource,
                ..
            } => SoftCommand {
                name: "clear_depth_stencil",
                accesses: smallvec![Access::new(
                    texture.id,
                    Subresource::Index(subresource),
                    ResourceState::DEPTH_WRITE
                )],
                copy: None,
            },
            Command::Draw {
                color_attachments,
                depth_stencil_attachment,
                sampled_textures,
                vertex_buffers,
                index_buffer,
                ..
            } => {
                let mut accesses = SmallVec::new();
                for (texture, subresource) in color_attachments {
                    accesses.push(Access::new(
                        texture.id,
                        Subresource::Index(subresource),
                        ResourceState::RENDER_TARGET,
                    ));
                }
                if let Some((texture, subresource, read_only)) = depth_stencil_attachment {
                    let required = if read_only {
                        ResourceState::DEPTH_READ
                    } else {
                        ResourceState::DEPTH_WRITE
                    };
                    accesses.push(Access::new(
                        texture.id,
                        Subresource::Index(subresource),
                        required,
                    ));
                }
                for texture in sampled_textures {
                    accesses.push(Access::all(
                        texture.id,
                        ResourceState::PIXEL_SHADER_RESOURCE,
                    ));
                }
                for buffer in vertex_buffers {
                    accesses.push(Access::all(
                        buffer.id,
                        ResourceState::VERTEX_AND_CONSTANT_BUFFER,
                    ));
                }
                if let Some(buffer) = index_buffer {
                    accesses.push(Access::all(buffer.id, ResourceState::INDEX_BUFFER));
                }

                SoftCommand {
                    name: "draw",
                    accesses,
                    copy: None,
                }
            }
            Command::Dispatch {
                storage_buffers,
                storage_textures,
                sampled_textures,
                constant_buffers,
                ..
            } => {
                let mut accesses = SmallVec::new();
                accesses.extend(
                    storage_buffers
                        .iter()
                        .map(|buffer| Access::all(buffer.id, ResourceState::UNORDERED_ACCESS)),
                );
                accesses.extend(
                    storage_textures
                        .iter()
                        .map(|texture| Access::all(texture.id, ResourceState::UNORDERED_ACCESS)),
                );
                accesses.extend(sampled_textures.iter().map(|texture| {
                    Access::all(texture.id, ResourceState::NON_PIXEL_SHADER_RESOURCE)
                }));
                accesses.extend(constant_buffers.iter().map(|buffer| {
                    Access::all(buffer.id, ResourceState::VERTEX_AND_CONSTANT_BUFFER)
                }));

                SoftCommand {
                    name: "dispatch",
                    accesses,
                    copy: None,
                }
            }
            Command::Downsample {
                texture,
                src_subresource,
                dst_subresource,
            } => SoftCommand {
                name: "downsample",
                accesses: smallvec![
                    Access::new(
                        texture.id,
                        Subresource::Index(src_subresource),
                        ResourceState::NON_PIXEL_SHADER_RESOURCE
                    ),
                    Access::new(
                        texture.id,
                        Subresource::Index(dst_subresource),
                        ResourceState::UNORDERED_ACCESS
                    ),
                ],
                copy: None,
            },
            Command::ResolveTexture { src, dst } => SoftCommand {
                name: "resolve_texture",
                accesses: smallvec![
                    Access::all(src.id, ResourceState::RESOLVE_SOURCE),
                    Access::all(dst.id, ResourceState::RESOLVE_DEST),
                ],
                copy: None,
            },
        }
    }
}

impl BufferCopy {
    #[inline(always)]
    pub(crate) fn execute(&self) {
        SharedAllocation::copy(
            &self.src,
            self.src_offset,
            &self.dst,
            self.dst_offset,
            self.len,
        );
    }
}
