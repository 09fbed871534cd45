use crate::{
    buffer::Buffer,
    texture::Texture,
    types::{ClearColor, PipelineHandle},
    Backend,
};

pub struct ColorAttachment<'a, B: Backend> {
    pub texture: &'a Texture<B>,
    pub mip_level: u32,
    pub array_layer: u32,
    /// Clears the attachment before drawing.
    pub clear: Option<ClearColor>,
}

pub struct DepthStencilAttachment<'a, B: Backend> {
    pub texture: &'a Texture<B>,
    pub mip_level: u32,
    pub array_layer: u32,
    /// Depth testing without writes. The attachment may then also be sampled.
    pub read_only: bool,
}

/// Describes a single draw and every resource it accesses.
pub struct DrawDescriptor<'a, B: Backend> {
    pub pipeline: PipelineHandle,
    pub color_attachments: &'a [ColorAttachment<'a, B>],
    pub depth_stencil_attachment: Option<DepthStencilAttachment<'a, B>>,
    /// Textures sampled in the pixel shader.
    pub sampled_textures: &'a [&'a Texture<B>],
    /// Vertex and constant buffers.
    pub vertex_buffers: &'a [&'a Buffer<B>],
    pub index_buffer: Option<&'a Buffer<B>>,
    pub vertex_count: u32,
    pub instance_count: u32,
}

/// Describes a single compute dispatch and every resource it accesses.
pub struct DispatchDescriptor<'a, B: Backend> {
    pub pipeline: PipelineHandle,
    /// Buffers read and written through unordered access.
    pub storage_buffers: &'a [&'a Buffer<B>],
    /// Textures read and written through unordered access.
    pub storage_textures: &'a [&'a Texture<B>],
    /// Textures sampled by the compute shader.
    pub sampled_textures: &'a [&'a Texture<B>],
    pub constant_buffers: &'a [&'a Buffer<B>],
    pub groups: (u32, u32, u32),
}

impl<'a, B: Backend> DrawDescriptor<'a, B> {
    /// A draw without any bound resources.
    pub fn new(pipeline: PipelineHandle, vertex_count: u32) -> Self {
        Self {
            pipeline,
            color_attachments: &[],
            depth_stencil_attachment: None,
            sampled_textures: &[],
            vertex_buffers: &[],
            index_buffer: None,
            vertex_count,
            instance_count: 1,
        }
    }
}

impl<'a, B: Backend> DispatchDescriptor<'a, B> {
    /// A dispatch without any bound resources.
    pub fn new(pipeline: PipelineHandle, groups: (u32, u32, u32)) -> Self {
        Self {
            pipeline,
            storage_buffers: &[],
            storage_textures: &[],
            sampled_textures: &[],
            constant_buffers: &[],
            groups,
        }
    }
}
