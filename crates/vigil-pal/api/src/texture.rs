use std::{mem::ManuallyDrop, sync::Arc};

use thiserror::Error;
use vigil_log::debug;

use crate::{
    context::Context,
    garbage::Garbage,
    resource::{ResourceId, ResourceInfo, Subresource},
    types::{Format, MultiSamples, ResourceState, TextureType},
    Backend,
};

#[derive(Debug, Clone)]
pub struct TextureCreateInfo {
    pub format: Format,
    pub ty: TextureType,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub sample_count: MultiSamples,
    /// The state every subresource is created in.
    pub initial_state: ResourceState,
    pub debug_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum TextureCreateError {
    #[error("out of device memory")]
    OutOfMemory,
    #[error("unsupported texture description: {0}")]
    Unsupported(String),
    #[error("an error has occured: {0}")]
    Other(String),
}

/// A GPU image made of `mip_levels * array_layers` subresources.
///
/// Textures are reference counted handles, so a single texture can be shared by many passes
/// (e.g. a shadow map read by several draws).
pub struct Texture<B: Backend>(Arc<TextureInner<B>>);

struct TextureInner<B: Backend> {
    ctx: Context<B>,
    info: ResourceInfo,
    dims: (u32, u32, u32),
    format: Format,
    sample_count: MultiSamples,
    create_info: TextureCreateInfo,
    id: ManuallyDrop<B::Texture>,
}

impl<B: Backend> Texture<B> {
    /// Creates a new texture and publishes its initial state.
    ///
    /// # Panics
    /// - If any dimension, `mip_levels` or `array_layers` is `0`.
    pub fn new(
        ctx: Context<B>,
        create_info: TextureCreateInfo,
    ) -> Result<Self, TextureCreateError> {
        assert!(
            create_info.width != 0 && create_info.height != 0 && create_info.depth != 0,
            "texture dimensions cannot be zero"
        );
        assert_ne!(create_info.mip_levels, 0, "texture must have at least one mip");
        assert_ne!(
            create_info.array_layers, 0,
            "texture must have at least one array layer"
        );

        let resource = ResourceId::new();
        let id = unsafe { ctx.0.backend.create_texture(resource, &create_info)? };
        Ok(Self::from_raw(ctx, resource, id, create_info))
    }

    /// Wraps a native texture that already exists in `create_info.initial_state`.
    pub(crate) fn from_raw(
        ctx: Context<B>,
        resource: ResourceId,
        id: B::Texture,
        create_info: TextureCreateInfo,
    ) -> Self {
        ctx.0
            .states
            .set_state(resource, Subresource::All, create_info.initial_state);

        Self(Arc::new(TextureInner {
            info: ResourceInfo::texture(
                resource,
                create_info.ty,
                create_info.mip_levels,
                create_info.array_layers,
            ),
            dims: (create_info.width, create_info.height, create_info.depth),
            format: create_info.format,
            sample_count: create_info.sample_count,
            create_info,
            ctx,
            id: ManuallyDrop::new(id),
        }))
    }

    /// Recreates the texture with new dimensions (e.g. when the window it is presented to is
    /// resized). The old allocation's state entry is removed immediately and the new one is
    /// published in the original initial state. Other handles to the old texture keep the old
    /// allocation alive, but it is no longer tracked.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureCreateError> {
        let ctx = self.0.ctx.clone();
        let old = self.id();
        let create_info = TextureCreateInfo {
            width,
            height,
            ..self.0.create_info.clone()
        };

        let new = Texture::new(ctx.clone(), create_info)?;
        ctx.state_table().remove_entry(old);
        debug!("texture {old:?} recreated as {:?} ({width}x{height})", new.id());

        *self = new;
        Ok(())
    }

    #[inline(always)]
    pub fn internal(&self) -> &B::Texture {
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
    pub fn dims(&self) -> (u32, u32, u32) {
        self.0.dims
    }

    #[inline(always)]
    pub fn format(&self) -> Format {
        self.0.format
    }

    #[inline(always)]
    pub fn sample_count(&self) -> MultiSamples {
        self.0.sample_count
    }

    #[inline(always)]
    pub fn mip_count(&self) -> u32 {
        self.0.create_info.mip_levels
    }

    #[inline(always)]
    pub fn array_layers(&self) -> u32 {
        self.0.create_info.array_layers
    }

    #[inline(always)]
    pub fn debug_name(&self) -> Option<&str> {
        self.0.create_info.debug_name.as_deref()
    }

    #[inline(always)]
    pub fn context(&self) -> &Context<B> {
        &self.0.ctx
    }

    /// Flat index of a mip level within an array layer.
    ///
    /// # Panics
    /// - If `mip_level` or `array_layer` is out of bounds.
    #[inline(always)]
    pub fn subresource(&self, mip_level: u32, array_layer: u32) -> Subresource {
        self.0.info.subresource(mip_level, array_layer)
    }

    /// The last state published for `subresource`. Lists that have been recorded but not yet
    /// submitted are not taken into account.
    #[inline(always)]
    pub fn published_state(&self, subresource: Subresource) -> Option<ResourceState> {
        self.0
            .ctx
            .state_table()
            .try_get_state(self.id(), subresource)
    }
}

impl<B: Backend> Clone for Texture<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: Backend> Drop for TextureInner<B> {
    fn drop(&mut self) {
        // SAFETY: `id` is never used again.
        let id = unsafe { ManuallyDrop::take(&mut self.id) };
        self.ctx.release(self.info.id, Garbage::Texture(id));
    }
}

impl Default for TextureCreateInfo {
    #[inline(always)]
    fn default() -> Self {
        Self {
            format: Format::Rgba8Unorm,
            ty: TextureType::Type2D,
            width: 128,
            height: 128,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            sample_count: MultiSamples::default(),
            initial_state: ResourceState::COMMON,
            debug_name: None,
        }
    }
}
