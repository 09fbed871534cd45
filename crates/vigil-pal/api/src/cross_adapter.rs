use thiserror::Error;
use vigil_log::debug;

use crate::{
    buffer::{Buffer, BufferCreateError, BufferCreateInfo},
    context::Context,
    resource::ResourceId,
    texture::{Texture, TextureCreateError, TextureCreateInfo},
    Backend,
};

#[derive(Debug, Error)]
pub enum SharedResourceError {
    #[error("device `{0}` does not support cross adapter resources")]
    Unsupported(String),
    #[error("shared handle does not match the resource description: {0}")]
    Incompatible(String),
    #[error("unable to create buffer: {0}")]
    Buffer(#[from] BufferCreateError),
    #[error("unable to create texture: {0}")]
    Texture(#[from] TextureCreateError),
    #[error("an error has occured: {0}")]
    Other(String),
}

/// A buffer whose memory is visible to two devices.
///
/// Each side is an ordinary [`Buffer`] with its own id and its own state, tracked by the context
/// it belongs to. Keeping the two sides' contents coherent (copies on one device, fence waits
/// on the other) is up to the caller.
pub struct CrossAdapterBuffer<B: Backend> {
    primary: Buffer<B>,
    secondary: Buffer<B>,
    handle: B::SharedHandle,
}

/// A texture whose memory is visible to two devices. See [`CrossAdapterBuffer`].
pub struct CrossAdapterTexture<B: Backend> {
    primary: Texture<B>,
    secondary: Texture<B>,
    handle: B::SharedHandle,
}

impl<B: Backend> CrossAdapterBuffer<B> {
    /// Creates the buffer on `primary` and opens it on `secondary`. Both sides start in
    /// `create_info.initial_state`.
    pub fn new(
        primary: &Context<B>,
        secondary: &Context<B>,
        create_info: BufferCreateInfo,
    ) -> Result<Self, SharedResourceError> {
        assert_ne!(create_info.size, 0, "buffer size cannot be zero");
        check_support(primary)?;
        check_support(secondary)?;

        let primary_id = ResourceId::new();
        let (primary_buffer, handle) = unsafe {
            primary
                .0
                .backend
                .create_shared_buffer(primary_id, &create_info)?
        };
        let primary_buffer =
            Buffer::from_raw(primary.clone(), primary_id, primary_buffer, create_info.clone());

        let secondary_id = ResourceId::new();
        let secondary_buffer = unsafe {
            secondary
                .0
                .backend
                .open_shared_buffer(secondary_id, &handle, &create_info)?
        };
        let secondary_buffer =
            Buffer::from_raw(secondary.clone(), secondary_id, secondary_buffer, create_info);

        debug!(
            "shared buffer {primary_id:?} on `{}` opened as {secondary_id:?} on `{}`",
            primary.properties().name,
            secondary.properties().name
        );

        Ok(Self {
            primary: primary_buffer,
            secondary: secondary_buffer,
            handle,
        })
    }

    #[inline(always)]
    pub fn primary(&self) -> &Buffer<B> {
        &self.primary
    }

    #[inline(always)]
    pub fn secondary(&self) -> &Buffer<B> {
        &self.secondary
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::SharedHandle {
        &self.handle
    }
}

impl<B: Backend> CrossAdapterTexture<B> {
    /// Creates the texture on `primary` and opens it on `secondary`. Every subresource of both
    /// sides starts in `create_info.initial_state`.
    pub fn new(
        primary: &Context<B>,
        secondary: &Context<B>,
        create_info: TextureCreateInfo,
    ) -> Result<Self, SharedResourceError> {
        check_support(primary)?;
        check_support(secondary)?;

        let primary_id = ResourceId::new();
        let (primary_texture, handle) = unsafe {
            primary
                .0
                .backend
                .create_shared_texture(primary_id, &create_info)?
        };
        let primary_texture = Texture::from_raw(
            primary.clone(),
            primary_id,
            primary_texture,
            create_info.clone(),
        );

        let secondary_id = ResourceId::new();
        let secondary_texture = unsafe {
            secondary
                .0
                .backend
                .open_shared_texture(secondary_id, &handle, &create_info)?
        };
        let secondary_texture =
            Texture::from_raw(secondary.clone(), secondary_id, secondary_texture, create_info);

        debug!(
            "shared texture {primary_id:?} on `{}` opened as {secondary_id:?} on `{}`",
            primary.properties().name,
            secondary.properties().name
        );

        Ok(Self {
            primary: primary_texture,
            secondary: secondary_texture,
            handle,
        })
    }

    #[inline(always)]
    pub fn primary(&self) -> &Texture<B> {
        &self.primary
    }

    #[inline(always)]
    pub fn secondary(&self) -> &Texture<B> {
        &self.secondary
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::SharedHandle {
        &self.handle
    }
}

#[inline(always)]
fn check_support<B: Backend>(ctx: &Context<B>) -> Result<(), SharedResourceError> {
    let properties = ctx.properties();
    if properties.cross_adapter {
        Ok(())
    } else {
        Err(SharedResourceError::Unsupported(properties.name.clone()))
    }
}
