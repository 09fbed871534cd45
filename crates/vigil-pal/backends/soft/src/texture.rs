use api::{
    resource::ResourceId,
    texture::{TextureCreateError, TextureCreateInfo},
    types::TextureType,
};

use crate::shared::{SharedAllocation, SharedLayout};

pub struct Texture {
    pub(crate) id: ResourceId,
    pub(crate) subresources: u32,
    pub(crate) memory: SharedAllocation,
}

impl Texture {
    pub(crate) fn new(
        id: ResourceId,
        create_info: &TextureCreateInfo,
    ) -> Result<Self, TextureCreateError> {
        if create_info.sample_count.0 > 1 && create_info.mip_levels > 1 {
            return Err(TextureCreateError::Unsupported(String::from(
                "multisampled textures cannot have more than one mip level",
            )));
        }

        if create_info.format.is_depth() && create_info.ty == TextureType::Type3D {
            return Err(TextureCreateError::Unsupported(String::from(
                "depth textures cannot be 3D",
            )));
        }

        Ok(Self::from_shared(
            id,
            create_info,
            SharedAllocation::new(0, layout(create_info)),
        ))
    }

    pub(crate) fn from_shared(
        id: ResourceId,
        create_info: &TextureCreateInfo,
        memory: SharedAllocation,
    ) -> Self {
        Self {
            id,
            subresources: create_info.mip_levels * create_info.array_layers,
            memory,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline(always)]
    pub fn subresource_count(&self) -> u32 {
        self.subresources
    }

    #[inline(always)]
    pub fn memory(&self) -> &SharedAllocation {
        &self.memory
    }
}

pub(crate) fn layout(create_info: &TextureCreateInfo) -> SharedLayout {
    SharedLayout::Texture {
        format: create_info.format,
        dims: (create_info.width, create_info.height, create_info.depth),
        mip_levels: create_info.mip_levels,
        array_layers: create_info.array_layers,
    }
}
