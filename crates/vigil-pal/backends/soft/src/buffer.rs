use api::{
    buffer::{BufferCreateError, BufferCreateInfo},
    resource::ResourceId,
};

use crate::shared::{SharedAllocation, SharedLayout};

pub struct Buffer {
    pub(crate) id: ResourceId,
    pub(crate) size: u64,
    pub(crate) memory: SharedAllocation,
}

impl Buffer {
    pub(crate) fn new(id: ResourceId, create_info: &BufferCreateInfo) -> Result<Self, BufferCreateError> {
        let len = usize::try_from(create_info.size).map_err(|_| BufferCreateError::OutOfMemory)?;
        Ok(Self {
            id,
            size: create_info.size,
            memory: SharedAllocation::new(
                len,
                SharedLayout::Buffer {
                    size: create_info.size,
                },
            ),
        })
    }

    pub(crate) fn from_shared(id: ResourceId, memory: SharedAllocation) -> Self {
        let size = memory.len() as u64;
        Self { id, size, memory }
    }

    #[inline(always)]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline(always)]
    pub fn memory(&self) -> &SharedAllocation {
        &self.memory
    }
}
