use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use api::types::Format;

/// What a shared allocation was created for. Opening a handle with a different description is
/// an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SharedLayout {
    Buffer {
        size: u64,
    },
    Texture {
        format: Format,
        dims: (u32, u32, u32),
        mip_levels: u32,
        array_layers: u32,
    },
}

/// Memory backing a soft resource. Cloning the allocation shares the memory, which is how
/// cross adapter handles are implemented.
#[derive(Debug, Clone)]
pub struct SharedAllocation {
    bytes: Arc<Mutex<Vec<u8>>>,
    layout: SharedLayout,
}

impl SharedAllocation {
    pub(crate) fn new(len: usize, layout: SharedLayout) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(vec![0; len])),
            layout,
        }
    }

    #[inline(always)]
    pub(crate) fn layout(&self) -> SharedLayout {
        self.layout
    }

    /// Size of the allocation in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if both allocations refer to the same memory.
    #[inline(always)]
    pub fn same_memory(&self, other: &SharedAllocation) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        self.lock()[offset..offset + len].to_vec()
    }

    pub(crate) fn write(&self, offset: usize, data: &[u8]) {
        self.lock()[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Copies `len` bytes from `src` into `dst`. The two may be the same memory.
    pub(crate) fn copy(
        src: &SharedAllocation,
        src_offset: usize,
        dst: &SharedAllocation,
        dst_offset: usize,
        len: usize,
    ) {
        if src.same_memory(dst) {
            src.lock()
                .copy_within(src_offset..src_offset + len, dst_offset);
        } else {
            let src = src.lock();
            dst.lock()[dst_offset..dst_offset + len]
                .copy_from_slice(&src[src_offset..src_offset + len]);
        }
    }

    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
