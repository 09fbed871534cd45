use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The usage state a resource (or one of its subresources) is in. Two states are only
    /// considered equal if all their bits match, so combined read states must be requested
    /// consistently to avoid redundant transitions.
    #[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(transparent)]
    pub struct ResourceState: u32 {
        const COMMON                     = 0;
        const VERTEX_AND_CONSTANT_BUFFER = 0b0000_0000_0000_0001;
        const INDEX_BUFFER               = 0b0000_0000_0000_0010;
        const RENDER_TARGET              = 0b0000_0000_0000_0100;
        const UNORDERED_ACCESS           = 0b0000_0000_0000_1000;
        const DEPTH_WRITE                = 0b0000_0000_0001_0000;
        const DEPTH_READ                 = 0b0000_0000_0010_0000;
        const NON_PIXEL_SHADER_RESOURCE  = 0b0000_0000_0100_0000;
        const PIXEL_SHADER_RESOURCE      = 0b0000_0000_1000_0000;
        const INDIRECT_ARGUMENT          = 0b0000_0010_0000_0000;
        const COPY_DEST                  = 0b0000_0100_0000_0000;
        const COPY_SOURCE                = 0b0000_1000_0000_0000;
        const RESOLVE_DEST               = 0b0001_0000_0000_0000;
        const RESOLVE_SOURCE             = 0b0010_0000_0000_0000;

        const PRESENT = Self::COMMON.bits();
        const ALL_SHADER_RESOURCE = Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits();
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
    }
}

impl ResourceState {
    /// States which may be used on a [`Transfer`](QueueType::Transfer) queue.
    pub const TRANSFER_COMPATIBLE: ResourceState = ResourceState::COPY_SOURCE
        .union(ResourceState::COPY_DEST)
        .union(ResourceState::COMMON);
}

impl Default for ResourceState {
    fn default() -> Self {
        ResourceState::COMMON
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    /// The job is still running.
    Running,
    /// The job is complete.
    Complete,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueType {
    /// The main queue is guaranteed to support graphics, transfer, and compute operations.
    Main,
    /// The transfer queue is guaranteed to support transfer operations and usually operates
    /// asynchronously to other queues.
    Transfer,
    /// The compute queue is guaranteed to support compute operations and usually operates
    /// asynchronously to other queues.
    Compute,
}

impl QueueType {
    pub const ALL: [QueueType; 3] = [QueueType::Main, QueueType::Transfer, QueueType::Compute];

    #[inline(always)]
    pub(crate) fn as_idx(self) -> usize {
        match self {
            QueueType::Main => 0,
            QueueType::Transfer => 1,
            QueueType::Compute => 2,
        }
    }

    /// Returns `true` if commands recorded for this queue may put a resource into `state`.
    #[inline(always)]
    pub fn supports_state(self, state: ResourceState) -> bool {
        match self {
            QueueType::Main => true,
            QueueType::Compute => !state.intersects(
                ResourceState::RENDER_TARGET
                    | ResourceState::DEPTH_WRITE
                    | ResourceState::DEPTH_READ
                    | ResourceState::PIXEL_SHADER_RESOURCE
                    | ResourceState::RESOLVE_DEST
                    | ResourceState::RESOLVE_SOURCE,
            ),
            QueueType::Transfer => ResourceState::TRANSFER_COMPATIBLE.contains(state),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureType {
    Type1D,
    Type2D,
    Type3D,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    R8Unorm,
    R16SFloat,
    R32SFloat,
    R32UInt,
    Rg16SFloat,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Rgba16SFloat,
    Rgba32SFloat,
    D16Unorm,
    D24UnormS8Uint,
    D32Sfloat,
}

impl Format {
    #[inline(always)]
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Format::D16Unorm | Format::D24UnormS8Uint | Format::D32Sfloat
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryUsage {
    GpuOnly,
    CpuToGpu,
    GpuToCpu,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MultiSamples(pub u32);

impl Default for MultiSamples {
    fn default() -> Self {
        MultiSamples(1)
    }
}

/// An opaque pipeline state object. Pipelines are created outside of Vigil, commands simply
/// pass the handle through to the backend.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipelineHandle(pub u64);

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub enum ClearColor {
    RgbaF32(f32, f32, f32, f32),
    RgbaU32(u32, u32, u32, u32),
}
