//! Pal is a thin layer over explicit graphics APIs whose main job is resource state tracking.
//!
//! To start using Pal, you must first choose a [`Backend`] and then create a
//! [`Context`](struct@context::Context). Resources are created from the context, commands are
//! recorded into [`CommandList`](command_list::CommandList)s obtained from a
//! [`Queue`](queue::Queue), and every transition barrier those commands need is derived
//! automatically.

pub mod buffer;
pub mod command_list;
pub mod config;
pub mod context;
pub mod cross_adapter;
mod garbage;
pub mod pass;
pub mod queue;
pub mod resource;
pub mod texture;
pub mod tracking;
pub mod types;

use std::time::Duration;

use buffer::{BufferCreateError, BufferCreateInfo};
use command_list::Command;
use cross_adapter::SharedResourceError;
use resource::ResourceId;
use texture::{TextureCreateError, TextureCreateInfo};
use tracking::Barrier;
use types::{JobStatus, QueueType};

/// Information about the device a backend drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    /// The device can create and open resources shared with another adapter.
    pub cross_adapter: bool,
}

/// A native graphics API.
///
/// Backends never make state tracking decisions. They receive fully resolved [`Barrier`]s and
/// record them verbatim.
///
/// # Queues
///
/// Each [`QueueType`] has a monotonically increasing fence. [`execute`](Backend::execute)
/// signals the queue's fence with the provided value once the lists have finished.
#[allow(clippy::missing_safety_doc)]
pub trait Backend: Sized + Send + Sync + 'static {
    type Buffer: Send + Sync;
    type Texture: Send + Sync;
    type CommandList: Send;
    type SharedHandle: Clone + Send + Sync;

    unsafe fn properties(&self) -> &DeviceProperties;

    /// Creates a buffer in `create_info.initial_state`.
    unsafe fn create_buffer(
        &self,
        id: ResourceId,
        create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, BufferCreateError>;
    /// Creates a texture with every subresource in `create_info.initial_state`.
    unsafe fn create_texture(
        &self,
        id: ResourceId,
        create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, TextureCreateError>;
    unsafe fn destroy_buffer(&self, buffer: &mut Self::Buffer);
    unsafe fn destroy_texture(&self, texture: &mut Self::Texture);

    /// Creates a buffer whose memory may be opened by another adapter.
    unsafe fn create_shared_buffer(
        &self,
        id: ResourceId,
        create_info: &BufferCreateInfo,
    ) -> Result<(Self::Buffer, Self::SharedHandle), SharedResourceError>;
    unsafe fn open_shared_buffer(
        &self,
        id: ResourceId,
        handle: &Self::SharedHandle,
        create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, SharedResourceError>;
    /// Creates a texture whose memory may be opened by another adapter.
    unsafe fn create_shared_texture(
        &self,
        id: ResourceId,
        create_info: &TextureCreateInfo,
    ) -> Result<(Self::Texture, Self::SharedHandle), SharedResourceError>;
    unsafe fn open_shared_texture(
        &self,
        id: ResourceId,
        handle: &Self::SharedHandle,
        create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, SharedResourceError>;

    unsafe fn create_command_list(&self, queue: QueueType) -> Self::CommandList;
    /// Resets a list for recording. The list is either new or its last submission has
    /// completed.
    unsafe fn begin_command_list(&self, list: &mut Self::CommandList, debug_name: Option<&str>);
    /// Records `barriers` as a single batch.
    unsafe fn record_barriers(&self, list: &mut Self::CommandList, barriers: &[Barrier]);
    unsafe fn record_command(&self, list: &mut Self::CommandList, command: Command<'_, Self>);
    unsafe fn end_command_list(&self, list: &mut Self::CommandList);

    /// Executes `lists` in order on `queue`, then signals the queue's fence with `signal`.
    unsafe fn execute(&self, queue: QueueType, lists: &[&Self::CommandList], signal: u64);
    /// Makes `queue` wait on the GPU until the fence of `on` reaches `value`.
    unsafe fn queue_wait(&self, queue: QueueType, on: QueueType, value: u64);
    unsafe fn completed_value(&self, queue: QueueType) -> u64;
    /// Blocks until the fence of `queue` reaches `value`, or until `timeout` elapses.
    unsafe fn wait_on(&self, queue: QueueType, value: u64, timeout: Option<Duration>)
        -> JobStatus;
}
