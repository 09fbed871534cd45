//! A software device.
//!
//! Command lists are executed on the CPU as soon as they are submitted. The device keeps its
//! own record of the true state of every subresource and checks every barrier and every command
//! against it, so any mistake made by the state tracker shows up as a [`ValidationError`].
//! Buffer copies are carried out for real, which makes the backend useful for checking data
//! flow across adapters.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use api::{
    buffer::{BufferCreateError, BufferCreateInfo},
    command_list::Command,
    cross_adapter::SharedResourceError,
    resource::ResourceId,
    texture::{TextureCreateError, TextureCreateInfo},
    tracking::Barrier,
    types::{JobStatus, QueueType, ResourceState},
    Backend, DeviceProperties,
};
use command_list::{Op, SoftCommand};
use device::Device;
use shared::SharedLayout;
use vigil_log::{info, trace, warn};

pub mod buffer;
pub mod command_list;
pub mod device;
pub mod shared;
pub mod texture;

pub use device::{ExecutedOp, ValidationError};
pub use shared::SharedAllocation;

pub struct SoftBackendCreateInfo {
    /// Name reported through [`DeviceProperties`].
    pub name: String,
    /// Whether resources can be shared with other soft devices.
    pub cross_adapter: bool,
    /// Number of executed operations kept for [`SoftBackend::history`]. Older operations are
    /// discarded. `0` disables the history.
    pub history_limit: usize,
}

pub struct SoftBackend {
    properties: DeviceProperties,
    device: Mutex<Device>,
    fences: [AtomicU64; 3],
}

impl SoftBackend {
    pub fn new(create_info: SoftBackendCreateInfo) -> Self {
        info!(
            "creating soft device `{}` (cross adapter: {})",
            create_info.name, create_info.cross_adapter
        );

        Self {
            properties: DeviceProperties {
                name: create_info.name,
                cross_adapter: create_info.cross_adapter,
            },
            device: Mutex::new(Device::new(create_info.history_limit)),
            fences: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Every validation error reported so far.
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        self.device().errors().to_vec()
    }

    /// Every validation error reported so far. The errors are cleared.
    pub fn take_validation_errors(&self) -> Vec<ValidationError> {
        self.device().take_errors()
    }

    /// Every barrier and command executed since the last
    /// [`clear_history`](SoftBackend::clear_history), in execution order. Only the most recent
    /// operations are kept, see [`SoftBackendCreateInfo::history_limit`].
    pub fn history(&self) -> Vec<ExecutedOp> {
        self.device().history().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.device().clear_history();
    }

    /// Transition barriers executed since the last [`clear_history`](SoftBackend::clear_history).
    pub fn executed_transitions(&self) -> Vec<Barrier> {
        self.device()
            .history()
            .iter()
            .filter_map(|op| match op {
                ExecutedOp::Barrier { barrier, .. }
                    if matches!(barrier, Barrier::Transition { .. }) =>
                {
                    Some(*barrier)
                }
                _ => None,
            })
            .collect()
    }

    /// The state a subresource is actually in, according to everything executed so far.
    pub fn device_state(&self, resource: ResourceId, subresource: u32) -> Option<ResourceState> {
        self.device().state(resource, subresource)
    }

    /// Number of resources that have been created and not yet destroyed.
    pub fn live_resources(&self) -> usize {
        self.device().live_resources()
    }

    /// Reads the contents of a buffer.
    pub fn read_buffer(&self, buffer: &buffer::Buffer) -> Vec<u8> {
        buffer.memory.read(0, buffer.size as usize)
    }

    /// Writes `data` into a buffer, as if through a host mapping.
    ///
    /// # Panics
    /// - If the write is out of bounds.
    pub fn write_buffer(&self, buffer: &buffer::Buffer, offset: u64, data: &[u8]) {
        assert!(
            offset
                .checked_add(data.len() as u64)
                .is_some_and(|end| end <= buffer.size),
            "write is out of bounds"
        );
        buffer.memory.write(offset as usize, data);
    }

    #[inline(always)]
    fn device(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline(always)]
    fn fence(&self, queue: QueueType) -> &AtomicU64 {
        &self.fences[match queue {
            QueueType::Main => 0,
            QueueType::Transfer => 1,
            QueueType::Compute => 2,
        }]
    }

    fn check_cross_adapter(&self) -> Result<(), SharedResourceError> {
        if self.properties.cross_adapter {
            Ok(())
        } else {
            Err(SharedResourceError::Unsupported(self.properties.name.clone()))
        }
    }
}

impl Default for SoftBackendCreateInfo {
    fn default() -> Self {
        Self {
            name: String::from("soft"),
            cross_adapter: true,
            history_limit: 4096,
        }
    }
}

impl Backend for SoftBackend {
    type Buffer = buffer::Buffer;
    type Texture = texture::Texture;
    type CommandList = command_list::CommandList;
    type SharedHandle = SharedAllocation;

    unsafe fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    unsafe fn create_buffer(
        &self,
        id: ResourceId,
        create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, BufferCreateError> {
        let buffer = buffer::Buffer::new(id, create_info)?;
        self.device().register(id, 1, create_info.initial_state);
        Ok(buffer)
    }

    unsafe fn create_texture(
        &self,
        id: ResourceId,
        create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, TextureCreateError> {
        let texture = texture::Texture::new(id, create_info)?;
        self.device()
            .register(id, texture.subresources, create_info.initial_state);
        Ok(texture)
    }

    unsafe fn destroy_buffer(&self, buffer: &mut Self::Buffer) {
        self.device().unregister(buffer.id);
    }

    unsafe fn destroy_texture(&self, texture: &mut Self::Texture) {
        self.device().unregister(texture.id);
    }

    unsafe fn create_shared_buffer(
        &self,
        id: ResourceId,
        create_info: &BufferCreateInfo,
    ) -> Result<(Self::Buffer, Self::SharedHandle), SharedResourceError> {
        self.check_cross_adapter()?;
        let buffer = self.create_buffer(id, create_info)?;
        let handle = buffer.memory.clone();
        Ok((buffer, handle))
    }

    unsafe fn open_shared_buffer(
        &self,
        id: ResourceId,
        handle: &Self::SharedHandle,
        create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, SharedResourceError> {
        self.check_cross_adapter()?;
        let expected = SharedLayout::Buffer {
            size: create_info.size,
        };
        if handle.layout() != expected {
            return Err(SharedResourceError::Incompatible(format!(
                "expected {expected:?}, found {:?}",
                handle.layout()
            )));
        }

        self.device().register(id, 1, create_info.initial_state);
        Ok(buffer::Buffer::from_shared(id, handle.clone()))
    }

    unsafe fn create_shared_texture(
        &self,
        id: ResourceId,
        create_info: &TextureCreateInfo,
    ) -> Result<(Self::Texture, Self::SharedHandle), SharedResourceError> {
        self.check_cross_adapter()?;
        let texture = self.create_texture(id, create_info)?;
        let handle = texture.memory.clone();
        Ok((texture, handle))
    }

    unsafe fn open_shared_texture(
        &self,
        id: ResourceId,
        handle: &Self::SharedHandle,
        create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, SharedResourceError> {
        self.check_cross_adapter()?;
        let expected = texture::layout(create_info);
        if handle.layout() != expected {
            return Err(SharedResourceError::Incompatible(format!(
                "expected {expected:?}, found {:?}",
                handle.layout()
            )));
        }

        let texture = texture::Texture::from_shared(id, create_info, handle.clone());
        self.device()
            .register(id, texture.subresources, create_info.initial_state);
        Ok(texture)
    }

    unsafe fn create_command_list(&self, queue: QueueType) -> Self::CommandList {
        command_list::CommandList::new(queue)
    }

    unsafe fn begin_command_list(&self, list: &mut Self::CommandList, debug_name: Option<&str>) {
        debug_assert!(!list.recording, "command list is already recording");
        list.ops.clear();
        list.debug_name = debug_name.map(String::from);
        list.recording = true;
    }

    unsafe fn record_barriers(&self, list: &mut Self::CommandList, barriers: &[Barrier]) {
        debug_assert!(list.recording, "command list is not recording");
        list.ops.push(Op::Barriers(barriers.to_vec()));
    }

    unsafe fn record_command(&self, list: &mut Self::CommandList, command: Command<'_, Self>) {
        debug_assert!(list.recording, "command list is not recording");
        list.ops.push(Op::Command(SoftCommand::from_command(command)));
    }

    unsafe fn end_command_list(&self, list: &mut Self::CommandList) {
        debug_assert!(list.recording, "command list is not recording");
        list.recording = false;
    }

    unsafe fn execute(&self, queue: QueueType, lists: &[&Self::CommandList], signal: u64) {
        puffin::profile_function!();

        let mut device = self.device();
        for list in lists {
            debug_assert!(!list.recording, "command list was executed while recording");
            if list.queue != queue {
                device.report(ValidationError::WrongQueue {
                    list: list.queue,
                    queue,
                });
            }

            for op in &list.ops {
                match op {
                    Op::Barriers(barriers) => {
                        for barrier in barriers {
                            device.apply_barrier(queue, barrier);
                        }
                    }
                    Op::Command(command) => {
                        device.access(queue, command);
                        if let Some(copy) = &command.copy {
                            copy.execute();
                        }
                    }
                }
            }
        }

        let previous = self.fence(queue).swap(signal, Ordering::AcqRel);
        debug_assert!(previous < signal, "fence values must increase");
        trace!(
            "executed {} list(s) on the {queue:?} queue of `{}`, fence at {signal}",
            lists.len(),
            self.properties.name
        );
    }

    unsafe fn queue_wait(&self, queue: QueueType, on: QueueType, value: u64) {
        let mut device = self.device();
        device.wait(queue, on, value);

        // Work is executed on submission, so a wait can only be satisfied by work that was
        // already submitted.
        if self.fence(on).load(Ordering::Acquire) < value {
            device.report(ValidationError::UnsignalledWait { queue, on, value });
        }
    }

    unsafe fn completed_value(&self, queue: QueueType) -> u64 {
        self.fence(queue).load(Ordering::Acquire)
    }

    unsafe fn wait_on(
        &self,
        queue: QueueType,
        value: u64,
        timeout: Option<Duration>,
    ) -> JobStatus {
        if self.completed_value(queue) >= value {
            return JobStatus::Complete;
        }

        if timeout.is_none() {
            warn!(
                "waiting forever on {queue:?} value {value} which was never submitted to `{}`",
                self.properties.name
            );
        }
        JobStatus::Running
    }
}

#[cfg(test)]
mod tests;
