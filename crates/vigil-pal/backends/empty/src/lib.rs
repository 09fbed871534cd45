use std::sync::OnceLock;

use api::{
    buffer::{BufferCreateError, BufferCreateInfo},
    command_list::Command,
    cross_adapter::SharedResourceError,
    resource::ResourceId,
    texture::{TextureCreateError, TextureCreateInfo},
    tracking::Barrier,
    types::{JobStatus, QueueType},
    Backend, DeviceProperties,
};

pub struct EmptyBackend;

impl Backend for EmptyBackend {
    type Buffer = ();
    type Texture = ();
    type CommandList = ();
    type SharedHandle = ();

    unsafe fn properties(&self) -> &DeviceProperties {
        static PROPERTIES: OnceLock<DeviceProperties> = OnceLock::new();
        PROPERTIES.get_or_init(|| DeviceProperties {
            name: String::from("empty"),
            cross_adapter: true,
        })
    }

    unsafe fn create_buffer(
        &self,
        _id: ResourceId,
        _create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, BufferCreateError> {
        Ok(())
    }

    unsafe fn create_texture(
        &self,
        _id: ResourceId,
        _create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, TextureCreateError> {
        Ok(())
    }

    unsafe fn destroy_buffer(&self, _buffer: &mut Self::Buffer) {}

    unsafe fn destroy_texture(&self, _texture: &mut Self::Texture) {}

    unsafe fn create_shared_buffer(
        &self,
        _id: ResourceId,
        _create_info: &BufferCreateInfo,
    ) -> Result<(Self::Buffer, Self::SharedHandle), SharedResourceError> {
        Ok(((), ()))
    }

    unsafe fn open_shared_buffer(
        &self,
        _id: ResourceId,
        _handle: &Self::SharedHandle,
        _create_info: &BufferCreateInfo,
    ) -> Result<Self::Buffer, SharedResourceError> {
        Ok(())
    }

    unsafe fn create_shared_texture(
        &self,
        _id: ResourceId,
        _create_info: &TextureCreateInfo,
    ) -> Result<(Self::Texture, Self::SharedHandle), SharedResourceError> {
        Ok(((), ()))
    }

    unsafe fn open_shared_texture(
        &self,
        _id: ResourceId,
        _handle: &Self::SharedHandle,
        _create_info: &TextureCreateInfo,
    ) -> Result<Self::Texture, SharedResourceError> {
        Ok(())
    }

    unsafe fn create_command_list(&self, _queue: QueueType) -> Self::CommandList {}

    unsafe fn begin_command_list(&self, _list: &mut Self::CommandList, _debug_name: Option<&str>) {
    }

    unsafe fn record_barriers(&self, _list: &mut Self::CommandList, _barriers: &[Barrier]) {}

    unsafe fn record_command(&self, _list: &mut Self::CommandList, _command: Command<'_, Self>) {}

    unsafe fn end_command_list(&self, _list: &mut Self::CommandList) {}

    unsafe fn execute(&self, _queue: QueueType, _lists: &[&Self::CommandList], _signal: u64) {}

    unsafe fn queue_wait(&self, _queue: QueueType, _on: QueueType, _value: u64) {}

    unsafe fn completed_value(&self, _queue: QueueType) -> u64 {
        u64::MAX
    }

    unsafe fn wait_on(
        &self,
        _queue: QueueType,
        _value: u64,
        _timeout: Option<std::time::Duration>,
    ) -> JobStatus {
        JobStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use api::{
        buffer::{Buffer, BufferCreateInfo},
        context::Context,
        resource::Subresource,
        types::ResourceState,
    };

    use super::EmptyBackend;

    #[test]
    fn submission_publishes_final_state() {
        let ctx = Context::new(EmptyBackend);
        let buffer = Buffer::new(
            ctx.clone(),
            BufferCreateInfo {
                size: 64,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(buffer.published_state(), Some(ResourceState::COMMON));

        let mut list = ctx.main().command_list(None);
        list.transition(&buffer, Subresource::All, ResourceState::COPY_DEST);
        list.transition(&buffer, Subresource::All, ResourceState::COPY_SOURCE);
        assert_eq!(buffer.published_state(), Some(ResourceState::COMMON));

        ctx.main().submit(list);
        assert_eq!(buffer.published_state(), Some(ResourceState::COPY_SOURCE));

        let id = buffer.id();
        ctx.wait_idle();
        std::mem::drop(buffer);
        assert!(!ctx.state_table().contains(id));
    }
}
