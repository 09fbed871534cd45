cfg_if::cfg_if! {
    if #[cfg(feature = "soft")] {
        pub type Backend = soft::SoftBackend;

        pub mod backend {
            pub use soft::{
                ExecutedOp, SharedAllocation, SoftBackend, SoftBackendCreateInfo, ValidationError,
            };
        }
    } else {
        pub type Backend = empty::EmptyBackend;

        pub mod backend {
            pub use empty::EmptyBackend;
        }
    }
}

pub mod prelude {
    pub use api::types::*;

    // Context
    pub type Context = api::context::Context<crate::Backend>;
    pub use api::context::ContextCreateInfo;

    // Configuration
    pub use api::config::{ConfigError, MissingStatePolicy, TrackingConfig};

    // Resources
    pub use api::resource::{ResourceId, ResourceInfo, ResourceKind, Subresource};

    // State tracking
    pub use api::tracking::{
        Barrier, GlobalStateTable, LocalStateTracker, PendingTransition, SubresourceState,
    };

    // Command list
    pub type CommandList = api::command_list::CommandList<crate::Backend>;
    pub type CopyBufferToBuffer<'a> = api::command_list::CopyBufferToBuffer<'a, crate::Backend>;
    pub type ResourceRef<'a> = api::command_list::ResourceRef<'a, crate::Backend>;
    pub use api::command_list::BufferTextureCopy;

    // Passes
    pub type DrawDescriptor<'a> = api::pass::DrawDescriptor<'a, crate::Backend>;
    pub type DispatchDescriptor<'a> = api::pass::DispatchDescriptor<'a, crate::Backend>;
    pub type ColorAttachment<'a> = api::pass::ColorAttachment<'a, crate::Backend>;
    pub type DepthStencilAttachment<'a> = api::pass::DepthStencilAttachment<'a, crate::Backend>;

    // Queue
    pub type Queue = api::queue::Queue<crate::Backend>;
    pub type Job = api::queue::Job<crate::Backend>;

    // Buffer
    pub type Buffer = api::buffer::Buffer<crate::Backend>;
    pub use api::buffer::{BufferCreateError, BufferCreateInfo};

    // Texture
    pub type Texture = api::texture::Texture<crate::Backend>;
    pub use api::texture::{TextureCreateError, TextureCreateInfo};

    // Cross adapter
    pub type CrossAdapterBuffer = api::cross_adapter::CrossAdapterBuffer<crate::Backend>;
    pub type CrossAdapterTexture = api::cross_adapter::CrossAdapterTexture<crate::Backend>;
    pub use api::cross_adapter::SharedResourceError;
}
