//! Renders each frame on a discrete device and composites it on an integrated one through a
//! buffer shared between the two.

use vigil_log::{info, LevelFilter, LogConfig};
use vigil_pal::{
    backend::{SoftBackend, SoftBackendCreateInfo},
    prelude::*,
};

const FRAMES: usize = 3;
const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const FRAME_SIZE: u64 = (WIDTH * HEIGHT * 4) as u64;

fn main() {
    vigil_log::init(LogConfig {
        tracking_filter: LevelFilter::Trace,
        ..Default::default()
    })
    .unwrap();
    puffin::set_scopes_on(true);

    let discrete = Context::new(SoftBackend::new(SoftBackendCreateInfo {
        name: String::from("discrete"),
        cross_adapter: true,
        ..Default::default()
    }));
    let integrated = Context::new(SoftBackend::new(SoftBackendCreateInfo {
        name: String::from("integrated"),
        cross_adapter: true,
        ..Default::default()
    }));

    let shared = CrossAdapterBuffer::new(
        &discrete,
        &integrated,
        BufferCreateInfo {
            size: FRAME_SIZE,
            initial_state: ResourceState::COMMON,
            debug_name: Some(String::from("shared_frame")),
            ..Default::default()
        },
    )
    .unwrap();

    let target = Texture::new(
        discrete.clone(),
        TextureCreateInfo {
            width: WIDTH,
            height: HEIGHT,
            initial_state: ResourceState::RENDER_TARGET,
            debug_name: Some(String::from("target")),
            ..Default::default()
        },
    )
    .unwrap();

    let present = Buffer::new(
        integrated.clone(),
        BufferCreateInfo {
            size: FRAME_SIZE,
            memory_usage: MemoryUsage::GpuToCpu,
            initial_state: ResourceState::COMMON,
            debug_name: Some(String::from("present")),
        },
    )
    .unwrap();

    for frame in 0..FRAMES {
        puffin::GlobalProfiler::lock().new_frame();

        // Render on the discrete device and copy the result into shared memory
        let mut list = discrete.main().command_list(Some("render"));
        list.clear_render_target(&target, 0, 0, ClearColor::RgbaF32(0.1, 0.2, 0.3, 1.0));
        let color_attachments = [ColorAttachment {
            texture: &target,
            mip_level: 0,
            array_layer: 0,
            clear: None,
        }];
        list.draw(&DrawDescriptor {
            color_attachments: &color_attachments,
            ..DrawDescriptor::new(PipelineHandle(0), 3)
        });
        list.copy_texture_to_buffer(
            &target,
            shared.primary(),
            BufferTextureCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                texture_offset: (0, 0, 0),
                texture_extent: (WIDTH, HEIGHT, 1),
                texture_mip_level: 0,
                texture_array_layer: 0,
            },
        );
        let job = discrete.main().submit(list);
        job.wait_on(None);

        // Composite on the integrated device
        let mut list = integrated.main().command_list(Some("composite"));
        list.copy_buffer_to_buffer(CopyBufferToBuffer {
            src: shared.secondary(),
            src_offset: 0,
            dst: &present,
            dst_offset: 0,
            len: FRAME_SIZE,
        });
        list.transition(&present, Subresource::All, ResourceState::COMMON);
        integrated.main().submit(list).wait_on(None);

        info!(
            "frame {frame}: discrete executed {} barrier(s), integrated executed {} barrier(s)",
            discrete.backend().executed_transitions().len(),
            integrated.backend().executed_transitions().len()
        );
        discrete.backend().clear_history();
        integrated.backend().clear_history();
    }

    discrete.wait_idle();
    integrated.wait_idle();

    let errors = discrete.backend().validation_errors().len()
        + integrated.backend().validation_errors().len();
    info!("finished with {errors} validation error(s)");
}
