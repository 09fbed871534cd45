//! Records a frame's passes on worker threads and submits them in pass order.

use std::{thread, time::Instant};

use vigil_log::{info, LogConfig};
use vigil_pal::{
    backend::{SoftBackend, SoftBackendCreateInfo},
    prelude::*,
};

const PASSES: usize = 8;
const FRAMES: usize = 4;

fn main() {
    vigil_log::init(LogConfig::default()).unwrap();

    let ctx = Context::with_create_info(
        SoftBackend::new(SoftBackendCreateInfo::default()),
        ContextCreateInfo {
            debug_name: Some(String::from("main")),
            tracking: TrackingConfig::from_ron("(missing_state: Panic, validate_queue_states: true)")
                .unwrap(),
            state_table: None,
        },
    );

    let gbuffer = Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            width: 1280,
            height: 720,
            array_layers: PASSES as u32,
            debug_name: Some(String::from("gbuffer")),
            ..Default::default()
        },
    )
    .unwrap();
    let lit = Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            width: 1280,
            height: 720,
            mip_levels: 6,
            debug_name: Some(String::from("lit")),
            ..Default::default()
        },
    )
    .unwrap();

    let queue = ctx.main();
    for frame in 0..FRAMES {
        let start = Instant::now();

        // Each pass renders into its own layer of the gbuffer
        let mut lists = thread::scope(|s| {
            let handles: Vec<_> = (0..PASSES)
                .map(|pass| {
                    let queue = &queue;
                    let gbuffer = &gbuffer;
                    s.spawn(move || {
                        let mut list = queue.command_list(Some("geometry"));
                        let color_attachments = [ColorAttachment {
                            texture: gbuffer,
                            mip_level: 0,
                            array_layer: pass as u32,
                            clear: Some(ClearColor::RgbaF32(0.0, 0.0, 0.0, 0.0)),
                        }];
                        list.draw(&DrawDescriptor {
                            color_attachments: &color_attachments,
                            ..DrawDescriptor::new(PipelineHandle(pass as u64), 36)
                        });
                        list
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        // Lighting reads every layer, then fills the mip chain for the next frame's bloom
        let mut lighting = queue.command_list(Some("lighting"));
        let sampled = [&gbuffer];
        let color_attachments = [ColorAttachment {
            texture: &lit,
            mip_level: 0,
            array_layer: 0,
            clear: None,
        }];
        lighting.draw(&DrawDescriptor {
            color_attachments: &color_attachments,
            sampled_textures: &sampled,
            ..DrawDescriptor::new(PipelineHandle(100), 3)
        });
        lighting.generate_mips(&lit, ResourceState::PIXEL_SHADER_RESOURCE);
        lists.push(lighting);

        queue.submit_batch(lists);
        info!(
            "frame {frame}: {} barrier(s) in {:?}, {} native list(s) allocated",
            ctx.backend().executed_transitions().len(),
            start.elapsed(),
            queue.allocated_lists()
        );
        ctx.backend().clear_history();
    }

    ctx.wait_idle();
    info!(
        "finished with {} validation error(s)",
        ctx.backend().validation_errors().len()
    );
}
