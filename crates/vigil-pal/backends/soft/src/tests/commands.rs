use api::{
    pass::{ColorAttachment, DepthStencilAttachment, DispatchDescriptor, DrawDescriptor},
    resource::Subresource,
    texture::{Texture, TextureCreateInfo},
    tracking::Barrier,
    types::{ClearColor, MultiSamples, PipelineHandle, ResourceState},
};

use super::*;
use crate::ValidationError;

#[test]
fn generate_mips_leaves_texture_uniform() {
    let ctx = device("main");
    let tex = texture(&ctx, 4, 2, ResourceState::COPY_DEST);

    let mut list = ctx.main().command_list(Some("mips"));
    list.generate_mips(&tex, ResourceState::PIXEL_SHADER_RESOURCE);
    // Every level is first touched individually
    assert_eq!(list.tracker().pending().len(), 8);
    ctx.main().submit(list);

    assert_eq!(executed_commands(&ctx), vec!["downsample"; 6]);
    // 8 from the published state, 2 per layer between levels and 8 into the final state
    assert_eq!(ctx.backend().executed_transitions().len(), 20);

    let global = ctx.state_table().try_get(tex.id()).unwrap();
    assert!(global.is_uniform());
    assert_eq!(global.uniform(), ResourceState::PIXEL_SHADER_RESOURCE);
    for idx in 0..8 {
        assert_eq!(
            ctx.backend().device_state(tex.id(), idx),
            Some(ResourceState::PIXEL_SHADER_RESOURCE)
        );
    }
    assert_valid(&ctx);
}

#[test]
fn generate_mips_on_compute_queue() {
    let ctx = device("main");
    let tex = texture(&ctx, 3, 1, ResourceState::NON_PIXEL_SHADER_RESOURCE);

    let mut list = ctx.compute().command_list(None);
    list.generate_mips(&tex, ResourceState::NON_PIXEL_SHADER_RESOURCE);
    ctx.compute().submit(list);

    // Mip 0 is already readable, so only the written levels move
    assert_eq!(
        ctx.backend().executed_transitions()[0],
        Barrier::transition(
            tex.id(),
            Subresource::Index(1),
            ResourceState::NON_PIXEL_SHADER_RESOURCE,
            ResourceState::UNORDERED_ACCESS
        )
    );
    assert_eq!(
        tex.published_state(Subresource::All),
        Some(ResourceState::NON_PIXEL_SHADER_RESOURCE)
    );
    assert_valid(&ctx);
}

#[test]
fn draw_with_sampled_read_only_depth() {
    let ctx = device("main");
    let color = texture(&ctx, 1, 1, ResourceState::COMMON);
    let depth = depth_texture(&ctx, ResourceState::DEPTH_WRITE);
    let shadow = depth_texture(&ctx, ResourceState::DEPTH_WRITE);
    let vertices = buffer(&ctx, 256, ResourceState::COPY_DEST);

    let mut list = ctx.main().command_list(Some("lighting"));
    list.clear_depth_stencil(&shadow, 0, 0, 1.0, 0);

    let color_attachments = [ColorAttachment {
        texture: &color,
        mip_level: 0,
        array_layer: 0,
        clear: Some(ClearColor::RgbaF32(0.0, 0.0, 0.0, 1.0)),
    }];
    let sampled = [&depth, &shadow];
    let vertex_buffers = [&vertices];
    list.draw(&DrawDescriptor {
        color_attachments: &color_attachments,
        depth_stencil_attachment: Some(DepthStencilAttachment {
            texture: &depth,
            mip_level: 0,
            array_layer: 0,
            read_only: true,
        }),
        sampled_textures: &sampled,
        vertex_buffers: &vertex_buffers,
        ..DrawDescriptor::new(PipelineHandle(1), 3)
    });
    ctx.main().submit(list);

    assert_eq!(
        executed_commands(&ctx),
        vec!["clear_depth_stencil", "clear_render_target", "draw"]
    );
    assert_eq!(
        depth.published_state(Subresource::All),
        Some(ResourceState::DEPTH_READ | ResourceState::PIXEL_SHADER_RESOURCE)
    );
    assert_eq!(
        shadow.published_state(Subresource::All),
        Some(ResourceState::PIXEL_SHADER_RESOURCE)
    );
    // Only the attached subresource was touched
    assert_eq!(
        color.published_state(Subresource::Index(0)),
        Some(ResourceState::RENDER_TARGET)
    );
    assert_valid(&ctx);
}

#[test]
fn dependent_dispatches_use_uav_barriers() {
    let ctx = device("main");
    let particles = buffer(&ctx, 1024, ResourceState::COMMON);
    let params = buffer(&ctx, 64, ResourceState::VERTEX_AND_CONSTANT_BUFFER);

    let storage = [&particles];
    let constants = [&params];
    let dispatch = DispatchDescriptor {
        storage_buffers: &storage,
        constant_buffers: &constants,
        ..DispatchDescriptor::new(PipelineHandle(7), (64, 1, 1))
    };

    let mut list = ctx.compute().command_list(Some("simulate"));
    list.dispatch(&dispatch);
    list.uav_barrier(&particles);
    list.dispatch(&dispatch);
    ctx.compute().submit(list);

    let history = ctx.backend().history();
    let uav = history
        .iter()
        .position(|op| {
            matches!(
                op,
                ExecutedOp::Barrier {
                    barrier: Barrier::UnorderedAccess { resource: Some(id) },
                    ..
                } if *id == particles.id()
            )
        })
        .unwrap();
    let dispatches: Vec<_> = history
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, ExecutedOp::Command { name: "dispatch", .. }))
        .map(|(idx, _)| idx)
        .collect();
    assert_eq!(dispatches.len(), 2);
    assert!(dispatches[0] < uav && uav < dispatches[1]);

    assert_eq!(
        particles.published_state(),
        Some(ResourceState::UNORDERED_ACCESS)
    );
    assert_valid(&ctx);
}

#[test]
fn resolve_multisampled_target() {
    let ctx = device("main");
    let msaa = Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            sample_count: MultiSamples(4),
            initial_state: ResourceState::RENDER_TARGET,
            ..Default::default()
        },
    )
    .unwrap();
    let resolved = texture(&ctx, 1, 1, ResourceState::PIXEL_SHADER_RESOURCE);

    let mut list = ctx.main().command_list(None);
    list.resolve_texture(&msaa, &resolved);
    list.transition(
        &resolved,
        Subresource::All,
        ResourceState::PIXEL_SHADER_RESOURCE,
    );
    ctx.main().submit(list);

    assert_eq!(executed_commands(&ctx), vec!["resolve_texture"]);
    assert_eq!(ctx.backend().executed_transitions().len(), 3);
    assert_eq!(
        msaa.published_state(Subresource::All),
        Some(ResourceState::RESOLVE_SOURCE)
    );
    assert_valid(&ctx);
}

#[test]
fn multisampled_mips_are_unsupported() {
    let ctx = device("main");
    let result = Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            sample_count: MultiSamples(4),
            mip_levels: 2,
            ..Default::default()
        },
    );
    assert!(result.is_err());
    assert!(ctx.state_table().is_empty());
}

#[test]
fn validation_catches_stale_before_state() {
    let ctx = device("main");
    let r = buffer(&ctx, 16, ResourceState::COMMON);

    // Publishing a state the device never reached makes the next resolution wrong
    ctx.state_table()
        .set_state(r.id(), Subresource::All, ResourceState::COPY_SOURCE);

    let mut list = ctx.main().command_list(None);
    list.transition(&r, Subresource::All, ResourceState::COPY_DEST);
    ctx.main().submit(list);

    assert_eq!(
        ctx.backend().take_validation_errors(),
        vec![ValidationError::StateMismatch {
            resource: r.id(),
            subresource: 0,
            expected: ResourceState::COPY_SOURCE,
            actual: ResourceState::COMMON,
        }]
    );
    assert_valid(&ctx);
}
