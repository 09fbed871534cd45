use api::{
    buffer::{Buffer, BufferCreateInfo},
    config::TrackingConfig,
    context::{Context, ContextCreateInfo},
    texture::{Texture, TextureCreateInfo},
    types::{Format, ResourceState},
};

use crate::{ExecutedOp, SoftBackend, SoftBackendCreateInfo};

mod commands;

fn device(name: &str) -> Context<SoftBackend> {
    device_with_config(name, TrackingConfig::default())
}

fn device_with_config(name: &str, tracking: TrackingConfig) -> Context<SoftBackend> {
    Context::with_create_info(
        SoftBackend::new(SoftBackendCreateInfo {
            name: String::from(name),
            cross_adapter: true,
            ..Default::default()
        }),
        ContextCreateInfo {
            debug_name: Some(String::from(name)),
            tracking: TrackingConfig {
                validate_queue_states: true,
                ..tracking
            },
            state_table: None,
        },
    )
}

fn buffer(ctx: &Context<SoftBackend>, size: u64, state: ResourceState) -> Buffer<SoftBackend> {
    Buffer::new(
        ctx.clone(),
        BufferCreateInfo {
            size,
            initial_state: state,
            ..Default::default()
        },
    )
    .unwrap()
}

fn texture(
    ctx: &Context<SoftBackend>,
    mip_levels: u32,
    array_layers: u32,
    state: ResourceState,
) -> Texture<SoftBackend> {
    Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            mip_levels,
            array_layers,
            initial_state: state,
            ..Default::default()
        },
    )
    .unwrap()
}

fn depth_texture(ctx: &Context<SoftBackend>, state: ResourceState) -> Texture<SoftBackend> {
    Texture::new(
        ctx.clone(),
        TextureCreateInfo {
            format: Format::D32Sfloat,
            initial_state: state,
            ..Default::default()
        },
    )
    .unwrap()
}

/// Names of the commands the device executed, in order.
fn executed_commands(ctx: &Context<SoftBackend>) -> Vec<&'static str> {
    ctx.backend()
        .history()
        .into_iter()
        .filter_map(|op| match op {
            ExecutedOp::Command { name, .. } => Some(name),
            _ => None,
        })
        .collect()
}

fn assert_valid(ctx: &Context<SoftBackend>) {
    let errors = ctx.backend().validation_errors();
    assert!(errors.is_empty(), "validation errors: {errors:#?}");
}
