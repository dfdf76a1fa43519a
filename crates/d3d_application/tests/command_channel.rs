//! Recording rules of the command channel and the fence counter behind it.

mod common;

use common::deferred_gpu;
use d3d_application::command_channel::CommandChannel;
use d3d_application::command_channel::CommandRecorder;
use d3d_application::command_channel::ListState;
use d3d_application::device::Device;
use d3d_application::device::Format;
use d3d_application::device::MeshDesc;
use d3d_application::device::PipelineDesc;
use d3d_application::device::ShaderSource;
use d3d_application::device::VertexAttribute;
use d3d_application::device::VertexFormat;
use d3d_application::fence_counter::FenceCounter;
use d3d_application::headless::HeadlessCommands;
use d3d_application::headless::HeadlessDevice;
use d3d_application::headless::HeadlessFence;
use d3d_application::headless::HeadlessGpu;
use d3d_application::headless::HeadlessMesh;
use d3d_application::headless::HeadlessPipeline;
use d3d_application::headless::E_INVALIDARG;

fn channel(
    gpu: &HeadlessGpu,
) -> (
    FenceCounter<HeadlessFence>,
    CommandChannel<HeadlessCommands>,
) {
    let device = HeadlessDevice::new(gpu.clone());
    (
        FenceCounter::new(device.create_fence().unwrap()),
        CommandChannel::new(device.create_commands().unwrap()),
    )
}

const LAYOUT: [VertexAttribute; 1] = [VertexAttribute {
    semantic: "POSITION",
    format: VertexFormat::Float32x3,
    offset: 0,
}];

fn pipeline_desc(render_target_format: Format) -> PipelineDesc<'static> {
    PipelineDesc {
        shader: ShaderSource {
            name: "flat.hlsl",
            code: "float4 VSMain(float3 p : POSITION) : SV_POSITION { return float4(p, 1); }",
            vertex_entry: "VSMain",
            pixel_entry: "PSMain",
        },
        vertex_layout: &LAYOUT,
        root_constants: 16,
        render_target_format,
        depth_stencil_format: Format::D24UnormS8Uint,
    }
}

/// A single triangle.
fn triangle(device: &HeadlessDevice) -> (HeadlessPipeline, HeadlessMesh) {
    let vertices = [0u8; 36];
    let pipeline = device
        .create_pipeline(&pipeline_desc(Format::R8g8b8a8Unorm))
        .unwrap();
    let mesh = device
        .create_mesh(&MeshDesc {
            vertices: &vertices,
            vertex_stride: 12,
            indices: &[0, 1, 2],
        })
        .unwrap();
    (pipeline, mesh)
}

#[test]
fn full_cycle_returns_to_idle() {
    let gpu = deferred_gpu();
    let (mut fence, mut channel) = channel(&gpu);
    assert_eq!(channel.state(), ListState::Idle);

    channel.begin(&mut fence).unwrap();
    assert_eq!(channel.state(), ListState::Recording);
    channel.close().unwrap();
    assert_eq!(channel.state(), ListState::Recorded);
    channel.submit(&fence).unwrap();
    assert_eq!(channel.state(), ListState::Idle);
    assert_eq!(gpu.pending(), 1);

    fence.flush().unwrap();
    assert_eq!(gpu.stats().executed_lists, 1);
    assert_eq!(fence.completed_value(), fence.current_value());
}

#[test]
fn begin_while_recording_is_an_error() {
    let gpu = deferred_gpu();
    let (mut fence, mut channel) = channel(&gpu);
    channel.begin(&mut fence).unwrap();
    assert!(channel.begin(&mut fence).is_err());
}

#[test]
fn close_and_submit_out_of_order_are_errors() {
    let gpu = deferred_gpu();
    let (mut fence, mut channel) = channel(&gpu);
    assert!(channel.close().is_err());
    assert!(channel.submit(&fence).is_err());

    channel.begin(&mut fence).unwrap();
    assert!(channel.submit(&fence).is_err(), "still recording");
    assert_eq!(gpu.stats().executed_lists, 0);
}

#[test]
fn begin_retires_the_previous_submission_first() {
    let gpu = deferred_gpu();
    let (mut fence, mut channel) = channel(&gpu);
    channel.begin(&mut fence).unwrap();
    channel.close().unwrap();
    channel.submit(&fence).unwrap();

    // Nothing signalled behind the submission yet, so begin has to add a
    // boundary and wait for it before the allocator can be reset.
    channel.begin(&mut fence).unwrap();
    assert_eq!(fence.current_value(), 1);
    assert_eq!(fence.completed_value(), 1);
    assert_eq!(gpu.pending(), 0);
}

#[test]
fn begin_uses_an_already_signalled_boundary() {
    let gpu = deferred_gpu();
    let (mut fence, mut channel) = channel(&gpu);
    channel.begin(&mut fence).unwrap();
    channel.close().unwrap();
    channel.submit(&fence).unwrap();
    fence.signal_next().unwrap();

    channel.begin(&mut fence).unwrap();
    assert_eq!(fence.current_value(), 1, "no extra signal");
    assert_eq!(fence.completed_value(), 1);
}

#[test]
fn waiting_on_an_unsignalled_value_fails() {
    let gpu = deferred_gpu();
    let (mut fence, _channel) = channel(&gpu);
    let report = fence.wait_until(5).unwrap_err();
    assert_eq!(
        report.operation_failed().unwrap().operation(),
        "SetEventOnCompletion"
    );
}

#[test]
fn wait_on_completed_value_returns_without_blocking() {
    let gpu = deferred_gpu();
    let (mut fence, _channel) = channel(&gpu);
    fence.flush().unwrap();
    let waits = gpu.stats().blocking_waits;
    fence.wait_until(1).unwrap();
    fence.wait_until(0).unwrap();
    assert_eq!(gpu.stats().blocking_waits, waits);
}

#[test]
fn pipeline_rejects_a_depth_render_target() {
    let gpu = deferred_gpu();
    let device = HeadlessDevice::new(gpu.clone());
    let report = device
        .create_pipeline(&pipeline_desc(Format::D32Float))
        .err()
        .unwrap();
    let failed = report.operation_failed().unwrap();
    assert_eq!(failed.operation(), "CreateGraphicsPipelineState");
    assert_eq!(failed.code(), E_INVALIDARG);
    assert_eq!(gpu.stats().pipelines_created, 0);
}

#[test]
fn mesh_indices_must_stay_inside_the_vertices() {
    let gpu = deferred_gpu();
    let device = HeadlessDevice::new(gpu.clone());
    let vertices = [0u8; 24];
    let desc = MeshDesc {
        vertices: &vertices,
        vertex_stride: 12,
        indices: &[0, 1, 2],
    };
    assert!(device.create_mesh(&desc).is_err());
    assert!(device
        .create_mesh(&MeshDesc {
            vertex_stride: 7,
            ..desc
        })
        .is_err());
    assert_eq!(gpu.stats().meshes_created, 0);
}

#[test]
fn draw_needs_pipeline_constants_and_mesh() {
    let gpu = deferred_gpu();
    let device = HeadlessDevice::new(gpu.clone());
    let (pipeline, mesh) = triangle(&device);
    let (mut fence, mut channel) = channel(&gpu);

    let commands = channel.begin(&mut fence).unwrap();
    // Nothing bound.
    commands.draw_indexed(3, 0, 0);
    commands.set_pipeline(&pipeline);
    commands.set_mesh(&mesh);
    // Root constants missing.
    commands.draw_indexed(3, 0, 0);
    commands.set_root_constants(&[0.0; 16]);
    // Past the end of the index buffer.
    commands.draw_indexed(3, 1, 0);
    commands.draw_indexed(3, 0, 0);
    // Rebinding the pipeline drops the constants again.
    commands.set_pipeline(&pipeline);
    commands.draw_indexed(3, 0, 0);

    assert_eq!(gpu.stats().invalid_draws, 4);
    assert_eq!(channel.recorder().commands().len(), 9);
}
