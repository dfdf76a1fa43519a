//! A vertex-colored cube seen through the orbit camera.

use bytemuck::Pod;
use bytemuck::Zeroable;
use d3d_application::application::Application;
use d3d_application::application::FrameContext;
use d3d_application::command_channel::CommandRecorder;
use d3d_application::device::Device;
use d3d_application::device::Extent;
use d3d_application::device::MeshDesc;
use d3d_application::device::PipelineDesc;
use d3d_application::device::ShaderSource;
use d3d_application::device::VertexAttribute;
use d3d_application::device::VertexFormat;
use d3d_application::events::Key;
use d3d_application::events::MouseButtons;
use d3d_application::AppResult;
use d3d_application::FrameClock;
use d3d_application::GraphicsContext;
use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::camera::OrbitCamera;

const COLOR_SHADER: &str = include_str!("../shaders/color.hlsl");

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

const fn vertex(position: [f32; 3], color: [f32; 4]) -> Vertex {
    Vertex { position, color }
}

const VERTEX_LAYOUT: [VertexAttribute; 2] = [
    VertexAttribute {
        semantic: "POSITION",
        format: VertexFormat::Float32x3,
        offset: 0,
    },
    VertexAttribute {
        semantic: "COLOR",
        format: VertexFormat::Float32x4,
        offset: 12,
    },
];

const BOX_VERTICES: [Vertex; 8] = [
    vertex([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0, 1.0]),
    vertex([-1.0, 1.0, -1.0], [0.0, 0.0, 0.0, 1.0]),
    vertex([1.0, 1.0, -1.0], [1.0, 0.0, 0.0, 1.0]),
    vertex([1.0, -1.0, -1.0], [0.0, 1.0, 0.0, 1.0]),
    vertex([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0, 1.0]),
    vertex([-1.0, 1.0, 1.0], [1.0, 1.0, 0.0, 1.0]),
    vertex([1.0, 1.0, 1.0], [0.0, 1.0, 1.0, 1.0]),
    vertex([1.0, -1.0, 1.0], [1.0, 0.0, 1.0, 1.0]),
];

/// Clockwise when seen from outside the box.
#[rustfmt::skip]
const BOX_INDICES: [u16; 36] = [
    // front
    0, 1, 2, 0, 2, 3,
    // back
    4, 6, 5, 4, 7, 6,
    // left
    4, 5, 1, 4, 1, 0,
    // right
    3, 2, 6, 3, 6, 7,
    // top
    1, 5, 6, 1, 6, 2,
    // bottom
    4, 0, 3, 4, 3, 7,
];

/// World-view-projection matrix bound at `b0`.
const ROOT_CONSTANTS: u32 = 16;

/// Pipeline and geometry are owned here and outlive every frame recorded
/// with them; the frame loop flushes the queue before the demo is dropped.
pub struct BoxDemo<P, M> {
    camera: OrbitCamera,
    clear_color: [f32; 4],
    pipeline: P,
    mesh: M,
}

impl<P, M> BoxDemo<P, M> {
    pub fn new<D>(context: &GraphicsContext<D>, clear_color: [f32; 4]) -> AppResult<Self>
    where
        D: Device<Pipeline = P, Mesh = M>,
    {
        let device = context.device();
        let pipeline = device
            .create_pipeline(&PipelineDesc {
                shader: ShaderSource {
                    name: "color.hlsl",
                    code: COLOR_SHADER,
                    vertex_entry: "VSMain",
                    pixel_entry: "PSMain",
                },
                vertex_layout: &VERTEX_LAYOUT,
                root_constants: ROOT_CONSTANTS,
                render_target_format: context.back_buffer_format(),
                depth_stencil_format: context.depth_stencil_format(),
            })
            .map_err(|e| e.wrap_err("failed to build the box pipeline"))?;
        let mesh = device
            .create_mesh(&MeshDesc {
                vertices: bytemuck::cast_slice(&BOX_VERTICES),
                vertex_stride: std::mem::size_of::<Vertex>() as u32,
                indices: &BOX_INDICES,
            })
            .map_err(|e| e.wrap_err("failed to upload the box geometry"))?;

        let mut camera = OrbitCamera::default();
        camera.set_aspect(context.extent());
        camera.advance(0.0);
        info!(
            vertices = BOX_VERTICES.len(),
            indices = BOX_INDICES.len(),
            "Box geometry ready"
        );
        Ok(Self {
            camera,
            clear_color,
            pipeline,
            mesh,
        })
    }
}

impl<C, P, M> Application<C> for BoxDemo<P, M>
where
    C: CommandRecorder<Pipeline = P, Mesh = M>,
{
    fn update(&mut self, clock: &FrameClock) {
        self.camera.advance(clock.delta_time());
    }

    fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    fn draw(&mut self, _clock: &FrameClock, frame: &mut FrameContext<'_, C>) -> AppResult<()> {
        let world_view_projection = self.camera.view_projection();
        trace!(?world_view_projection, extent = %frame.extent, "Box frame");

        let commands = &mut *frame.commands;
        commands.set_pipeline(&self.pipeline);
        commands.set_root_constants(&world_view_projection.to_cols_array());
        commands.set_mesh(&self.mesh);
        commands.draw_indexed(BOX_INDICES.len() as u32, 0, 0);
        Ok(())
    }

    fn on_resize(&mut self, extent: Extent) {
        debug!(%extent, "Updating projection");
        self.camera.set_aspect(extent);
    }

    fn on_mouse_down(&mut self, _buttons: MouseButtons, x: i32, y: i32) {
        self.camera.grab(x, y);
    }

    fn on_mouse_up(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {
        self.camera.release();
    }

    fn on_mouse_move(&mut self, buttons: MouseButtons, x: i32, y: i32) {
        let (dx, dy) = self.camera.drag_to(x, y);
        if buttons.left {
            self.camera.rotate(dx, dy);
        } else if buttons.right {
            self.camera.zoom(dx, dy);
        }
    }

    fn on_key_up(&mut self, key: Key) {
        debug!(?key, "Unhandled key");
    }
}
