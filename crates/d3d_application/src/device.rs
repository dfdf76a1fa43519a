use serde::Deserialize;

use crate::command_channel::CommandRecorder;
use crate::error::AppResult;
use crate::fence_counter::GpuFence;

/// Number of presentable images in the back-buffer ring.
pub const SWAP_CHAIN_BUFFER_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn clamp_min(self, min: Extent) -> Self {
        Self {
            width: self.width.max(min.width),
            height: self.height.max(min.height),
        }
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    R8g8b8a8Unorm,
    B8g8r8a8Unorm,
    R16g16b16a16Float,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8x24Uint,
}

impl Format {
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Format::D24UnormS8Uint | Format::D32Float | Format::D32FloatS8x24Uint
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDesc {
    pub count: u32,
    pub quality: u32,
}

impl SampleDesc {
    pub const SINGLE: SampleDesc = SampleDesc {
        count: 1,
        quality: 0,
    };
}

impl Default for SampleDesc {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Logical usage state of an image, as seen by transition commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    RenderTarget,
    Present,
    DepthWrite,
}

/// A CPU descriptor address inside a [`ViewTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(pub usize);

/// A fixed-size table of views laid out at a constant stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTable {
    pub start: usize,
    pub increment: usize,
    pub len: usize,
}

impl ViewTable {
    pub fn slot(&self, index: usize) -> ViewHandle {
        debug_assert!(index < self.len, "view slot {index} outside table of {}", self.len);
        ViewHandle(self.start + index * self.increment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full client area, depth range [0, 1].
    pub fn covering(extent: Extent) -> Self {
        Self {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    pub fn covering(extent: Extent) -> Self {
        Self {
            left: 0,
            top: 0,
            right: extent.width as i32,
            bottom: extent.height as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapChainDesc {
    pub extent: Extent,
    pub format: Format,
    pub buffer_count: u32,
    pub samples: SampleDesc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilDesc {
    pub extent: Extent,
    pub format: Format,
    pub samples: SampleDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One per-vertex input, matched to the vertex shader by semantic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: &'static str,
    pub format: VertexFormat,
    pub offset: u32,
}

/// HLSL compiled when the pipeline is created.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    /// Shown in compiler diagnostics.
    pub name: &'a str,
    pub code: &'a str,
    pub vertex_entry: &'a str,
    pub pixel_entry: &'a str,
}

/// A triangle-list pipeline writing one color target and the depth buffer.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc<'a> {
    pub shader: ShaderSource<'a>,
    pub vertex_layout: &'a [VertexAttribute],
    /// Number of 32-bit values bound to register `b0` through
    /// [`CommandRecorder::set_root_constants`].
    pub root_constants: u32,
    pub render_target_format: Format,
    pub depth_stencil_format: Format,
}

/// Vertex bytes and 16-bit indices uploaded once and drawn many times.
#[derive(Debug, Clone, Copy)]
pub struct MeshDesc<'a> {
    pub vertices: &'a [u8],
    pub vertex_stride: u32,
    pub indices: &'a [u16],
}

impl MeshDesc<'_> {
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32 / self.vertex_stride.max(1)
    }
}

/// The presentable image chain bound to a window.
pub trait SwapChain {
    type Image;

    /// Recreates the internal buffers. Fails while any buffer handle obtained
    /// from [`SwapChain::buffer`] is still alive.
    fn resize_buffers(&mut self, buffer_count: u32, extent: Extent, format: Format)
        -> AppResult<()>;
    fn buffer(&self, index: u32) -> AppResult<Self::Image>;
    fn present(&mut self, sync_interval: u32) -> AppResult<()>;
    /// The sample description the buffers were actually created with.
    fn sample_desc(&self) -> SampleDesc;
}

/// The graphics device collaborator.
pub trait Device {
    type Image;
    /// Whatever the swap chain presents into (a window handle, or nothing).
    type Surface;
    type Fence: GpuFence;
    type Pipeline;
    type Mesh;
    type Commands: CommandRecorder<
        Image = Self::Image,
        Pipeline = Self::Pipeline,
        Mesh = Self::Mesh,
    >;
    type SwapChain: SwapChain<Image = Self::Image>;

    fn create_fence(&self) -> AppResult<Self::Fence>;
    fn create_commands(&self) -> AppResult<Self::Commands>;
    fn create_swap_chain(
        &self,
        surface: &Self::Surface,
        desc: &SwapChainDesc,
    ) -> AppResult<Self::SwapChain>;

    /// Sized for exactly [`SWAP_CHAIN_BUFFER_COUNT`] render-target views.
    fn render_target_table(&self) -> ViewTable;
    /// Sized for one depth/stencil view.
    fn depth_stencil_table(&self) -> ViewTable;

    fn create_render_target_view(&self, image: &Self::Image, view: ViewHandle);
    fn create_depth_stencil(&self, desc: &DepthStencilDesc) -> AppResult<Self::Image>;
    fn create_depth_stencil_view(&self, image: &Self::Image, format: Format, view: ViewHandle);

    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> AppResult<u32>;

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> AppResult<Self::Pipeline>;
    fn create_mesh(&self, desc: &MeshDesc<'_>) -> AppResult<Self::Mesh>;
}
