use std::rc::Rc;

use eyre::eyre;

use super::gpu::HeadlessGpu;
use super::gpu::QueueItem;
use super::gpu::RecordedCommand;
use crate::command_channel::CommandRecorder;
use crate::device::DepthStencilDesc;
use crate::device::Device;
use crate::device::Extent;
use crate::device::Format;
use crate::device::MeshDesc;
use crate::device::PipelineDesc;
use crate::device::ResourceState;
use crate::device::SampleDesc;
use crate::device::ScissorRect;
use crate::device::SwapChain;
use crate::device::SwapChainDesc;
use crate::device::ViewHandle;
use crate::device::ViewTable;
use crate::device::Viewport;
use crate::device::SWAP_CHAIN_BUFFER_COUNT;
use crate::error::AppResult;
use crate::error::OperationFailed;
use crate::fence_counter::GpuFence;

pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;
pub const DXGI_ERROR_INVALID_CALL: i32 = 0x887A_0001_u32 as i32;

pub const RENDER_TARGET_TABLE: ViewTable = ViewTable {
    start: 0x1000,
    increment: 32,
    len: SWAP_CHAIN_BUFFER_COUNT,
};
pub const DEPTH_STENCIL_TABLE: ViewTable = ViewTable {
    start: 0x2000,
    increment: 8,
    len: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    BackBuffer,
    DepthStencil,
}

#[derive(Debug)]
pub struct ImageInfo {
    pub id: u64,
    pub kind: ImageKind,
    pub extent: Extent,
    pub format: Format,
    pub samples: SampleDesc,
}

/// A GPU resource handle. Cloning it adds an outstanding reference, which
/// blocks [`SwapChain::resize_buffers`] just like a held COM pointer.
#[derive(Debug, Clone)]
pub struct HeadlessImage(Rc<ImageInfo>);

impl HeadlessImage {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn info(&self) -> &ImageInfo {
        &self.0
    }

    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

#[derive(Debug)]
pub struct HeadlessPipeline {
    id: u64,
    root_constants: u32,
}

impl HeadlessPipeline {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
pub struct HeadlessMesh {
    id: u64,
    vertex_count: u32,
    index_count: u32,
}

impl HeadlessMesh {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

pub struct HeadlessDevice {
    gpu: HeadlessGpu,
}

impl HeadlessDevice {
    pub fn new(gpu: HeadlessGpu) -> Self {
        Self { gpu }
    }

    pub fn gpu(&self) -> &HeadlessGpu {
        &self.gpu
    }
}

impl Device for HeadlessDevice {
    type Image = HeadlessImage;
    type Surface = ();
    type Fence = HeadlessFence;
    type Pipeline = HeadlessPipeline;
    type Mesh = HeadlessMesh;
    type Commands = HeadlessCommands;
    type SwapChain = HeadlessSwapChain;

    fn create_fence(&self) -> AppResult<HeadlessFence> {
        if self.gpu.state.borrow().fail_fence_creation {
            return Err(OperationFailed::new("CreateFence", E_FAIL, "fence creation failed").into());
        }
        Ok(HeadlessFence {
            gpu: self.gpu.clone(),
        })
    }

    fn create_commands(&self) -> AppResult<HeadlessCommands> {
        Ok(HeadlessCommands {
            gpu: self.gpu.clone(),
            open: false,
            log: Vec::new(),
            pipeline: None,
            mesh: None,
            root_constants: None,
        })
    }

    fn create_swap_chain(&self, _surface: &(), desc: &SwapChainDesc) -> AppResult<HeadlessSwapChain> {
        let mut state = self.gpu.state.borrow_mut();
        if state.live_swap_chains > 0 {
            return Err(OperationFailed::new(
                "CreateSwapChainForHwnd",
                E_FAIL,
                "the surface already has a swap chain",
            )
            .into());
        }
        state.live_swap_chains += 1;
        state.stats.swap_chains_created += 1;
        drop(state);

        let mut swap_chain = HeadlessSwapChain {
            gpu: self.gpu.clone(),
            buffers: Vec::new(),
            current: 0,
            format: desc.format,
            samples: desc.samples,
        };
        swap_chain.build_buffers(desc.buffer_count, desc.extent);
        Ok(swap_chain)
    }

    fn render_target_table(&self) -> ViewTable {
        RENDER_TARGET_TABLE
    }

    fn depth_stencil_table(&self) -> ViewTable {
        DEPTH_STENCIL_TABLE
    }

    fn create_render_target_view(&self, image: &HeadlessImage, view: ViewHandle) {
        self.gpu
            .state
            .borrow_mut()
            .render_target_views
            .insert(view.0, image.id());
    }

    fn create_depth_stencil(&self, desc: &DepthStencilDesc) -> AppResult<HeadlessImage> {
        if !desc.format.is_depth() {
            return Err(eyre!("{:?} is not a depth/stencil format", desc.format).into());
        }
        let id = self.gpu.state.borrow_mut().new_image(ResourceState::Common);
        Ok(HeadlessImage(Rc::new(ImageInfo {
            id,
            kind: ImageKind::DepthStencil,
            extent: desc.extent,
            format: desc.format,
            samples: desc.samples,
        })))
    }

    fn create_depth_stencil_view(&self, image: &HeadlessImage, _format: Format, view: ViewHandle) {
        self.gpu
            .state
            .borrow_mut()
            .depth_stencil_views
            .insert(view.0, image.id());
    }

    fn multisample_quality_levels(&self, _format: Format, sample_count: u32) -> AppResult<u32> {
        if sample_count == 1 {
            return Ok(1);
        }
        Ok(self.gpu.state.borrow().msaa_quality_levels)
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> AppResult<HeadlessPipeline> {
        let shader = &desc.shader;
        if shader.code.is_empty() || shader.vertex_entry.is_empty() || shader.pixel_entry.is_empty()
        {
            return Err(eyre!("shader {} has no code or entry point", shader.name).into());
        }
        if desc.vertex_layout.is_empty() {
            return Err(eyre!("pipeline has no vertex layout").into());
        }
        if desc.render_target_format.is_depth() || !desc.depth_stencil_format.is_depth() {
            return Err(OperationFailed::new(
                "CreateGraphicsPipelineState",
                E_INVALIDARG,
                format!(
                    "{:?} / {:?} is not a color / depth format pair",
                    desc.render_target_format, desc.depth_stencil_format
                ),
            )
            .into());
        }
        let mut state = self.gpu.state.borrow_mut();
        state.stats.pipelines_created += 1;
        Ok(HeadlessPipeline {
            id: state.new_id(),
            root_constants: desc.root_constants,
        })
    }

    fn create_mesh(&self, desc: &MeshDesc<'_>) -> AppResult<HeadlessMesh> {
        if desc.vertex_stride == 0 || desc.vertices.len() % desc.vertex_stride as usize != 0 {
            return Err(eyre!(
                "{} vertex bytes are not a whole number of {}-byte vertices",
                desc.vertices.len(),
                desc.vertex_stride
            )
            .into());
        }
        let vertex_count = desc.vertex_count();
        if let Some(index) = desc.indices.iter().find(|&&i| u32::from(i) >= vertex_count) {
            return Err(eyre!("index {index} is out of range for {vertex_count} vertices").into());
        }
        let mut state = self.gpu.state.borrow_mut();
        state.stats.meshes_created += 1;
        Ok(HeadlessMesh {
            id: state.new_id(),
            vertex_count,
            index_count: desc.indices.len() as u32,
        })
    }
}

pub struct HeadlessFence {
    gpu: HeadlessGpu,
}

impl GpuFence for HeadlessFence {
    fn signal(&mut self, value: u64) -> AppResult<()> {
        let mut state = self.gpu.state.borrow_mut();
        state.signaled = state.signaled.max(value);
        state.stats.signals += 1;
        state.enqueue(QueueItem::Signal(value));
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.gpu.state.borrow().completed
    }

    fn wait_for(&mut self, value: u64) -> AppResult<()> {
        let mut state = self.gpu.state.borrow_mut();
        if value > state.signaled {
            return Err(OperationFailed::new(
                "SetEventOnCompletion",
                E_FAIL,
                format!("waiting for {value} which was never signalled would hang"),
            )
            .into());
        }
        state.stats.blocking_waits += 1;
        state.drain(value);
        Ok(())
    }
}

pub struct HeadlessCommands {
    gpu: HeadlessGpu,
    open: bool,
    log: Vec<RecordedCommand>,
    /// Id and root constant count of the bound pipeline.
    pipeline: Option<(u64, u32)>,
    /// Id, vertex count and index count of the bound mesh.
    mesh: Option<(u64, u32, u32)>,
    root_constants: Option<usize>,
}

impl HeadlessCommands {
    /// Commands recorded into the currently open or last closed list.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.log
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn check_render_target(&self, view: ViewHandle) {
        let mut state = self.gpu.state.borrow_mut();
        if !state.render_target_views.contains_key(&view.0) {
            state.stats.invalid_view_uses += 1;
        }
    }

    fn check_depth_stencil(&self, view: ViewHandle) {
        let mut state = self.gpu.state.borrow_mut();
        if !state.depth_stencil_views.contains_key(&view.0) {
            state.stats.invalid_view_uses += 1;
        }
    }

    fn draw_is_valid(&self, index_count: u32, start_index: u32, base_vertex: i32) -> bool {
        let (Some((_, wanted_constants)), Some((_, vertex_count, mesh_indices))) =
            (self.pipeline, self.mesh)
        else {
            return false;
        };
        let constants_ok =
            wanted_constants == 0 || self.root_constants == Some(wanted_constants as usize);
        let indices_ok = start_index
            .checked_add(index_count)
            .is_some_and(|end| end <= mesh_indices);
        constants_ok && indices_ok && base_vertex >= 0 && (base_vertex as u32) < vertex_count
    }
}

impl CommandRecorder for HeadlessCommands {
    type Image = HeadlessImage;
    type Pipeline = HeadlessPipeline;
    type Mesh = HeadlessMesh;

    fn reset(&mut self) -> AppResult<()> {
        if self.open {
            return Err(OperationFailed::new("Reset", E_FAIL, "command list is still open").into());
        }
        if self.gpu.state.borrow().has_pending_lists() {
            return Err(OperationFailed::new(
                "Reset",
                E_FAIL,
                "command allocator is still in use by the GPU",
            )
            .into());
        }
        self.open = true;
        self.log.clear();
        self.pipeline = None;
        self.mesh = None;
        self.root_constants = None;
        Ok(())
    }

    fn close(&mut self) -> AppResult<()> {
        if !self.open {
            return Err(OperationFailed::new("Close", E_FAIL, "command list is not open").into());
        }
        self.open = false;
        Ok(())
    }

    fn submit(&mut self) -> AppResult<()> {
        if self.open {
            return Err(OperationFailed::new(
                "ExecuteCommandLists",
                E_FAIL,
                "command list was not closed",
            )
            .into());
        }
        self.gpu
            .state
            .borrow_mut()
            .enqueue(QueueItem::Execute(self.log.clone()));
        Ok(())
    }

    fn transition(&mut self, image: &HeadlessImage, before: ResourceState, after: ResourceState) {
        self.log.push(RecordedCommand::Transition {
            image: image.id(),
            before,
            after,
        });
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {
        self.log.push(RecordedCommand::SetViewport);
    }

    fn set_scissor(&mut self, _rect: &ScissorRect) {
        self.log.push(RecordedCommand::SetScissor);
    }

    fn clear_render_target(&mut self, view: ViewHandle, _color: [f32; 4]) {
        self.log.push(RecordedCommand::ClearRenderTarget(view));
        self.check_render_target(view);
    }

    fn clear_depth_stencil(&mut self, view: ViewHandle, _depth: f32, _stencil: u8) {
        self.log.push(RecordedCommand::ClearDepthStencil(view));
        self.check_depth_stencil(view);
    }

    fn set_render_targets(&mut self, color: ViewHandle, depth: ViewHandle) {
        self.log.push(RecordedCommand::SetRenderTargets { color, depth });
        self.check_render_target(color);
        self.check_depth_stencil(depth);
    }

    fn set_pipeline(&mut self, pipeline: &HeadlessPipeline) {
        self.log.push(RecordedCommand::SetPipeline(pipeline.id));
        self.pipeline = Some((pipeline.id, pipeline.root_constants));
        // A new root signature invalidates root arguments.
        self.root_constants = None;
    }

    fn set_root_constants(&mut self, values: &[f32]) {
        self.log.push(RecordedCommand::SetRootConstants(values.len()));
        self.root_constants = Some(values.len());
    }

    fn set_mesh(&mut self, mesh: &HeadlessMesh) {
        self.log.push(RecordedCommand::SetMesh(mesh.id));
        self.mesh = Some((mesh.id, mesh.vertex_count, mesh.index_count));
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.log.push(RecordedCommand::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
        if !self.draw_is_valid(index_count, start_index, base_vertex) {
            self.gpu.state.borrow_mut().stats.invalid_draws += 1;
        }
    }
}

pub struct HeadlessSwapChain {
    gpu: HeadlessGpu,
    buffers: Vec<HeadlessImage>,
    current: usize,
    format: Format,
    samples: SampleDesc,
}

impl HeadlessSwapChain {
    /// The buffer the next present will show.
    pub fn current_back_buffer_index(&self) -> usize {
        self.current
    }

    pub fn extent(&self) -> Extent {
        self.buffers
            .first()
            .map(|buffer| buffer.info().extent)
            .unwrap_or_default()
    }

    fn build_buffers(&mut self, count: u32, extent: Extent) {
        let mut state = self.gpu.state.borrow_mut();
        self.buffers = (0..count)
            .map(|_| {
                HeadlessImage(Rc::new(ImageInfo {
                    id: state.new_image(ResourceState::Present),
                    kind: ImageKind::BackBuffer,
                    extent,
                    format: self.format,
                    samples: self.samples,
                }))
            })
            .collect();
        self.current = 0;
    }
}

impl SwapChain for HeadlessSwapChain {
    type Image = HeadlessImage;

    fn resize_buffers(&mut self, buffer_count: u32, extent: Extent, format: Format) -> AppResult<()> {
        if let Some(held) = self.buffers.iter().find(|buffer| buffer.handle_count() > 1) {
            return Err(OperationFailed::new(
                "ResizeBuffers",
                DXGI_ERROR_INVALID_CALL,
                format!("buffer {} still has outstanding references", held.id()),
            )
            .into());
        }
        if self.gpu.state.borrow().has_pending_lists() {
            return Err(OperationFailed::new(
                "ResizeBuffers",
                DXGI_ERROR_INVALID_CALL,
                "the GPU may still reference the buffers",
            )
            .into());
        }
        self.format = format;
        self.build_buffers(buffer_count, extent);
        self.gpu.state.borrow_mut().stats.buffer_resizes += 1;
        Ok(())
    }

    fn buffer(&self, index: u32) -> AppResult<HeadlessImage> {
        self.buffers.get(index as usize).cloned().ok_or_else(|| {
            OperationFailed::new(
                "GetBuffer",
                DXGI_ERROR_INVALID_CALL,
                format!("no buffer {index}"),
            )
            .into()
        })
    }

    fn present(&mut self, _sync_interval: u32) -> AppResult<()> {
        let image = self
            .buffers
            .get(self.current)
            .map(HeadlessImage::id)
            .ok_or_else(|| eyre!("swap chain has no buffers"))?;
        let mut state = self.gpu.state.borrow_mut();
        state.stats.presents += 1;
        state.enqueue(QueueItem::Present { image });
        drop(state);
        self.current = (self.current + 1) % self.buffers.len();
        Ok(())
    }

    fn sample_desc(&self) -> SampleDesc {
        self.samples
    }
}

impl Drop for HeadlessSwapChain {
    fn drop(&mut self) {
        let mut state = self.gpu.state.borrow_mut();
        state.live_swap_chains = state.live_swap_chains.saturating_sub(1);
    }
}
