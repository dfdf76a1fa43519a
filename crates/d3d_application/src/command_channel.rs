//! The single reusable command recording unit and its submission rules.

use eyre::eyre;

use crate::device::ResourceState;
use crate::device::ScissorRect;
use crate::device::ViewHandle;
use crate::device::Viewport;
use crate::error::AppResult;
use crate::fence_counter::FenceCounter;
use crate::fence_counter::GpuFence;

/// One recording buffer plus its backing allocator, bound to the queue.
pub trait CommandRecorder {
    type Image;
    type Pipeline;
    type Mesh;

    /// Resets the allocator and reopens the list for recording.
    fn reset(&mut self) -> AppResult<()>;
    fn close(&mut self) -> AppResult<()>;
    /// Executes the closed list on the queue.
    fn submit(&mut self) -> AppResult<()>;

    fn transition(&mut self, image: &Self::Image, before: ResourceState, after: ResourceState);
    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, rect: &ScissorRect);
    fn clear_render_target(&mut self, view: ViewHandle, color: [f32; 4]);
    fn clear_depth_stencil(&mut self, view: ViewHandle, depth: f32, stencil: u8);
    fn set_render_targets(&mut self, color: ViewHandle, depth: ViewHandle);

    /// Binds the pipeline state, its root signature and the triangle-list
    /// topology.
    fn set_pipeline(&mut self, pipeline: &Self::Pipeline);
    /// Writes the bound pipeline's root constants.
    fn set_root_constants(&mut self, values: &[f32]);
    /// Binds the vertex and index buffers.
    fn set_mesh(&mut self, mesh: &Self::Mesh);
    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    /// Closed with nothing new recorded.
    Idle,
    Recording,
    /// Closed and waiting to be submitted.
    Recorded,
}

pub struct CommandChannel<R> {
    recorder: R,
    state: ListState,
    /// Fence value current when the last list was submitted. That work has
    /// retired once the GPU completes any later value.
    submitted_after: Option<u64>,
}

impl<R: CommandRecorder> CommandChannel<R> {
    /// Takes a recorder whose list has already been closed.
    pub fn new(recorder: R) -> Self {
        Self {
            recorder,
            state: ListState::Idle,
            submitted_after: None,
        }
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Opens the list for recording, first waiting for the previous
    /// submission to retire so the allocator can be reset.
    pub fn begin<F: GpuFence>(&mut self, fence: &mut FenceCounter<F>) -> AppResult<&mut R> {
        if self.state == ListState::Recording {
            return Err(eyre!("command list is already open for recording").into());
        }
        if let Some(after) = self.submitted_after.take() {
            fence.retire(after)?;
        }
        self.recorder.reset()?;
        self.state = ListState::Recording;
        Ok(&mut self.recorder)
    }

    pub fn close(&mut self) -> AppResult<()> {
        if self.state != ListState::Recording {
            return Err(eyre!("command list closed while not recording").into());
        }
        self.recorder.close()?;
        self.state = ListState::Recorded;
        Ok(())
    }

    pub fn submit<F: GpuFence>(&mut self, fence: &FenceCounter<F>) -> AppResult<()> {
        if self.state != ListState::Recorded {
            return Err(eyre!("only a closed, recorded command list can be submitted").into());
        }
        self.recorder.submit()?;
        self.submitted_after = Some(fence.current_value());
        self.state = ListState::Idle;
        Ok(())
    }
}
