use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::device::ResourceState;
use crate::device::ViewHandle;

/// When submitted queue work completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Work stays in flight until the CPU blocks on a fence.
    #[default]
    Deferred,
    /// Work completes as soon as it is queued.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuStats {
    pub executed_lists: u32,
    pub signals: u32,
    pub presents: u32,
    pub blocking_waits: u32,
    pub buffer_resizes: u32,
    pub swap_chains_created: u32,
    pub pipelines_created: u32,
    pub meshes_created: u32,
    /// Indexed draws the GPU executed.
    pub draws: u32,
    /// Barriers whose `before` state did not match the tracked state, and
    /// draws or presents of an image in the wrong state.
    pub state_mismatches: u32,
    /// Clears and binds through a view slot nothing was written to.
    pub invalid_view_uses: u32,
    /// Draws recorded without a pipeline, mesh or root constants to satisfy
    /// them, or outside the bound index buffer.
    pub invalid_draws: u32,
}

/// One command as recorded into a headless list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordedCommand {
    Transition {
        image: u64,
        before: ResourceState,
        after: ResourceState,
    },
    SetViewport,
    SetScissor,
    ClearRenderTarget(ViewHandle),
    ClearDepthStencil(ViewHandle),
    SetRenderTargets {
        color: ViewHandle,
        depth: ViewHandle,
    },
    SetPipeline(u64),
    SetRootConstants(usize),
    SetMesh(u64),
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum QueueItem {
    Execute(Vec<RecordedCommand>),
    Signal(u64),
    Present { image: u64 },
}

#[derive(Debug, Default)]
pub(crate) struct GpuState {
    pub queue: VecDeque<QueueItem>,
    pub mode: CompletionMode,
    pub signaled: u64,
    pub completed: u64,
    pub next_id: u64,
    pub resource_states: HashMap<u64, ResourceState>,
    pub render_target_views: HashMap<usize, u64>,
    pub depth_stencil_views: HashMap<usize, u64>,
    pub live_swap_chains: u32,
    pub stats: GpuStats,
    pub fail_fence_creation: bool,
    pub msaa_quality_levels: u32,
    pub last_executed: Vec<RecordedCommand>,
}

impl GpuState {
    pub fn enqueue(&mut self, item: QueueItem) {
        self.queue.push_back(item);
        if self.mode == CompletionMode::Immediate {
            self.drain(u64::MAX);
        }
    }

    /// Executes queued work in order until `completed >= value` or the queue
    /// is empty.
    pub fn drain(&mut self, value: u64) {
        while self.completed < value {
            let Some(item) = self.queue.pop_front() else {
                break;
            };
            match item {
                QueueItem::Execute(commands) => {
                    self.stats.executed_lists += 1;
                    self.execute(&commands);
                    self.last_executed = commands;
                }
                QueueItem::Signal(signal) => self.completed = self.completed.max(signal),
                QueueItem::Present { image } => {
                    if self.resource_states.get(&image) != Some(&ResourceState::Present) {
                        self.stats.state_mismatches += 1;
                    }
                }
            }
        }
    }

    fn execute(&mut self, commands: &[RecordedCommand]) {
        let mut color_target = None;
        for command in commands {
            match *command {
                RecordedCommand::Transition {
                    image,
                    before,
                    after,
                } => {
                    let state = self.resource_states.entry(image).or_insert(before);
                    if *state != before {
                        self.stats.state_mismatches += 1;
                    }
                    *state = after;
                }
                RecordedCommand::SetRenderTargets { color, .. } => {
                    color_target = self.render_target_views.get(&color.0).copied();
                }
                RecordedCommand::DrawIndexed { .. } => {
                    self.stats.draws += 1;
                    let drawable = color_target
                        .and_then(|image| self.resource_states.get(&image))
                        .is_some_and(|state| *state == ResourceState::RenderTarget);
                    if !drawable {
                        self.stats.state_mismatches += 1;
                    }
                }
                _ => {}
            }
        }
    }

    pub fn has_pending_lists(&self) -> bool {
        self.queue
            .iter()
            .any(|item| matches!(item, QueueItem::Execute(_)))
    }

    pub fn new_image(&mut self, state: ResourceState) -> u64 {
        let id = self.new_id();
        self.resource_states.insert(id, state);
        id
    }

    pub fn new_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A simulated GPU timeline shared by every headless object.
#[derive(Debug, Clone, Default)]
pub struct HeadlessGpu {
    pub(crate) state: Rc<RefCell<GpuState>>,
}

impl HeadlessGpu {
    pub fn new(mode: CompletionMode) -> Self {
        let gpu = Self::default();
        {
            let mut state = gpu.state.borrow_mut();
            state.mode = mode;
            state.msaa_quality_levels = 1;
        }
        gpu
    }

    pub fn stats(&self) -> GpuStats {
        self.state.borrow().stats
    }

    pub fn signaled_value(&self) -> u64 {
        self.state.borrow().signaled
    }

    pub fn completed_value(&self) -> u64 {
        self.state.borrow().completed
    }

    /// Queue items not yet executed.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    pub fn resource_state(&self, image: u64) -> Option<ResourceState> {
        self.state.borrow().resource_states.get(&image).copied()
    }

    pub fn live_swap_chains(&self) -> u32 {
        self.state.borrow().live_swap_chains
    }

    /// The image a render-target view slot was last written with.
    pub fn render_target_view(&self, slot: usize) -> Option<u64> {
        self.state.borrow().render_target_views.get(&slot).copied()
    }

    pub fn depth_stencil_view(&self, slot: usize) -> Option<u64> {
        self.state.borrow().depth_stencil_views.get(&slot).copied()
    }

    /// The commands of the most recently executed list.
    pub fn last_executed(&self) -> Vec<RecordedCommand> {
        self.state.borrow().last_executed.clone()
    }

    pub fn set_fail_fence_creation(&self, fail: bool) {
        self.state.borrow_mut().fail_fence_creation = fail;
    }

    /// Quality levels reported for 4x multisampling. Zero means unsupported.
    pub fn set_msaa_quality_levels(&self, levels: u32) {
        self.state.borrow_mut().msaa_quality_levels = levels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_work_waits_for_drain() {
        let gpu = HeadlessGpu::new(CompletionMode::Deferred);
        let mut state = gpu.state.borrow_mut();
        let image = state.new_image(ResourceState::Present);
        state.enqueue(QueueItem::Execute(vec![RecordedCommand::Transition {
            image,
            before: ResourceState::Present,
            after: ResourceState::RenderTarget,
        }]));
        state.enqueue(QueueItem::Signal(1));
        assert_eq!(state.completed, 0);
        assert_eq!(state.queue.len(), 2);

        state.drain(1);
        assert_eq!(state.completed, 1);
        assert_eq!(state.resource_states[&image], ResourceState::RenderTarget);
        assert_eq!(state.stats.state_mismatches, 0);
    }

    #[test]
    fn mismatched_barrier_is_counted() {
        let gpu = HeadlessGpu::new(CompletionMode::Immediate);
        let mut state = gpu.state.borrow_mut();
        let image = state.new_image(ResourceState::Common);
        state.enqueue(QueueItem::Execute(vec![RecordedCommand::Transition {
            image,
            before: ResourceState::RenderTarget,
            after: ResourceState::Present,
        }]));
        assert_eq!(state.stats.state_mismatches, 1);
        assert!(!state.has_pending_lists());
    }

    fn draw_into(state: &mut GpuState, image_state: ResourceState) {
        let image = state.new_image(image_state);
        state.render_target_views.insert(0x1000, image);
        state.enqueue(QueueItem::Execute(vec![
            RecordedCommand::SetRenderTargets {
                color: ViewHandle(0x1000),
                depth: ViewHandle(0x2000),
            },
            RecordedCommand::DrawIndexed {
                index_count: 36,
                start_index: 0,
                base_vertex: 0,
            },
        ]));
    }

    #[test]
    fn draw_into_a_render_target_is_counted() {
        let gpu = HeadlessGpu::new(CompletionMode::Immediate);
        let mut state = gpu.state.borrow_mut();
        draw_into(&mut state, ResourceState::RenderTarget);
        assert_eq!(state.stats.draws, 1);
        assert_eq!(state.stats.state_mismatches, 0);
        assert_eq!(state.last_executed.len(), 2);
    }

    #[test]
    fn draw_into_a_presentable_image_is_a_mismatch() {
        let gpu = HeadlessGpu::new(CompletionMode::Immediate);
        let mut state = gpu.state.borrow_mut();
        draw_into(&mut state, ResourceState::Present);
        assert_eq!(state.stats.draws, 1);
        assert_eq!(state.stats.state_mismatches, 1);
    }

    #[test]
    fn presenting_a_render_target_is_a_mismatch() {
        let gpu = HeadlessGpu::new(CompletionMode::Immediate);
        let mut state = gpu.state.borrow_mut();
        let image = state.new_image(ResourceState::RenderTarget);
        state.enqueue(QueueItem::Present { image });
        assert_eq!(state.stats.state_mismatches, 1);
    }
}
