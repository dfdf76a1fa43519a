use crate::command_channel::CommandRecorder;
use crate::device::Extent;
use crate::device::ViewHandle;
use crate::error::AppResult;
use crate::events::Key;
use crate::events::MouseButtons;
use crate::frame_clock::FrameClock;

/// LightSteelBlue.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.690, 0.769, 0.871, 1.0];

/// What `draw` gets to record into: the open command list with the current
/// back buffer already bound, cleared and in the render-target state.
pub struct FrameContext<'a, C: CommandRecorder> {
    pub commands: &'a mut C,
    pub back_buffer: &'a C::Image,
    pub render_target: ViewHandle,
    pub depth_stencil: ViewHandle,
    pub extent: Extent,
}

/// The hooks a demo supplies to the frame loop.
pub trait Application<C: CommandRecorder> {
    fn update(&mut self, clock: &FrameClock);

    fn draw(&mut self, _clock: &FrameClock, _frame: &mut FrameContext<'_, C>) -> AppResult<()> {
        Ok(())
    }

    fn clear_color(&self) -> [f32; 4] {
        DEFAULT_CLEAR_COLOR
    }

    /// Called after the back buffers were recreated at `extent`.
    fn on_resize(&mut self, _extent: Extent) {}

    fn on_mouse_down(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {}
    fn on_mouse_up(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {}
    fn on_mouse_move(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {}
    fn on_key_up(&mut self, _key: Key) {}
}
