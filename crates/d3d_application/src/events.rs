use crate::device::Extent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKind {
    Restored,
    Minimized,
    Maximized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    F2,
    /// Any other virtual-key code.
    Other(u32),
}

/// Window notifications the frame loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Activated,
    Deactivated,
    Resized { extent: Extent, kind: SizeKind },
    /// The user grabbed the resize bars.
    EnterSizeMove,
    /// The user released the resize bars.
    ExitSizeMove,
    MouseDown { buttons: MouseButtons, x: i32, y: i32 },
    MouseUp { buttons: MouseButtons, x: i32, y: i32 },
    MouseMove { buttons: MouseButtons, x: i32, y: i32 },
    KeyUp(Key),
    Quit { exit_code: i32 },
}

/// The windowing collaborator.
pub trait Window {
    /// Drains pending OS messages without blocking. Returns `None` only when
    /// nothing is pending.
    fn poll_event(&mut self) -> Option<WindowEvent>;
    fn client_extent(&self) -> Extent;
    fn set_title(&mut self, title: &str);
    /// Asks the OS to end the loop with exit code 0.
    fn request_close(&mut self);
}
