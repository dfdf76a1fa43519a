//! Decides which window notifications trigger the resize state machine and
//! which pause the application.
//!
//! Dragging the resize bars produces a stream of size notifications. Those
//! are collected and acted on once, when the drag ends.

use crate::device::Extent;
use crate::events::SizeKind;
use crate::events::WindowEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockControl {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    /// Run the resize state machine with this client extent.
    pub resize: Option<Extent>,
    pub clock: Option<ClockControl>,
}

#[derive(Debug, Clone)]
pub struct WindowState {
    client_extent: Extent,
    paused: bool,
    minimized: bool,
    maximized: bool,
    resizing: bool,
}

impl WindowState {
    pub fn new(client_extent: Extent) -> Self {
        Self {
            client_extent,
            paused: false,
            minimized: false,
            maximized: false,
            resizing: false,
        }
    }

    pub fn client_extent(&self) -> Extent {
        self.client_extent
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn minimized(&self) -> bool {
        self.minimized
    }

    pub fn maximized(&self) -> bool {
        self.maximized
    }

    pub fn resizing(&self) -> bool {
        self.resizing
    }

    pub fn handle(&mut self, event: &WindowEvent) -> Response {
        match *event {
            WindowEvent::Activated => {
                self.paused = false;
                Response {
                    clock: Some(ClockControl::Start),
                    ..Default::default()
                }
            }
            WindowEvent::Deactivated => {
                self.paused = true;
                Response {
                    clock: Some(ClockControl::Stop),
                    ..Default::default()
                }
            }
            WindowEvent::Resized { extent, kind } => {
                self.client_extent = extent;
                self.on_resized(kind)
            }
            WindowEvent::EnterSizeMove => {
                self.paused = true;
                self.resizing = true;
                Response {
                    clock: Some(ClockControl::Stop),
                    ..Default::default()
                }
            }
            WindowEvent::ExitSizeMove => {
                self.paused = false;
                self.resizing = false;
                Response {
                    resize: Some(self.client_extent),
                    clock: Some(ClockControl::Start),
                }
            }
            _ => Response::default(),
        }
    }

    fn on_resized(&mut self, kind: SizeKind) -> Response {
        let resize = match kind {
            SizeKind::Minimized => {
                self.paused = true;
                self.minimized = true;
                self.maximized = false;
                false
            }
            SizeKind::Maximized => {
                self.paused = false;
                self.minimized = false;
                self.maximized = true;
                true
            }
            SizeKind::Restored if self.minimized => {
                self.paused = false;
                self.minimized = false;
                true
            }
            SizeKind::Restored if self.maximized => {
                self.paused = false;
                self.maximized = false;
                true
            }
            // Acted on at ExitSizeMove.
            SizeKind::Restored if self.resizing => false,
            // SetWindowPos, SetFullscreenState and similar.
            SizeKind::Restored => true,
        };
        Response {
            resize: resize.then_some(self.client_extent),
            clock: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resized(width: u32, height: u32, kind: SizeKind) -> WindowEvent {
        WindowEvent::Resized {
            extent: Extent::new(width, height),
            kind,
        }
    }

    fn resize_count(state: &mut WindowState, events: &[WindowEvent]) -> usize {
        events
            .iter()
            .filter(|event| state.handle(event).resize.is_some())
            .count()
    }

    #[test]
    fn drag_resizes_once_at_the_end() {
        let mut state = WindowState::new(Extent::new(800, 600));
        let mut events = vec![WindowEvent::EnterSizeMove];
        events.extend((0..25).map(|i| resized(800 + i * 10, 600 + i * 5, SizeKind::Restored)));
        events.push(WindowEvent::ExitSizeMove);

        assert_eq!(resize_count(&mut state, &events[..events.len() - 1]), 0);
        assert!(state.paused());
        let response = state.handle(&WindowEvent::ExitSizeMove);
        assert_eq!(response.resize, Some(Extent::new(1040, 720)));
        assert_eq!(response.clock, Some(ClockControl::Start));
        assert!(!state.paused());
    }

    #[test]
    fn enter_size_move_stops_the_clock() {
        let mut state = WindowState::new(Extent::new(800, 600));
        let response = state.handle(&WindowEvent::EnterSizeMove);
        assert_eq!(response.clock, Some(ClockControl::Stop));
        assert!(state.resizing());
    }

    #[test]
    fn minimize_then_restore_resizes_once() {
        let mut state = WindowState::new(Extent::new(800, 600));
        let events = [
            resized(0, 0, SizeKind::Minimized),
            resized(800, 600, SizeKind::Restored),
        ];
        assert_eq!(state.handle(&events[0]).resize, None);
        assert!(state.paused() && state.minimized());
        assert_eq!(state.handle(&events[1]).resize, Some(Extent::new(800, 600)));
        assert!(!state.paused() && !state.minimized());
    }

    #[test]
    fn maximize_then_restore_resizes_once_each() {
        let mut state = WindowState::new(Extent::new(800, 600));
        let events = [
            resized(1920, 1017, SizeKind::Maximized),
            resized(800, 600, SizeKind::Restored),
        ];
        assert_eq!(resize_count(&mut state, &events), 2);
        assert!(!state.maximized());
    }

    #[test]
    fn programmatic_restore_resizes_once() {
        let mut state = WindowState::new(Extent::new(800, 600));
        assert_eq!(resize_count(&mut state, &[resized(1024, 768, SizeKind::Restored)]), 1);
        assert_eq!(state.client_extent(), Extent::new(1024, 768));
    }

    #[test]
    fn repeated_minimize_never_resizes() {
        let mut state = WindowState::new(Extent::new(800, 600));
        let events = [
            resized(0, 0, SizeKind::Minimized),
            resized(0, 0, SizeKind::Minimized),
        ];
        assert_eq!(resize_count(&mut state, &events), 0);
    }

    #[test]
    fn activation_pauses_and_resumes() {
        let mut state = WindowState::new(Extent::new(800, 600));
        assert_eq!(
            state.handle(&WindowEvent::Deactivated).clock,
            Some(ClockControl::Stop)
        );
        assert!(state.paused());
        assert_eq!(
            state.handle(&WindowEvent::Activated).clock,
            Some(ClockControl::Start)
        );
        assert!(!state.paused());
    }
}
