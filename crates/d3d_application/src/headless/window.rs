use std::collections::VecDeque;

use crate::device::Extent;
use crate::events::Window;
use crate::events::WindowEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Event(WindowEvent),
    /// Report an empty message queue this many times.
    Idle(u32),
}

/// Plays back a scripted sequence of window notifications. Once the script
/// runs out the window asks to quit with exit code 0.
#[derive(Debug)]
pub struct HeadlessWindow {
    script: VecDeque<ScriptStep>,
    extent: Extent,
    title: String,
    title_updates: u32,
    close_requested: bool,
}

impl HeadlessWindow {
    pub fn new(extent: Extent, script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            extent,
            title: String::new(),
            title_updates: 0,
            close_requested: false,
        }
    }

    /// A window that idles for `frames` iterations and then quits.
    pub fn idle_for(extent: Extent, frames: u32) -> Self {
        Self::new(extent, [ScriptStep::Idle(frames)])
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_updates(&self) -> u32 {
        self.title_updates
    }

    pub fn remaining_steps(&self) -> usize {
        self.script.len()
    }
}

impl Window for HeadlessWindow {
    fn poll_event(&mut self) -> Option<WindowEvent> {
        if self.close_requested {
            self.close_requested = false;
            self.script.clear();
            return Some(WindowEvent::Quit { exit_code: 0 });
        }
        loop {
            match self.script.front_mut() {
                None => return Some(WindowEvent::Quit { exit_code: 0 }),
                Some(ScriptStep::Idle(0)) => {
                    self.script.pop_front();
                }
                Some(ScriptStep::Idle(remaining)) => {
                    *remaining -= 1;
                    return None;
                }
                Some(ScriptStep::Event(event)) => {
                    let event = *event;
                    self.script.pop_front();
                    if let WindowEvent::Resized { extent, .. } = event {
                        self.extent = extent;
                    }
                    return Some(event);
                }
            }
        }
    }

    fn client_extent(&self) -> Extent {
        self.extent
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.title_updates += 1;
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Key;

    #[test]
    fn script_plays_back_then_quits() {
        let mut window = HeadlessWindow::new(
            Extent::new(800, 600),
            [
                ScriptStep::Idle(2),
                ScriptStep::Event(WindowEvent::KeyUp(Key::F2)),
                ScriptStep::Idle(0),
            ],
        );
        assert_eq!(window.poll_event(), None);
        assert_eq!(window.poll_event(), None);
        assert_eq!(window.poll_event(), Some(WindowEvent::KeyUp(Key::F2)));
        assert_eq!(window.poll_event(), Some(WindowEvent::Quit { exit_code: 0 }));
    }

    #[test]
    fn close_request_preempts_the_script() {
        let mut window = HeadlessWindow::idle_for(Extent::new(800, 600), 10);
        window.request_close();
        assert_eq!(window.poll_event(), Some(WindowEvent::Quit { exit_code: 0 }));
        assert_eq!(window.remaining_steps(), 0);
    }
}
