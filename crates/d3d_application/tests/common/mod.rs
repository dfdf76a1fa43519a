#![allow(dead_code)]

use d3d_application::application::Application;
use d3d_application::application::FrameContext;
use d3d_application::config::GraphicsConfig;
use d3d_application::device::Extent;
use d3d_application::events::Key;
use d3d_application::events::MouseButtons;
use d3d_application::headless::CompletionMode;
use d3d_application::headless::HeadlessCommands;
use d3d_application::headless::HeadlessDevice;
use d3d_application::headless::HeadlessGpu;
use d3d_application::AppResult;
use d3d_application::FrameClock;
use d3d_application::GraphicsContext;

pub const START: Extent = Extent {
    width: 800,
    height: 600,
};
pub const MIN: Extent = Extent {
    width: 200,
    height: 200,
};

pub fn context(gpu: &HeadlessGpu) -> AppResult<GraphicsContext<HeadlessDevice>> {
    context_with(gpu, &GraphicsConfig::default())
}

pub fn context_with(
    gpu: &HeadlessGpu,
    config: &GraphicsConfig,
) -> AppResult<GraphicsContext<HeadlessDevice>> {
    GraphicsContext::new(HeadlessDevice::new(gpu.clone()), (), config, START, MIN)
}

pub fn deferred_gpu() -> HeadlessGpu {
    HeadlessGpu::new(CompletionMode::Deferred)
}

#[derive(Debug, Default)]
pub struct RecordingApp {
    pub updates: u32,
    pub draws: u32,
    pub resizes: Vec<Extent>,
    pub mouse_downs: u32,
    pub mouse_ups: u32,
    pub mouse_moves: u32,
    pub keys: Vec<Key>,
}

impl Application<HeadlessCommands> for RecordingApp {
    fn update(&mut self, _clock: &FrameClock) {
        self.updates += 1;
    }

    fn draw(
        &mut self,
        _clock: &FrameClock,
        frame: &mut FrameContext<'_, HeadlessCommands>,
    ) -> AppResult<()> {
        assert!(frame.commands.is_open(), "draw records into an open list");
        self.draws += 1;
        Ok(())
    }

    fn on_resize(&mut self, extent: Extent) {
        self.resizes.push(extent);
    }

    fn on_mouse_down(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {
        self.mouse_downs += 1;
    }

    fn on_mouse_up(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {
        self.mouse_ups += 1;
    }

    fn on_mouse_move(&mut self, _buttons: MouseButtons, _x: i32, _y: i32) {
        self.mouse_moves += 1;
    }

    fn on_key_up(&mut self, key: Key) {
        self.keys.push(key);
    }
}
