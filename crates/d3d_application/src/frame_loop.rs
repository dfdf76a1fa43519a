//! The message pump and the update/draw cadence around it.

use std::time::Duration;

use tracing::debug;
use tracing::info;

use crate::application::Application;
use crate::device::Device;
use crate::error::AppResult;
use crate::events::Key;
use crate::events::Window;
use crate::events::WindowEvent;
use crate::frame_clock::FrameClock;
use crate::frame_stats::FrameStats;
use crate::graphics_context::GraphicsContext;
use crate::window_state::ClockControl;
use crate::window_state::WindowState;

pub struct FrameLoop<D, W, A>
where
    D: Device,
    W: Window,
    A: Application<D::Commands>,
{
    // Declared before the window so the swap chain goes away first.
    context: GraphicsContext<D>,
    window: W,
    app: A,
    clock: FrameClock,
    window_state: WindowState,
    stats: FrameStats,
    title: String,
    paused_sleep: Duration,
    frames_rendered: u64,
}

impl<D, W, A> FrameLoop<D, W, A>
where
    D: Device,
    W: Window,
    A: Application<D::Commands>,
{
    pub fn new(
        window: W,
        context: GraphicsContext<D>,
        mut app: A,
        title: impl Into<String>,
        paused_sleep: Duration,
    ) -> Self {
        app.on_resize(context.extent());
        Self {
            window_state: WindowState::new(window.client_extent()),
            context,
            window,
            app,
            clock: FrameClock::default(),
            stats: FrameStats::default(),
            title: title.into(),
            paused_sleep,
            frames_rendered: 0,
        }
    }

    /// Runs until the window delivers a quit request and returns its exit
    /// code. Errors from the graphics context end the loop.
    pub fn run(&mut self) -> AppResult<i32> {
        self.clock.reset();
        loop {
            if let Some(event) = self.window.poll_event() {
                if let WindowEvent::Quit { exit_code } = event {
                    info!(exit_code, frames = self.frames_rendered, "Frame loop finished");
                    return Ok(exit_code);
                }
                self.dispatch(event)?;
                continue;
            }

            self.clock.tick();
            if self.window_state.paused() {
                std::thread::sleep(self.paused_sleep);
                continue;
            }
            self.frame()?;
        }
    }

    fn frame(&mut self) -> AppResult<()> {
        if let Some(rate) = self.stats.frame(self.clock.total_time()) {
            debug!(fps = rate.fps, mspf = rate.mspf, "Frame stats");
            self.window.set_title(&rate.caption(&self.title));
        }
        self.app.update(&self.clock);
        self.context.render_frame(&mut self.app, &self.clock)?;
        self.frames_rendered += 1;
        Ok(())
    }

    fn dispatch(&mut self, event: WindowEvent) -> AppResult<()> {
        match event {
            WindowEvent::MouseDown { buttons, x, y } => self.app.on_mouse_down(buttons, x, y),
            WindowEvent::MouseUp { buttons, x, y } => self.app.on_mouse_up(buttons, x, y),
            WindowEvent::MouseMove { buttons, x, y } => self.app.on_mouse_move(buttons, x, y),
            WindowEvent::KeyUp(Key::Escape) => self.window.request_close(),
            WindowEvent::KeyUp(Key::F2) => {
                let enabled = !self.context.multisampling();
                if self.context.set_multisampling(enabled)? {
                    self.app.on_resize(self.context.extent());
                }
            }
            WindowEvent::KeyUp(key) => self.app.on_key_up(key),
            other => {
                let response = self.window_state.handle(&other);
                match response.clock {
                    Some(ClockControl::Start) => self.clock.start(),
                    Some(ClockControl::Stop) => self.clock.stop(),
                    None => {}
                }
                if let Some(extent) = response.resize {
                    self.context.resize(extent)?;
                    self.app.on_resize(self.context.extent());
                }
            }
        }
        Ok(())
    }

    pub fn context(&self) -> &GraphicsContext<D> {
        &self.context
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn window_state(&self) -> &WindowState {
        &self.window_state
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}
