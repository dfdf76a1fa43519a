//! Frame synchronization and swap-chain lifecycle for a Direct3D 12 style
//! windowed application.
//!
//! The GPU is reached through the traits in [`device`], [`fence_counter`] and
//! [`command_channel`]. [`d3d12`] implements them on Windows, [`headless`]
//! everywhere.

pub mod application;
pub mod back_buffer_ring;
pub mod command_channel;
pub mod config;
#[cfg(windows)]
pub mod d3d12;
pub mod device;
pub mod error;
pub mod events;
pub mod fence_counter;
pub mod frame_clock;
pub mod frame_loop;
pub mod frame_stats;
pub mod graphics_context;
pub mod headless;
pub mod presentation;
#[cfg(windows)]
pub mod win32;
pub mod window_state;

pub use application::Application;
pub use application::FrameContext;
pub use config::AppConfig;
pub use config::CommandLine;
pub use error::AppReport;
pub use error::AppResult;
pub use frame_clock::FrameClock;
pub use frame_loop::FrameLoop;
pub use graphics_context::GraphicsContext;
