//! A backend with no GPU and no window.
//!
//! Queue work is kept on a simulated timeline so the synchronization rules
//! are observable: allocator resets and buffer resizes fail while work is in
//! flight, outstanding buffer references block a resize, and every barrier is
//! checked against the tracked resource state.

mod device;
mod gpu;
mod window;

pub use device::HeadlessCommands;
pub use device::HeadlessDevice;
pub use device::HeadlessFence;
pub use device::HeadlessImage;
pub use device::HeadlessMesh;
pub use device::HeadlessPipeline;
pub use device::HeadlessSwapChain;
pub use device::ImageInfo;
pub use device::ImageKind;
pub use device::DEPTH_STENCIL_TABLE;
pub use device::DXGI_ERROR_INVALID_CALL;
pub use device::E_FAIL;
pub use device::E_INVALIDARG;
pub use device::RENDER_TARGET_TABLE;
pub use gpu::CompletionMode;
pub use gpu::GpuStats;
pub use gpu::HeadlessGpu;
pub use gpu::RecordedCommand;
pub use window::HeadlessWindow;
pub use window::ScriptStep;
