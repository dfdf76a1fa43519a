//! A Win32 top-level window that turns its messages into [`WindowEvent`]s.
//!
//! [`WindowEvent`]: crate::events::WindowEvent

mod window;
mod window_class;

pub use window::Win32Window;
