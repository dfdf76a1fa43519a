use std::collections::VecDeque;
use std::ptr::NonNull;

use tracing::debug;
use tracing::warn;
use widestring::U16CString;
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::UpdateWindow;
use windows::Win32::System::LibraryLoader::*;
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::*;

use super::window_class::register_window_class;
use crate::device::Extent;
use crate::error::AppResult;
use crate::error::CheckOperation;
use crate::events::Key;
use crate::events::MouseButtons;
use crate::events::SizeKind;
use crate::events::Window;
use crate::events::WindowEvent;

const MK_LBUTTON: usize = 0x0001;
const MK_RBUTTON: usize = 0x0002;
const MK_MBUTTON: usize = 0x0010;

/// State the window procedure writes into. Boxed so its address survives
/// moves of [`Win32Window`].
struct WindowShared {
    events: VecDeque<WindowEvent>,
    min_track_size: Extent,
    /// Set once `WM_DESTROY` arrived, after which the handle is invalid.
    destroyed: bool,
}

pub struct Win32Window {
    hwnd: HWND,
    shared: Box<WindowShared>,
}

impl Win32Window {
    /// Creates and shows an overlapped window whose client area is `extent`.
    pub fn new(title: &str, extent: Extent, min_extent: Extent) -> AppResult<Self> {
        let mut instance = HMODULE::default();
        unsafe { GetModuleHandleExW(Default::default(), None, &mut instance) }
            .op("GetModuleHandleExW")?;
        let class = register_window_class(instance, w!("D3DApplicationWindow"), Some(wndproc))?;

        let mut window_rect = RECT {
            left: 0,
            top: 0,
            right: extent.width as i32,
            bottom: extent.height as i32,
        };
        unsafe { AdjustWindowRect(&mut window_rect, WS_OVERLAPPEDWINDOW, false) }
            .op("AdjustWindowRect")?;

        let mut shared = Box::new(WindowShared {
            events: VecDeque::new(),
            min_track_size: min_extent,
            destroyed: false,
        });
        let title = U16CString::from_str(title).map_err(|e| eyre::eyre!("bad title: {e}"))?;
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                &class,
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                window_rect.right - window_rect.left,
                window_rect.bottom - window_rect.top,
                None,
                None,
                Some(instance.into()),
                Some(&mut *shared as *mut WindowShared as _),
            )
        }
        .op("CreateWindowExW")?;

        unsafe { _ = ShowWindow(hwnd, SW_SHOW) };
        unsafe { _ = UpdateWindow(hwnd) };

        let mut window = Self { hwnd, shared };
        window.discard_startup_messages();
        Ok(window)
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Creation and the first show produce size and activation messages
    /// the graphics context is already initialized for.
    fn discard_startup_messages(&mut self) {
        let mut message = MSG::default();
        while unsafe { PeekMessageW(&mut message, None, 0, 0, PM_REMOVE) }.into() {
            unsafe {
                _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            }
        }
        debug!(
            discarded = self.shared.events.len(),
            "Discarded startup window events"
        );
        self.shared.events.clear();
    }
}

impl Window for Win32Window {
    fn poll_event(&mut self) -> Option<WindowEvent> {
        loop {
            if let Some(event) = self.shared.events.pop_front() {
                return Some(event);
            }
            let mut message = MSG::default();
            if !bool::from(unsafe { PeekMessageW(&mut message, None, 0, 0, PM_REMOVE) }) {
                return None;
            }
            if message.message == WM_QUIT {
                return Some(WindowEvent::Quit {
                    exit_code: message.wParam.0 as i32,
                });
            }
            unsafe {
                _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            }
        }
    }

    fn client_extent(&self) -> Extent {
        let mut rect = RECT::default();
        match unsafe { GetClientRect(self.hwnd, &mut rect) } {
            Ok(()) => Extent::new(
                (rect.right - rect.left).max(0) as u32,
                (rect.bottom - rect.top).max(0) as u32,
            ),
            Err(e) => {
                warn!("GetClientRect failed: {}", e);
                Extent::default()
            }
        }
    }

    fn set_title(&mut self, title: &str) {
        let Ok(title) = U16CString::from_str(title) else {
            warn!(%title, "Window title contains a nul character");
            return;
        };
        if let Err(e) = unsafe { SetWindowTextW(self.hwnd, PCWSTR(title.as_ptr())) } {
            warn!("SetWindowTextW failed: {}", e);
        }
    }

    fn request_close(&mut self) {
        unsafe { PostQuitMessage(0) };
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        // Closing the window through its frame already destroyed it.
        if self.shared.destroyed {
            return;
        }
        unsafe {
            // The procedure must not reach `shared` while it is being freed.
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            if let Err(e) = DestroyWindow(self.hwnd) {
                warn!("DestroyWindow failed: {}", e);
            }
        }
    }
}

fn low_word(value: isize) -> u32 {
    (value as usize & 0xFFFF) as u32
}

fn high_word(value: isize) -> u32 {
    ((value as usize >> 16) & 0xFFFF) as u32
}

/// Signed client coordinates packed into an `LPARAM`.
fn point(lparam: LPARAM) -> (i32, i32) {
    (
        low_word(lparam.0) as u16 as i16 as i32,
        high_word(lparam.0) as u16 as i16 as i32,
    )
}

fn buttons(wparam: WPARAM) -> MouseButtons {
    MouseButtons {
        left: wparam.0 & MK_LBUTTON != 0,
        right: wparam.0 & MK_RBUTTON != 0,
        middle: wparam.0 & MK_MBUTTON != 0,
    }
}

fn key(wparam: WPARAM) -> Key {
    let code = wparam.0 as u16;
    if code == VK_ESCAPE.0 {
        Key::Escape
    } else if code == VK_F2.0 {
        Key::F2
    } else {
        Key::Other(code as u32)
    }
}

/// Handles the messages the frame loop cares about. `None` defers to
/// `DefWindowProcW`.
fn handle_message(
    window: HWND,
    shared: &mut WindowShared,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> Option<LRESULT> {
    let event = match message {
        WM_ACTIVATE => {
            if low_word(wparam.0 as isize) == WA_INACTIVE {
                WindowEvent::Deactivated
            } else {
                WindowEvent::Activated
            }
        }
        WM_SIZE => {
            let kind = match wparam.0 as u32 {
                SIZE_MINIMIZED => SizeKind::Minimized,
                SIZE_MAXIMIZED => SizeKind::Maximized,
                SIZE_RESTORED => SizeKind::Restored,
                _ => return Some(LRESULT(0)),
            };
            WindowEvent::Resized {
                extent: Extent::new(low_word(lparam.0), high_word(lparam.0)),
                kind,
            }
        }
        WM_ENTERSIZEMOVE => WindowEvent::EnterSizeMove,
        WM_EXITSIZEMOVE => WindowEvent::ExitSizeMove,
        WM_DESTROY => {
            shared.destroyed = true;
            unsafe { PostQuitMessage(0) };
            return Some(LRESULT(0));
        }
        // Alt+key combinations that match no mnemonic would beep otherwise.
        WM_MENUCHAR => return Some(LRESULT((MNC_CLOSE as isize) << 16)),
        WM_GETMINMAXINFO => {
            let info = unsafe { &mut *(lparam.0 as *mut MINMAXINFO) };
            info.ptMinTrackSize.x = shared.min_track_size.width as i32;
            info.ptMinTrackSize.y = shared.min_track_size.height as i32;
            return Some(LRESULT(0));
        }
        WM_LBUTTONDOWN | WM_MBUTTONDOWN | WM_RBUTTONDOWN => {
            unsafe { SetCapture(window) };
            let (x, y) = point(lparam);
            WindowEvent::MouseDown {
                buttons: buttons(wparam),
                x,
                y,
            }
        }
        WM_LBUTTONUP | WM_MBUTTONUP | WM_RBUTTONUP => {
            unsafe { ReleaseCapture() }.ok();
            let (x, y) = point(lparam);
            WindowEvent::MouseUp {
                buttons: buttons(wparam),
                x,
                y,
            }
        }
        WM_MOUSEMOVE => {
            let (x, y) = point(lparam);
            WindowEvent::MouseMove {
                buttons: buttons(wparam),
                x,
                y,
            }
        }
        WM_KEYUP => WindowEvent::KeyUp(key(wparam)),
        _ => return None,
    };
    shared.events.push_back(event);
    Some(LRESULT(0))
}

extern "system" fn wndproc(window: HWND, message: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if message == WM_CREATE {
        unsafe {
            let create_struct: &CREATESTRUCTW = &*(lparam.0 as *const CREATESTRUCTW);
            SetWindowLongPtrW(window, GWLP_USERDATA, create_struct.lpCreateParams as _);
        }
        return LRESULT(0);
    }

    let user_data = unsafe { GetWindowLongPtrW(window, GWLP_USERDATA) };
    // Messages arrive before WM_CREATE and after the window is dropped.
    let Some(mut shared) = NonNull::new(user_data as *mut WindowShared) else {
        return unsafe { DefWindowProcW(window, message, wparam, lparam) };
    };
    let shared = unsafe { shared.as_mut() };

    handle_message(window, shared, message, wparam, lparam)
        .unwrap_or_else(|| unsafe { DefWindowProcW(window, message, wparam, lparam) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> WindowShared {
        WindowShared {
            events: VecDeque::new(),
            min_track_size: Extent::new(200, 200),
            destroyed: false,
        }
    }

    fn drain_quit() {
        let mut message = MSG::default();
        while unsafe { PeekMessageW(&mut message, None, WM_QUIT, WM_QUIT, PM_REMOVE) }.into() {}
    }

    #[test]
    fn destroy_is_recorded_and_posts_quit() {
        let mut shared = shared();
        let result = handle_message(HWND::default(), &mut shared, WM_DESTROY, WPARAM(0), LPARAM(0));
        assert_eq!(result, Some(LRESULT(0)));
        assert!(shared.destroyed);
        assert!(shared.events.is_empty());

        let mut message = MSG::default();
        let posted: bool =
            unsafe { PeekMessageW(&mut message, None, WM_QUIT, WM_QUIT, PM_REMOVE) }.into();
        assert!(posted);
        assert_eq!(message.wParam.0, 0);
        drain_quit();
    }

    #[test]
    fn size_messages_become_resize_events() {
        let mut shared = shared();
        let lparam = LPARAM((600 << 16) | 800);
        handle_message(
            HWND::default(),
            &mut shared,
            WM_SIZE,
            WPARAM(SIZE_MAXIMIZED as usize),
            lparam,
        );
        assert_eq!(
            shared.events.pop_front(),
            Some(WindowEvent::Resized {
                extent: Extent::new(800, 600),
                kind: SizeKind::Maximized,
            })
        );
        assert!(!shared.destroyed);
    }

    #[test]
    fn min_max_info_uses_the_minimum_track_size() {
        let mut shared = shared();
        let mut info = MINMAXINFO::default();
        handle_message(
            HWND::default(),
            &mut shared,
            WM_GETMINMAXINFO,
            WPARAM(0),
            LPARAM(&mut info as *mut MINMAXINFO as isize),
        );
        assert_eq!((info.ptMinTrackSize.x, info.ptMinTrackSize.y), (200, 200));
    }

    #[test]
    fn escape_and_f2_are_named_keys() {
        assert_eq!(key(WPARAM(VK_ESCAPE.0 as usize)), Key::Escape);
        assert_eq!(key(WPARAM(VK_F2.0 as usize)), Key::F2);
        assert_eq!(key(WPARAM(0x41)), Key::Other(0x41));
    }
}
