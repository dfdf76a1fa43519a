use windows::core::Param;
use windows::core::ParamValue;
use windows::core::PCWSTR;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::error::AppResult;
use crate::error::OperationFailed;

/// Equivalent to the MAKEINTATOM macro.
#[allow(non_snake_case)]
fn MAKEINTATOM(atom: u16) -> PCWSTR {
    PCWSTR(atom as usize as *const u16)
}

/// A registered window class, usable wherever a class name is expected.
pub struct ClassIdAtom(u16);

impl Param<PCWSTR> for &ClassIdAtom {
    unsafe fn param(self) -> ParamValue<PCWSTR> {
        ParamValue::Owned(MAKEINTATOM(self.0))
    }
}

pub fn register_window_class(
    instance: HMODULE,
    name: PCWSTR,
    wndproc: WNDPROC,
) -> AppResult<ClassIdAtom> {
    let class = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: wndproc,
        hInstance: instance.into(),
        hCursor: unsafe { LoadCursorW(None, IDC_ARROW)? },
        lpszClassName: name,
        ..Default::default()
    };
    let atom = unsafe { RegisterClassExW(&class) };
    if atom == 0 {
        let error = windows::core::Error::from_win32();
        return Err(
            OperationFailed::new("RegisterClassExW", error.code().0, error.message()).into(),
        );
    }
    Ok(ClassIdAtom(atom))
}
