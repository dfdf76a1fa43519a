use tracing::debug;
use tracing::info;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::D3D12CreateDevice;
use windows::Win32::Graphics::Direct3D12::ID3D12Device;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use super::dxgi_format;
use crate::device::Format;
use crate::error::AppResult;
use crate::error::CheckOperation;

fn adapter_name(adapter: &IDXGIAdapter1) -> AppResult<(String, bool)> {
    let desc = unsafe { adapter.GetDesc1() }.op("GetDesc1")?;
    let len = desc
        .Description
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(desc.Description.len());
    let name = String::from_utf16_lossy(&desc.Description[..len]);
    let software = (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE)
        != DXGI_ADAPTER_FLAG_NONE;
    Ok((name, software))
}

/// The display modes `output` supports for `format`.
pub fn display_modes(output: &IDXGIOutput, format: Format) -> AppResult<Vec<DXGI_MODE_DESC>> {
    let format = dxgi_format(format);
    let flags = DXGI_ENUM_MODES(0);
    let mut count = 0;
    unsafe { output.GetDisplayModeList(format, flags, &mut count, None) }
        .op("GetDisplayModeList")?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut modes = vec![DXGI_MODE_DESC::default(); count as usize];
    unsafe { output.GetDisplayModeList(format, flags, &mut count, Some(modes.as_mut_ptr())) }
        .op("GetDisplayModeList")?;
    modes.truncate(count as usize);
    Ok(modes)
}

/// Logs every adapter with its outputs, and at debug level each output's
/// display modes for `format`.
pub fn log_adapters(factory: &IDXGIFactory4, format: Format) -> AppResult<()> {
    for i in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(i) } {
            Ok(adapter) => adapter,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(e.into()),
        };
        let (name, software) = adapter_name(&adapter)?;
        info!(index = i, software, "Adapter: {}", name);

        for j in 0.. {
            let output = match unsafe { adapter.EnumOutputs(j) } {
                Ok(output) => output,
                Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(e) => return Err(e.into()),
            };
            let desc = unsafe { output.GetDesc() }.op("IDXGIOutput::GetDesc")?;
            let len = desc
                .DeviceName
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(desc.DeviceName.len());
            info!(
                adapter = i,
                output = j,
                "Output: {}",
                String::from_utf16_lossy(&desc.DeviceName[..len])
            );
            for mode in display_modes(&output, format)? {
                debug!(
                    adapter = i,
                    output = j,
                    width = mode.Width,
                    height = mode.Height,
                    "Display mode refresh {}/{}",
                    mode.RefreshRate.Numerator,
                    mode.RefreshRate.Denominator
                );
            }
        }
    }
    Ok(())
}

/// The first hardware adapter that can create a feature level 11.0 device.
pub fn get_hardware_adapter(factory: &IDXGIFactory4) -> AppResult<Option<IDXGIAdapter1>> {
    for i in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(i) } {
            Ok(adapter) => adapter,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(e.into()),
        };
        let (name, software) = adapter_name(&adapter)?;
        if software {
            continue;
        }
        let supported = unsafe {
            D3D12CreateDevice(
                &adapter,
                D3D_FEATURE_LEVEL_11_0,
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
        }
        .is_ok();
        if supported {
            info!("Selected adapter: {}", name);
            return Ok(Some(adapter));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_output_lists_modes_for_the_back_buffer_format() {
        let factory: IDXGIFactory4 =
            unsafe { CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0)) }.unwrap();
        log_adapters(&factory, Format::R8g8b8a8Unorm).unwrap();

        let Ok(adapter) = (unsafe { factory.EnumAdapters1(0) }) else {
            return;
        };
        if let Ok(output) = unsafe { adapter.EnumOutputs(0) } {
            let modes = display_modes(&output, Format::R8g8b8a8Unorm).unwrap();
            assert!(modes
                .iter()
                .all(|mode| mode.Format == DXGI_FORMAT_R8G8B8A8_UNORM));
        }
    }
}
