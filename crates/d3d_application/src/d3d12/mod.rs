//! Direct3D 12 and DXGI implementation of the device traits.

mod adapter;
mod commands;
mod device;
mod fence;
mod mesh;
mod pipeline;
mod swap_chain;

pub use commands::D3d12Commands;
pub use device::D3d12Device;
pub use fence::D3d12Fence;
pub use mesh::D3d12Mesh;
pub use pipeline::D3d12Pipeline;
pub use swap_chain::D3d12SwapChain;

use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::device::Format;
use crate::device::ResourceState;
use crate::device::SampleDesc;

pub(crate) fn dxgi_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::R8g8b8a8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::B8g8r8a8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        Format::R16g16b16a16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        Format::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        Format::D32Float => DXGI_FORMAT_D32_FLOAT,
        Format::D32FloatS8x24Uint => DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    }
}

/// Depth resources are created typeless so other views can reinterpret them.
pub(crate) fn typeless_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::D24UnormS8Uint => DXGI_FORMAT_R24G8_TYPELESS,
        Format::D32Float => DXGI_FORMAT_R32_TYPELESS,
        Format::D32FloatS8x24Uint => DXGI_FORMAT_R32G8X24_TYPELESS,
        other => dxgi_format(other),
    }
}

pub(crate) fn resource_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    match state {
        ResourceState::Common => D3D12_RESOURCE_STATE_COMMON,
        ResourceState::RenderTarget => D3D12_RESOURCE_STATE_RENDER_TARGET,
        ResourceState::Present => D3D12_RESOURCE_STATE_PRESENT,
        ResourceState::DepthWrite => D3D12_RESOURCE_STATE_DEPTH_WRITE,
    }
}

pub(crate) fn sample_desc(samples: SampleDesc) -> DXGI_SAMPLE_DESC {
    DXGI_SAMPLE_DESC {
        Count: samples.count,
        Quality: samples.quality,
    }
}
