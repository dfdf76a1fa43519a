use windows::Win32::Graphics::Direct3D12::ID3D12Resource;
use windows::Win32::Graphics::Dxgi::*;

use super::dxgi_format;
use crate::device::Extent;
use crate::device::Format;
use crate::device::SampleDesc;
use crate::device::SwapChain;
use crate::error::AppResult;
use crate::error::CheckOperation;

/// A flip-discard swap chain. Flip-model buffers are always single-sample.
pub struct D3d12SwapChain {
    swap_chain: IDXGISwapChain3,
}

impl D3d12SwapChain {
    pub(crate) fn new(swap_chain: IDXGISwapChain3) -> Self {
        Self { swap_chain }
    }

    pub fn current_back_buffer_index(&self) -> u32 {
        unsafe { self.swap_chain.GetCurrentBackBufferIndex() }
    }
}

impl SwapChain for D3d12SwapChain {
    type Image = ID3D12Resource;

    fn resize_buffers(&mut self, buffer_count: u32, extent: Extent, format: Format) -> AppResult<()> {
        unsafe {
            self.swap_chain.ResizeBuffers(
                buffer_count,
                extent.width,
                extent.height,
                dxgi_format(format),
                DXGI_SWAP_CHAIN_FLAG(0),
            )
        }
        .op("ResizeBuffers")
    }

    fn buffer(&self, index: u32) -> AppResult<ID3D12Resource> {
        unsafe { self.swap_chain.GetBuffer(index) }.op("GetBuffer")
    }

    fn present(&mut self, sync_interval: u32) -> AppResult<()> {
        unsafe { self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .op("Present")
    }

    fn sample_desc(&self) -> SampleDesc {
        SampleDesc::SINGLE
    }
}
