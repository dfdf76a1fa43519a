use eyre::eyre;
use tracing::info;
use tracing::warn;
use windows::core::*;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;

use super::adapter::get_hardware_adapter;
use super::adapter::log_adapters;
use super::commands::D3d12Commands;
use super::dxgi_format;
use super::fence::D3d12Fence;
use super::mesh::create_mesh;
use super::mesh::D3d12Mesh;
use super::pipeline::create_pipeline;
use super::pipeline::D3d12Pipeline;
use super::sample_desc;
use super::swap_chain::D3d12SwapChain;
use super::typeless_format;
use crate::config::GraphicsConfig;
use crate::device::DepthStencilDesc;
use crate::device::Device;
use crate::device::Format;
use crate::device::MeshDesc;
use crate::device::PipelineDesc;
use crate::device::SampleDesc;
use crate::device::SwapChainDesc;
use crate::device::ViewHandle;
use crate::device::ViewTable;
use crate::device::SWAP_CHAIN_BUFFER_COUNT;
use crate::error::AppResult;
use crate::error::CheckOperation;

/// The device, its direct queue and the two descriptor heaps the
/// presentation images are viewed through.
pub struct D3d12Device {
    factory: IDXGIFactory4,
    device: ID3D12Device,
    queue: ID3D12CommandQueue,
    rtv_heap: ID3D12DescriptorHeap,
    rtv_descriptor_size: usize,
    dsv_heap: ID3D12DescriptorHeap,
    dsv_descriptor_size: usize,
}

impl D3d12Device {
    pub fn new(config: &GraphicsConfig) -> AppResult<Self> {
        let mut factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
        if config.debug_layer {
            unsafe {
                let mut debug: Option<ID3D12Debug> = None;
                if let Some(debug) = D3D12GetDebugInterface(&mut debug).ok().and(debug) {
                    debug.EnableDebugLayer();
                    factory_flags |= DXGI_CREATE_FACTORY_DEBUG;
                    info!("D3D12 debug layer enabled");
                } else {
                    warn!("D3D12 debug layer unavailable");
                }
            }
        }

        let factory: IDXGIFactory4 =
            unsafe { CreateDXGIFactory2(factory_flags) }.op("CreateDXGIFactory2")?;
        log_adapters(&factory, config.back_buffer_format)?;

        let device = if config.use_warp_device {
            info!("Using WARP adapter");
            create_warp_device(&factory)?
        } else {
            match create_hardware_device(&factory) {
                Ok(device) => device,
                Err(e) => {
                    warn!("No hardware device ({}), falling back to WARP", e);
                    create_warp_device(&factory)?
                }
            }
        };

        let queue: ID3D12CommandQueue = unsafe {
            device.CreateCommandQueue(&D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                ..Default::default()
            })
        }
        .op("CreateCommandQueue")?;

        let rtv_heap = create_heap(
            &device,
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            SWAP_CHAIN_BUFFER_COUNT as u32,
        )?;
        let dsv_heap = create_heap(&device, D3D12_DESCRIPTOR_HEAP_TYPE_DSV, 1)?;
        let rtv_descriptor_size =
            unsafe { device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV) }
                as usize;
        let dsv_descriptor_size =
            unsafe { device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_DSV) }
                as usize;

        Ok(Self {
            factory,
            device,
            queue,
            rtv_heap,
            rtv_descriptor_size,
            dsv_heap,
            dsv_descriptor_size,
        })
    }

    pub fn device(&self) -> &ID3D12Device {
        &self.device
    }

    pub fn queue(&self) -> &ID3D12CommandQueue {
        &self.queue
    }
}

fn create_hardware_device(factory: &IDXGIFactory4) -> AppResult<ID3D12Device> {
    let adapter = get_hardware_adapter(factory)?
        .ok_or_else(|| eyre!("no hardware adapter supports feature level 11.0"))?;
    let mut device: Option<ID3D12Device> = None;
    unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device) }
        .op("D3D12CreateDevice")?;
    Ok(device.ok_or_else(|| eyre!("D3D12CreateDevice returned no device"))?)
}

fn create_warp_device(factory: &IDXGIFactory4) -> AppResult<ID3D12Device> {
    let adapter: IDXGIAdapter = unsafe { factory.EnumWarpAdapter() }.op("EnumWarpAdapter")?;
    let mut device: Option<ID3D12Device> = None;
    unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device) }
        .op("D3D12CreateDevice")?;
    Ok(device.ok_or_else(|| eyre!("D3D12CreateDevice returned no WARP device"))?)
}

fn create_heap(
    device: &ID3D12Device,
    kind: D3D12_DESCRIPTOR_HEAP_TYPE,
    count: u32,
) -> AppResult<ID3D12DescriptorHeap> {
    unsafe {
        device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
            NumDescriptors: count,
            Type: kind,
            Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
            NodeMask: 0,
        })
    }
    .op("CreateDescriptorHeap")
}

impl Device for D3d12Device {
    type Image = ID3D12Resource;
    type Surface = HWND;
    type Fence = D3d12Fence;
    type Pipeline = D3d12Pipeline;
    type Mesh = D3d12Mesh;
    type Commands = D3d12Commands;
    type SwapChain = D3d12SwapChain;

    fn create_fence(&self) -> AppResult<D3d12Fence> {
        D3d12Fence::new(&self.device, &self.queue)
    }

    fn create_commands(&self) -> AppResult<D3d12Commands> {
        D3d12Commands::new(&self.device, &self.queue)
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> AppResult<D3d12Pipeline> {
        create_pipeline(&self.device, desc)
    }

    fn create_mesh(&self, desc: &MeshDesc<'_>) -> AppResult<D3d12Mesh> {
        create_mesh(&self.device, desc)
    }

    fn create_swap_chain(&self, hwnd: &HWND, desc: &SwapChainDesc) -> AppResult<D3d12SwapChain> {
        if desc.samples.count > 1 {
            warn!(
                samples = desc.samples.count,
                "Flip-model swap chains are single-sample; presenting without MSAA"
            );
        }
        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            BufferCount: desc.buffer_count,
            Width: desc.extent.width,
            Height: desc.extent.height,
            Format: dxgi_format(desc.format),
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            SampleDesc: sample_desc(SampleDesc::SINGLE),
            ..Default::default()
        };
        let swap_chain: IDXGISwapChain1 = unsafe {
            self.factory
                .CreateSwapChainForHwnd(&self.queue, *hwnd, &swap_chain_desc, None, None)
        }
        .op("CreateSwapChainForHwnd")?;
        unsafe { self.factory.MakeWindowAssociation(*hwnd, DXGI_MWA_NO_ALT_ENTER) }
            .op("MakeWindowAssociation")?;
        Ok(D3d12SwapChain::new(swap_chain.cast()?))
    }

    fn render_target_table(&self) -> ViewTable {
        ViewTable {
            start: unsafe { self.rtv_heap.GetCPUDescriptorHandleForHeapStart() }.ptr,
            increment: self.rtv_descriptor_size,
            len: SWAP_CHAIN_BUFFER_COUNT,
        }
    }

    fn depth_stencil_table(&self) -> ViewTable {
        ViewTable {
            start: unsafe { self.dsv_heap.GetCPUDescriptorHandleForHeapStart() }.ptr,
            increment: self.dsv_descriptor_size,
            len: 1,
        }
    }

    fn create_render_target_view(&self, image: &ID3D12Resource, view: ViewHandle) {
        unsafe {
            self.device
                .CreateRenderTargetView(image, None, D3D12_CPU_DESCRIPTOR_HANDLE { ptr: view.0 })
        };
    }

    fn create_depth_stencil(&self, desc: &DepthStencilDesc) -> AppResult<ID3D12Resource> {
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Alignment: 0,
            Width: desc.extent.width as u64,
            Height: desc.extent.height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: typeless_format(desc.format),
            SampleDesc: sample_desc(desc.samples),
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
        };
        let clear_value = D3D12_CLEAR_VALUE {
            Format: dxgi_format(desc.format),
            Anonymous: D3D12_CLEAR_VALUE_0 {
                DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                    Depth: 1.0,
                    Stencil: 0,
                },
            },
        };
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_DEFAULT,
            ..Default::default()
        };

        let mut depth_stencil: Option<ID3D12Resource> = None;
        unsafe {
            self.device.CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &resource_desc,
                D3D12_RESOURCE_STATE_COMMON,
                Some(&clear_value),
                &mut depth_stencil,
            )
        }
        .op("CreateCommittedResource")?;
        Ok(depth_stencil.ok_or_else(|| eyre!("CreateCommittedResource returned no resource"))?)
    }

    fn create_depth_stencil_view(&self, image: &ID3D12Resource, format: Format, view: ViewHandle) {
        let samples = unsafe { image.GetDesc() }.SampleDesc.Count;
        let view_dimension = if samples > 1 {
            D3D12_DSV_DIMENSION_TEXTURE2DMS
        } else {
            D3D12_DSV_DIMENSION_TEXTURE2D
        };
        let view_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
            Format: dxgi_format(format),
            ViewDimension: view_dimension,
            Flags: D3D12_DSV_FLAG_NONE,
            Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_DSV { MipSlice: 0 },
            },
        };
        unsafe {
            self.device.CreateDepthStencilView(
                image,
                Some(&view_desc),
                D3D12_CPU_DESCRIPTOR_HANDLE { ptr: view.0 },
            )
        };
    }

    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> AppResult<u32> {
        let mut levels = D3D12_FEATURE_DATA_MULTISAMPLE_QUALITY_LEVELS {
            Format: dxgi_format(format),
            SampleCount: sample_count,
            Flags: D3D12_MULTISAMPLE_QUALITY_LEVELS_FLAG_NONE,
            NumQualityLevels: 0,
        };
        unsafe {
            self.device.CheckFeatureSupport(
                D3D12_FEATURE_MULTISAMPLE_QUALITY_LEVELS,
                &mut levels as *mut _ as *mut std::ffi::c_void,
                std::mem::size_of::<D3D12_FEATURE_DATA_MULTISAMPLE_QUALITY_LEVELS>() as u32,
            )
        }
        .op("CheckFeatureSupport")?;
        Ok(levels.NumQualityLevels)
    }
}
