use std::mem::ManuallyDrop;

use windows::core::*;
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST;
use windows::Win32::Graphics::Direct3D12::*;

use super::mesh::D3d12Mesh;
use super::pipeline::D3d12Pipeline;
use super::resource_state;
use crate::command_channel::CommandRecorder;
use crate::device::ResourceState;
use crate::device::ScissorRect;
use crate::device::ViewHandle;
use crate::device::Viewport;
use crate::error::AppResult;
use crate::error::CheckOperation;

fn transition_barrier(
    resource: &ID3D12Resource,
    state_before: D3D12_RESOURCE_STATES,
    state_after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            // Borrowed pointer; the barrier must not release it.
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                StateBefore: state_before,
                StateAfter: state_after,
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            }),
        },
    }
}

fn cpu_handle(view: ViewHandle) -> D3D12_CPU_DESCRIPTOR_HANDLE {
    D3D12_CPU_DESCRIPTOR_HANDLE { ptr: view.0 }
}

/// One allocator and one graphics command list on the direct queue.
pub struct D3d12Commands {
    allocator: ID3D12CommandAllocator,
    list: ID3D12GraphicsCommandList,
    queue: ID3D12CommandQueue,
}

impl D3d12Commands {
    pub(crate) fn new(device: &ID3D12Device, queue: &ID3D12CommandQueue) -> AppResult<Self> {
        let allocator: ID3D12CommandAllocator =
            unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }
                .op("CreateCommandAllocator")?;
        let list: ID3D12GraphicsCommandList = unsafe {
            device.CreateCommandList(
                0,
                D3D12_COMMAND_LIST_TYPE_DIRECT,
                &allocator,
                None::<&ID3D12PipelineState>,
            )
        }
        .op("CreateCommandList")?;
        // Lists are created open; the channel expects a closed one.
        unsafe { list.Close() }.op("ID3D12GraphicsCommandList::Close")?;
        Ok(Self {
            allocator,
            list,
            queue: queue.clone(),
        })
    }
}

impl CommandRecorder for D3d12Commands {
    type Image = ID3D12Resource;
    type Pipeline = D3d12Pipeline;
    type Mesh = D3d12Mesh;

    fn reset(&mut self) -> AppResult<()> {
        unsafe { self.allocator.Reset() }.op("ID3D12CommandAllocator::Reset")?;
        unsafe { self.list.Reset(&self.allocator, None::<&ID3D12PipelineState>) }
            .op("ID3D12GraphicsCommandList::Reset")
    }

    fn close(&mut self) -> AppResult<()> {
        unsafe { self.list.Close() }.op("ID3D12GraphicsCommandList::Close")
    }

    fn submit(&mut self) -> AppResult<()> {
        let command_lists = [Some(self.list.cast::<ID3D12CommandList>()?)];
        unsafe { self.queue.ExecuteCommandLists(&command_lists) };
        Ok(())
    }

    fn transition(&mut self, image: &ID3D12Resource, before: ResourceState, after: ResourceState) {
        let barrier = transition_barrier(image, resource_state(before), resource_state(after));
        unsafe { self.list.ResourceBarrier(&[barrier]) };
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        let viewport = D3D12_VIEWPORT {
            TopLeftX: viewport.top_left_x,
            TopLeftY: viewport.top_left_y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe { self.list.RSSetViewports(&[viewport]) };
    }

    fn set_scissor(&mut self, rect: &ScissorRect) {
        let rect = RECT {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        };
        unsafe { self.list.RSSetScissorRects(&[rect]) };
    }

    fn clear_render_target(&mut self, view: ViewHandle, color: [f32; 4]) {
        unsafe { self.list.ClearRenderTargetView(cpu_handle(view), &color, None) };
    }

    fn clear_depth_stencil(&mut self, view: ViewHandle, depth: f32, stencil: u8) {
        unsafe {
            self.list.ClearDepthStencilView(
                cpu_handle(view),
                D3D12_CLEAR_FLAG_DEPTH | D3D12_CLEAR_FLAG_STENCIL,
                depth,
                stencil,
                None,
            )
        };
    }

    fn set_render_targets(&mut self, color: ViewHandle, depth: ViewHandle) {
        let rtv = cpu_handle(color);
        let dsv = cpu_handle(depth);
        unsafe { self.list.OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv)) };
    }

    fn set_pipeline(&mut self, pipeline: &D3d12Pipeline) {
        unsafe {
            self.list.SetPipelineState(pipeline.state());
            self.list.SetGraphicsRootSignature(pipeline.root_signature());
            self.list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
    }

    fn set_root_constants(&mut self, values: &[f32]) {
        unsafe {
            self.list.SetGraphicsRoot32BitConstants(
                0,
                values.len() as u32,
                values.as_ptr() as *const _,
                0,
            )
        };
    }

    fn set_mesh(&mut self, mesh: &D3d12Mesh) {
        unsafe {
            self.list.IASetVertexBuffers(0, Some(&[*mesh.vertex_view()]));
            self.list.IASetIndexBuffer(Some(mesh.index_view()));
        }
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        unsafe {
            self.list
                .DrawIndexedInstanced(index_count, 1, start_index, base_vertex, 0)
        };
    }
}
