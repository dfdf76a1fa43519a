use eyre::eyre;
use tracing::debug;
use windows::core::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::device::MeshDesc;
use crate::error::AppResult;
use crate::error::CheckOperation;

/// Vertex and index buffers living in the upload heap.
pub struct D3d12Mesh {
    // Views point into these buffers.
    _vertex_buffer: ID3D12Resource,
    _index_buffer: ID3D12Resource,
    vertex_view: D3D12_VERTEX_BUFFER_VIEW,
    index_view: D3D12_INDEX_BUFFER_VIEW,
    index_count: u32,
}

impl D3d12Mesh {
    pub fn vertex_view(&self) -> &D3D12_VERTEX_BUFFER_VIEW {
        &self.vertex_view
    }

    pub fn index_view(&self) -> &D3D12_INDEX_BUFFER_VIEW {
        &self.index_view
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

fn upload_buffer(device: &ID3D12Device, bytes: &[u8], name: PCWSTR) -> AppResult<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_UPLOAD,
        ..Default::default()
    };
    let resource_desc = D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: bytes.len() as u64,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    };

    let mut buffer: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &heap_props,
            D3D12_HEAP_FLAG_NONE,
            &resource_desc,
            D3D12_RESOURCE_STATE_GENERIC_READ,
            None,
            &mut buffer,
        )
    }
    .op("CreateCommittedResource")?;
    let buffer = buffer.ok_or_else(|| eyre!("CreateCommittedResource returned no buffer"))?;
    unsafe { buffer.SetName(name) }.ok();

    unsafe {
        let mut data_ptr = std::ptr::null_mut();
        // Nothing is read back.
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        buffer.Map(0, Some(&read_range), Some(&mut data_ptr)).op("Map")?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr as *mut u8, bytes.len());
        buffer.Unmap(0, None);
    }
    Ok(buffer)
}

pub(crate) fn create_mesh(device: &ID3D12Device, desc: &MeshDesc<'_>) -> AppResult<D3d12Mesh> {
    let index_bytes: Vec<u8> = desc
        .indices
        .iter()
        .flat_map(|index| index.to_le_bytes())
        .collect();

    let vertex_buffer = upload_buffer(device, desc.vertices, w!("VertexBuffer"))?;
    let index_buffer = upload_buffer(device, &index_bytes, w!("IndexBuffer"))?;

    let vertex_view = D3D12_VERTEX_BUFFER_VIEW {
        BufferLocation: unsafe { vertex_buffer.GetGPUVirtualAddress() },
        StrideInBytes: desc.vertex_stride,
        SizeInBytes: desc.vertices.len() as u32,
    };
    let index_view = D3D12_INDEX_BUFFER_VIEW {
        BufferLocation: unsafe { index_buffer.GetGPUVirtualAddress() },
        SizeInBytes: index_bytes.len() as u32,
        Format: DXGI_FORMAT_R16_UINT,
    };

    debug!(
        vertices = desc.vertex_count(),
        indices = desc.indices.len(),
        "Mesh uploaded"
    );
    Ok(D3d12Mesh {
        _vertex_buffer: vertex_buffer,
        _index_buffer: index_buffer,
        vertex_view,
        index_view,
        index_count: desc.indices.len() as u32,
    })
}
