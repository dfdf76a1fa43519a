use std::ffi::CString;

use eyre::eyre;
use tracing::debug;
use tracing::info;
use windows::core::*;
use windows::Win32::Foundation::FALSE;
use windows::Win32::Foundation::TRUE;
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::dxgi_format;
use super::sample_desc;
use crate::device::PipelineDesc;
use crate::device::SampleDesc;
use crate::device::ShaderSource;
use crate::device::VertexFormat;
use crate::error::AppReport;
use crate::error::AppResult;
use crate::error::CheckOperation;
use crate::error::OperationFailed;

/// A root signature and the pipeline state object built against it.
pub struct D3d12Pipeline {
    root_signature: ID3D12RootSignature,
    state: ID3D12PipelineState,
}

impl D3d12Pipeline {
    pub fn root_signature(&self) -> &ID3D12RootSignature {
        &self.root_signature
    }

    pub fn state(&self) -> &ID3D12PipelineState {
        &self.state
    }
}

fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

fn blob_text(blob: &ID3DBlob) -> String {
    String::from_utf8_lossy(blob_bytes(blob))
        .trim_end_matches('\0')
        .trim_end()
        .to_string()
}

fn c_string(text: &str) -> AppResult<CString> {
    Ok(CString::new(text).map_err(|e| eyre!("{text:?} contains a nul character: {e}"))?)
}

fn vertex_format(format: VertexFormat) -> DXGI_FORMAT {
    match format {
        VertexFormat::Float32x3 => DXGI_FORMAT_R32G32B32_FLOAT,
        VertexFormat::Float32x4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
    }
}

/// Root parameter 0 holds `root_constants` 32-bit values for register `b0`.
fn create_root_signature(
    device: &ID3D12Device,
    root_constants: u32,
) -> AppResult<ID3D12RootSignature> {
    let parameters = [D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            Constants: D3D12_ROOT_CONSTANTS {
                ShaderRegister: 0,
                RegisterSpace: 0,
                Num32BitValues: root_constants,
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_VERTEX,
    }];
    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: if root_constants > 0 { 1 } else { 0 },
        pParameters: parameters.as_ptr(),
        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
        ..Default::default()
    };

    let mut signature = None;
    let mut errors = None;
    let result = unsafe {
        D3D12SerializeRootSignature(
            &desc,
            D3D_ROOT_SIGNATURE_VERSION_1,
            &mut signature,
            Some(&mut errors),
        )
    };
    if let Err(e) = result {
        let message = errors.as_ref().map(blob_text).unwrap_or_else(|| e.message());
        return Err(OperationFailed::new("D3D12SerializeRootSignature", e.code().0, message).into());
    }
    let signature =
        signature.ok_or_else(|| eyre!("D3D12SerializeRootSignature returned no blob"))?;
    unsafe { device.CreateRootSignature(0, blob_bytes(&signature)) }.op("CreateRootSignature")
}

fn compile_shader(shader: &ShaderSource<'_>, entry_point: &str, target: &str) -> AppResult<ID3DBlob> {
    let flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        0
    };
    let name = c_string(shader.name)?;
    let entry = c_string(entry_point)?;
    let target = c_string(target)?;

    let mut code = None;
    let mut errors = None;
    let result = unsafe {
        D3DCompile(
            shader.code.as_ptr() as *const _,
            shader.code.len(),
            PCSTR(name.as_ptr() as *const u8),
            None,
            None,
            PCSTR(entry.as_ptr() as *const u8),
            PCSTR(target.as_ptr() as *const u8),
            flags,
            0,
            &mut code,
            Some(&mut errors),
        )
    };
    let diagnostics = errors.as_ref().map(blob_text);
    if let Err(e) = result {
        let message = diagnostics.unwrap_or_else(|| e.message());
        return Err(
            AppReport::from(OperationFailed::new("D3DCompile", e.code().0, message))
                .wrap_err(format!("compiling {} {entry_point}", shader.name)),
        );
    }
    if let Some(warnings) = diagnostics.filter(|text| !text.is_empty()) {
        debug!(shader = shader.name, entry_point, "Shader compiler output: {}", warnings);
    }
    Ok(code.ok_or_else(|| eyre!("D3DCompile returned no bytecode"))?)
}

fn shader_bytecode(blob: &ID3DBlob) -> D3D12_SHADER_BYTECODE {
    D3D12_SHADER_BYTECODE {
        pShaderBytecode: unsafe { blob.GetBufferPointer() },
        BytecodeLength: unsafe { blob.GetBufferSize() },
    }
}

pub(crate) fn create_pipeline(
    device: &ID3D12Device,
    desc: &PipelineDesc<'_>,
) -> AppResult<D3d12Pipeline> {
    let root_signature = create_root_signature(device, desc.root_constants)?;
    let vertex_shader = compile_shader(&desc.shader, desc.shader.vertex_entry, "vs_5_0")?;
    let pixel_shader = compile_shader(&desc.shader, desc.shader.pixel_entry, "ps_5_0")?;

    // Owns the semantic names the input elements point into.
    let semantics = desc
        .vertex_layout
        .iter()
        .map(|attribute| c_string(attribute.semantic))
        .collect::<AppResult<Vec<_>>>()?;
    let input_elements: Vec<D3D12_INPUT_ELEMENT_DESC> = desc
        .vertex_layout
        .iter()
        .zip(&semantics)
        .map(|(attribute, semantic)| D3D12_INPUT_ELEMENT_DESC {
            SemanticName: PCSTR(semantic.as_ptr() as *const u8),
            SemanticIndex: 0,
            Format: vertex_format(attribute.format),
            InputSlot: 0,
            AlignedByteOffset: attribute.offset,
            InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
            InstanceDataStepRate: 0,
        })
        .collect();

    let mut rtv_formats = [DXGI_FORMAT_UNKNOWN; 8];
    rtv_formats[0] = dxgi_format(desc.render_target_format);

    let opaque = D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: FALSE,
        LogicOpEnable: FALSE,
        SrcBlend: D3D12_BLEND_ONE,
        DestBlend: D3D12_BLEND_ZERO,
        BlendOp: D3D12_BLEND_OP_ADD,
        SrcBlendAlpha: D3D12_BLEND_ONE,
        DestBlendAlpha: D3D12_BLEND_ZERO,
        BlendOpAlpha: D3D12_BLEND_OP_ADD,
        LogicOp: D3D12_LOGIC_OP_NOOP,
        RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
    };
    let pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
        pRootSignature: unsafe { std::mem::transmute_copy(&root_signature) },
        VS: shader_bytecode(&vertex_shader),
        PS: shader_bytecode(&pixel_shader),
        InputLayout: D3D12_INPUT_LAYOUT_DESC {
            pInputElementDescs: input_elements.as_ptr(),
            NumElements: input_elements.len() as u32,
        },
        RasterizerState: D3D12_RASTERIZER_DESC {
            FillMode: D3D12_FILL_MODE_SOLID,
            CullMode: D3D12_CULL_MODE_BACK,
            FrontCounterClockwise: FALSE,
            DepthClipEnable: TRUE,
            ..Default::default()
        },
        BlendState: D3D12_BLEND_DESC {
            AlphaToCoverageEnable: FALSE,
            IndependentBlendEnable: FALSE,
            RenderTarget: [opaque; 8],
        },
        DepthStencilState: D3D12_DEPTH_STENCIL_DESC {
            DepthEnable: TRUE,
            DepthWriteMask: D3D12_DEPTH_WRITE_MASK_ALL,
            DepthFunc: D3D12_COMPARISON_FUNC_LESS,
            StencilEnable: FALSE,
            ..Default::default()
        },
        DSVFormat: dxgi_format(desc.depth_stencil_format),
        SampleMask: u32::MAX,
        PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
        NumRenderTargets: 1,
        RTVFormats: rtv_formats,
        // Flip-model back buffers, and the depth buffer matched to them, are
        // always single-sample on this backend.
        SampleDesc: sample_desc(SampleDesc::SINGLE),
        ..Default::default()
    };
    // The descriptor borrows the root signature without adding a reference.
    let state = unsafe { device.CreateGraphicsPipelineState(&pso_desc) }
        .op("CreateGraphicsPipelineState")?;

    info!(shader = desc.shader.name, "Pipeline state created");
    Ok(D3d12Pipeline {
        root_signature,
        state,
    })
}
