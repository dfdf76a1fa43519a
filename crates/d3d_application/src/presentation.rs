//! Back buffers, depth buffer and the resize state machine that recreates them.
//!
//! Nothing here is resized in place. Every transition flushes the queue,
//! drops every image handle, rebuilds the buffers and flushes again before
//! the loop is allowed to record the next frame.

use eyre::eyre;
use tracing::debug;
use tracing::info;

use crate::back_buffer_ring::BackBufferRing;
use crate::command_channel::CommandChannel;
use crate::command_channel::CommandRecorder;
use crate::device::DepthStencilDesc;
use crate::device::Device;
use crate::device::Extent;
use crate::device::Format;
use crate::device::ResourceState;
use crate::device::ScissorRect;
use crate::device::SwapChain;
use crate::device::SwapChainDesc;
use crate::device::ViewHandle;
use crate::device::Viewport;
use crate::device::SWAP_CHAIN_BUFFER_COUNT;
use crate::error::AppResult;
use crate::fence_counter::FenceCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentState {
    Presenting,
    Resizing,
}

pub struct Presentation<D: Device> {
    swap_chain: Option<D::SwapChain>,
    ring: BackBufferRing<D::Image>,
    depth_stencil: Option<D::Image>,
    depth_stencil_view: ViewHandle,
    depth_stencil_format: Format,
    extent: Extent,
    viewport: Viewport,
    scissor: ScissorRect,
    state: PresentState,
}

impl<D: Device> Presentation<D> {
    /// Wraps a freshly created swap chain. Nothing is renderable until the
    /// first [`Presentation::resize`].
    pub fn new(
        swap_chain: D::SwapChain,
        desc: &SwapChainDesc,
        depth_stencil_format: Format,
    ) -> Self {
        Self {
            swap_chain: Some(swap_chain),
            ring: BackBufferRing::new(desc.format),
            depth_stencil: None,
            depth_stencil_view: ViewHandle(0),
            depth_stencil_format,
            extent: desc.extent,
            viewport: Viewport::covering(desc.extent),
            scissor: ScissorRect::covering(desc.extent),
            state: PresentState::Presenting,
        }
    }

    pub fn resize(
        &mut self,
        device: &D,
        fence: &mut FenceCounter<D::Fence>,
        channel: &mut CommandChannel<D::Commands>,
        extent: Extent,
    ) -> AppResult<()> {
        self.state = PresentState::Resizing;
        debug!(%extent, "Resizing back buffers");

        fence.flush()?;
        self.release_images();

        let swap_chain = self
            .swap_chain
            .as_mut()
            .ok_or_else(|| eyre!("swap chain is missing"))?;
        swap_chain.resize_buffers(SWAP_CHAIN_BUFFER_COUNT as u32, extent, self.ring.format())?;
        self.ring
            .acquire(device, swap_chain, device.render_target_table(), extent)?;

        let depth_stencil = device.create_depth_stencil(&DepthStencilDesc {
            extent,
            format: self.depth_stencil_format,
            samples: swap_chain.sample_desc(),
        })?;
        let view = device.depth_stencil_table().slot(0);
        device.create_depth_stencil_view(&depth_stencil, self.depth_stencil_format, view);

        let commands = channel.begin(fence)?;
        commands.transition(&depth_stencil, ResourceState::Common, ResourceState::DepthWrite);
        channel.close()?;
        channel.submit(fence)?;
        fence.flush()?;

        self.depth_stencil = Some(depth_stencil);
        self.depth_stencil_view = view;
        self.extent = extent;
        self.viewport = Viewport::covering(extent);
        self.scissor = ScissorRect::covering(extent);
        self.state = PresentState::Presenting;
        Ok(())
    }

    /// Replaces the swap chain itself, then runs the full resize.
    pub fn recreate(
        &mut self,
        device: &D,
        surface: &D::Surface,
        desc: &SwapChainDesc,
        fence: &mut FenceCounter<D::Fence>,
        channel: &mut CommandChannel<D::Commands>,
    ) -> AppResult<()> {
        self.state = PresentState::Resizing;
        fence.flush()?;
        self.release_images();
        // A window can only own one swap chain at a time.
        self.swap_chain = None;
        let swap_chain = device.create_swap_chain(surface, desc)?;
        info!(samples = swap_chain.sample_desc().count, "Recreated swap chain");
        self.swap_chain = Some(swap_chain);
        self.resize(device, fence, channel, desc.extent)
    }

    /// Presents the current back buffer and moves the ring forward.
    pub fn present(&mut self, sync_interval: u32) -> AppResult<()> {
        let swap_chain = self
            .swap_chain
            .as_mut()
            .ok_or_else(|| eyre!("swap chain is missing"))?;
        swap_chain.present(sync_interval)?;
        self.ring.advance();
        Ok(())
    }

    fn release_images(&mut self) {
        self.ring.release();
        self.depth_stencil = None;
    }

    pub fn ring(&self) -> &BackBufferRing<D::Image> {
        &self.ring
    }

    pub fn swap_chain(&self) -> Option<&D::SwapChain> {
        self.swap_chain.as_ref()
    }

    pub fn depth_stencil(&self) -> Option<&D::Image> {
        self.depth_stencil.as_ref()
    }

    pub fn depth_stencil_view(&self) -> ViewHandle {
        self.depth_stencil_view
    }

    pub fn depth_stencil_format(&self) -> Format {
        self.depth_stencil_format
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scissor(&self) -> &ScissorRect {
        &self.scissor
    }

    pub fn state(&self) -> PresentState {
        self.state
    }
}
