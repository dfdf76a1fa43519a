use eyre::eyre;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::application::Application;
use crate::application::FrameContext;
use crate::command_channel::CommandChannel;
use crate::command_channel::CommandRecorder;
use crate::config::GraphicsConfig;
use crate::device::Device;
use crate::device::Extent;
use crate::device::Format;
use crate::device::ResourceState;
use crate::device::SampleDesc;
use crate::device::SwapChainDesc;
use crate::device::SWAP_CHAIN_BUFFER_COUNT;
use crate::error::AppResult;
use crate::fence_counter::FenceCounter;
use crate::frame_clock::FrameClock;
use crate::presentation::Presentation;

const MSAA_SAMPLE_COUNT: u32 = 4;

/// Device, queue synchronization, command channel and presentation images
/// for one window.
pub struct GraphicsContext<D: Device> {
    presentation: Presentation<D>,
    channel: CommandChannel<D::Commands>,
    fence: FenceCounter<D::Fence>,
    surface: D::Surface,
    back_buffer_format: Format,
    min_extent: Extent,
    sync_interval: u32,
    multisampling: bool,
    msaa_quality_levels: u32,
    device: D,
}

impl<D: Device> GraphicsContext<D> {
    /// Creates every GPU object and runs the first resize. Any failure here
    /// is fatal; whatever was created so far is released on return.
    pub fn new(
        device: D,
        surface: D::Surface,
        config: &GraphicsConfig,
        extent: Extent,
        min_extent: Extent,
    ) -> AppResult<Self> {
        let fence = device
            .create_fence()
            .map_err(|e| e.wrap_err("failed to create the frame fence"))?;
        let commands = device
            .create_commands()
            .map_err(|e| e.wrap_err("failed to create the command list"))?;

        let msaa_quality_levels =
            device.multisample_quality_levels(config.back_buffer_format, MSAA_SAMPLE_COUNT)?;
        let mut multisampling = config.multisampling;
        if msaa_quality_levels == 0 {
            warn!(format = ?config.back_buffer_format, "4x MSAA is not supported, disabling it");
            multisampling = false;
        }

        let extent = extent.clamp_min(min_extent);
        let desc = swap_chain_desc(
            extent,
            config.back_buffer_format,
            samples_for(multisampling, msaa_quality_levels),
        );
        let swap_chain = device
            .create_swap_chain(&surface, &desc)
            .map_err(|e| e.wrap_err("failed to create the swap chain"))?;
        let presentation = Presentation::new(swap_chain, &desc, config.depth_stencil_format);

        let mut context = Self {
            presentation,
            channel: CommandChannel::new(commands),
            fence: FenceCounter::new(fence),
            surface,
            back_buffer_format: config.back_buffer_format,
            min_extent,
            sync_interval: config.sync_interval,
            multisampling,
            msaa_quality_levels,
            device,
        };
        context.resize(extent)?;
        info!(%extent, multisampling, "Graphics context ready");
        Ok(context)
    }

    /// Runs the resize state machine, clamping to the minimum client size.
    pub fn resize(&mut self, extent: Extent) -> AppResult<()> {
        let extent = extent.clamp_min(self.min_extent);
        self.presentation
            .resize(&self.device, &mut self.fence, &mut self.channel, extent)?;
        info!(%extent, "Back buffers resized");
        Ok(())
    }

    /// Recreates the swap chain with or without 4x MSAA. Returns whether
    /// anything changed.
    pub fn set_multisampling(&mut self, enabled: bool) -> AppResult<bool> {
        if enabled == self.multisampling {
            return Ok(false);
        }
        if enabled && self.msaa_quality_levels == 0 {
            warn!("4x MSAA is not supported on this device");
            return Ok(false);
        }
        self.multisampling = enabled;
        let desc = swap_chain_desc(
            self.presentation.extent(),
            self.back_buffer_format,
            samples_for(enabled, self.msaa_quality_levels),
        );
        self.presentation.recreate(
            &self.device,
            &self.surface,
            &desc,
            &mut self.fence,
            &mut self.channel,
        )?;
        info!(enabled, "Multisampling toggled");
        Ok(true)
    }

    /// Records, submits and presents one frame, then waits for the GPU to
    /// finish it before returning.
    pub fn render_frame<A>(&mut self, app: &mut A, clock: &FrameClock) -> AppResult<()>
    where
        A: Application<D::Commands>,
    {
        let clear_color = app.clear_color();
        let commands = self.channel.begin(&mut self.fence)?;

        let ring = self.presentation.ring();
        let back_buffer = ring
            .current_image()
            .ok_or_else(|| eyre!("no back buffer to render into"))?;
        let render_target = ring.current_view();
        let depth_stencil = self.presentation.depth_stencil_view();

        commands.transition(back_buffer, ResourceState::Present, ResourceState::RenderTarget);
        commands.set_viewport(self.presentation.viewport());
        commands.set_scissor(self.presentation.scissor());
        commands.clear_render_target(render_target, clear_color);
        commands.clear_depth_stencil(depth_stencil, 1.0, 0);
        commands.set_render_targets(render_target, depth_stencil);

        let mut frame = FrameContext {
            commands,
            back_buffer,
            render_target,
            depth_stencil,
            extent: self.presentation.extent(),
        };
        app.draw(clock, &mut frame)?;
        frame
            .commands
            .transition(back_buffer, ResourceState::RenderTarget, ResourceState::Present);

        self.channel.close()?;
        self.channel.submit(&self.fence)?;
        self.presentation.present(self.sync_interval)?;
        self.fence.flush()
    }

    pub fn flush(&mut self) -> AppResult<()> {
        self.fence.flush()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn presentation(&self) -> &Presentation<D> {
        &self.presentation
    }

    pub fn fence(&self) -> &FenceCounter<D::Fence> {
        &self.fence
    }

    pub fn channel(&self) -> &CommandChannel<D::Commands> {
        &self.channel
    }

    pub fn extent(&self) -> Extent {
        self.presentation.extent()
    }

    pub fn back_buffer_format(&self) -> Format {
        self.back_buffer_format
    }

    pub fn depth_stencil_format(&self) -> Format {
        self.presentation.depth_stencil_format()
    }

    pub fn multisampling(&self) -> bool {
        self.multisampling
    }
}

impl<D: Device> Drop for GraphicsContext<D> {
    fn drop(&mut self) {
        // Resources are released after this; the GPU must be done with them.
        if let Err(e) = self.fence.flush() {
            error!("Error waiting for GPU idle on shutdown: {:?}", e);
        }
    }
}

fn samples_for(multisampling: bool, quality_levels: u32) -> SampleDesc {
    if multisampling {
        SampleDesc {
            count: MSAA_SAMPLE_COUNT,
            quality: quality_levels - 1,
        }
    } else {
        SampleDesc::SINGLE
    }
}

fn swap_chain_desc(extent: Extent, format: Format, samples: SampleDesc) -> SwapChainDesc {
    SwapChainDesc {
        extent,
        format,
        buffer_count: SWAP_CHAIN_BUFFER_COUNT as u32,
        samples,
    }
}
