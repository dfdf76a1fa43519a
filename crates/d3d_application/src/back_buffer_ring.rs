use crate::device::Device;
use crate::device::Extent;
use crate::device::Format;
use crate::device::SwapChain;
use crate::device::ViewHandle;
use crate::device::ViewTable;
use crate::device::SWAP_CHAIN_BUFFER_COUNT;
use crate::error::AppResult;

/// The swap chain's presentable images, one of which is current.
pub struct BackBufferRing<I> {
    images: Option<[I; SWAP_CHAIN_BUFFER_COUNT]>,
    views: [ViewHandle; SWAP_CHAIN_BUFFER_COUNT],
    current: usize,
    extent: Extent,
    format: Format,
}

impl<I> BackBufferRing<I> {
    pub fn new(format: Format) -> Self {
        Self {
            images: None,
            views: [ViewHandle(0); SWAP_CHAIN_BUFFER_COUNT],
            current: 0,
            extent: Extent::default(),
            format,
        }
    }

    /// Drops every image handle so the swap chain can recreate its buffers.
    pub fn release(&mut self) {
        self.images = None;
    }

    /// Takes fresh handles to every buffer and writes one render-target view
    /// per image at its slot in `table`. The first image becomes current.
    pub fn acquire<D>(
        &mut self,
        device: &D,
        swap_chain: &D::SwapChain,
        table: ViewTable,
        extent: Extent,
    ) -> AppResult<()>
    where
        D: Device<Image = I>,
    {
        debug_assert!(self.images.is_none(), "acquire without release");
        self.current = 0;
        let images: [I; SWAP_CHAIN_BUFFER_COUNT] =
            array_init::try_array_init(|i| swap_chain.buffer(i as u32))?;
        for (i, image) in images.iter().enumerate() {
            let view = table.slot(i);
            device.create_render_target_view(image, view);
            self.views[i] = view;
        }
        self.images = Some(images);
        self.extent = extent;
        Ok(())
    }

    /// Moves to the next image. Only call after a successful present.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % SWAP_CHAIN_BUFFER_COUNT;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_image(&self) -> Option<&I> {
        self.images.as_ref().map(|images| &images[self.current])
    }

    pub fn current_view(&self) -> ViewHandle {
        self.views[self.current]
    }

    pub fn images(&self) -> Option<&[I; SWAP_CHAIN_BUFFER_COUNT]> {
        self.images.as_ref()
    }

    pub fn views(&self) -> &[ViewHandle; SWAP_CHAIN_BUFFER_COUNT] {
        &self.views
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SampleDesc;
    use crate::device::SwapChainDesc;
    use crate::headless::CompletionMode;
    use crate::headless::HeadlessDevice;
    use crate::headless::HeadlessGpu;
    use crate::headless::HeadlessImage;
    use crate::headless::HeadlessSwapChain;

    fn ring_and_chain() -> (HeadlessDevice, BackBufferRing<HeadlessImage>, HeadlessSwapChain) {
        let device = HeadlessDevice::new(HeadlessGpu::new(CompletionMode::Immediate));
        let desc = SwapChainDesc {
            extent: Extent::new(640, 480),
            format: Format::R8g8b8a8Unorm,
            buffer_count: SWAP_CHAIN_BUFFER_COUNT as u32,
            samples: SampleDesc::SINGLE,
        };
        let swap_chain = device.create_swap_chain(&(), &desc).unwrap();
        (device, BackBufferRing::new(desc.format), swap_chain)
    }

    #[test]
    fn acquire_writes_one_view_per_slot() {
        let (device, mut ring, swap_chain) = ring_and_chain();
        let table = device.render_target_table();
        ring.acquire(&device, &swap_chain, table, Extent::new(640, 480)).unwrap();

        assert_eq!(ring.current_index(), 0);
        assert_eq!(ring.views(), &[table.slot(0), table.slot(1)]);
        let images = ring.images().unwrap();
        for (i, image) in images.iter().enumerate() {
            assert_eq!(device.gpu().render_target_view(table.slot(i).0), Some(image.id()));
            assert_eq!(image.handle_count(), 2);
        }
    }

    #[test]
    fn advance_wraps_and_release_drops_handles() {
        let (device, mut ring, swap_chain) = ring_and_chain();
        ring.acquire(&device, &swap_chain, device.render_target_table(), Extent::new(640, 480))
            .unwrap();
        ring.advance();
        assert_eq!(ring.current_index(), 1);
        ring.advance();
        assert_eq!(ring.current_index(), 0);

        let first = swap_chain.buffer(0).unwrap();
        assert_eq!(first.handle_count(), 3);
        ring.release();
        assert!(ring.current_image().is_none());
        assert_eq!(first.handle_count(), 2);
    }
}
