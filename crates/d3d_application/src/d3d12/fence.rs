use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::*;

use crate::error::AppResult;
use crate::error::CheckOperation;
use crate::error::OperationFailed;
use crate::fence_counter::GpuFence;

/// An auto-reset event closed on drop.
struct OwnedEvent(HANDLE);

impl Drop for OwnedEvent {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe { CloseHandle(self.0) }.ok();
        }
    }
}

pub struct D3d12Fence {
    fence: ID3D12Fence,
    queue: ID3D12CommandQueue,
    event: OwnedEvent,
}

impl D3d12Fence {
    pub(crate) fn new(device: &ID3D12Device, queue: &ID3D12CommandQueue) -> AppResult<Self> {
        let fence: ID3D12Fence =
            unsafe { device.CreateFence(0, D3D12_FENCE_FLAG_NONE) }.op("CreateFence")?;
        let event = unsafe { CreateEventA(None, false, false, None) }.op("CreateEventA")?;
        Ok(Self {
            fence,
            queue: queue.clone(),
            event: OwnedEvent(event),
        })
    }
}

impl GpuFence for D3d12Fence {
    fn signal(&mut self, value: u64) -> AppResult<()> {
        unsafe { self.queue.Signal(&self.fence, value) }.op("ID3D12CommandQueue::Signal")
    }

    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for(&mut self, value: u64) -> AppResult<()> {
        unsafe { self.fence.SetEventOnCompletion(value, self.event.0) }
            .op("SetEventOnCompletion")?;
        let wait = unsafe { WaitForSingleObjectEx(self.event.0, INFINITE, false) };
        if wait == WAIT_FAILED {
            let error = windows::core::Error::from_win32();
            return Err(OperationFailed::new(
                "WaitForSingleObjectEx",
                error.code().0,
                error.message(),
            )
            .into());
        }
        Ok(())
    }
}
