pub mod instance;
pub mod device;
pub mod queue;
pub mod target;
pub mod transfer_ctx;

use ash::vk;
use crate::renderer::backend::{GpuBackend, SharedGpu};
use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use crate::renderer::contexts::device_ctx::transfer_ctx::TransferContext;
use crate::renderer::error::RenderResult;

/// Responsibilities:
/// - Own the shared backend, which holds the logical device and both queues
/// - Remember which queue families were chosen and the device memory types
/// - Run blocking one-off transfers on the graphics queue
pub struct RenderDeviceContext {
    pub transfer: TransferContext,
    pub gpu: SharedGpu,
    pub queue_families: QueueFamilyIndices,
    pub memory_types: Vec<vk::MemoryType>,
}

impl RenderDeviceContext {
    pub fn new(
        gpu: SharedGpu,
        queue_families: QueueFamilyIndices,
    ) -> RenderResult<Self> {
        let memory_types = gpu.memory_types();
        let transfer = TransferContext::new(&gpu, queue_families.graphics)?;

        Ok(Self {
            transfer,
            gpu,
            queue_families,
            memory_types,
        })
    }

    pub fn find_memory_type(
        &self,
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> RenderResult<u32> {
        device::find_memory_type(&self.memory_types, type_bits, properties)
    }

    pub fn immediate_submit<F>(&self, func: F) -> RenderResult<()>
    where
        F: FnOnce(vk::CommandBuffer, &dyn GpuBackend) -> RenderResult<()>,
    {
        self.transfer.immediate_submit(func)
    }
}
