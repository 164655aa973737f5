use ash::vk;
use crate::renderer::backend::{GpuBackend, Owned, QueueRole, SharedGpu, SubmitDesc};
use crate::renderer::error::{RenderResult, VkResultExt};

/// One reusable command buffer on the graphics queue for blocking uploads
pub struct TransferContext {
    command_buffer: vk::CommandBuffer,
    command_pool: Owned<vk::CommandPool>,
    gpu: SharedGpu,
}

impl TransferContext {
    pub fn new(
        gpu: &SharedGpu,
        graphics_family: u32,
    ) -> RenderResult<Self> {
        let command_pool = Owned::new(
            gpu.create_command_pool(
                graphics_family,
                vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )
            .op("vkCreateCommandPool")?,
            gpu,
        );
        let command_buffer = gpu
            .allocate_command_buffers(command_pool.raw(), 1)
            .op("vkAllocateCommandBuffers")?
            .first()
            .copied()
            .ok_or(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
            .op("vkAllocateCommandBuffers")?;

        Ok(Self {
            command_buffer,
            command_pool,
            gpu: gpu.clone(),
        })
    }

    /// Records `func` into a one-time-submit command buffer, submits it to the graphics
    /// queue and blocks until the queue is idle. A failed recording resets the pool so the
    /// buffer can be begun again.
    pub fn immediate_submit<F>(
        &self,
        func: F,
    ) -> RenderResult<()>
    where
        F: FnOnce(vk::CommandBuffer, &dyn GpuBackend) -> RenderResult<()>,
    {
        let gpu = &*self.gpu;
        let cmd = self.command_buffer;

        gpu.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .op("vkBeginCommandBuffer")?;

        let recorded = func(cmd, gpu).and_then(|()| gpu.end_command_buffer(cmd).op("vkEndCommandBuffer"));
        if let Err(err) = recorded {
            if let Err(reset) = gpu.reset_command_pool(self.command_pool.raw()) {
                log::warn!("Failed to reset transfer command pool after a failed recording: {}", reset);
            }
            return Err(err);
        }

        gpu.queue_submit(
            QueueRole::Graphics,
            &SubmitDesc {
                wait_semaphores: &[],
                wait_stages: &[],
                command_buffers: &[cmd],
                signal_semaphores: &[],
            },
        )
        .op("vkQueueSubmit")?;

        gpu.queue_wait_idle(QueueRole::Graphics).op("vkQueueWaitIdle")?;
        gpu.reset_command_pool(self.command_pool.raw()).op("vkResetCommandPool")?;

        Ok(())
    }
}
