use ash::vk;
use crate::renderer::backend::{Owned, SharedGpu};
use crate::renderer::contexts::pipeline_ctx::RenderPipelineContext;
use crate::renderer::contexts::resource_ctx::RenderResourceContext;
use crate::renderer::error::{RenderResult, VkResultExt};

/// One pre-recorded primary command buffer per swapchain image
pub struct FrameRecorder {
    command_buffers: Vec<vk::CommandBuffer>,
    pool: Owned<vk::CommandPool>,
    gpu: SharedGpu,
}

impl FrameRecorder {
    pub fn new(gpu: &SharedGpu, graphics_family: u32) -> RenderResult<Self> {
        let pool = Owned::new(
            gpu.create_command_pool(graphics_family, vk::CommandPoolCreateFlags::empty())
                .op("vkCreateCommandPool")?,
            gpu,
        );

        Ok(Self {
            command_buffers: Vec::new(),
            pool,
            gpu: gpu.clone(),
        })
    }

    /// Frees the previous command buffers and records one for each framebuffer of `pip`.
    pub fn record(
        &mut self,
        pip: &RenderPipelineContext,
        res: &RenderResourceContext,
        clear_color: [f32; 4],
    ) -> RenderResult<()> {
        self.free();

        let gpu = &*self.gpu;
        let count = pip.framebuffer_count() as u32;
        self.command_buffers = gpu
            .allocate_command_buffers(self.pool.raw(), count)
            .op("vkAllocateCommandBuffers")?;

        for (index, &cmd) in self.command_buffers.iter().enumerate() {
            let Some(framebuffer) = pip.framebuffer(index) else {
                break;
            };

            gpu.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::SIMULTANEOUS_USE)
                .op("vkBeginCommandBuffer")?;

            gpu.cmd_begin_render_pass(
                cmd,
                pip.render_pass.handle(),
                framebuffer,
                pip.extent,
                clear_color,
            );
            gpu.cmd_bind_pipeline(cmd, pip.pipeline.handle());
            gpu.cmd_bind_vertex_buffer(cmd, res.vertex_buffer.handle(), 0);
            gpu.cmd_bind_index_buffer(cmd, res.index_buffer.handle(), 0, vk::IndexType::UINT16);
            gpu.cmd_bind_descriptor_set(cmd, pip.pipeline.layout(), res.descriptor_set());
            gpu.cmd_draw_indexed(cmd, res.index_count, 1);
            gpu.cmd_end_render_pass(cmd);

            gpu.end_command_buffer(cmd).op("vkEndCommandBuffer")?;
        }

        log::debug!("Recorded {} command buffers", count);
        Ok(())
    }

    pub fn command_buffer(&self, image_index: u32) -> Option<vk::CommandBuffer> {
        self.command_buffers.get(image_index as usize).copied()
    }

    pub fn free(&mut self) {
        if !self.command_buffers.is_empty() {
            self.gpu.free_command_buffers(self.pool.raw(), &self.command_buffers);
            self.command_buffers.clear();
        }
    }
}

impl Drop for FrameRecorder {
    fn drop(&mut self) {
        self.free();
    }
}
