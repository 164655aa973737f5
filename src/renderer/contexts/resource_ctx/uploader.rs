use ash::vk;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::error::{RenderError, RenderResult};
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::texture::{Texture, TexturePixels};

/// Moves data into device-local memory through temporary host-visible staging buffers
pub struct ResourceUploader<'a> {
    dev: &'a RenderDeviceContext,
}

impl<'a> ResourceUploader<'a> {
    pub fn new(dev: &'a RenderDeviceContext) -> Self {
        Self { dev }
    }

    fn create_staging_buffer<T: Copy>(&self, data: &[T]) -> RenderResult<Buffer> {
        let staging_buffer = Buffer::new(
            self.dev,
            size_of_val(data) as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging_buffer.write(data, 0)?;
        Ok(staging_buffer)
    }

    /// Copies `data` into the start of `dst` and waits for the copy to finish. The staging
    /// buffer is released before returning.
    pub fn upload_via_staging<T: Copy>(&self, dst: &Buffer, data: &[T]) -> RenderResult<()> {
        let len = size_of_val(data) as vk::DeviceSize;
        if len > dst.size {
            return Err(RenderError::Copy(format!(
                "{} bytes do not fit in a buffer of {} bytes",
                len, dst.size
            )));
        }

        let staging_buffer = self.create_staging_buffer(data)?;
        let size = staging_buffer.size;

        self.dev.immediate_submit(|cmd, gpu| {
            gpu.cmd_copy_buffer(cmd, staging_buffer.handle(), dst.handle(), size);
            Ok(())
        })
    }

    /// Device-local buffer with `usage` holding a copy of `data`
    pub fn create_device_local_buffer<T: Copy>(
        &self,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> RenderResult<Buffer> {
        let buffer = Buffer::new(
            self.dev,
            size_of_val(data) as vk::DeviceSize,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        self.upload_via_staging(&buffer, data)?;
        Ok(buffer)
    }

    /// Uploads the pixels into a new sampled texture left in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn upload_texture(&self, pixels: &TexturePixels) -> RenderResult<Texture> {
        let staging_buffer = self.create_staging_buffer(&pixels.rgba)?;
        let texture = Texture::new(self.dev, pixels.extent())?;

        self.dev.immediate_submit(|cmd, gpu| {
            gpu.cmd_transition_image_layout(
                cmd,
                texture.image(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            gpu.cmd_copy_buffer_to_image(cmd, staging_buffer.handle(), texture.image(), texture.extent);
            gpu.cmd_transition_image_layout(
                cmd,
                texture.image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
            Ok(())
        })?;

        Ok(texture)
    }
}
