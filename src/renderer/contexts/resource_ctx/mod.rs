pub mod descriptor_set_layout_builder;
pub mod uploader;

use ash::vk;
use crate::renderer::backend::{DescriptorBinding, DescriptorWrite, Owned};
use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::resource_ctx::descriptor_set_layout_builder::DescriptorSetLayoutBuilder;
use crate::renderer::contexts::resource_ctx::uploader::ResourceUploader;
use crate::renderer::error::{RenderResult, VkResultExt};
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::mesh::Mesh;
use crate::renderer::resources::shader::GraphicsShader;
use crate::renderer::resources::texture::{Texture, TexturePixels};
use crate::renderer::shader_data::UniformBufferObject;

pub const SHADER_NAME: &str = "quad";
const CHECKERBOARD_SIZE: u32 = 256;
const CHECKERBOARD_CELLS: u32 = 8;

/// Everything the scene needs from disk, loaded before any GPU work starts
pub struct SceneAssets {
    pub mesh: Mesh,
    pub texture: TexturePixels,
    pub shader: GraphicsShader,
}

impl SceneAssets {
    pub fn load(config: &RenderConfig) -> RenderResult<Self> {
        let shader = GraphicsShader::load(&config.shader_dir, SHADER_NAME)?;
        let texture = match &config.texture {
            Some(path) => TexturePixels::load(path)?,
            None => TexturePixels::checkerboard(CHECKERBOARD_SIZE, CHECKERBOARD_CELLS),
        };

        Ok(Self {
            mesh: Mesh::quad(),
            texture,
            shader,
        })
    }
}

/// Responsibilities:
/// - Own the vertex, index, and uniform buffers and the texture
/// - Own the descriptor set layout and the one descriptor set that binds them
/// - Keep all of it alive across swapchain recreation
pub struct RenderResourceContext {
    descriptor_set: Owned<vk::DescriptorSet>,
    descriptor_set_layout: Owned<vk::DescriptorSetLayout>,
    pub texture: Texture,
    pub uniform_buffer: Buffer,
    pub index_buffer: Buffer,
    pub vertex_buffer: Buffer,
    pub index_count: u32,
    pub shader: GraphicsShader,
}

impl RenderResourceContext {
    pub fn new(
        dev: &RenderDeviceContext,
        assets: SceneAssets,
    ) -> RenderResult<Self> {
        let uploader = ResourceUploader::new(dev);

        let vertex_buffer = uploader.create_device_local_buffer(
            &assets.mesh.vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = uploader.create_device_local_buffer(
            &assets.mesh.indices,
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;
        let uniform_buffer = Buffer::new(
            dev,
            size_of::<UniformBufferObject>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let texture = uploader.upload_texture(&assets.texture)?;

        let (descriptor_set_layout, bindings) = DescriptorSetLayoutBuilder::new()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
            .add_binding(1, vk::DescriptorType::SAMPLED_IMAGE, vk::ShaderStageFlags::FRAGMENT)
            .add_binding(2, vk::DescriptorType::SAMPLER, vk::ShaderStageFlags::FRAGMENT)
            .build(&dev.gpu)?;
        let descriptor_set = Self::create_descriptor_set(
            dev,
            &descriptor_set_layout,
            &bindings,
            &uniform_buffer,
            &texture,
        )?;

        log::debug!(
            "Uploaded {} vertices, {} indices and a {}x{} texture",
            assets.mesh.vertices.len(),
            assets.mesh.indices.len(),
            texture.extent.width,
            texture.extent.height,
        );

        Ok(Self {
            descriptor_set,
            descriptor_set_layout,
            texture,
            uniform_buffer,
            index_buffer,
            vertex_buffer,
            index_count: assets.mesh.index_count(),
            shader: assets.shader,
        })
    }

    fn create_descriptor_set(
        dev: &RenderDeviceContext,
        layout: &Owned<vk::DescriptorSetLayout>,
        bindings: &[DescriptorBinding],
        uniform_buffer: &Buffer,
        texture: &Texture,
    ) -> RenderResult<Owned<vk::DescriptorSet>> {
        let gpu = &dev.gpu;
        let descriptor_set = Owned::new(
            gpu.allocate_descriptor_set(layout.raw(), bindings)
                .op("vkAllocateDescriptorSets")?,
            gpu,
        );

        gpu.write_descriptor_set(descriptor_set.raw(), &[
            DescriptorWrite::UniformBuffer {
                binding: 0,
                buffer: uniform_buffer.handle(),
                range: size_of::<UniformBufferObject>() as vk::DeviceSize,
            },
            DescriptorWrite::SampledImage {
                binding: 1,
                view: texture.view(),
            },
            DescriptorWrite::Sampler {
                binding: 2,
                sampler: texture.sampler(),
            },
        ]);

        Ok(descriptor_set)
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set.raw()
    }

    #[inline]
    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout.raw()
    }

    /// Overwrites the uniform buffer in place. The GPU may still be reading it for an
    /// earlier frame unless the caller has waited.
    pub fn update_uniforms(&self, ubo: &UniformBufferObject) -> RenderResult<()> {
        self.uniform_buffer.write(std::slice::from_ref(ubo), 0)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_assets() -> SceneAssets {
    use crate::renderer::backend::mock::test_spirv;

    let words = ash::util::read_spv(&mut std::io::Cursor::new(test_spirv())).unwrap();
    SceneAssets {
        mesh: Mesh::quad(),
        texture: TexturePixels::checkerboard(4, 2),
        shader: GraphicsShader {
            vertex: words.clone(),
            fragment: words,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::renderer::backend::mock::MockGpu;
    use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
    use crate::renderer::resources::mesh::QUAD_VERTICES;

    fn device() -> (Arc<MockGpu>, RenderDeviceContext) {
        let (mock, gpu) = MockGpu::shared();
        let dev = RenderDeviceContext::new(gpu, QueueFamilyIndices { graphics: 0, present: 0 }).unwrap();
        (mock, dev)
    }

    #[test]
    fn uploads_quad_and_binds_three_descriptors() {
        let (mock, dev) = device();
        let res = RenderResourceContext::new(&dev, test_assets()).unwrap();

        assert_eq!(res.index_count, 6);
        assert_eq!(
            mock.buffer_contents(res.vertex_buffer.handle()),
            bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES).to_vec()
        );
        assert_eq!(
            mock.buffer_contents(res.index_buffer.handle()),
            bytemuck::cast_slice::<u16, u8>(&[0, 1, 2, 2, 3, 0]).to_vec()
        );

        let writes = mock.descriptor_writes(res.descriptor_set());
        assert_eq!(writes, vec![
            DescriptorWrite::UniformBuffer {
                binding: 0,
                buffer: res.uniform_buffer.handle(),
                range: 192,
            },
            DescriptorWrite::SampledImage {
                binding: 1,
                view: res.texture.view(),
            },
            DescriptorWrite::Sampler {
                binding: 2,
                sampler: res.texture.sampler(),
            },
        ]);
    }

    #[test]
    fn uniform_update_is_visible_in_memory() {
        let (mock, dev) = device();
        let res = RenderResourceContext::new(&dev, test_assets()).unwrap();

        let ubo = UniformBufferObject::animated(0.5, vk::Extent2D { width: 4, height: 3 });
        res.update_uniforms(&ubo).unwrap();

        assert_eq!(
            mock.buffer_contents(res.uniform_buffer.handle()),
            bytemuck::bytes_of(&ubo).to_vec()
        );
    }

    #[test]
    fn dropping_releases_every_resource() {
        let (mock, dev) = device();
        let res = RenderResourceContext::new(&dev, test_assets()).unwrap();
        drop(res);

        for kind in ["buffer", "memory", "image", "image_view", "sampler", "descriptor_set", "descriptor_set_layout"] {
            assert_eq!(mock.live(kind), 0, "{kind} leaked");
        }
        assert_eq!(mock.state().bad_destroys, 0);
    }
}
