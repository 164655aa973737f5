use ash::vk;
use crate::renderer::backend::{DescriptorBinding, Owned, SharedGpu};
use crate::renderer::error::{RenderResult, VkResultExt};

pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutBuilder {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(DescriptorBinding {
            binding,
            ty: descriptor_type,
            stages,
        });
        self
    }

    /// Creates the layout and hands back the bindings it was built from, which the
    /// descriptor allocator needs to size its pools.
    pub fn build(
        self,
        gpu: &SharedGpu,
    ) -> RenderResult<(Owned<vk::DescriptorSetLayout>, Vec<DescriptorBinding>)> {
        let layout = gpu
            .create_descriptor_set_layout(&self.bindings)
            .op("vkCreateDescriptorSetLayout")?;
        Ok((Owned::new(layout, gpu), self.bindings))
    }
}
