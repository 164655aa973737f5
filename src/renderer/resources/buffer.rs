use ash::vk;
use crate::renderer::backend::{Owned, SharedGpu};
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::error::{RenderError, RenderResult, VkResultExt};

/// A buffer with its own dedicated memory allocation
pub struct Buffer {
    memory: Owned<vk::DeviceMemory>,
    buffer: Owned<vk::Buffer>,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    host_visible: bool,
    gpu: SharedGpu,
}

impl Buffer {
    pub fn new(
        dev: &RenderDeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> RenderResult<Self> {
        let gpu = &dev.gpu;

        let buffer = gpu
            .create_buffer(size, usage)
            .map_err(|result| RenderError::buffer_creation(size, result))?;
        let buffer = Owned::new(buffer, gpu);

        let reqs = gpu.buffer_memory_requirements(buffer.raw());
        let memory_type = dev.find_memory_type(reqs.memory_type_bits, properties)?;
        let memory = gpu
            .allocate_memory(reqs.size, memory_type)
            .map_err(|result| RenderError::allocation(reqs.size, result))?;
        let memory = Owned::new(memory, gpu);

        gpu.bind_buffer_memory(buffer.raw(), memory.raw())
            .op("vkBindBufferMemory")?;

        Ok(Self {
            memory,
            buffer,
            size,
            usage,
            host_visible: properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE),
            gpu: gpu.clone(),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.raw()
    }

    /// Maps the memory, copies `data` at `start_offset` and unmaps again.
    pub fn write<T>(
        &self,
        data: &[T],
        start_offset: usize,
    ) -> RenderResult<presser::CopyRecord>
    where
        T: Copy,
    {
        if !self.host_visible {
            return Err::<presser::CopyRecord, _>(vk::Result::ERROR_MEMORY_MAP_FAILED).op("vkMapMemory");
        }

        let mapped = self
            .gpu
            .map_memory(self.memory.raw(), self.size)
            .op("vkMapMemory")?;

        let copy_record = unsafe {
            let mut raw_allocation = presser::RawAllocation::from_raw_parts(mapped, self.size as usize);
            let mut slab = raw_allocation.borrow_as_slab();
            presser::copy_from_slice_to_offset(data, &mut slab, start_offset)
        };

        self.gpu.unmap_memory(self.memory.raw());

        copy_record.map_err(|err| RenderError::Copy(format!("{:?}", err)))
    }
}
