//! In-memory backend used by unit tests. Hands out unique handles, tracks which ones are
//! alive, backs device memory with host bytes and replays recorded copies on submit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;
use super::{
    DescriptorBinding, DescriptorWrite, GpuBackend, GraphicsPipelineDesc, ImageDesc, QueueRole,
    SharedGpu, SubmitDesc, SwapchainDesc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Acquire,
    Present,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Buffer,
    Allocate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockCommand {
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    },
    EndRenderPass,
    BindPipeline(vk::Pipeline),
    BindVertexBuffer(vk::Buffer, vk::DeviceSize),
    BindIndexBuffer(vk::Buffer, vk::DeviceSize, vk::IndexType),
    BindDescriptorSet(vk::PipelineLayout, vk::DescriptorSet),
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    },
    CopyBufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent2D,
    },
    TransitionImage {
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedSwapchain {
    pub handle: vk::SwapchainKHR,
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub concurrent_families: Vec<u32>,
    pub old_swapchain: vk::SwapchainKHR,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedPipeline {
    pub extent: vk::Extent2D,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub polygon_mode: vk::PolygonMode,
    pub blend_enable: bool,
    pub attribute_count: usize,
    pub stride: u32,
}

#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    pub queue: QueueRole,
    pub command_buffer: vk::CommandBuffer,
    pub commands: Vec<MockCommand>,
    pub waited: Option<vk::Semaphore>,
    pub wait_stage: Option<vk::PipelineStageFlags>,
    pub signaled: Option<vk::Semaphore>,
}

pub struct MockState {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub memory_types: Vec<vk::MemoryType>,

    pub swapchains_created: usize,
    pub swapchains: Vec<RecordedSwapchain>,
    pub pipelines: Vec<RecordedPipeline>,
    pub submits: Vec<RecordedSubmit>,
    pub presents: usize,
    pub device_waits: usize,
    pub queue_waits: usize,
    pub acquires: usize,
    pub bad_destroys: usize,

    next_handle: u64,
    live: HashMap<&'static str, HashSet<u64>>,
    faults: HashMap<FaultPoint, VecDeque<vk::Result>>,
    memory: HashMap<u64, Box<[u8]>>,
    buffer_sizes: HashMap<u64, vk::DeviceSize>,
    bound: HashMap<u64, u64>,
    swapchain_images: HashMap<u64, Vec<vk::Image>>,
    command_pools: HashMap<u64, u64>,
    commands: HashMap<u64, Vec<MockCommand>>,
    descriptor_writes: HashMap<u64, Vec<DescriptorWrite>>,
    next_image_index: u32,
}

pub struct MockGpu {
    state: Mutex<MockState>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D { width: 800, height: 600 },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            memory_types: vec![
                vk::MemoryType {
                    property_flags: vk::MemoryPropertyFlags::DEVICE_LOCAL,
                    heap_index: 0,
                },
                vk::MemoryType {
                    property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
                        | vk::MemoryPropertyFlags::HOST_COHERENT,
                    heap_index: 1,
                },
            ],

            swapchains_created: 0,
            swapchains: Vec::new(),
            pipelines: Vec::new(),
            submits: Vec::new(),
            presents: 0,
            device_waits: 0,
            queue_waits: 0,
            acquires: 0,
            bad_destroys: 0,

            next_handle: 0x1000,
            live: HashMap::new(),
            faults: HashMap::new(),
            memory: HashMap::new(),
            buffer_sizes: HashMap::new(),
            bound: HashMap::new(),
            swapchain_images: HashMap::new(),
            command_pools: HashMap::new(),
            commands: HashMap::new(),
            descriptor_writes: HashMap::new(),
            next_image_index: 0,
        }
    }
}

impl MockState {
    fn create<H: Handle>(&mut self, kind: &'static str) -> H {
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.entry(kind).or_default().insert(raw);
        H::from_raw(raw)
    }

    fn destroy<H: Handle>(&mut self, kind: &'static str, handle: H) {
        let removed = self
            .live
            .get_mut(kind)
            .is_some_and(|set| set.remove(&handle.as_raw()));
        if !removed {
            self.bad_destroys += 1;
        }
    }

    /// Pops the next injected fault. A queued `SUCCESS` lets one call through.
    fn fault(&mut self, point: FaultPoint) -> Option<vk::Result> {
        self.faults
            .get_mut(&point)
            .and_then(VecDeque::pop_front)
            .filter(|result| *result != vk::Result::SUCCESS)
    }

    fn record(&mut self, cmd: vk::CommandBuffer, command: MockCommand) {
        self.commands.entry(cmd.as_raw()).or_default().push(command);
    }

    fn bytes_of(&self, resource: u64) -> Option<&[u8]> {
        let memory = self.bound.get(&resource)?;
        self.memory.get(memory).map(|bytes| &bytes[..])
    }

    fn replay(&mut self, cmd: vk::CommandBuffer) {
        let commands = self.commands.get(&cmd.as_raw()).cloned().unwrap_or_default();
        for command in commands {
            let (src, dst, len) = match command {
                MockCommand::CopyBuffer { src, dst, size } => {
                    (src.as_raw(), dst.as_raw(), size as usize)
                }
                MockCommand::CopyBufferToImage { src, dst, extent } => {
                    (src.as_raw(), dst.as_raw(), (extent.width * extent.height * 4) as usize)
                }
                _ => continue,
            };
            let Some(data) = self.bytes_of(src).map(|bytes| bytes[..len].to_vec()) else {
                continue;
            };
            if let Some(memory) = self.bound.get(&dst).copied() {
                if let Some(target) = self.memory.get_mut(&memory) {
                    target[..len].copy_from_slice(&data);
                }
            }
        }
    }
}

impl MockGpu {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// The mock and the same object as a shared backend.
    pub fn shared() -> (Arc<Self>, SharedGpu) {
        let mock = Arc::new(Self::new());
        let gpu: SharedGpu = mock.clone();
        (mock, gpu)
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inject(&self, point: FaultPoint, results: &[vk::Result]) {
        self.state()
            .faults
            .entry(point)
            .or_default()
            .extend(results.iter().copied());
    }

    pub fn live(&self, kind: &str) -> usize {
        self.state().live.get(kind).map_or(0, HashSet::len)
    }

    pub fn total_live(&self) -> usize {
        self.state().live.values().map(HashSet::len).sum()
    }

    pub fn commands(&self, cmd: vk::CommandBuffer) -> Vec<MockCommand> {
        self.state().commands.get(&cmd.as_raw()).cloned().unwrap_or_default()
    }

    pub fn descriptor_writes(&self, set: vk::DescriptorSet) -> Vec<DescriptorWrite> {
        self.state()
            .descriptor_writes
            .get(&set.as_raw())
            .cloned()
            .unwrap_or_default()
    }

    pub fn buffer_contents(&self, buffer: vk::Buffer) -> Vec<u8> {
        let state = self.state();
        let size = state.buffer_sizes.get(&buffer.as_raw()).copied().unwrap_or(0) as usize;
        state
            .bytes_of(buffer.as_raw())
            .map(|bytes| bytes[..size].to_vec())
            .unwrap_or_default()
    }

    pub fn image_contents(&self, image: vk::Image) -> Vec<u8> {
        self.state()
            .bytes_of(image.as_raw())
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }
}

/// A minimal valid SPIR-V header for shader loading tests.
pub fn test_spirv() -> Vec<u8> {
    let words = [0x0723_0203u32, 0x0001_0000, 0, 1, 0];
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

impl GpuBackend for MockGpu {
    fn device_wait_idle(&self) -> VkResult<()> {
        self.state().device_waits += 1;
        Ok(())
    }

    fn queue_wait_idle(&self, _queue: QueueRole) -> VkResult<()> {
        self.state().queue_waits += 1;
        Ok(())
    }

    fn memory_types(&self) -> Vec<vk::MemoryType> {
        self.state().memory_types.clone()
    }

    fn surface_capabilities(&self) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.state().capabilities)
    }

    fn surface_formats(&self) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.state().formats.clone())
    }

    fn surface_present_modes(&self) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.state().present_modes.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let mut state = self.state();
        let handle: vk::SwapchainKHR = state.create("swapchain");
        let images = (0..desc.min_image_count)
            .map(|_| {
                state.next_handle += 1;
                vk::Image::from_raw(state.next_handle)
            })
            .collect();
        state.swapchain_images.insert(handle.as_raw(), images);
        state.swapchains_created += 1;
        state.swapchains.push(RecordedSwapchain {
            handle,
            min_image_count: desc.min_image_count,
            format: desc.format,
            extent: desc.extent,
            present_mode: desc.present_mode,
            concurrent_families: desc.concurrent_families.to_vec(),
            old_swapchain: desc.old_swapchain,
        });
        Ok(handle)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state();
        state.swapchain_images.remove(&swapchain.as_raw());
        state.destroy("swapchain", swapchain);
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.state()
            .swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        _signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut state = self.state();
        state.acquires += 1;
        let suboptimal = match state.fault(FaultPoint::Acquire) {
            Some(vk::Result::SUBOPTIMAL_KHR) => true,
            Some(err) => return Err(err),
            None => false,
        };
        let count = state
            .swapchain_images
            .get(&swapchain.as_raw())
            .map_or(0, Vec::len) as u32;
        if count == 0 {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        let index = state.next_image_index % count;
        state.next_image_index = state.next_image_index.wrapping_add(1);
        Ok((index, suboptimal))
    }

    fn queue_present(
        &self,
        _swapchain: vk::SwapchainKHR,
        _image_index: u32,
        _wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut state = self.state();
        let suboptimal = match state.fault(FaultPoint::Present) {
            Some(vk::Result::SUBOPTIMAL_KHR) => true,
            Some(err) => return Err(err),
            None => false,
        };
        state.presents += 1;
        Ok(suboptimal)
    }

    fn create_image(&self, desc: &ImageDesc) -> VkResult<vk::Image> {
        let mut state = self.state();
        let image: vk::Image = state.create("image");
        let size = u64::from(desc.extent.width) * u64::from(desc.extent.height) * 4;
        state.buffer_sizes.insert(image.as_raw(), size);
        Ok(image)
    }

    fn destroy_image(&self, image: vk::Image) {
        let mut state = self.state();
        state.bound.remove(&image.as_raw());
        state.destroy("image", image);
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        let size = self.state().buffer_sizes.get(&image.as_raw()).copied().unwrap_or(0);
        vk::MemoryRequirements {
            size,
            alignment: 16,
            memory_type_bits: 0b11,
        }
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        self.state().bound.insert(image.as_raw(), memory.as_raw());
        Ok(())
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
        Ok(self.state().create("image_view"))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.state().destroy("image_view", view);
    }

    fn create_sampler(&self) -> VkResult<vk::Sampler> {
        Ok(self.state().create("sampler"))
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.state().destroy("sampler", sampler);
    }

    fn create_render_pass(&self, _color_format: vk::Format) -> VkResult<vk::RenderPass> {
        Ok(self.state().create("render_pass"))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.state().destroy("render_pass", render_pass);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        Ok(self.state().create("framebuffer"))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.state().destroy("framebuffer", framebuffer);
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let mut state = self.state();
        if let Some(err) = state.fault(FaultPoint::ShaderModule) {
            return Err(err);
        }
        if code.first() != Some(&0x0723_0203) {
            return Err(vk::Result::ERROR_INVALID_SHADER_NV);
        }
        Ok(state.create("shader_module"))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.state().destroy("shader_module", module);
    }

    fn create_descriptor_set_layout(
        &self,
        _bindings: &[DescriptorBinding],
    ) -> VkResult<vk::DescriptorSetLayout> {
        Ok(self.state().create("descriptor_set_layout"))
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.state().destroy("descriptor_set_layout", layout);
    }

    fn create_pipeline_layout(
        &self,
        _set_layouts: &[vk::DescriptorSetLayout],
    ) -> VkResult<vk::PipelineLayout> {
        let mut state = self.state();
        if let Some(err) = state.fault(FaultPoint::PipelineLayout) {
            return Err(err);
        }
        Ok(state.create("pipeline_layout"))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state().destroy("pipeline_layout", layout);
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> VkResult<vk::Pipeline> {
        let mut state = self.state();
        if let Some(err) = state.fault(FaultPoint::Pipeline) {
            return Err(err);
        }
        state.pipelines.push(RecordedPipeline {
            extent: desc.extent,
            cull_mode: desc.cull_mode,
            front_face: desc.front_face,
            polygon_mode: desc.polygon_mode,
            blend_enable: desc.color_blend.blend_enable == vk::TRUE,
            attribute_count: desc.vertex_attributes.len(),
            stride: desc.vertex_bindings.first().map_or(0, |binding| binding.stride),
        });
        Ok(state.create("pipeline"))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state().destroy("pipeline", pipeline);
    }

    fn allocate_descriptor_set(
        &self,
        _layout: vk::DescriptorSetLayout,
        _bindings: &[DescriptorBinding],
    ) -> VkResult<vk::DescriptorSet> {
        Ok(self.state().create("descriptor_set"))
    }

    fn free_descriptor_set(&self, set: vk::DescriptorSet) {
        let mut state = self.state();
        state.descriptor_writes.remove(&set.as_raw());
        state.destroy("descriptor_set", set);
    }

    fn write_descriptor_set(&self, set: vk::DescriptorSet, writes: &[DescriptorWrite]) {
        self.state()
            .descriptor_writes
            .entry(set.as_raw())
            .or_default()
            .extend_from_slice(writes);
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        _usage: vk::BufferUsageFlags,
    ) -> VkResult<vk::Buffer> {
        let mut state = self.state();
        if let Some(err) = state.fault(FaultPoint::Buffer) {
            return Err(err);
        }
        let buffer: vk::Buffer = state.create("buffer");
        state.buffer_sizes.insert(buffer.as_raw(), size);
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state();
        state.bound.remove(&buffer.as_raw());
        state.destroy("buffer", buffer);
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let size = self.state().buffer_sizes.get(&buffer.as_raw()).copied().unwrap_or(0);
        vk::MemoryRequirements {
            size,
            alignment: 4,
            memory_type_bits: 0b11,
        }
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> VkResult<vk::DeviceMemory> {
        let mut state = self.state();
        if let Some(err) = state.fault(FaultPoint::Allocate) {
            return Err(err);
        }
        if memory_type_index as usize >= state.memory_types.len() {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let memory: vk::DeviceMemory = state.create("memory");
        state
            .memory
            .insert(memory.as_raw(), vec![0u8; size as usize].into_boxed_slice());
        Ok(memory)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state();
        state.memory.remove(&memory.as_raw());
        state.destroy("memory", memory);
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        self.state().bound.insert(buffer.as_raw(), memory.as_raw());
        Ok(())
    }

    fn map_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<NonNull<u8>> {
        let mut state = self.state();
        let bytes = state
            .memory
            .get_mut(&memory.as_raw())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        if size as usize > bytes.len() {
            return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        NonNull::new(bytes.as_mut_ptr()).ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)
    }

    fn unmap_memory(&self, _memory: vk::DeviceMemory) {}

    fn create_command_pool(
        &self,
        _queue_family_index: u32,
        _flags: vk::CommandPoolCreateFlags,
    ) -> VkResult<vk::CommandPool> {
        Ok(self.state().create("command_pool"))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut state = self.state();
        let owned: Vec<u64> = state
            .command_pools
            .iter()
            .filter(|(_, owner)| **owner == pool.as_raw())
            .map(|(cmd, _)| *cmd)
            .collect();
        for cmd in owned {
            state.command_pools.remove(&cmd);
            state.destroy("command_buffer", vk::CommandBuffer::from_raw(cmd));
        }
        state.destroy("command_pool", pool);
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()> {
        let mut state = self.state();
        let owned: Vec<u64> = state
            .command_pools
            .iter()
            .filter(|(_, owner)| **owner == pool.as_raw())
            .map(|(cmd, _)| *cmd)
            .collect();
        for cmd in owned {
            state.commands.remove(&cmd);
        }
        Ok(())
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut state = self.state();
        Ok((0..count)
            .map(|_| {
                let cmd: vk::CommandBuffer = state.create("command_buffer");
                state.command_pools.insert(cmd.as_raw(), pool.as_raw());
                cmd
            })
            .collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut state = self.state();
        for cmd in buffers {
            state.command_pools.remove(&cmd.as_raw());
            state.commands.remove(&cmd.as_raw());
            state.destroy("command_buffer", *cmd);
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        _flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        self.state().commands.insert(cmd.as_raw(), Vec::new());
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: vk::CommandBuffer) -> VkResult<()> {
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        self.state().record(cmd, MockCommand::BeginRenderPass {
            render_pass,
            framebuffer,
            extent,
            clear_color,
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.state().record(cmd, MockCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.state().record(cmd, MockCommand::BindPipeline(pipeline));
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer, offset: vk::DeviceSize) {
        self.state().record(cmd, MockCommand::BindVertexBuffer(buffer, offset));
    }

    fn cmd_bind_index_buffer(
        &self,
        cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        self.state().record(cmd, MockCommand::BindIndexBuffer(buffer, offset, index_type));
    }

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.state().record(cmd, MockCommand::BindDescriptorSet(layout, set));
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32, instance_count: u32) {
        self.state().record(cmd, MockCommand::DrawIndexed {
            index_count,
            instance_count,
        });
    }

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        self.state().record(cmd, MockCommand::CopyBuffer { src, dst, size });
    }

    fn cmd_copy_buffer_to_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent2D,
    ) {
        self.state().record(cmd, MockCommand::CopyBufferToImage { src, dst, extent });
    }

    fn cmd_transition_image_layout(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) {
        self.state().record(cmd, MockCommand::TransitionImage {
            image,
            old_layout,
            new_layout,
        });
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        Ok(self.state().create("semaphore"))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state().destroy("semaphore", semaphore);
    }

    fn queue_submit(&self, queue: QueueRole, submit: &SubmitDesc) -> VkResult<()> {
        let mut state = self.state();
        for cmd in submit.command_buffers {
            state.replay(*cmd);
            let commands = state.commands.get(&cmd.as_raw()).cloned().unwrap_or_default();
            state.submits.push(RecordedSubmit {
                queue,
                command_buffer: *cmd,
                commands,
                waited: submit.wait_semaphores.first().copied(),
                wait_stage: submit.wait_stages.first().copied(),
                signaled: submit.signal_semaphores.first().copied(),
            });
        }
        Ok(())
    }
}
