use std::ffi::{c_char, CStr};
use std::sync::Arc;
use ash::vk;
use gpu_descriptor::{CreatePoolError, DescriptorDevice, DescriptorPoolCreateFlags, DescriptorTotalCount, DeviceAllocationError};
use smallvec::SmallVec;
use crate::renderer::contexts::device_ctx::instance::RenderInstance;
use crate::renderer::contexts::device_ctx::queue::{find_queue_families, QueueFamily, QueueFamilyIndices};
use crate::renderer::error::{RenderError, RenderResult, VkResultExt};

/// What a physical device offers for the current surface, gathered up front so that
/// selection is a plain function over data.
#[derive(Debug, Clone, Default)]
pub struct DeviceCandidate {
    pub name: String,
    pub queue_families: Vec<QueueFamily>,
    pub extensions: Vec<String>,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,

        #[cfg(target_os = "macos")]
        ash::khr::portability_subset::NAME,
    ]
}

impl DeviceCandidate {
    fn missing_extensions(&self) -> Vec<&'static CStr> {
        required_device_extensions()
            .into_iter()
            .filter(|required| {
                !self
                    .extensions
                    .iter()
                    .any(|supported| required.to_str() == Ok(supported.as_str()))
            })
            .collect()
    }
}

/// Picks the first candidate in enumeration order that has graphics and present queues,
/// every required extension, and at least one surface format and present mode.
pub fn select_device(candidates: &[DeviceCandidate]) -> RenderResult<(usize, QueueFamilyIndices)> {
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(indices) = find_queue_families(&candidate.queue_families) else {
            log::debug!("Skipping {}: no graphics and present queue families", candidate.name);
            continue;
        };

        let missing = candidate.missing_extensions();
        if !missing.is_empty() {
            log::debug!("Skipping {}: missing device extensions {:?}", candidate.name, missing);
            continue;
        }

        if candidate.surface_formats.is_empty() || candidate.present_modes.is_empty() {
            log::debug!("Skipping {}: inadequate swapchain support", candidate.name);
            continue;
        }

        return Ok((index, indices));
    }

    Err(RenderError::NoSuitableDevice)
}

/// Smallest memory type index allowed by `type_bits` whose flags contain `required`.
pub fn find_memory_type(
    memory_types: &[vk::MemoryType],
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> RenderResult<u32> {
    memory_types
        .iter()
        .enumerate()
        .take(u32::BITS as usize)
        .find(|(i, ty)| type_bits & (1 << i) != 0 && ty.property_flags.contains(required))
        .map(|(i, _)| i as u32)
        .ok_or_else(|| RenderError::no_suitable_memory_type(type_bits, required))
}

/// Describes every physical device against the instance's surface.
pub fn enumerate_candidates(
    ins: &RenderInstance,
) -> RenderResult<Vec<(vk::PhysicalDevice, DeviceCandidate)>> {
    let instance = &ins.instance;
    let physical_devices = unsafe {
        instance
            .enumerate_physical_devices()
            .op("vkEnumeratePhysicalDevices")?
    };

    physical_devices
        .into_iter()
        .map(|device| -> RenderResult<(vk::PhysicalDevice, DeviceCandidate)> {
            let candidate = unsafe {
                let properties = instance.get_physical_device_properties(device);
                let name = properties
                    .device_name_as_c_str()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let queue_families = instance
                    .get_physical_device_queue_family_properties(device)
                    .into_iter()
                    .enumerate()
                    .map(|(i, props)| {
                        let supports_present = ins
                            .surface_loader
                            .get_physical_device_surface_support(device, i as u32, ins.surface)
                            .unwrap_or(false);
                        QueueFamily::new(i as u32, props, supports_present)
                    })
                    .collect();

                let extensions = instance
                    .enumerate_device_extension_properties(device)
                    .op("vkEnumerateDeviceExtensionProperties")?
                    .iter()
                    .filter_map(|ext| ext.extension_name_as_c_str().ok())
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .collect();

                // A query failure only disqualifies this device
                let surface_formats = ins
                    .surface_loader
                    .get_physical_device_surface_formats(device, ins.surface)
                    .unwrap_or_default();
                let present_modes = ins
                    .surface_loader
                    .get_physical_device_surface_present_modes(device, ins.surface)
                    .unwrap_or_default();

                DeviceCandidate {
                    name,
                    queue_families,
                    extensions,
                    surface_formats,
                    present_modes,
                }
            };
            Ok((device, candidate))
        })
        .collect()
}

/// Creates the logical device with one queue per distinct family.
pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    indices: QueueFamilyIndices,
) -> RenderResult<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos = indices
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect::<Vec<_>>();

    let enabled_extension_names = required_device_extensions()
        .iter()
        .map(|ext| ext.as_ptr())
        .collect::<Vec<*const c_char>>();
    let enabled_features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&enabled_extension_names)
        .enabled_features(&enabled_features);

    unsafe {
        instance
            .create_device(physical_device, &device_create_info, None)
            .op("vkCreateDevice")
    }
}

/// Adapts `ash::Device` to the pool management calls `gpu-descriptor` makes.
pub struct DescriptorAshDevice(pub Arc<ash::Device>);

impl From<Arc<ash::Device>> for DescriptorAshDevice {
    fn from(device: Arc<ash::Device>) -> Self {
        Self(device)
    }
}

impl DescriptorDevice<vk::DescriptorSetLayout, vk::DescriptorPool, vk::DescriptorSet>
for DescriptorAshDevice
{
    unsafe fn create_descriptor_pool(
        &self,
        descriptor_count: &DescriptorTotalCount,
        max_sets: u32,
        flags: DescriptorPoolCreateFlags,
    ) -> Result<vk::DescriptorPool, CreatePoolError> {
        let counts = [
            (vk::DescriptorType::SAMPLER, descriptor_count.sampler),
            (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, descriptor_count.combined_image_sampler),
            (vk::DescriptorType::SAMPLED_IMAGE, descriptor_count.sampled_image),
            (vk::DescriptorType::STORAGE_IMAGE, descriptor_count.storage_image),
            (vk::DescriptorType::UNIFORM_TEXEL_BUFFER, descriptor_count.uniform_texel_buffer),
            (vk::DescriptorType::STORAGE_TEXEL_BUFFER, descriptor_count.storage_texel_buffer),
            (vk::DescriptorType::UNIFORM_BUFFER, descriptor_count.uniform_buffer),
            (vk::DescriptorType::STORAGE_BUFFER, descriptor_count.storage_buffer),
            (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, descriptor_count.uniform_buffer_dynamic),
            (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, descriptor_count.storage_buffer_dynamic),
            (vk::DescriptorType::INPUT_ATTACHMENT, descriptor_count.input_attachment),
        ];
        let pool_sizes: SmallVec<[vk::DescriptorPoolSize; 11]> = counts
            .iter()
            .filter(|(_, count)| *count != 0)
            .map(|(ty, count)| vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: *count,
            })
            .collect();

        let mut ash_flags = vk::DescriptorPoolCreateFlags::empty();
        if flags.contains(DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET) {
            ash_flags |= vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET;
        }

        let result = unsafe {
            self.0.create_descriptor_pool(
                &vk::DescriptorPoolCreateInfo::default()
                    .max_sets(max_sets)
                    .pool_sizes(&pool_sizes)
                    .flags(ash_flags),
                None,
            )
        };

        match result {
            Ok(pool) => Ok(pool),
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY) => Err(CreatePoolError::OutOfDeviceMemory),
            Err(vk::Result::ERROR_FRAGMENTATION) => Err(CreatePoolError::Fragmentation),
            Err(err) => {
                log::error!("vkCreateDescriptorPool failed with {}", err);
                Err(CreatePoolError::OutOfHostMemory)
            }
        }
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe {
            self.0.destroy_descriptor_pool(pool, None)
        }
    }

    unsafe fn alloc_descriptor_sets<'a>(
        &self,
        pool: &mut vk::DescriptorPool,
        layouts: impl ExactSizeIterator<Item = &'a vk::DescriptorSetLayout>,
        sets: &mut impl Extend<vk::DescriptorSet>,
    ) -> Result<(), DeviceAllocationError> {
        let set_layouts: SmallVec<[_; 16]> = layouts.copied().collect();

        let result = unsafe {
            self.0.allocate_descriptor_sets(
                &vk::DescriptorSetAllocateInfo::default()
                    .set_layouts(&set_layouts)
                    .descriptor_pool(*pool),
            )
        };

        match result {
            Ok(allocated) => {
                sets.extend(allocated);
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY) => Err(DeviceAllocationError::OutOfDeviceMemory),
            Err(vk::Result::ERROR_FRAGMENTED_POOL) => Err(DeviceAllocationError::FragmentedPool),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) => Err(DeviceAllocationError::OutOfPoolMemory),
            Err(err) => {
                log::error!("vkAllocateDescriptorSets failed with {}", err);
                Err(DeviceAllocationError::OutOfHostMemory)
            }
        }
    }

    unsafe fn dealloc_descriptor_sets(
        &self,
        pool: &mut vk::DescriptorPool,
        sets: impl Iterator<Item = vk::DescriptorSet>,
    ) {
        let sets: SmallVec<[_; 16]> = sets.collect();
        if let Err(err) = unsafe { self.0.free_descriptor_sets(*pool, &sets) } {
            log::error!("vkFreeDescriptorSets failed with {}", err);
        }
    }
}
