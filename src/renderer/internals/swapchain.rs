use ash::vk;
use crate::renderer::backend::{Owned, SharedGpu, SwapchainDesc};
use crate::renderer::error::{RenderResult, VkResultExt};

/// Preferred format when the surface leaves the choice to us
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Everything decided from the surface before the swapchain itself is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub min_image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainSettings {
    pub fn choose(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: &[vk::SurfaceFormatKHR],
        present_modes: &[vk::PresentModeKHR],
        window_extent: vk::Extent2D,
        vsync: bool,
    ) -> Self {
        let pre_transform = if capabilities
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            capabilities.current_transform
        };

        Self {
            format: choose_surface_format(formats),
            present_mode: choose_present_mode(present_modes, vsync),
            extent: choose_swap_extent(capabilities, window_extent),
            min_image_count: choose_image_count(capabilities),
            pre_transform,
        }
    }
}

/// A lone `UNDEFINED` entry means the surface has no preference.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    match formats {
        [only] if only.format == vk::Format::UNDEFINED => PREFERRED_SURFACE_FORMAT,
        _ => formats
            .iter()
            .find(|format| **format == PREFERRED_SURFACE_FORMAT)
            .or_else(|| formats.first())
            .copied()
            .unwrap_or(PREFERRED_SURFACE_FORMAT),
    }
}

/// MAILBOX, then IMMEDIATE, then FIFO which every implementation supports.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }

    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| present_modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_swap_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    // Not `clamp`, which panics if a driver reports min above max
    let (min, max) = (capabilities.min_image_extent, capabilities.max_image_extent);
    vk::Extent2D {
        width: window_extent.width.max(min.width).min(max.width),
        height: window_extent.height.max(min.height).min(max.height),
    }
}

/// One more than the minimum so we rarely wait on the driver, capped when a maximum exists.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let min = capabilities.min_image_count;
    let max = capabilities.max_image_count;
    if max > 0 && min + 1 > max {
        max
    } else {
        min + 1
    }
}

pub struct Swapchain {
    // Views go before the chain that owns their images
    pub image_views: Vec<Owned<vk::ImageView>>,
    pub images: Vec<vk::Image>,
    swapchain: Owned<vk::SwapchainKHR>,

    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        gpu: &SharedGpu,
        settings: &SwapchainSettings,
        concurrent_families: &[u32],
        old_swapchain: vk::SwapchainKHR,
    ) -> RenderResult<Self> {
        let swapchain = Owned::new(
            gpu.create_swapchain(&SwapchainDesc {
                min_image_count: settings.min_image_count,
                format: settings.format,
                extent: settings.extent,
                present_mode: settings.present_mode,
                pre_transform: settings.pre_transform,
                concurrent_families,
                old_swapchain,
            })
            .op("vkCreateSwapchainKHR")?,
            gpu,
        );

        let images = gpu
            .swapchain_images(swapchain.raw())
            .op("vkGetSwapchainImagesKHR")?;
        let image_views = images
            .iter()
            .map(|image| {
                gpu.create_image_view(*image, settings.format.format)
                    .op("vkCreateImageView")
                    .map(|view| Owned::new(view, gpu))
            })
            .collect::<RenderResult<Vec<_>>>()?;

        log::debug!(
            "Created swapchain {:?} with {} images at {}x{} ({:?})",
            swapchain.raw(),
            images.len(),
            settings.extent.width,
            settings.extent.height,
            settings.present_mode,
        );

        Ok(Self {
            image_views,
            images,
            swapchain,
            format: settings.format,
            present_mode: settings.present_mode,
            extent: settings.extent,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain.raw()
    }

    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }
}
