use ash::vk;
use crate::renderer::backend::SharedGpu;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::error::{RenderResult, VkResultExt};
use crate::renderer::internals::swapchain::{Swapchain, SwapchainSettings};

/// Why the presentation target no longer matches the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    OutOfDate,
    Suboptimal,
    Resized,
    Minimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainState {
    Uninitialized,
    Ready,
    Stale(StaleReason),
    Destroyed,
}

/// Presentation target of the renderer: the swapchain for the window surface and the
/// bookkeeping needed to rebuild it when the surface changes
pub struct RenderTarget {
    swapchain: Option<Swapchain>,
    state: SwapchainState,
    vsync: bool,
    concurrent_families: Vec<u32>,
    gpu: SharedGpu,
}

impl RenderTarget {
    pub fn new(
        dev: &RenderDeviceContext,
        window_extent: vk::Extent2D,
        vsync: bool,
    ) -> RenderResult<Self> {
        let mut target = Self {
            swapchain: None,
            state: SwapchainState::Uninitialized,
            vsync,
            concurrent_families: dev.queue_families.concurrent_families(),
            gpu: dev.gpu.clone(),
        };
        target.recreate(window_extent)?;

        Ok(target)
    }

    pub fn state(&self) -> SwapchainState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SwapchainState::Ready
    }

    /// The current swapchain, only while the target is ready
    pub fn swapchain(&self) -> Option<&Swapchain> {
        match self.state {
            SwapchainState::Ready => self.swapchain.as_ref(),
            _ => None,
        }
    }

    pub fn mark_stale(&mut self, reason: StaleReason) {
        if matches!(self.state, SwapchainState::Ready | SwapchainState::Stale(_)) {
            log::debug!("Swapchain marked stale: {:?}", reason);
            self.state = SwapchainState::Stale(reason);
        }
    }

    /// Builds a swapchain for the current surface, handing the previous one over as
    /// `old_swapchain` and destroying it afterwards. The caller must already have waited
    /// for the device to go idle and dropped everything that referenced the old images.
    ///
    /// Returns `false` and stays stale when the window has no area to present to.
    pub fn recreate(&mut self, window_extent: vk::Extent2D) -> RenderResult<bool> {
        let gpu = &self.gpu;
        let capabilities = gpu.surface_capabilities().op("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        let formats = gpu.surface_formats().op("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        let present_modes = gpu.surface_present_modes().op("vkGetPhysicalDeviceSurfacePresentModesKHR")?;

        let settings = SwapchainSettings::choose(
            &capabilities,
            &formats,
            &present_modes,
            window_extent,
            self.vsync,
        );

        let minimized = window_extent.width == 0
            || window_extent.height == 0
            || settings.extent.width == 0
            || settings.extent.height == 0;
        if minimized {
            self.state = SwapchainState::Stale(StaleReason::Minimized);
            return Ok(false);
        }

        let mut old = self.swapchain.take();
        if let Some(old) = old.as_mut() {
            old.image_views.clear();
        }
        let old_handle = old
            .as_ref()
            .map_or(vk::SwapchainKHR::null(), Swapchain::handle);

        let created = Swapchain::new(gpu, &settings, &self.concurrent_families, old_handle);
        drop(old);

        match created {
            Ok(swapchain) => {
                log::info!(
                    "Swapchain ready: {}x{}, {:?}, {:?}",
                    swapchain.extent.width,
                    swapchain.extent.height,
                    swapchain.format.format,
                    swapchain.present_mode,
                );
                self.swapchain = Some(swapchain);
                self.state = SwapchainState::Ready;
                Ok(true)
            }
            Err(err) => {
                self.state = SwapchainState::Stale(StaleReason::OutOfDate);
                Err(err)
            }
        }
    }

    pub fn destroy(&mut self) {
        self.swapchain = None;
        self.state = SwapchainState::Destroyed;
    }
}
