pub mod config;
pub mod error;

mod backend;
mod contexts;
mod internals;
mod resources;
mod shader_data;

pub use contexts::device_ctx::target::StaleReason;
pub use contexts::frame_ctx::{FrameStats, FrameStatus};

use ash::vk;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::window::Window;
use crate::renderer::backend::SharedGpu;
use crate::renderer::backend::vulkan::VulkanBackend;
use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use crate::renderer::contexts::device_ctx::target::RenderTarget;
use crate::renderer::contexts::frame_ctx::{Acquired, RenderFrameContext};
use crate::renderer::contexts::pipeline_ctx::RenderPipelineContext;
use crate::renderer::contexts::resource_ctx::{RenderResourceContext, SceneAssets};
use crate::renderer::error::{RenderResult, VkResultExt};
use crate::renderer::shader_data::UniformBufferObject;

pub struct Renderer {
    // Dropped top to bottom, the reverse of creation
    frm: RenderFrameContext,
    pip: Option<RenderPipelineContext>,
    target: RenderTarget,
    res: RenderResourceContext,
    dev: RenderDeviceContext,

    config: RenderConfig,
    resize_requested: bool,
    start: Instant,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        config: RenderConfig,
    ) -> RenderResult<Self> {
        let assets = SceneAssets::load(&config)?;
        let (backend, queue_families) = VulkanBackend::new(window.clone(), &config)?;
        let gpu: SharedGpu = Arc::new(backend);

        Self::with_device(gpu, queue_families, assets, config, window_extent(&window))
    }

    fn with_device(
        gpu: SharedGpu,
        queue_families: QueueFamilyIndices,
        assets: SceneAssets,
        config: RenderConfig,
        window_extent: vk::Extent2D,
    ) -> RenderResult<Self> {
        let dev = RenderDeviceContext::new(gpu, queue_families)?;
        let res = RenderResourceContext::new(&dev, assets)?;
        let target = RenderTarget::new(&dev, window_extent, config.vsync)?;
        let frm = RenderFrameContext::new(&dev)?;

        let mut renderer = Self {
            frm,
            pip: None,
            target,
            res,
            dev,
            config,
            resize_requested: false,
            start: Instant::now(),
        };
        renderer.build_extent_dependents()?;

        Ok(renderer)
    }

    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    pub fn stats(&self) -> FrameStats {
        self.frm.stats
    }

    pub fn draw(&mut self, window_extent: vk::Extent2D) -> RenderResult<FrameStatus> {
        self.draw_at(window_extent, self.start.elapsed())
    }

    /// Runs one frame with the quad animated to `elapsed`. A stale swapchain is rebuilt
    /// either before acquiring or after presenting, and reported as `Retry`.
    pub fn draw_at(
        &mut self,
        window_extent: vk::Extent2D,
        elapsed: Duration,
    ) -> RenderResult<FrameStatus> {
        if self.resize_requested || !self.target.is_ready() || self.pip.is_none() {
            if !self.recreate_swapchain(window_extent)? {
                return Ok(self.retry(StaleReason::Minimized));
            }
        }

        let (Some(swapchain), Some(pip)) = (self.target.swapchain(), self.pip.as_ref()) else {
            return Ok(self.retry(StaleReason::OutOfDate));
        };

        self.res.update_uniforms(&UniformBufferObject::animated(elapsed.as_secs_f32(), pip.extent))?;

        let (image_index, acquired_suboptimal) = match self.frm.acquire(swapchain)? {
            Acquired::Image { index, suboptimal } => (index, suboptimal),
            Acquired::OutOfDate => return self.recover(StaleReason::OutOfDate, window_extent),
        };

        self.frm.submit(image_index)?;
        let stale = self
            .frm
            .present(swapchain, image_index)?
            .or(acquired_suboptimal.then_some(StaleReason::Suboptimal));

        match stale {
            Some(reason) => self.recover(reason, window_extent),
            None => Ok(FrameStatus::Presented),
        }
    }

    fn recover(
        &mut self,
        reason: StaleReason,
        window_extent: vk::Extent2D,
    ) -> RenderResult<FrameStatus> {
        self.target.mark_stale(reason);
        self.recreate_swapchain(window_extent)?;
        Ok(self.retry(reason))
    }

    fn retry(&mut self, reason: StaleReason) -> FrameStatus {
        self.frm.stats.retried += 1;
        FrameStatus::Retry(reason)
    }

    /// Waits for the device, drops everything sized to the old swapchain and rebuilds it.
    /// Returns `false` while the window has no area.
    pub fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> RenderResult<bool> {
        self.dev.gpu.device_wait_idle().op("vkDeviceWaitIdle")?;

        self.frm.recorder.free();
        self.pip = None;
        self.resize_requested = false;

        if !self.target.recreate(window_extent)? {
            log::debug!("Window has no area, postponing swapchain recreation");
            return Ok(false);
        }
        self.build_extent_dependents()?;
        self.frm.stats.recreations += 1;

        Ok(true)
    }

    fn build_extent_dependents(&mut self) -> RenderResult<()> {
        let Some(swapchain) = self.target.swapchain() else {
            return Ok(());
        };

        let pip = RenderPipelineContext::new(&self.dev, swapchain, &self.res, self.config.blend)?;
        self.frm.recorder.record(&pip, &self.res, self.config.clear_color)?;
        self.pip = Some(pip);

        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(err) = self.dev.gpu.device_wait_idle() {
            log::error!("Failed to wait for the device before teardown: {}", err);
        }
        self.target.destroy();
    }
}

pub fn window_extent(window: &Window) -> vk::Extent2D {
    let size = window.inner_size();
    vk::Extent2D {
        width: size.width,
        height: size.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::mock::{FaultPoint, MockCommand, MockGpu};
    use crate::renderer::contexts::resource_ctx::test_assets;
    use crate::renderer::error::RenderError;

    const WINDOW: vk::Extent2D = vk::Extent2D { width: 800, height: 600 };
    const FRAME_TIME: Duration = Duration::from_millis(16);

    fn renderer() -> (Arc<MockGpu>, Renderer) {
        let (mock, gpu) = MockGpu::shared();
        let renderer = Renderer::with_device(
            gpu,
            QueueFamilyIndices { graphics: 0, present: 0 },
            test_assets(),
            RenderConfig::default(),
            WINDOW,
        )
        .unwrap();
        (mock, renderer)
    }

    fn draw_calls(commands: &[MockCommand]) -> Vec<u32> {
        commands
            .iter()
            .filter_map(|command| match command {
                MockCommand::DrawIndexed { index_count, .. } => Some(*index_count),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_frame_draws_the_quad() {
        let (mock, mut renderer) = renderer();
        let uploads = mock.state().submits.len();

        assert_eq!(renderer.draw_at(WINDOW, FRAME_TIME).unwrap(), FrameStatus::Presented);

        let state = mock.state();
        assert_eq!(state.pipelines.len(), 1);
        assert_eq!(state.submits.len(), uploads + 1);
        assert_eq!(draw_calls(&state.submits[uploads].commands), vec![6]);
        assert_eq!(state.presents, 1);
    }

    #[test]
    fn uniforms_follow_elapsed_time() {
        let (mock, mut renderer) = renderer();
        let ubo_buffer = renderer.res.uniform_buffer.handle();

        renderer.draw_at(WINDOW, Duration::from_secs(1)).unwrap();
        let expected = UniformBufferObject::animated(1.0, WINDOW);
        assert_eq!(mock.buffer_contents(ubo_buffer), bytemuck::bytes_of(&expected).to_vec());
    }

    #[test]
    fn out_of_date_acquire_recreates_once_without_submitting() {
        let (mock, mut renderer) = renderer();
        mock.inject(FaultPoint::Acquire, &[vk::Result::ERROR_OUT_OF_DATE_KHR]);
        let (uploads, created) = {
            let state = mock.state();
            (state.submits.len(), state.swapchains_created)
        };

        assert_eq!(
            renderer.draw_at(WINDOW, FRAME_TIME).unwrap(),
            FrameStatus::Retry(StaleReason::OutOfDate)
        );
        {
            let state = mock.state();
            assert_eq!(state.swapchains_created, created + 1);
            assert_eq!(state.submits.len(), uploads);
            assert_eq!(state.presents, 0);
        }
        assert_eq!(renderer.stats().recreations, 1);

        // The rebuilt chain draws normally
        assert_eq!(renderer.draw_at(WINDOW, FRAME_TIME).unwrap(), FrameStatus::Presented);
        assert_eq!(mock.state().swapchains_created, created + 1);
    }

    #[test]
    fn suboptimal_present_triggers_recreation() {
        let (mock, mut renderer) = renderer();
        mock.inject(FaultPoint::Present, &[vk::Result::SUBOPTIMAL_KHR]);

        assert_eq!(
            renderer.draw_at(WINDOW, FRAME_TIME).unwrap(),
            FrameStatus::Retry(StaleReason::Suboptimal)
        );
        assert_eq!(mock.state().swapchains_created, 2);
        assert_eq!(mock.state().presents, 1);
        assert!(renderer.target.is_ready());
    }

    #[test]
    fn fatal_present_error_propagates() {
        let (mock, mut renderer) = renderer();
        mock.inject(FaultPoint::Present, &[vk::Result::ERROR_DEVICE_LOST]);

        match renderer.draw_at(WINDOW, FRAME_TIME).err().unwrap() {
            RenderError::Api { op, result, .. } => {
                assert_eq!(op, "vkQueuePresentKHR");
                assert_eq!(result, vk::Result::ERROR_DEVICE_LOST);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(mock.state().swapchains_created, 1);
    }

    #[test]
    fn minimized_window_skips_frames() {
        let (mock, mut renderer) = renderer();
        let minimized = vk::Extent2D { width: 0, height: 0 };
        let uploads = mock.state().submits.len();

        renderer.request_resize();
        assert_eq!(
            renderer.draw_at(minimized, FRAME_TIME).unwrap(),
            FrameStatus::Retry(StaleReason::Minimized)
        );
        assert_eq!(
            renderer.draw_at(minimized, FRAME_TIME).unwrap(),
            FrameStatus::Retry(StaleReason::Minimized)
        );
        assert_eq!(mock.state().submits.len(), uploads);
        assert_eq!(mock.live("pipeline"), 0);

        assert_eq!(renderer.draw_at(WINDOW, FRAME_TIME).unwrap(), FrameStatus::Presented);
        assert_eq!(mock.live("pipeline"), 1);
        assert_eq!(renderer.stats().retried, 2);
    }

    #[test]
    fn resize_rebuilds_extent_dependents() {
        let (mock, mut renderer) = renderer();
        renderer.draw_at(WINDOW, FRAME_TIME).unwrap();

        mock.state().capabilities.current_extent = vk::Extent2D { width: 1024, height: 768 };
        renderer.request_resize();
        assert_eq!(renderer.draw_at(WINDOW, FRAME_TIME).unwrap(), FrameStatus::Presented);

        let state = mock.state();
        assert_eq!(state.swapchains_created, 2);
        assert_eq!(state.pipelines.last().unwrap().extent, vk::Extent2D { width: 1024, height: 768 });
        assert!(state.device_waits >= 1);
    }

    #[test]
    fn teardown_releases_every_handle() {
        let (mock, renderer) = renderer();
        assert!(mock.total_live() > 0);

        drop(renderer);
        assert_eq!(mock.total_live(), 0);
        assert_eq!(mock.state().bad_destroys, 0);
        assert!(mock.state().device_waits >= 1);
    }
}
