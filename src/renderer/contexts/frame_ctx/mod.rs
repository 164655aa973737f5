pub mod recorder;

use ash::vk;
use crate::renderer::backend::{Owned, QueueRole, SharedGpu, SubmitDesc};
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::device_ctx::target::StaleReason;
use crate::renderer::contexts::frame_ctx::recorder::FrameRecorder;
use crate::renderer::error::{RenderResult, VkResultExt};
use crate::renderer::internals::swapchain::Swapchain;

/// Where the current frame is in the acquire, submit, present chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Acquiring,
    Submitting,
    Presenting,
}

/// Outcome of a frame that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// Nothing was presented; the swapchain has been rebuilt or is waiting for the window
    /// to regain an area
    Retry(StaleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Image { index: u32, suboptimal: bool },
    OutOfDate,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub retried: u64,
    pub recreations: u64,
}

pub struct FrameSync {
    // Signaled by the presentation engine when the acquired image can be rendered to
    pub image_available: Owned<vk::Semaphore>,
    // Signaled by the graphics queue when the frame's commands have finished
    pub render_finished: Owned<vk::Semaphore>,
}

impl FrameSync {
    pub fn new(gpu: &SharedGpu) -> RenderResult<Self> {
        let image_available = Owned::new(gpu.create_semaphore().op("vkCreateSemaphore")?, gpu);
        let render_finished = Owned::new(gpu.create_semaphore().op("vkCreateSemaphore")?, gpu);

        Ok(Self {
            image_available,
            render_finished,
        })
    }
}

/// Responsibilities:
/// - Own the per-image command buffers and the frame semaphores
/// - Drive one frame through acquire, submit and present
/// - Keep exactly one frame in flight by waiting on the present queue
pub struct RenderFrameContext {
    pub recorder: FrameRecorder,
    sync: FrameSync,
    phase: FramePhase,
    pub stats: FrameStats,
    gpu: SharedGpu,
}

impl RenderFrameContext {
    pub fn new(dev: &RenderDeviceContext) -> RenderResult<Self> {
        Ok(Self {
            recorder: FrameRecorder::new(&dev.gpu, dev.queue_families.graphics)?,
            sync: FrameSync::new(&dev.gpu)?,
            phase: FramePhase::Idle,
            stats: FrameStats::default(),
            gpu: dev.gpu.clone(),
        })
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Blocks until the presentation engine hands over an image. An out-of-date swapchain
    /// ends the frame without signaling anything.
    pub fn acquire(&mut self, swapchain: &Swapchain) -> RenderResult<Acquired> {
        self.phase = FramePhase::Acquiring;

        let result = self.gpu.acquire_next_image(
            swapchain.handle(),
            u64::MAX,
            self.sync.image_available.raw(),
        );
        match result {
            Ok((index, suboptimal)) => Ok(Acquired::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.phase = FramePhase::Idle;
                Ok(Acquired::OutOfDate)
            }
            Err(err) => {
                self.phase = FramePhase::Idle;
                Err(err).op("vkAcquireNextImageKHR")
            }
        }
    }

    /// Submits the command buffer recorded for `image_index`. It waits for the image at the
    /// color attachment output stage and signals render-finished.
    pub fn submit(&mut self, image_index: u32) -> RenderResult<()> {
        self.phase = FramePhase::Submitting;

        let Some(cmd) = self.recorder.command_buffer(image_index) else {
            self.phase = FramePhase::Idle;
            return Err(vk::Result::ERROR_UNKNOWN).op("vkQueueSubmit");
        };

        let submitted = self
            .gpu
            .queue_submit(
                QueueRole::Graphics,
                &SubmitDesc {
                    wait_semaphores: &[self.sync.image_available.raw()],
                    wait_stages: &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                    command_buffers: &[cmd],
                    signal_semaphores: &[self.sync.render_finished.raw()],
                },
            )
            .op("vkQueueSubmit");
        if submitted.is_err() {
            self.phase = FramePhase::Idle;
        }
        submitted
    }

    /// Presents `image_index` once rendering has finished and waits for the present queue to
    /// drain, so the semaphores are free for the next frame. Returns the reason the swapchain
    /// needs rebuilding, if any.
    pub fn present(
        &mut self,
        swapchain: &Swapchain,
        image_index: u32,
    ) -> RenderResult<Option<StaleReason>> {
        self.phase = FramePhase::Presenting;

        let stale = match self.gpu.queue_present(
            swapchain.handle(),
            image_index,
            self.sync.render_finished.raw(),
        ) {
            Ok(false) => None,
            Ok(true) => Some(StaleReason::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Some(StaleReason::OutOfDate),
            Err(err) => {
                self.phase = FramePhase::Idle;
                return Err(err).op("vkQueuePresentKHR");
            }
        };

        let drained = self.gpu.queue_wait_idle(QueueRole::Present).op("vkQueueWaitIdle");
        self.phase = FramePhase::Idle;
        drained?;

        if stale.is_none() {
            self.stats.presented += 1;
        }
        Ok(stale)
    }
}
