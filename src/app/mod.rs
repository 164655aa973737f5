use super::renderer::Renderer;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};
use crate::renderer::config::RenderConfig;
use crate::renderer::{FrameStatus, window_extent};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

pub struct App {
    // The renderer references the window's surface, so it goes first
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    config: RenderConfig,

    // State
    request_redraws: bool,
    close_requested: bool,
    last_stats: Instant,
    error: Option<color_eyre::Report>,
}

impl App {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            renderer: None,
            window: None,
            config,

            request_redraws: true,
            close_requested: false,
            last_stats: Instant::now(),
            error: None,
        }
    }

    /// Runs the event loop until the window closes or the renderer fails.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: color_eyre::Report) {
        self.error = Some(err);
        self.close_requested = true;
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_none() {
            let attributes = Window::default_attributes()
                .with_title(self.config.window_title.clone())
                .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
                .with_resizable(self.config.resizable);
            self.window = Some(Arc::new(event_loop.create_window(attributes)?));
        }

        if self.renderer.is_none() {
            let window = self
                .window
                .clone()
                .ok_or_else(|| eyre!("Window was not created"))?;
            self.renderer = Some(Renderer::new(window, self.config.clone())?);
        }

        Ok(())
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(renderer), Some(window)) = (self.renderer.as_mut(), self.window.as_ref()) else {
            return;
        };

        match renderer.draw(window_extent(window)) {
            Ok(FrameStatus::Presented) => {}
            Ok(FrameStatus::Retry(reason)) => log::debug!("Frame skipped: {:?}", reason),
            Err(err) => {
                self.fail(event_loop, err.into());
                return;
            }
        }

        if self.last_stats.elapsed() >= STATS_INTERVAL {
            let stats = renderer.stats();
            log::debug!(
                "{} frames presented, {} retried, {} swapchain recreations",
                stats.presented,
                stats.retried,
                stats.recreations,
            );
            self.last_stats = Instant::now();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent
    ) {
        if self.window.as_ref().is_none_or(|window| window.id() != window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.request_resize();
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            WindowEvent::KeyboardInput {
                event:
                KeyEvent {
                    logical_key: key,
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => match key.as_ref() {
                Key::Character("r") => {
                    self.request_redraws = !self.request_redraws;
                    log::info!("request_redraws: {}", self.request_redraws);
                }
                Key::Named(NamedKey::Escape) => {
                    self.close_requested = true;
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.close_requested {
            event_loop.exit();
            return;
        }

        if self.request_redraws {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.window = None;
    }
}
