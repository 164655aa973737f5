use std::panic::Location;
use ash::vk;
use crate::renderer::backend::{GraphicsPipelineDesc, Owned, SharedGpu};
use crate::renderer::config::BlendMode;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::resource_ctx::RenderResourceContext;
use crate::renderer::error::{RenderError, RenderResult, VkResultExt};
use crate::renderer::internals::swapchain::Swapchain;
use crate::renderer::resources::shader::GraphicsShader;
use crate::renderer::shader_data::Vertex;

/// Single color attachment that is cleared, stored and handed to the presentation engine
pub struct RenderPass(Owned<vk::RenderPass>);

impl RenderPass {
    pub fn new(gpu: &SharedGpu, color_format: vk::Format) -> RenderResult<Self> {
        let render_pass = gpu
            .create_render_pass(color_format)
            .op("vkCreateRenderPass")?;
        Ok(Self(Owned::new(render_pass, gpu)))
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.0.raw()
    }
}

impl BlendMode {
    pub fn attachment_state(self) -> vk::PipelineColorBlendAttachmentState {
        match self {
            BlendMode::Replace => vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::FALSE,
                src_color_blend_factor: vk::BlendFactor::ONE,
                dst_color_blend_factor: vk::BlendFactor::ZERO,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ZERO,
                alpha_blend_op: vk::BlendOp::ADD,
                color_write_mask: vk::ColorComponentFlags::RGBA,
            },
            // src * src_alpha + dst * (1 - src_alpha)
            BlendMode::AlphaBlend => vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::TRUE,
                src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
                dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ZERO,
                alpha_blend_op: vk::BlendOp::ADD,
                color_write_mask: vk::ColorComponentFlags::RGBA,
            },
        }
    }
}

#[track_caller]
fn failed(op: &'static str, stage: &'static str) -> impl Fn(vk::Result) -> RenderError {
    let location = Location::caller();
    move |result| RenderError::PipelineCreation {
        op,
        stage,
        result,
        location,
    }
}

pub struct GraphicsPipeline {
    pipeline: Owned<vk::Pipeline>,
    layout: Owned<vk::PipelineLayout>,
}

impl GraphicsPipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.raw()
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.raw()
    }
}

/// Fixed-function state for the quad pipeline. Viewport and scissor are baked in, so a
/// pipeline only ever matches the extent it was built for.
pub struct PipelineBuilder<'a> {
    shader: &'a GraphicsShader,
    set_layout: vk::DescriptorSetLayout,
    extent: vk::Extent2D,
    polygon_mode: vk::PolygonMode,
    cull_mode: vk::CullModeFlags,
    front_face: vk::FrontFace,
    blend_mode: BlendMode,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        shader: &'a GraphicsShader,
        set_layout: vk::DescriptorSetLayout,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            shader,
            set_layout,
            extent,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            // The projection flips Y, which turns the quad's winding counter-clockwise
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            blend_mode: BlendMode::default(),
        }
    }

    pub fn blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Creates the shader modules, the layout and the pipeline in that order. The modules
    /// only live until the pipeline exists; anything built before a failure is released.
    pub fn build(
        self,
        gpu: &SharedGpu,
        render_pass: &RenderPass,
    ) -> RenderResult<GraphicsPipeline> {
        let vertex_module = Owned::new(
            gpu.create_shader_module(&self.shader.vertex)
                .map_err(failed("vkCreateShaderModule", "vertex shader module"))?,
            gpu,
        );
        let fragment_module = Owned::new(
            gpu.create_shader_module(&self.shader.fragment)
                .map_err(failed("vkCreateShaderModule", "fragment shader module"))?,
            gpu,
        );
        let layout = Owned::new(
            gpu.create_pipeline_layout(&[self.set_layout])
                .map_err(failed("vkCreatePipelineLayout", "pipeline layout"))?,
            gpu,
        );

        let vertex_bindings = [Vertex::binding_description()];
        let vertex_attributes = Vertex::attribute_descriptions();
        let pipeline = gpu
            .create_graphics_pipeline(&GraphicsPipelineDesc {
                vertex_module: vertex_module.raw(),
                fragment_module: fragment_module.raw(),
                vertex_bindings: &vertex_bindings,
                vertex_attributes: &vertex_attributes,
                extent: self.extent,
                polygon_mode: self.polygon_mode,
                cull_mode: self.cull_mode,
                front_face: self.front_face,
                color_blend: self.blend_mode.attachment_state(),
                layout: layout.raw(),
                render_pass: render_pass.handle(),
            })
            .map_err(failed("vkCreateGraphicsPipelines", "graphics pipeline"))?;

        Ok(GraphicsPipeline {
            pipeline: Owned::new(pipeline, gpu),
            layout,
        })
    }
}

/// Responsibilities:
/// - Own the render pass, graphics pipeline, and one framebuffer per swapchain image
/// - Be thrown away and rebuilt whenever the swapchain is
pub struct RenderPipelineContext {
    framebuffers: Vec<Owned<vk::Framebuffer>>,
    pub pipeline: GraphicsPipeline,
    pub render_pass: RenderPass,
    pub extent: vk::Extent2D,
}

impl RenderPipelineContext {
    pub fn new(
        dev: &RenderDeviceContext,
        swapchain: &Swapchain,
        res: &RenderResourceContext,
        blend_mode: BlendMode,
    ) -> RenderResult<Self> {
        let gpu = &dev.gpu;

        let render_pass = RenderPass::new(gpu, swapchain.format.format)?;
        let pipeline = PipelineBuilder::new(&res.shader, res.descriptor_set_layout(), swapchain.extent)
            .blend_mode(blend_mode)
            .build(gpu, &render_pass)?;
        let framebuffers = swapchain
            .image_views
            .iter()
            .map(|view| {
                gpu.create_framebuffer(render_pass.handle(), view.raw(), swapchain.extent)
                    .op("vkCreateFramebuffer")
                    .map(|framebuffer| Owned::new(framebuffer, gpu))
            })
            .collect::<RenderResult<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            pipeline,
            render_pass,
            extent: swapchain.extent,
        })
    }

    pub fn framebuffer(&self, image_index: usize) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index).map(Owned::raw)
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}
