use std::path::Path;
use ash::vk;
use image::{Rgba, RgbaImage};
use crate::renderer::backend::{ImageDesc, Owned};
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::error::{RenderError, RenderResult, VkResultExt};

pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Tightly packed RGBA8 pixels waiting to be uploaded
#[derive(Debug, Clone)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TexturePixels {
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        }
    }

    pub fn load(path: &Path) -> RenderResult<Self> {
        let image = image::open(path)?;
        log::info!("Loaded texture {:?} ({}x{})", path, image.width(), image.height());
        Ok(Self::from_image(&image))
    }

    /// Two-tone checkerboard with `cells` squares along each side
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let image = RgbaImage::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgba([235, 235, 235, 255])
            } else {
                Rgba([40, 40, 48, 255])
            }
        });
        Self {
            width: size,
            height: size,
            rgba: image.into_raw(),
        }
    }

    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Device-local sampled image with its view and sampler
pub struct Texture {
    sampler: Owned<vk::Sampler>,
    view: Owned<vk::ImageView>,
    memory: Owned<vk::DeviceMemory>,
    image: Owned<vk::Image>,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
}

impl Texture {
    pub fn new(
        dev: &RenderDeviceContext,
        extent: vk::Extent2D,
    ) -> RenderResult<Self> {
        let gpu = &dev.gpu;

        let image = Owned::new(
            gpu.create_image(&ImageDesc {
                extent,
                format: TEXTURE_FORMAT,
                usage: vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            })
            .op("vkCreateImage")?,
            gpu,
        );

        let reqs = gpu.image_memory_requirements(image.raw());
        let memory_type = dev.find_memory_type(
            reqs.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let memory = Owned::new(
            gpu.allocate_memory(reqs.size, memory_type)
                .map_err(|result| RenderError::allocation(reqs.size, result))?,
            gpu,
        );
        gpu.bind_image_memory(image.raw(), memory.raw())
            .op("vkBindImageMemory")?;

        let view = Owned::new(
            gpu.create_image_view(image.raw(), TEXTURE_FORMAT)
                .op("vkCreateImageView")?,
            gpu,
        );
        let sampler = Owned::new(gpu.create_sampler().op("vkCreateSampler")?, gpu);

        Ok(Self {
            sampler,
            view,
            memory,
            image,
            extent,
            format: TEXTURE_FORMAT,
        })
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image.raw()
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view.raw()
    }

    #[inline]
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler.raw()
    }
}
