use std::panic::Location;
use std::path::{Path, PathBuf};
use ash::prelude::VkResult;
use ash::vk;
use thiserror::Error;

/// Unrecoverable renderer errors. A stale swapchain is not one of these; see `FrameStatus`.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No physical device exposes graphics and present queues, the required extensions and a usable surface")]
    NoSuitableDevice,

    #[error("No memory type matches type bits {type_bits:#b} with properties {properties:?} at {location}")]
    NoSuitableMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
        location: &'static Location<'static>,
    },

    #[error("Validation layer {0} requested but not available")]
    MissingValidationLayer(String),

    #[error("{op} failed for the {stage} with {result} at {location}")]
    PipelineCreation {
        op: &'static str,
        stage: &'static str,
        result: vk::Result,
        location: &'static Location<'static>,
    },

    #[error("vkCreateBuffer failed for {size} bytes with {result} at {location}")]
    BufferCreation {
        size: vk::DeviceSize,
        result: vk::Result,
        location: &'static Location<'static>,
    },

    #[error("vkAllocateMemory failed for {size} bytes with {result} at {location}")]
    Allocation {
        size: vk::DeviceSize,
        result: vk::Result,
        location: &'static Location<'static>,
    },

    #[error("Failed to load shader binary {path:?} at {location}: {source}")]
    ShaderLoad {
        path: PathBuf,
        source: std::io::Error,
        location: &'static Location<'static>,
    },

    #[error("Failed to copy into mapped memory: {0}")]
    Copy(String),

    #[error("Failed to load texture: {0}")]
    Texture(#[from] image::ImageError),

    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("Window system error: {0}")]
    Window(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{op} failed with {result} at {location}")]
    Api {
        op: &'static str,
        result: vk::Result,
        location: &'static Location<'static>,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Names the failing Vulkan operation and records where it was called from.
pub trait VkResultExt<T> {
    fn op(self, op: &'static str) -> RenderResult<T>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    #[track_caller]
    fn op(self, op: &'static str) -> RenderResult<T> {
        let location = Location::caller();
        self.map_err(|result| RenderError::Api { op, result, location })
    }
}

impl RenderError {
    #[track_caller]
    pub fn no_suitable_memory_type(type_bits: u32, properties: vk::MemoryPropertyFlags) -> Self {
        Self::NoSuitableMemoryType {
            type_bits,
            properties,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn pipeline_creation(op: &'static str, stage: &'static str, result: vk::Result) -> Self {
        Self::PipelineCreation {
            op,
            stage,
            result,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn buffer_creation(size: vk::DeviceSize, result: vk::Result) -> Self {
        Self::BufferCreation {
            size,
            result,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn allocation(size: vk::DeviceSize, result: vk::Result) -> Self {
        Self::Allocation {
            size,
            result,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn shader_load(path: &Path, source: std::io::Error) -> Self {
        Self::ShaderLoad {
            path: path.to_path_buf(),
            source,
            location: Location::caller(),
        }
    }
}
