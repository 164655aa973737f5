//! "Resources" are the GPU objects the scene is made of. They outlive swapchain
//! recreation and are owned by the resource context.

pub mod buffer;
pub mod mesh;
pub mod shader;
pub mod texture;
