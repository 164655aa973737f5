use std::fs::File;
use std::path::Path;
use crate::renderer::error::{RenderError, RenderResult};

/// SPIR-V words for the two stages of a graphics pipeline
#[derive(Debug, Clone)]
pub struct GraphicsShader {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl GraphicsShader {
    /// Loads `<dir>/<name>.vert.spv` and `<dir>/<name>.frag.spv`.
    pub fn load(dir: &Path, shader_name: &str) -> RenderResult<Self> {
        let vertex = load_shader_binary(&dir.join(format!("{}.vert.spv", shader_name)))?;
        let fragment = load_shader_binary(&dir.join(format!("{}.frag.spv", shader_name)))?;
        Ok(Self { vertex, fragment })
    }
}

/// Reads a SPIR-V blob, checking size, alignment and magic number.
pub fn load_shader_binary(path: &Path) -> RenderResult<Vec<u32>> {
    let shader_load = |source| RenderError::shader_load(path, source);
    let mut file = File::open(path).map_err(shader_load)?;
    ash::util::read_spv(&mut file).map_err(shader_load)
}
