use std::path::PathBuf;
use crate::renderer::error::{RenderError, RenderResult};

const ENV_PREFIX: &str = "TESSERA_";

/// How the quad's fragments combine with the cleared background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    Replace,
    #[default]
    AlphaBlend,
}

/// Contains configuration options for the renderer like the resolution, vsync, and other settings
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub vsync: bool,
    pub validation: bool,
    pub blend: BlendMode,
    pub clear_color: [f32; 4],
    pub shader_dir: PathBuf,
    /// PNG or JPEG file for the quad; a checkerboard is generated when unset
    pub texture: Option<PathBuf>,

    // Window
    pub window_title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            vsync: false,
            validation: cfg!(debug_assertions),
            blend: BlendMode::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            shader_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders-built"),
            texture: None,

            window_title: String::from("tessera"),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by any `TESSERA_*` environment variables
    pub fn from_env() -> RenderResult<Self> {
        Self::default().with_overrides(std::env::vars())
    }

    /// Applies `TESSERA_*` style key/value pairs. Keys without the prefix are ignored,
    /// unknown prefixed keys are logged and skipped.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> RenderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match name {
                "VSYNC" => self.vsync = parse_bool(name, value)?,
                "VALIDATION" => self.validation = parse_bool(name, value)?,
                "BLEND" => self.blend = parse_blend(value)?,
                "CLEAR_COLOR" => self.clear_color = parse_color(value)?,
                "SHADER_DIR" => self.shader_dir = PathBuf::from(value),
                "TEXTURE" => {
                    self.texture = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "TITLE" => self.window_title = value.to_owned(),
                "WIDTH" => self.width = parse_dimension(name, value)?,
                "HEIGHT" => self.height = parse_dimension(name, value)?,
                "RESIZABLE" => self.resizable = parse_bool(name, value)?,
                _ => log::warn!("Ignoring unknown setting {}{}", ENV_PREFIX, name),
            }
        }

        Ok(self)
    }
}

fn invalid(name: &str, value: &str, expected: &str) -> RenderError {
    RenderError::Config(format!("{ENV_PREFIX}{name}={value:?}, expected {expected}"))
}

fn parse_bool(name: &str, value: &str) -> RenderResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value, "a boolean")),
    }
}

fn parse_blend(value: &str) -> RenderResult<BlendMode> {
    match value.to_ascii_lowercase().as_str() {
        "replace" | "opaque" => Ok(BlendMode::Replace),
        "alpha" | "alpha_blend" => Ok(BlendMode::AlphaBlend),
        _ => Err(invalid("BLEND", value, "replace or alpha")),
    }
}

fn parse_color(value: &str) -> RenderResult<[f32; 4]> {
    let channels = value
        .split(',')
        .map(|channel| channel.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("CLEAR_COLOR", value, "four comma separated floats"))?;

    <[f32; 4]>::try_from(channels)
        .map_err(|_| invalid("CLEAR_COLOR", value, "four comma separated floats"))
}

fn parse_dimension(name: &str, value: &str) -> RenderResult<u32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|dimension| *dimension > 0)
        .ok_or_else(|| invalid(name, value, "a positive integer"))
}
