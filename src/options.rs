//! Render settings with TOML support.
//!
//! Every section is `#[serde(default)]`, so a file that only overrides
//! `[resolve]` still parses.

use std::path::Path;

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::graphics::{ClearValue, DepthMode, FilterMode, Sampler, WindingOrder, WrapMode};
use crate::passes::GeometryPassInfo;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub target: TargetOptions,
    pub geometry: GeometryOptions,
    pub resolve: ResolveOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOptions {
    pub width: usize,
    pub height: usize,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryOptions {
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub depth: DepthMode,
    pub cull_back: bool,
    pub winding_order: WindingOrder,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.8, 0.2, 0.2, 1.0],
            clear_depth: 1.0,
            depth: DepthMode::Write,
            cull_back: true,
            winding_order: WindingOrder::CounterClockwise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    pub filter: FilterMode,
    pub wrap: WrapMode,
    pub border_color: [f32; 4],
    pub clear_color: [f32; 4],
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
            border_color: [0.0, 0.0, 0.0, 0.0],
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl ResolveOptions {
    pub fn sampler(&self) -> Sampler {
        Sampler {
            filter: self.filter,
            wrap: self.wrap,
            border_color: Vector4::from(self.border_color),
        }
    }
}

impl RenderOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RenderError::OptionsParse(e.to_string()))
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let options = Self::from_toml_str(&content)?;

        log::info!("loaded render options from {}", path.display());
        Ok(options)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RenderError::OptionsParse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn geometry_pass_info(&self) -> GeometryPassInfo {
        GeometryPassInfo {
            width: self.target.width,
            height: self.target.height,
            clear: ClearValue {
                color: Vector4::from(self.geometry.clear_color),
                depth: self.geometry.clear_depth,
            },
            depth: self.geometry.depth,
            cull_back: self.geometry.cull_back,
            winding_order: self.geometry.winding_order,
        }
    }
}
