//! Map theme: which layers a map has and where their tiles live.

use std::fs;
use std::path::{Path, PathBuf};

use image::Rgba;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::texture::level::MAX_PROBED_LEVEL;
use crate::map::projection::TileProjection;
use crate::tile::TileLayout;

#[derive(Debug, Clone, Deserialize)]
pub struct MapTheme {
    pub head: ThemeHead,
    /// Raster layer; absent for vector-only maps
    #[serde(default)]
    pub texture: Option<TextureLayer>,
    #[serde(default)]
    pub vector: Option<VectorLayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeHead {
    pub name: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default = "default_background")]
    pub background_color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextureLayer {
    pub source_dir: PathBuf,
    #[serde(default)]
    pub projection: TileProjection,
    #[serde(default = "default_texture_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_texture_tile_size")]
    pub tile_height: u32,
    #[serde(default = "default_texture_columns")]
    pub level_zero_columns: u32,
    #[serde(default = "default_one")]
    pub level_zero_rows: u32,
    #[serde(default = "default_suffix")]
    pub file_suffix: String,
    /// Deepest level to use; probed from the tile directory when absent
    #[serde(default)]
    pub max_level: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorLayer {
    pub source_dir: PathBuf,
    #[serde(default = "default_vector_format")]
    pub format: String,
    #[serde(default = "default_vector_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_vector_tile_size")]
    pub tile_height: u32,
    #[serde(default = "default_one")]
    pub level_zero_columns: u32,
    #[serde(default = "default_one")]
    pub level_zero_rows: u32,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub max_level: Option<u32>,
}

fn default_target() -> String {
    "earth".to_string()
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_texture_tile_size() -> u32 {
    675
}

fn default_texture_columns() -> u32 {
    2
}

fn default_one() -> u32 {
    1
}

fn default_suffix() -> String {
    "jpg".to_string()
}

fn default_vector_format() -> String {
    "geojson".to_string()
}

fn default_vector_tile_size() -> u32 {
    256
}

fn default_worker_threads() -> usize {
    4
}

impl TextureLayer {
    pub fn layout(&self) -> TileLayout {
        TileLayout::new(self.tile_width, self.tile_height, self.level_zero_columns, self.level_zero_rows)
    }
}

impl VectorLayer {
    pub fn layout(&self) -> TileLayout {
        TileLayout::new(self.tile_width, self.tile_height, self.level_zero_columns, self.level_zero_rows)
    }
}

impl MapTheme {
    /// Read a theme file. Relative source directories resolve against the
    /// directory holding the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let theme = Self::from_toml(&contents, base)?;
        info!(name = %theme.head.name, path = %path.display(), "loaded map theme");
        Ok(theme)
    }

    pub fn from_toml(contents: &str, base_dir: &Path) -> Result<Self> {
        let mut theme: MapTheme = toml::from_str(contents)?;
        theme.validate()?;
        if let Some(texture) = &mut theme.texture {
            texture.source_dir = base_dir.join(&texture.source_dir);
        }
        if let Some(vector) = &mut theme.vector {
            vector.source_dir = base_dir.join(&vector.source_dir);
        }
        Ok(theme)
    }

    fn validate(&self) -> Result<()> {
        parse_color(&self.head.background_color)?;
        if let Some(texture) = &self.texture {
            validate_layout("texture", &texture.layout())?;
            validate_max_level("texture", texture.max_level)?;
            if texture.file_suffix.is_empty() {
                return Err(Error::Theme("texture file_suffix is empty".into()));
            }
        }
        if let Some(vector) = &self.vector {
            validate_layout("vector", &vector.layout())?;
            validate_max_level("vector", vector.max_level)?;
            if vector.worker_threads == 0 {
                return Err(Error::Theme("vector worker_threads must be at least 1".into()));
            }
        }
        Ok(())
    }

    pub fn has_texture_layer(&self) -> bool {
        self.texture.is_some()
    }

    pub fn has_vector_layer(&self) -> bool {
        self.vector.is_some()
    }

    pub fn background(&self) -> Rgba<u8> {
        parse_color(&self.head.background_color).unwrap_or(Rgba([0, 0, 0, 255]))
    }
}

fn validate_layout(layer: &str, layout: &TileLayout) -> Result<()> {
    if layout.tile_width == 0 || layout.tile_height == 0 {
        return Err(Error::Theme(format!("{layer} tile size must be non-zero")));
    }
    if layout.level_zero_columns == 0 || layout.level_zero_rows == 0 {
        return Err(Error::Theme(format!("{layer} level zero grid must be non-empty")));
    }
    Ok(())
}

fn validate_max_level(layer: &str, max_level: Option<u32>) -> Result<()> {
    match max_level {
        Some(level) if level > MAX_PROBED_LEVEL => Err(Error::Theme(format!(
            "{layer} max_level {level} is above the deepest supported level {MAX_PROBED_LEVEL}"
        ))),
        _ => Ok(()),
    }
}

/// Parse `#rrggbb` or `#rrggbbaa`
pub fn parse_color(s: &str) -> Result<Rgba<u8>> {
    let invalid = || Error::Theme(format!("invalid color `{s}`"));
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}
