use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub geometry: GeometryConfig,
    pub palette: PaletteConfig,
    pub projection: ProjectionConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub stats_url: String,
    pub tests_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            stats_url: "https://api.covid19india.org/data.json".to_string(),
            tests_url: "https://api.covid19india.org/state_test_data.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeometryConfig {
    pub path: PathBuf,
    /// TopoJSON object to read; the first object when unset.
    pub object: Option<String>,
    pub name_property: String,
    /// Property holding the region code for GeoJSON and Shapefile inputs.
    pub id_property: Option<String>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/india.topo.json"),
            object: None,
            name_property: "name".to_string(),
            id_property: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaletteConfig {
    pub colors: Vec<String>, // Hex codes, lowest bucket first
    pub default_color: String,
    pub hover_color: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        // Red variants
        let colors = [
            "#ffedea", "#ffcec5", "#ffad9f", "#ff8a75", "#ff5533", "#e2492d", "#be3d26", "#9a311f",
            "#782618",
        ];
        Self {
            colors: colors.iter().map(|c| c.to_string()).collect(),
            default_color: "#EEE".to_string(),
            hover_color: "#ccc".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProjectionConfig {
    pub scale: f64,
    /// [longitude, latitude] in degrees
    pub center: [f64; 2],
    pub width: u32,
    pub height: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scale: 350.0,
            center: [78.9629, 22.5937],
            width: 600,
            height: 220,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub svg: PathBuf,
    pub html: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg: PathBuf::from("output/map.svg"),
            html: PathBuf::from("output/index.html"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!(?path, "config file not found, using built-in defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.palette.colors.is_empty() {
            return Err(anyhow!("palette.colors must contain at least one color"));
        }
        if self.projection.width == 0 || self.projection.height == 0 {
            return Err(anyhow!(
                "projection width and height must be non-zero (got {}x{})",
                self.projection.width,
                self.projection.height
            ));
        }
        Ok(())
    }
}
