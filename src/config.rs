use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::types::{BoundingBox, Units};

// Rough geographic bounding box of North Carolina, the default study area.
const DEFAULT_BBOX: [f64; 4] = [-84.821869, 33.842316, -74.960621, 36.588117];

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// GeoJSON point collection to aggregate.
    pub input: PathBuf,
    /// Destination for the hexagon feature collection.
    pub output: PathBuf,
    /// Hexagon edge length, in `units`. 2 for a large grid, .2 for a small one.
    pub side: f64,
    #[serde(default = "default_units")]
    pub units: Units,
    /// Write the hexagon collection (the primary output).
    #[serde(default = "default_true")]
    pub hex: bool,
    /// Also write the Wurman dot circle collections.
    #[serde(default)]
    pub wurman: bool,
    /// Feature property holding the payload to collect per hexagon.
    #[serde(default = "default_payload_key")]
    pub payload_key: String,
    #[serde(default = "default_bbox")]
    pub bbox: BoundingBox,
    /// Number of natural-breaks classes.
    #[serde(default = "default_classes")]
    pub classes: usize,
    /// Outer circle shrink factor, slightly below 1 so adjacent dots never touch.
    #[serde(default = "default_shrink")]
    pub shrink: f64,
    /// Count breakpoints for the inner-circle step table. One more entry than
    /// `multipliers`; a count in [breaks[j], breaks[j+1]) takes multipliers[j],
    /// and the last interval is closed at its upper end.
    #[serde(default = "default_breaks")]
    pub breaks: Vec<f64>,
    #[serde(default = "default_multipliers")]
    pub multipliers: Vec<f64>,
    pub wurman_outer_output: Option<PathBuf>,
    pub wurman_inner_output: Option<PathBuf>,
}

fn default_units() -> Units {
    Units::Miles
}

fn default_true() -> bool {
    true
}

fn default_payload_key() -> String {
    "residences".to_string()
}

fn default_bbox() -> BoundingBox {
    BoundingBox::from(DEFAULT_BBOX)
}

fn default_classes() -> usize {
    7
}

fn default_shrink() -> f64 {
    0.95
}

fn default_breaks() -> Vec<f64> {
    vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 200.0, 100000.0]
}

fn default_multipliers() -> Vec<f64> {
    vec![0.3, 0.6, 0.8, 1.0, 1.0, 1.0, 1.0]
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Command-line flags win over the config file, matching the original
    /// script's `--input --output --side` arguments.
    pub fn apply_overrides(
        &mut self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        side: Option<f64>,
        wurman: bool,
    ) {
        if let Some(input) = input {
            self.input = input;
        }
        if let Some(output) = output {
            self.output = output;
        }
        if let Some(side) = side {
            self.side = side;
        }
        if wurman {
            self.wurman = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes == 0 {
            bail!("classes must be at least 1");
        }
        if self.breaks.len() != self.multipliers.len() + 1 {
            bail!(
                "breaks must have exactly one more entry than multipliers ({} breaks, {} multipliers)",
                self.breaks.len(),
                self.multipliers.len()
            );
        }
        if !self.breaks.windows(2).all(|w| w[0] < w[1]) {
            bail!("breaks must be strictly increasing");
        }
        if self.shrink <= 0.0 {
            bail!("shrink must be positive");
        }
        Ok(())
    }

    pub fn wurman_outer_path(&self) -> PathBuf {
        self.wurman_outer_output
            .clone()
            .unwrap_or_else(|| self.output.with_file_name("wurmanOuterCircles.json"))
    }

    pub fn wurman_inner_path(&self) -> PathBuf {
        self.wurman_inner_output
            .clone()
            .unwrap_or_else(|| self.output.with_file_name("wurmanInnerCircles.json"))
    }
}
