use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use image::Rgb;
use serde::Deserialize;

use crate::overlay::{OverlayRenderer, OverlayStyle};
use crate::pipeline::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::severity::{SeverityClassifier, SeverityPalette, SeverityThresholds};

pub const CONFIG_ENV: &str = "PLANTSCAN_CONFIG";
pub const FONT_ENV: &str = "PLANTSCAN_FONT";
pub const THRESHOLD_ENV: &str = "PLANTSCAN_CONF_THRESHOLD";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    detect: Option<DetectConfigFile>,
    severity: Option<SeverityConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    confidence_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SeverityConfigFile {
    severe_above: Option<f64>,
    moderate_above: Option<f64>,
    severe_color: Option<String>,
    moderate_color: Option<String>,
    mild_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    stroke_width: Option<u32>,
    font_path: Option<PathBuf>,
    font_size: Option<f32>,
    text_color: Option<String>,
    jpeg_quality: Option<u8>,
}

/// Resolved settings: file values over defaults, environment over both.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub confidence_threshold: f64,
    pub thresholds: SeverityThresholds,
    pub palette: SeverityPalette,
    pub style: OverlayStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            thresholds: SeverityThresholds::default(),
            palette: SeverityPalette::default(),
            style: OverlayStyle::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or from `$PLANTSCAN_CONFIG` when no path is given.
    /// With neither, defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut cfg = match path.or(env_path.as_deref()) {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document; missing tables and keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text).context("failed to parse TOML")?;
        let cfg = Self::from_file(file)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let detect = file.detect.unwrap_or_default();
        let severity = file.severity.unwrap_or_default();
        let render = file.render.unwrap_or_default();

        let thresholds = SeverityThresholds {
            severe_above: severity
                .severe_above
                .unwrap_or(defaults.thresholds.severe_above),
            moderate_above: severity
                .moderate_above
                .unwrap_or(defaults.thresholds.moderate_above),
        };

        let palette = SeverityPalette {
            severe: color_or(severity.severe_color, defaults.palette.severe)?,
            moderate: color_or(severity.moderate_color, defaults.palette.moderate)?,
            mild: color_or(severity.mild_color, defaults.palette.mild)?,
        };

        let style = OverlayStyle {
            stroke_width: render.stroke_width.unwrap_or(defaults.style.stroke_width),
            font_path: render.font_path.or(defaults.style.font_path),
            font_size: render.font_size.unwrap_or(defaults.style.font_size),
            text_color: color_or(render.text_color, defaults.style.text_color)?,
            jpeg_quality: render.jpeg_quality.unwrap_or(defaults.style.jpeg_quality),
        };

        Ok(Self {
            confidence_threshold: detect
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            thresholds,
            palette,
            style,
        })
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(font) = lookup(FONT_ENV) {
            self.style.font_path = Some(PathBuf::from(font));
        }
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            self.confidence_threshold = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("{THRESHOLD_ENV} must be a number, got '{raw}'"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidence_threshold must lie in [0, 1], got {}",
                self.confidence_threshold
            );
        }
        self.thresholds.validate()?;
        if self.style.stroke_width == 0 {
            bail!("render.stroke_width must be at least 1");
        }
        if !(self.style.font_size > 0.0) {
            bail!("render.font_size must be positive, got {}", self.style.font_size);
        }
        if !(1..=100).contains(&self.style.jpeg_quality) {
            bail!(
                "render.jpeg_quality must be within 1..=100, got {}",
                self.style.jpeg_quality
            );
        }
        Ok(())
    }

    /// Severity classifier built from the configured bounds and palette.
    pub fn classifier(&self) -> SeverityClassifier {
        SeverityClassifier::new(self.thresholds, self.palette)
    }

    /// Overlay renderer using the configured classifier and style.
    pub fn renderer(&self) -> OverlayRenderer {
        OverlayRenderer::new(self.classifier(), self.style.clone())
    }
}

fn color_or(value: Option<String>, default: Rgb<u8>) -> Result<Rgb<u8>> {
    match value {
        Some(hex) => parse_hex_color(&hex),
        None => Ok(default),
    }
}

/// Parse `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("invalid color '{value}', expected #RRGGBB");
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| anyhow!("invalid color '{value}', expected #RRGGBB"))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.confidence_threshold, 0.25);
        assert_eq!(cfg.style.jpeg_quality, 95);
        assert_eq!(cfg.style.font_path, Some(PathBuf::from("arial.ttf")));
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = Config::from_toml_str(
            r##"
            [detect]
            confidence_threshold = 0.4

            [severity]
            severe_above = 0.9
            mild_color = "#00FF00"

            [render]
            stroke_width = 3
            font_path = "/usr/share/fonts/DejaVuSans.ttf"
            "##,
        )
        .unwrap();

        assert_eq!(cfg.confidence_threshold, 0.4);
        assert_eq!(cfg.thresholds.severe_above, 0.9);
        assert_eq!(cfg.thresholds.moderate_above, 0.6);
        assert_eq!(cfg.palette.mild, Rgb([0, 255, 0]));
        assert_eq!(cfg.palette.severe, Rgb([255, 0, 0]));
        assert_eq!(cfg.style.stroke_width, 3);
        assert_eq!(
            cfg.style.font_path.as_deref(),
            Some(Path::new("/usr/share/fonts/DejaVuSans.ttf"))
        );
    }

    #[test]
    fn rejects_inconsistent_values() {
        assert!(Config::from_toml_str("[severity]\nmoderate_above = 0.85").is_err());
        assert!(Config::from_toml_str("[render]\njpeg_quality = 0").is_err());
        assert!(Config::from_toml_str("[render]\nstroke_width = 0").is_err());
        assert!(Config::from_toml_str("[detect]\nconfidence_threshold = 2.0").is_err());
        assert!(Config::from_toml_str("[severity]\nsevere_color = \"red\"").is_err());
    }

    #[test]
    fn environment_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|key| match key {
            FONT_ENV => Some("/tmp/label.ttf".to_string()),
            THRESHOLD_ENV => Some(" 0.5 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.style.font_path, Some(PathBuf::from("/tmp/label.ttf")));
        assert_eq!(cfg.confidence_threshold, 0.5);

        let mut cfg = Config::default();
        assert!(
            cfg.apply_overrides(|key| (key == THRESHOLD_ENV).then(|| "high".to_string()))
                .is_err()
        );
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#FFA500").unwrap(), Rgb([255, 165, 0]));
        assert_eq!(parse_hex_color("000000").unwrap(), Rgb([0, 0, 0]));
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plantscan.toml");
        std::fs::write(&path, "[render]\nfont_size = 20.0\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.style.font_size, 20.0);
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
