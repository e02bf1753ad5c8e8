use crate::error::{Result, SubforgeError};
use crate::subtitle::StyleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    #[default]
    Srt,
    Vtt,
    Ass,
    Json,
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Ok(SubtitleFormat::Vtt),
            "ass" | "ssa" => Ok(SubtitleFormat::Ass),
            "json" => Ok(SubtitleFormat::Json),
            _ => Err(format!(
                "Unknown format: {}. Use 'srt', 'vtt', 'ass', or 'json'",
                s
            )),
        }
    }
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Json => "json",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

/// Which text line(s) of each cue are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Main,
    Secondary,
    Dual,
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayMode::Main => write!(f, "main"),
            DisplayMode::Secondary => write!(f, "secondary"),
            DisplayMode::Dual => write!(f, "dual"),
        }
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(DisplayMode::Main),
            "secondary" | "sub" => Ok(DisplayMode::Secondary),
            "dual" => Ok(DisplayMode::Dual),
            _ => Err(format!(
                "Unknown display mode: {}. Use 'main', 'secondary', or 'dual'",
                s
            )),
        }
    }
}

/// Output resolution of a video export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionMode {
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
}

impl ResolutionMode {
    /// Output height, or `None` to keep the source size.
    pub fn target_height(&self) -> Option<u32> {
        match self {
            ResolutionMode::Original => None,
            ResolutionMode::P1080 => Some(1080),
            ResolutionMode::P720 => Some(720),
            ResolutionMode::P480 => Some(480),
        }
    }
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target_height() {
            Some(height) => write!(f, "{}p", height),
            None => write!(f, "original"),
        }
    }
}

impl std::str::FromStr for ResolutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(ResolutionMode::Original),
            "1080p" | "1080" => Ok(ResolutionMode::P1080),
            "720p" | "720" => Ok(ResolutionMode::P720),
            "480p" | "480" => Ok(ResolutionMode::P480),
            _ => Err(format!(
                "Unknown resolution: {}. Use 'original', '1080p', '720p', or '480p'",
                s
            )),
        }
    }
}

/// Encoder quality profile. `Custom` carries an explicit bitrate in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityProfile {
    High,
    #[default]
    Medium,
    Low,
    Custom { bitrate_kbps: u32 },
}

impl QualityProfile {
    /// Build a profile from a name and an optional bitrate, as given on the
    /// command line.
    pub fn parse(name: &str, bitrate_kbps: Option<u32>) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "custom" => match bitrate_kbps {
                Some(bitrate_kbps) if bitrate_kbps > 0 => {
                    Ok(QualityProfile::Custom { bitrate_kbps })
                }
                _ => Err(SubforgeError::Config(
                    "Custom quality needs a bitrate greater than 0 (kbit/s)".to_string(),
                )),
            },
            _ => name.parse().map_err(SubforgeError::Config),
        }
    }
}

impl std::fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityProfile::High => write!(f, "high"),
            QualityProfile::Medium => write!(f, "medium"),
            QualityProfile::Low => write!(f, "low"),
            QualityProfile::Custom { bitrate_kbps } => write!(f, "custom:{}", bitrate_kbps),
        }
    }
}

impl std::str::FromStr for QualityProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if let Some(rate) = lower.strip_prefix("custom:") {
            return match rate.trim().parse::<u32>() {
                Ok(bitrate_kbps) if bitrate_kbps > 0 => Ok(QualityProfile::Custom { bitrate_kbps }),
                _ => Err(format!("Invalid custom bitrate: {}", rate)),
            };
        }
        match lower.as_str() {
            "high" => Ok(QualityProfile::High),
            "medium" => Ok(QualityProfile::Medium),
            "low" => Ok(QualityProfile::Low),
            _ => Err(format!(
                "Unknown quality profile: {}. Use 'high', 'medium', 'low', or 'custom:<kbps>'",
                s
            )),
        }
    }
}

impl TryFrom<String> for QualityProfile {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualityProfile> for String {
    fn from(value: QualityProfile) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_format: SubtitleFormat,
    pub default_quality: QualityProfile,
    pub default_resolution: ResolutionMode,
    pub display_mode: DisplayMode,
    /// Directory holding the bundled Noto CJK font files.
    pub fonts_dir: Option<PathBuf>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub probe_timeout_secs: u64,
    /// Language tag written on soft-embedded subtitle tracks.
    pub subtitle_language: String,
    pub history_capacity: usize,
    pub style: StyleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_format: SubtitleFormat::default(),
            default_quality: QualityProfile::default(),
            default_resolution: ResolutionMode::default(),
            display_mode: DisplayMode::default(),
            fonts_dir: None,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            probe_timeout_secs: 8,
            subtitle_language: "und".to_string(),
            history_capacity: crate::subtitle::DEFAULT_HISTORY_CAPACITY,
            style: StyleConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(dir) = std::env::var("SUBFORGE_FONTS_DIR") {
            config.fonts_dir = Some(PathBuf::from(dir));
        }
        if let Ok(format) = std::env::var("SUBFORGE_DEFAULT_FORMAT") {
            if let Ok(f) = format.parse() {
                config.default_format = f;
            }
        }
        if let Ok(quality) = std::env::var("SUBFORGE_DEFAULT_QUALITY") {
            if let Ok(q) = quality.parse() {
                config.default_quality = q;
            }
        }
        if let Ok(resolution) = std::env::var("SUBFORGE_DEFAULT_RESOLUTION") {
            if let Ok(r) = resolution.parse() {
                config.default_resolution = r;
            }
        }
        if let Ok(path) = std::env::var("SUBFORGE_FFMPEG") {
            config.ffmpeg_path = path;
        }
        if let Ok(path) = std::env::var("SUBFORGE_FFPROBE") {
            config.ffprobe_path = path;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(SubforgeError::Config(
                "History capacity must be greater than 0".to_string(),
            ));
        }

        if self.probe_timeout_secs == 0 {
            return Err(SubforgeError::Config(
                "Probe timeout must be greater than 0".to_string(),
            ));
        }

        if self.style.font_size.is_nan() || self.style.font_size <= 0.0 {
            return Err(SubforgeError::Config(format!(
                "Font size must be positive, got {}",
                self.style.font_size
            )));
        }

        if let Some(dir) = &self.fonts_dir {
            if !dir.is_dir() {
                return Err(SubforgeError::Config(format!(
                    "Fonts directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Fonts directory, falling back to `<data dir>/subforge/fonts`.
    pub fn resolved_fonts_dir(&self) -> Option<PathBuf> {
        self.fonts_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("subforge").join("fonts")))
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subforge").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("srt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert_eq!("VTT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Vtt);
        assert_eq!("ass".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Ass);
        assert_eq!("json".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Json);
        assert!("txt".parse::<SubtitleFormat>().is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SubtitleFormat::from_path(Path::new("/a/b/movie.ASS")),
            Some(SubtitleFormat::Ass)
        );
        assert_eq!(SubtitleFormat::from_path(Path::new("movie")), None);
    }

    #[test]
    fn test_display_mode_parsing() {
        assert_eq!("dual".parse::<DisplayMode>().unwrap(), DisplayMode::Dual);
        assert_eq!("sub".parse::<DisplayMode>().unwrap(), DisplayMode::Secondary);
        assert!("both".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("720p".parse::<ResolutionMode>().unwrap(), ResolutionMode::P720);
        assert_eq!(ResolutionMode::P480.target_height(), Some(480));
        assert_eq!(ResolutionMode::Original.target_height(), None);
        assert_eq!(ResolutionMode::P1080.to_string(), "1080p");
        assert!("4k".parse::<ResolutionMode>().is_err());
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("HIGH".parse::<QualityProfile>().unwrap(), QualityProfile::High);
        assert_eq!(
            "custom:2500".parse::<QualityProfile>().unwrap(),
            QualityProfile::Custom { bitrate_kbps: 2500 }
        );
        assert!("ultra".parse::<QualityProfile>().is_err());
        assert!("custom:0".parse::<QualityProfile>().is_err());
    }

    #[test]
    fn test_quality_parse_rejects_with_config_error() {
        assert!(matches!(
            QualityProfile::parse("ultra", None),
            Err(SubforgeError::Config(_))
        ));
        assert!(matches!(
            QualityProfile::parse("custom", None),
            Err(SubforgeError::Config(_))
        ));
        assert_eq!(
            QualityProfile::parse("custom", Some(2000)).unwrap(),
            QualityProfile::Custom { bitrate_kbps: 2000 }
        );
        assert_eq!(QualityProfile::parse("low", Some(2000)).unwrap(), QualityProfile::Low);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_format, SubtitleFormat::Srt);
        assert_eq!(config.default_quality, QualityProfile::Medium);
        assert_eq!(config.probe_timeout_secs, 8);
        assert_eq!(config.history_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            fonts_dir: Some(PathBuf::from("/nonexistent/fonts/dir")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config {
            default_quality: QualityProfile::Custom { bitrate_kbps: 1800 },
            default_resolution: ResolutionMode::P720,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("custom:1800"));
        assert!(text.contains("720p"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.default_quality, config.default_quality);
        assert_eq!(back.default_resolution, ResolutionMode::P720);
    }
}
