use crate::capture::DEFAULT_REGION_FILE;
use crate::engine::LanguageHint;
use crate::live::LoopSettings;
use std::path::PathBuf;

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Recognition engine to use ("ocrs", "tesseract"); first available if unset
    #[arg(long, global = true, env = "SCAN_ENGINE")]
    pub engine: Option<String>,

    /// Languages requested in every recognition call (e.g. "eng+fra+jpn")
    #[arg(long, global = true, env = "SCAN_LANGUAGES", default_value = "eng+fra+jpn")]
    pub languages: String,

    /// Vocabulary JSON file (array of names or canonical -> names map)
    #[arg(long, global = true, env = "SCAN_VOCABULARY")]
    pub vocabulary: Option<PathBuf>,

    /// Screenshot file the capture region is cropped from on every tick
    #[arg(long, global = true, env = "SCAN_SCREEN_FILE", default_value = "screenshot.png")]
    pub screen_file: PathBuf,

    /// File the capture region is saved to
    #[arg(long, global = true, env = "SCAN_REGION_FILE", default_value = DEFAULT_REGION_FILE)]
    pub region_file: PathBuf,

    /// Directory for downloaded models (defaults to the user cache dir)
    #[arg(long, global = true, env = "SCAN_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Entities reported per image (1-3)
    #[arg(long, global = true, env = "SCAN_MAX_ENTITIES", default_value = "1")]
    pub max_entities: usize,

    /// Minimum combined confidence for a detection (0.1-1.0)
    #[arg(long, global = true, env = "SCAN_CONFIDENCE_THRESHOLD", default_value = "0.6")]
    pub confidence_threshold: f32,
}

/// HTTP server options
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "SCAN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SCAN_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "SCAN_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: Option<String>,
    pub languages: LanguageHint,
    pub vocabulary_path: Option<PathBuf>,
    pub screen_file: PathBuf,
    pub region_file: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub tessdata_path: Option<String>,
    pub max_entities: usize,
    pub confidence_threshold: f32,
}

impl Config {
    /// Root directory for downloaded models
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("creature-scan")
        })
    }

    /// Loop settings seeded from this configuration, clamped
    pub fn loop_settings(&self) -> LoopSettings {
        let mut settings = LoopSettings::default();
        settings.set_max_entities(self.max_entities);
        settings.set_confidence_threshold(self.confidence_threshold);
        settings
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            languages: LanguageHint::default(),
            vocabulary_path: None,
            screen_file: PathBuf::from("screenshot.png"),
            region_file: PathBuf::from(DEFAULT_REGION_FILE),
            cache_dir: None,
            tessdata_path: None,
            max_entities: 1,
            confidence_threshold: 0.6,
        }
    }
}

impl From<ScanArgs> for Config {
    fn from(args: ScanArgs) -> Self {
        let languages = LanguageHint::parse(&args.languages);
        Self {
            engine: args.engine,
            languages: if languages.is_empty() {
                LanguageHint::default()
            } else {
                languages
            },
            vocabulary_path: args.vocabulary,
            screen_file: args.screen_file,
            region_file: args.region_file,
            cache_dir: args.cache_dir,
            tessdata_path: args.tessdata_path,
            max_entities: args.max_entities,
            confidence_threshold: args.confidence_threshold,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
        }
    }
}

/// Live loop timing options
#[derive(clap::Args, Debug, Clone)]
pub struct WatchArgs {
    /// Seconds between captures (0.5-10)
    #[arg(long, env = "SCAN_INTERVAL", default_value = "2.0")]
    pub interval: f64,

    /// Consecutive identical detections required before reporting (1-5)
    #[arg(long, env = "SCAN_SENSITIVITY", default_value = "2")]
    pub sensitivity: u32,
}
