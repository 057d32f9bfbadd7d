use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "irfit.toml";

/// Columns, classes and significance level of the analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Significance level for intervals and tests
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Response column (Y)
    #[serde(default = "default_response")]
    pub response: String,

    /// Column holding the material class
    #[serde(default = "default_class_column")]
    pub class_column: String,

    /// Predictor columns (X), one model per family per predictor
    #[serde(default = "default_predictors")]
    pub predictors: Vec<String>,

    /// Class whose rows the models are fitted on
    #[serde(default)]
    pub fit_class: f64,

    /// The two classes compared by the t-test
    #[serde(default = "default_compare_classes")]
    pub compare_classes: [f64; 2],
}

fn default_alpha() -> f64 { 0.05 }
fn default_response() -> String { "IR".to_string() }
fn default_class_column() -> String { "M".to_string() }
fn default_predictors() -> Vec<String> { vec!["V".to_string(), "T".to_string()] }
fn default_compare_classes() -> [f64; 2] { [0.0, 1.0] }

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            response: default_response(),
            class_column: default_class_column(),
            predictors: default_predictors(),
            fit_class: 0.0,
            compare_classes: default_compare_classes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveSection {
    /// Use the fixed 1.96 z-score instead of the normal quantile at `alpha`
    #[serde(default = "default_fixed_z_score")]
    pub fixed_z_score: bool,
}

fn default_fixed_z_score() -> bool { true }

impl Default for DescriptiveSection {
    fn default() -> Self {
        Self {
            fixed_z_score: default_fixed_z_score(),
        }
    }
}

/// Optional subsampling before analysis
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SamplingSection {
    /// Rows to draw (None = use the whole file)
    #[serde(default)]
    pub size: Option<usize>,

    /// Seed for the draw (None = 0)
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Directory receiving CSV, JSON and plot files
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Emit plot series
    #[serde(default = "default_plots")]
    pub plots: bool,
}

fn default_directory() -> PathBuf { PathBuf::from("reports") }
fn default_plots() -> bool { true }

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            plots: default_plots(),
        }
    }
}

/// Complete irfit configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub analysis: AnalysisSection,

    #[serde(default)]
    pub descriptive: DescriptiveSection,

    #[serde(default)]
    pub sampling: SamplingSection,

    #[serde(default)]
    pub output: OutputSection,
}

impl AnalysisConfig {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load() -> Self {
        Self::load_from(None)
    }

    /// Same as [`load`](Self::load), reading `path` instead of `irfit.toml`
    /// when given
    pub fn load_from(path: Option<&Path>) -> Self {
        let mut config = Self::default();

        let file = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        if let Ok(file_config) = Self::from_file(file) {
            config = file_config;
        }

        config.apply_env_overrides();
        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(alpha) = std::env::var("IRFIT_ALPHA") {
            if let Ok(val) = alpha.parse() {
                self.analysis.alpha = val;
            }
        }

        if let Ok(response) = std::env::var("IRFIT_RESPONSE") {
            if !response.is_empty() {
                self.analysis.response = response;
            }
        }

        if let Ok(class) = std::env::var("IRFIT_FIT_CLASS") {
            if let Ok(val) = class.parse() {
                self.analysis.fit_class = val;
            }
        }

        if let Ok(size) = std::env::var("IRFIT_SAMPLE_SIZE") {
            if let Ok(val) = size.parse() {
                self.sampling.size = Some(val);
            }
        }

        if let Ok(seed) = std::env::var("IRFIT_SEED") {
            if let Ok(val) = seed.parse() {
                self.sampling.seed = Some(val);
            }
        }

        if let Ok(dir) = std::env::var("IRFIT_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.output.directory = PathBuf::from(dir);
            }
        }

        if std::env::var("IRFIT_NO_PLOTS").is_ok() {
            self.output.plots = false;
        }
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}
