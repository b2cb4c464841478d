use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "movie_etl.toml";

/// Tabular format used for processed and curated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(EtlError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(value: OutputFormat) -> Self {
        value.extension().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Directory layout of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub curated_dir: PathBuf,
    pub graph_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl DataPaths {
    /// Standard layout rooted at `base`.
    pub fn under(base: &Path) -> Self {
        let data = base.join("data");
        Self {
            raw_dir: data.join("raw_selected").join("kaggle_movies"),
            processed_dir: data.join("processed"),
            curated_dir: data.join("curated"),
            graph_dir: data.join("neo4j"),
            docs_dir: base.join("docs"),
            logs_dir: base.join("logs"),
        }
    }

    /// Output directories, created on demand by the stages that write them.
    pub fn ensure_output_dirs(&self) -> Result<()> {
        for dir in [
            &self.processed_dir,
            &self.curated_dir,
            &self.graph_dir,
            &self.docs_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::under(Path::new("."))
    }
}

/// File names of the five raw tables inside `DataPaths::raw_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputFiles {
    pub movies_metadata: String,
    pub credits: String,
    pub keywords: String,
    pub ratings: String,
    pub links: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            movies_metadata: "movies_metadata.csv".to_string(),
            credits: "credits.csv".to_string(),
            keywords: "keywords.csv".to_string(),
            ratings: "ratings_small.csv".to_string(),
            links: "links_small.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Parameters {
    /// Ratings needed before a movie's mean rating is trusted.
    pub min_rating_count: u64,
    pub max_cast_per_movie: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            min_rating_count: 50,
            max_cast_per_movie: 20,
        }
    }
}

/// Immutable configuration handed to every stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub inputs: InputFiles,
    pub params: Parameters,
    pub output_format: OutputFormat,
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_dir: Option<PathBuf>,
    pub output_format: Option<String>,
    pub min_rating_count: Option<u64>,
    pub max_cast_per_movie: Option<usize>,
}

impl PipelineConfig {
    /// Layers defaults, the TOML file, environment variables and CLI overrides.
    ///
    /// An explicitly named config file must exist; the default file is optional.
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.apply_overrides(overrides)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(base) = std::env::var("MOVIE_ETL_BASE_DIR") {
            self.paths = DataPaths::under(Path::new(&base));
        }
        if let Ok(format) = std::env::var("MOVIE_ETL_FORMAT") {
            self.output_format = format.parse()?;
        }
        if let Ok(value) = std::env::var("MOVIE_ETL_MIN_RATING_COUNT") {
            self.params.min_rating_count = value.trim().parse().map_err(|_| {
                EtlError::Config(format!("MOVIE_ETL_MIN_RATING_COUNT is not a count: {value}"))
            })?;
        }
        if let Ok(value) = std::env::var("MOVIE_ETL_MAX_CAST") {
            self.params.max_cast_per_movie = value.trim().parse().map_err(|_| {
                EtlError::Config(format!("MOVIE_ETL_MAX_CAST is not a count: {value}"))
            })?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(base) = &overrides.base_dir {
            self.paths = DataPaths::under(base);
        }
        if let Some(format) = &overrides.output_format {
            self.output_format = format.parse()?;
        }
        if let Some(min) = overrides.min_rating_count {
            self.params.min_rating_count = min;
        }
        if let Some(max) = overrides.max_cast_per_movie {
            self.params.max_cast_per_movie = max;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.params.max_cast_per_movie == 0 {
            return Err(EtlError::Config(
                "max_cast_per_movie must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn raw_path(&self, file_name: &str) -> PathBuf {
        self.paths.raw_dir.join(file_name)
    }
}
