//! Configuration types for the extraction and scoring pipeline.
//!
//! Every path, service credential and timing knob lives in one
//! [`PipelineConfig`], constructed once at process start and passed to each
//! stage explicitly. Nothing reads process-wide state after construction.

use crate::error::PdcaasError;
use crate::progress::ProgressCallback;
use crate::spreadsheet::SheetFormat;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Document Intelligence model. Tables come out of the layout model.
pub const DEFAULT_MODEL_ID: &str = "prebuilt-layout";

/// Default REST api-version (v3.1 GA, `formrecognizer` route).
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdcaas_extract::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .endpoint("https://my-resource.cognitiveservices.azure.com/")
///     .api_key("0123456789abcdef")
///     .pdf_dir("./PDF")
///     .curated_path("./R/final_result.xlsx")
///     .build()
///     .unwrap();
/// assert_eq!(config.model_id, "prebuilt-layout");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Document Intelligence resource endpoint, e.g.
    /// `https://<name>.cognitiveservices.azure.com/`.
    ///
    /// Only required when the analysis stage runs.
    pub endpoint: Option<String>,

    /// Subscription key sent as `Ocp-Apim-Subscription-Key`.
    pub api_key: Option<String>,

    /// Model used for analysis. Default: `prebuilt-layout`.
    ///
    /// Custom extraction models trained in Document Intelligence Studio work
    /// too, as long as their result carries a `tables` array.
    pub model_id: String,

    /// REST api-version query parameter. Default: `2023-07-31`.
    pub api_version: String,

    /// Directory holding the source PDFs. Default: `./PDF`.
    pub pdf_dir: PathBuf,

    /// Directory for per-document analysis JSON. Created if absent. Default: `./JSON`.
    pub json_dir: PathBuf,

    /// Aggregated spreadsheet written by the extraction stage.
    /// Default: `./final_result.xlsx`.
    pub output_path: PathBuf,

    /// Curated spreadsheet read and rewritten by the scoring stage.
    /// Default: `./R/final_result.xlsx`.
    ///
    /// Separate from [`Self::output_path`]: the curated copy is maintained by
    /// hand from the aggregated output, and scoring never touches the latter.
    pub curated_path: PathBuf,

    /// Render charts into this directory after scoring. Default: `None`
    /// (chart rendering stays off).
    pub chart_dir: Option<PathBuf>,

    /// Upper bound for one document's submit + poll cycle, in seconds. Default: 300.
    pub analysis_timeout_secs: u64,

    /// Delay between status polls, in milliseconds. Default: 1000.
    pub poll_interval_ms: u64,

    /// Reuse the intermediate JSON already in `json_dir` instead of calling
    /// the service. Default: false.
    pub skip_analysis: bool,

    /// Stop after writing the aggregated spreadsheet. Default: false.
    pub skip_scoring: bool,

    /// Optional progress callback for per-document events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            pdf_dir: PathBuf::from("./PDF"),
            json_dir: PathBuf::from("./JSON"),
            output_path: PathBuf::from("./final_result.xlsx"),
            curated_path: PathBuf::from("./R/final_result.xlsx"),
            chart_dir: None,
            analysis_timeout_secs: 300,
            poll_interval_ms: 1000,
            skip_analysis: false,
            skip_scoring: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("pdf_dir", &self.pdf_dir)
            .field("json_dir", &self.json_dir)
            .field("output_path", &self.output_path)
            .field("curated_path", &self.curated_path)
            .field("chart_dir", &self.chart_dir)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("skip_analysis", &self.skip_analysis)
            .field("skip_scoring", &self.skip_scoring)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Intermediate JSON path for a source document: `<json_dir>/<stem>.json`.
    pub fn intermediate_path(&self, document: &Path) -> PathBuf {
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.json_dir.join(format!("{stem}.json"))
    }

    /// Directory charts are written to when enabled.
    pub fn chart_dir(&self) -> Option<&Path> {
        self.chart_dir.as_deref()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn json_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.json_dir = dir.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn curated_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.curated_path = path.into();
        self
    }

    pub fn chart_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.chart_dir = Some(dir.into());
        self
    }

    pub fn analysis_timeout_secs(mut self, secs: u64) -> Self {
        self.config.analysis_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(100);
        self
    }

    pub fn skip_analysis(mut self, v: bool) -> Self {
        self.config.skip_analysis = v;
        self
    }

    pub fn skip_scoring(mut self, v: bool) -> Self {
        self.config.skip_scoring = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PdcaasError> {
        let c = &self.config;
        if let Some(ref endpoint) = c.endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(PdcaasError::InvalidConfig(format!(
                    "endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        if c.model_id.trim().is_empty() {
            return Err(PdcaasError::InvalidConfig("model id must not be empty".into()));
        }
        if c.analysis_timeout_secs == 0 {
            return Err(PdcaasError::InvalidConfig(
                "analysis timeout must be ≥ 1s".into(),
            ));
        }
        for path in [&c.output_path, &c.curated_path] {
            if SheetFormat::from_path(path).is_none() {
                return Err(PdcaasError::InvalidConfig(format!(
                    "'{}' is not a .xlsx or .csv spreadsheet",
                    path.display()
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_output_and_curated_apart() {
        let config = PipelineConfig::default();
        assert_ne!(config.output_path, config.curated_path);
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert!(config.chart_dir().is_none());
    }

    #[test]
    fn intermediate_path_uses_document_stem() {
        let config = PipelineConfig::builder().json_dir("/tmp/json").build().unwrap();
        assert_eq!(
            config.intermediate_path(Path::new("/data/PDF/lentil.protein.pdf")),
            PathBuf::from("/tmp/json/lentil.protein.json")
        );
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = PipelineConfig::builder()
            .endpoint("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, PdcaasError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unknown_spreadsheet_extension() {
        let err = PipelineConfig::builder()
            .output_path("result.ods")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("result.ods"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(PipelineConfig::builder()
            .analysis_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn poll_interval_is_floored() {
        let config = PipelineConfig::builder().poll_interval_ms(5).build().unwrap();
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = PipelineConfig::builder()
            .api_key("super-secret-key")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("super-secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
