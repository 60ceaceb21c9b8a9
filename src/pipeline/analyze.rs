//! Document analysis: submit a PDF to Azure AI Document Intelligence and
//! persist the structured result.
//!
//! ## Wire protocol
//!
//! ```text
//! POST {endpoint}/formrecognizer/documentModels/{model}:analyze?api-version={v}
//!      Ocp-Apim-Subscription-Key: …      {"base64Source": "…"}
//!   ◀─ 202 Accepted, Operation-Location: {url}
//! GET  {url}   (repeat every poll_interval)
//!   ◀─ {"status": "running"} … {"status": "succeeded", "analyzeResult": {…}}
//! ```
//!
//! The submit + poll cycle runs under one explicit deadline. Service-side
//! failure and deadline expiry come back as [`AnalysisOutcome`] variants;
//! transport and HTTP-level failures are `Err(PdcaasError)`. Nothing is
//! retried.

use crate::config::PipelineConfig;
use crate::error::PdcaasError;
use crate::persist::write_bytes_atomic;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Header carrying the resource key.
pub const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Result of one analysis call.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The service finished; holds the `analyzeResult` object verbatim.
    Completed(serde_json::Value),
    /// The service reported the operation as failed or canceled.
    Failed { reason: String },
    /// The deadline passed before the service finished.
    TimedOut { secs: u64 },
}

/// Something that can turn a PDF into a structured analysis result.
///
/// [`AzureDocumentAnalyzer`] is the production implementation; tests plug in
/// fakes that return canned results.
pub trait DocumentAnalyzer {
    /// Analyse one document and wait for the outcome.
    fn analyze(
        &self,
        document: &Path,
    ) -> impl Future<Output = Result<AnalysisOutcome, PdcaasError>> + Send;
}

/// REST client for the Document Intelligence analyze endpoint.
#[derive(Debug, Clone)]
pub struct AzureDocumentAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    deadline: Duration,
    poll_interval: Duration,
}

impl AzureDocumentAnalyzer {
    /// Build a client from the pipeline configuration.
    ///
    /// Fails with [`PdcaasError::ServiceNotConfigured`] when the endpoint or
    /// key is missing.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PdcaasError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| PdcaasError::ServiceNotConfigured {
                hint: "Set --endpoint or AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT.".into(),
            })?;
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PdcaasError::ServiceNotConfigured {
                hint: "Set --api-key or AZURE_DOCUMENT_INTELLIGENCE_KEY.".into(),
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model_id: config.model_id.clone(),
            api_version: config.api_version.clone(),
            deadline: Duration::from_secs(config.analysis_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// The analyze URL for this resource and model.
    pub fn analyze_url(&self) -> String {
        analyze_url(&self.endpoint, &self.model_id, &self.api_version)
    }

    /// POST the document and return the `Operation-Location` to poll.
    async fn submit(&self, pdf: &[u8]) -> Result<String, PdcaasError> {
        let body = AnalyzeRequest {
            base64_source: STANDARD.encode(pdf),
        };

        let response = self
            .client
            .post(self.analyze_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &text));
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PdcaasError::ServiceError {
                status: status.as_u16(),
                body: "response carried no Operation-Location header".into(),
            })
    }

    /// Poll the operation until it reaches a terminal status.
    async fn poll(&self, operation_url: &str) -> Result<AnalysisOutcome, PdcaasError> {
        loop {
            sleep(self.poll_interval).await;

            let response = self
                .client
                .get(operation_url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(http_error(status.as_u16(), &text));
            }

            let operation: AnalyzeOperation = response.json().await?;
            match interpret_operation(operation) {
                Some(outcome) => return Ok(outcome),
                None => debug!("Analysis still in progress"),
            }
        }
    }
}

impl DocumentAnalyzer for AzureDocumentAnalyzer {
    async fn analyze(&self, document: &Path) -> Result<AnalysisOutcome, PdcaasError> {
        let pdf = tokio::fs::read(document)
            .await
            .map_err(|_| PdcaasError::FileNotFound {
                path: document.to_path_buf(),
            })?;
        debug!("Submitting {} ({} bytes)", document.display(), pdf.len());

        let cycle = async {
            let operation_url = self.submit(&pdf).await?;
            self.poll(&operation_url).await
        };

        match timeout(self.deadline, cycle).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Analysis of {} exceeded {}s",
                    document.display(),
                    self.deadline.as_secs()
                );
                Ok(AnalysisOutcome::TimedOut {
                    secs: self.deadline.as_secs(),
                })
            }
        }
    }
}

/// Analyse `document` and write the result to `json_path` as pretty JSON.
///
/// Returns the number of tables in the result. A failed or timed-out
/// analysis becomes [`PdcaasError::AnalysisFailed`].
pub async fn analyze_and_save<A: DocumentAnalyzer>(
    analyzer: &A,
    document: &Path,
    json_path: &Path,
) -> Result<usize, PdcaasError> {
    let start = Instant::now();
    let result = match analyzer.analyze(document).await? {
        AnalysisOutcome::Completed(result) => result,
        AnalysisOutcome::Failed { reason } => {
            return Err(PdcaasError::AnalysisFailed {
                path: document.to_path_buf(),
                reason,
            })
        }
        AnalysisOutcome::TimedOut { secs } => {
            return Err(PdcaasError::AnalysisFailed {
                path: document.to_path_buf(),
                reason: format!("timed out after {secs}s"),
            })
        }
    };

    let tables = table_count(&result);
    let json = serde_json::to_vec_pretty(&result)
        .map_err(|e| PdcaasError::Internal(format!("serialise analysis result: {e}")))?;
    write_bytes_atomic(json_path, &json)?;

    info!(
        "JSON saved to {} ({} tables, {}ms)",
        json_path.display(),
        tables,
        start.elapsed().as_millis()
    );
    Ok(tables)
}

/// Number of entries in the result's `tables` array.
pub fn table_count(result: &serde_json::Value) -> usize {
    result
        .get("tables")
        .and_then(|t| t.as_array())
        .map_or(0, Vec::len)
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    base64_source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    error: Option<ServiceErrorBody>,
    #[serde(default)]
    analyze_result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ServiceErrorBody {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown service error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ServiceErrorBody,
}

fn analyze_url(endpoint: &str, model_id: &str, api_version: &str) -> String {
    format!(
        "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
        endpoint.trim_end_matches('/'),
        model_id,
        api_version
    )
}

/// Map a non-success HTTP response to an error, surfacing the service's
/// `error.message` when the body carries one.
fn http_error(status: u16, body: &str) -> PdcaasError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.describe())
        .unwrap_or_else(|_| body.to_string());
    match status {
        401 | 403 => PdcaasError::AuthError { status, detail },
        _ => PdcaasError::ServiceError {
            status,
            body: detail,
        },
    }
}

/// `Some` once the operation is terminal, `None` while it is still running.
fn interpret_operation(operation: AnalyzeOperation) -> Option<AnalysisOutcome> {
    match operation.status.to_ascii_lowercase().as_str() {
        "succeeded" => Some(match operation.analyze_result {
            Some(result) => AnalysisOutcome::Completed(result),
            None => AnalysisOutcome::Failed {
                reason: "service reported success without an analyzeResult".into(),
            },
        }),
        "failed" | "canceled" => Some(AnalysisOutcome::Failed {
            reason: operation
                .error
                .map(|e| e.describe())
                .unwrap_or_else(|| format!("operation {}", operation.status)),
        }),
        _ => None,
    }
}
