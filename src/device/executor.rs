//! Request executor for applying translated requests.
//!
//! Requests run strictly in order. Execution stops at the first failure:
//! later requests may depend on earlier ones (an element must exist before
//! its fields are patched), and nothing is rolled back.

use tracing::{debug, error, info};

use super::client::RequestSender;
use super::translate::RestRequest;

/// Executor for request sequences.
pub struct RequestExecutor<'a> {
    /// Transport.
    sender: &'a dyn RequestSender,
}

/// Result of executing a single request.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// Request index.
    pub index: usize,
    /// Request that was sent.
    pub request: RestRequest,
    /// Whether the request succeeded.
    pub success: bool,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of executing a request sequence.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Individual request results, up to and including the first failure.
    pub results: Vec<RequestResult>,
    /// Number of requests not sent because an earlier one failed.
    pub skipped: usize,
    /// Whether every request succeeded.
    pub success: bool,
}

impl<'a> RequestExecutor<'a> {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(sender: &'a dyn RequestSender) -> Self {
        Self { sender }
    }

    /// Sends `requests` in order, stopping at the first failure.
    pub async fn execute(&self, resource: &str, requests: &[RestRequest]) -> ExecutionResult {
        info!("Applying {} request(s) for {resource}", requests.len());

        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            debug!("[{index}] {} {}", request.method, request.path);

            match self.sender.send(request).await {
                Ok(_) => results.push(RequestResult {
                    index,
                    request: request.clone(),
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    error!("Request {index} for {resource} failed: {e}");
                    results.push(RequestResult {
                        index,
                        request: request.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                    return ExecutionResult {
                        skipped: requests.len() - index - 1,
                        results,
                        success: false,
                    };
                }
            }
        }

        ExecutionResult {
            results,
            skipped: 0,
            success: true,
        }
    }
}

impl ExecutionResult {
    /// The failed request, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&RequestResult> {
        self.results.iter().find(|r| !r.success)
    }

    /// Number of requests that succeeded.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

impl std::fmt::Debug for RequestExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor").finish_non_exhaustive()
    }
}
