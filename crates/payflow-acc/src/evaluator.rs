use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ policy_version, transaction, verifications }` request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub policy_version: String,
    pub transaction: Value,
    pub verifications: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyResult {
    pub allow: bool,
    pub violations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub result: PolicyResult,
}

/// Seam over the external policy evaluator, mirroring the teacher's
/// `BrokerAdapter` trait: the ACC decision logic never talks to `reqwest`
/// directly, only to this trait, so tests can substitute a fixed responder.
pub trait PolicyEvaluator {
    /// Evaluate a request. A network error or non-200 response must be
    /// translated here into `Ok(PolicyResponse)` with `allow: false` and a
    /// synthetic `POLICY_UNAVAILABLE` violation — never propagated as an
    /// `Err`, since the spec treats evaluator unavailability as a policy
    /// answer, not a system error.
    fn evaluate(
        &self,
        req: &PolicyRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyResponse> + Send + '_>>;
}

/// Production evaluator: POSTs to `POST /v1/data/.../v1` with a 10s timeout.
pub struct HttpPolicyEvaluator {
    client: reqwest::Client,
    url: String,
}

impl HttpPolicyEvaluator {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client must build");
        Self {
            client,
            url: url.into(),
        }
    }
}

impl PolicyEvaluator for HttpPolicyEvaluator {
    fn evaluate(
        &self,
        req: &PolicyRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyResponse> + Send + '_>> {
        let body = serde_json::json!({ "input": req });
        let url = self.url.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let outcome = client.post(&url).json(&body).send().await;
            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<PolicyResponse>().await {
                        Ok(parsed) => parsed,
                        Err(_) => synthetic_unavailable(),
                    }
                }
                _ => synthetic_unavailable(),
            }
        })
    }
}

fn synthetic_unavailable() -> PolicyResponse {
    PolicyResponse {
        result: PolicyResult {
            allow: false,
            violations: vec!["POLICY_UNAVAILABLE".to_string()],
        },
    }
}
