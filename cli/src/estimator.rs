use anyhow::{Context, Result};

use kcal_core::StoreError;
use kcal_core::estimate::{EstimateRequest, EstimateResult, Estimator};

pub struct EstimatorClient {
    client: reqwest::Client,
    url: String,
    rt: tokio::runtime::Handle,
}

impl EstimatorClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "kcal-cli/{} (calorie log)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            rt: tokio::runtime::Handle::try_current()
                .context("Estimator client needs a tokio runtime")?,
        })
    }

    pub async fn estimate_async(&self, request: &EstimateRequest) -> Result<EstimateResult> {
        log::debug!(
            "POST {} with {} candidates",
            self.url,
            request.candidates.len()
        );
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .context("Failed to reach estimator")?
            .error_for_status()
            .context("Estimator rejected the request")?;

        resp.json::<EstimateResult>()
            .await
            .context("Failed to parse estimator response")
    }
}

// Requires the multi-threaded runtime: block_in_place panics on a current-thread one.
impl Estimator for EstimatorClient {
    fn estimate(&self, request: &EstimateRequest) -> kcal_core::Result<EstimateResult> {
        tokio::task::block_in_place(|| self.rt.block_on(self.estimate_async(request)))
            .map_err(|e| StoreError::Estimator(format!("{e:#}")))
    }
}
