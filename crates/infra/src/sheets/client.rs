use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use stockwatch_inventory::Grid;

use super::auth::TokenProvider;
use super::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/";

/// Reads a rectangular range of cell values.
#[async_trait]
pub trait ValuesReader: Send + Sync {
    async fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, FetchError>;
}

#[async_trait]
impl<R> ValuesReader for Arc<R>
where
    R: ValuesReader + ?Sized,
{
    async fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, FetchError> {
        (**self).values(spreadsheet_id, range).await
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets v4 `spreadsheets.values.get`.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    base_url: Url,
}

impl SheetsClient {
    pub fn new(tokens: TokenProvider) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http,
            tokens,
            base_url,
        })
    }

    /// Point the client at another endpoint (e.g. a local fake).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, FetchError> {
        self.base_url = Url::parse(base_url).map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(self)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("base url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl ValuesReader for SheetsClient {
    async fn values(&self, spreadsheet_id: &str, range: &str) -> Result<Grid, FetchError> {
        let token = self.tokens.token().await?;
        let url = self.values_url(spreadsheet_id, range)?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ValueRange = response
            .json()
            .await
            .map_err(|e| FetchError::malformed(format!("unexpected values response: {e}")))?;

        let grid: Grid = payload
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();

        debug!(range, rows = grid.len(), "fetched sheet values");
        Ok(grid)
    }
}

/// Formatted values arrive as strings; anything else is rendered as JSON text.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
