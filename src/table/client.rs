//! HTTP client for a remote status table service

use super::http::{RangeResponse, WriteCellRequest, WriteRangeRequest};
use super::{CellRef, StatusTable};
use crate::common::{encode_sheet, Error, Result};
use std::time::Duration;

/// [`StatusTable`] backed by the table HTTP API
pub struct HttpTable {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTable {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn sheet_url(&self, sheet: &str) -> String {
        format!("{}/v1/sheets/{}", self.base_url, encode_sheet(sheet))
    }

    /// Probe `GET /health`
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }
}

/// Turn a non-success response into a table error
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Table(format!("table service returned {}: {}", status, body)))
}

#[tonic::async_trait]
impl StatusTable for HttpTable {
    async fn read_range(
        &self,
        sheet: &str,
        from_col: char,
        from_row: u32,
        to_col: char,
        to_row: u32,
    ) -> Result<Vec<Vec<String>>> {
        let from = CellRef::new(from_col, from_row)?.to_string();
        let to = CellRef::new(to_col, to_row)?.to_string();
        let resp = self
            .client
            .get(format!("{}/range", self.sheet_url(sheet)))
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .map_err(|e| Error::Table(e.to_string()))?;
        let body: RangeResponse = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| Error::Table(e.to_string()))?;
        Ok(body.values)
    }

    async fn write_range(
        &self,
        sheet: &str,
        from_col: char,
        row: u32,
        to_col: char,
        values: Vec<String>,
    ) -> Result<()> {
        let req = WriteRangeRequest {
            from: CellRef::new(from_col, row)?.to_string(),
            to: CellRef::new(to_col, row)?.to_string(),
            values,
        };
        let resp = self
            .client
            .put(format!("{}/range", self.sheet_url(sheet)))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Table(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }

    async fn write_cell(&self, sheet: &str, col: char, row: u32, value: &str) -> Result<()> {
        let cell = CellRef::new(col, row)?;
        let resp = self
            .client
            .put(format!("{}/cells/{}", self.sheet_url(sheet), cell))
            .json(&WriteCellRequest {
                value: value.to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::Table(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }
}
