#![cfg(feature = "web")]

//! Hosted worksheet reached through the Google Sheets v4 values API.

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::cell::CellValue;
use crate::layout::DATA_START_ROW;
use crate::spreadsheet::pad_rows;
use crate::store::{SheetStore, StoreError};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Where the feedback lives: one worksheet of one spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLocation {
    pub spreadsheet_id: String,
    pub worksheet: String,
}

impl SheetLocation {
    /// `'Sheet1'!A4:B4` style range on the worksheet
    fn qualified(&self, range: &str) -> String {
        if range.is_empty() {
            format!("'{}'", self.worksheet)
        } else {
            format!("'{}'!{}", self.worksheet, range)
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            API_BASE,
            self.spreadsheet_id,
            urlencoding::encode(&self.qualified(range)),
            suffix
        )
    }

    fn batch_update_url(&self) -> String {
        format!("{}/{}/values:batchUpdate", API_BASE, self.spreadsheet_id)
    }
}

/// Hosted worksheet accessed as a service account
///
/// Access tokens are minted from the service-account key and refreshed by
/// `gcp_auth` once they expire.
pub struct GoogleSheetStore {
    client: Client,
    location: SheetLocation,
    account: CustomServiceAccount,
}

impl GoogleSheetStore {
    /// Connect to `location` using a service-account key
    ///
    /// # Arguments
    /// * `location` - Spreadsheet id and worksheet title
    /// * `credentials_json` - The service-account key file contents
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - The store, or an error if the key is unusable
    pub fn new(location: SheetLocation, credentials_json: &str) -> Result<Self, StoreError> {
        let account = CustomServiceAccount::from_json(credentials_json)?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        info!(
            "google sheet {} ({}) via service account",
            location.spreadsheet_id, location.worksheet
        );
        Ok(GoogleSheetStore {
            client,
            location,
            account,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.account.token(&[SHEETS_SCOPE]).await?;
        let response = request.bearer_auth(token.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.location.values_url(range, "");
        let response = self.send(self.client.get(url)).await?;
        let body: ValueRange = response.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_text).collect())
            .collect())
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_rows(values: &[Vec<CellValue>]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|row| Value::Array(row.iter().map(CellValue::to_json).collect()))
            .collect(),
    )
}

#[async_trait]
impl SheetStore for GoogleSheetStore {
    async fn clear(&self) -> Result<(), StoreError> {
        let url = self.location.values_url("", ":clear");
        self.send(self.client.post(url).json(&json!({}))).await?;
        Ok(())
    }

    async fn update(&self, anchor: &str, values: Vec<Vec<CellValue>>) -> Result<(), StoreError> {
        let url = self.location.values_url(anchor, "?valueInputOption=RAW");
        let body = json!({
            "range": self.location.qualified(anchor),
            "majorDimension": "ROWS",
            "values": json_rows(&values),
        });
        self.send(self.client.put(url).json(&body)).await?;
        debug!("updated {} rows at {}", values.len(), anchor);
        Ok(())
    }

    async fn batch_update(&self, updates: Vec<(&str, Vec<Vec<CellValue>>)>) -> Result<(), StoreError> {
        let body = batch_body(&self.location, &updates);
        self.send(self.client.post(self.location.batch_update_url()).json(&body))
            .await?;
        debug!("updated {} ranges in one batch", updates.len());
        Ok(())
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<(), StoreError> {
        // Anchor on the data header so the service finds the feedback table
        let table = format!("A{}:D", DATA_START_ROW - 1);
        let url = self
            .location
            .values_url(&table, ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS");
        let body = json!({
            "majorDimension": "ROWS",
            "values": json_rows(&[values]),
        });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let mut rows = self.fetch("").await?;
        while rows.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            rows.pop();
        }
        Ok(pad_rows(rows))
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.fetch(range).await
    }
}

fn batch_body(location: &SheetLocation, updates: &[(&str, Vec<Vec<CellValue>>)]) -> Value {
    let data: Vec<Value> = updates
        .iter()
        .map(|(anchor, values)| {
            json!({
                "range": location.qualified(anchor),
                "majorDimension": "ROWS",
                "values": json_rows(values),
            })
        })
        .collect();
    json!({ "valueInputOption": "RAW", "data": data })
}
