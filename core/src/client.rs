//! Stateless typed client for the record store's data API.
//!
//! # Design
//! `RecordClient` holds the endpoint, the API token and a `Transport`, and
//! carries no mutable state between calls. Each remote operation is split
//! into a `build_*` method that produces an `HttpRequest` and a `parse_*`
//! method that consumes an `HttpResponse`; the async methods glue the two
//! together through the transport. Listing every record of a type lives in
//! `fetch.rs`.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RecordStoreConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::{Constraint, CreatedRecord, ListEnvelope, Page, SYSTEM_FIELDS};

/// Client for one record store endpoint.
#[derive(Debug, Clone)]
pub struct RecordClient<T> {
    base_url: String,
    api_token: SecretString,
    transport: T,
}

impl<T> RecordClient<T> {
    pub fn new(config: &RecordStoreConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Request for the page of `record_type` starting at `cursor`.
    ///
    /// An empty constraint list sends no `constraints` parameter at all.
    pub fn build_list_page(
        &self,
        record_type: &str,
        cursor: u64,
        constraints: &[Constraint],
    ) -> Result<HttpRequest, ApiError> {
        let url = self.collection_url(record_type)?;
        let mut query = vec![
            ("cursor".to_string(), cursor.to_string()),
            (
                "api_token".to_string(),
                self.api_token.expose_secret().to_string(),
            ),
        ];
        if !constraints.is_empty() {
            let encoded = serde_json::to_string(constraints)
                .map_err(|e| ApiError::Serialization(e.to_string()))?;
            query.push(("constraints".to_string(), encoded));
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url,
            query,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn parse_list_page<F: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Page<F>, ApiError> {
        check_status(&response)?;
        let envelope: ListEnvelope<F> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(envelope.response)
    }

    /// Request creating one record of `record_type` from `fields`.
    ///
    /// `fields` must serialize to a JSON object and must not set any of the
    /// store-assigned system fields.
    pub fn build_create<F: Serialize + ?Sized>(
        &self,
        record_type: &str,
        fields: &F,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.collection_url(record_type)?;
        let value =
            serde_json::to_value(fields).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let Value::Object(map) = &value else {
            return Err(ApiError::Serialization(
                "record fields must serialize to a JSON object".to_string(),
            ));
        };
        if let Some(reserved) = SYSTEM_FIELDS.iter().find(|name| map.contains_key(**name)) {
            return Err(ApiError::ReservedField((*reserved).to_string()));
        }
        let body =
            serde_json::to_string(&value).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            query: vec![(
                "api_token".to_string(),
                self.api_token.expose_secret().to_string(),
            )],
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Identifier the store assigned to the new record.
    pub fn parse_create(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        let created: CreatedRecord = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        if created.id.is_empty() {
            return Err(ApiError::Deserialization(
                "record store returned an empty id".to_string(),
            ));
        }
        Ok(created.id)
    }

    fn collection_url(&self, record_type: &str) -> Result<String, ApiError> {
        validate_record_type(record_type)?;
        Ok(format!("{}/{record_type}", self.base_url))
    }
}

impl<T: Transport> RecordClient<T> {
    /// Fetch a single page at `cursor`.
    pub async fn fetch_page<F: DeserializeOwned>(
        &self,
        record_type: &str,
        cursor: u64,
        constraints: &[Constraint],
    ) -> Result<Page<F>, ApiError> {
        let request = self.build_list_page(record_type, cursor, constraints)?;
        debug!(record_type, cursor, "fetching record page");
        let response = self.transport.execute(request).await?;
        self.parse_list_page(response)
    }

    /// Create one record and return its new identifier. Never retried.
    pub async fn create<F: Serialize + ?Sized>(
        &self,
        record_type: &str,
        fields: &F,
    ) -> Result<String, ApiError> {
        let request = self.build_create(record_type, fields)?;
        let result = match self.transport.execute(request).await {
            Ok(response) => self.parse_create(response),
            Err(e) => Err(e.into()),
        };
        match &result {
            Ok(id) => debug!(record_type, id = %id, "record created"),
            Err(ApiError::Remote { status, body }) => {
                warn!(record_type, status, body = %body, "record store rejected create")
            }
            Err(e) => warn!(record_type, error = %e, "record create failed"),
        }
        result
    }
}

fn validate_record_type(record_type: &str) -> Result<(), ApiError> {
    if record_type.is_empty() || record_type.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidRecordType(record_type.to_string()));
    }
    Ok(())
}

/// Map non-2xx statuses to `ApiError::Remote`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Remote {
        status: response.status,
        body: response.body.clone(),
    })
}
