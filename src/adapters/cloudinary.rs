use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::config::MediaConfig;
use crate::domain::model::{DeleteOutcome, StoredAsset};
use crate::domain::ports::MediaHost;
use crate::utils::error::{Result, ServiceError};

/// Signed Cloudinary upload API client.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: &MediaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base().trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.api_base, self.cloud_name, action)
    }

    /// Adds `timestamp`, `api_key` and `signature` to the signed parameters
    /// and returns the full form body.
    fn signed_form(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.api_secret);
        params.insert("api_key", self.api_key.clone());
        params.insert("signature", signature);
        params
    }
}

/// `key=value` pairs in key order, joined with `&`.
pub fn string_to_sign(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .filter(|(k, v)| !matches!(**k, "file" | "api_key" | "signature") && !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex SHA-1 of the string to sign followed by the API secret.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => format!("{}: {}", status, envelope.error.message),
        Err(_) => status.to_string(),
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, data_uri: &str, folder: &str) -> Result<StoredAsset> {
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        let mut form = self.signed_form(params);
        form.insert("file", data_uri.to_string());

        let url = self.endpoint("upload");
        tracing::debug!("Making media upload request to: {}", url);
        let response = self.client.post(&url).form(&form).send().await?;
        tracing::debug!("Media upload response status: {}", response.status());

        if !response.status().is_success() {
            return Err(ServiceError::upstream(error_message(response).await));
        }

        let body: UploadResponse = response.json().await?;
        Ok(StoredAsset {
            secure_url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> DeleteOutcome {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let form = self.signed_form(params);

        let response = match self.client.post(self.endpoint("destroy")).form(&form).send().await {
            Ok(response) => response,
            Err(e) => return DeleteOutcome::Failed(e.to_string()),
        };
        if !response.status().is_success() {
            return DeleteOutcome::Failed(error_message(response).await);
        }

        match response.json::<DestroyResponse>().await {
            Ok(body) if body.result == "ok" => DeleteOutcome::Deleted,
            Ok(body) if body.result == "not found" => DeleteOutcome::NotFound,
            Ok(body) => DeleteOutcome::Failed(format!("unexpected result: {}", body.result)),
            Err(e) => DeleteOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_sign_sorts_and_skips_unsigned_fields() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("file", "data:image/png;base64,AA==".to_string());
        params.insert("api_key", "1234".to_string());

        assert_eq!(
            string_to_sign(&params),
            "public_id=sample_image&timestamp=1315060510"
        );
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let mut params = BTreeMap::new();
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("timestamp", "1315060510".to_string());

        assert_eq!(
            sign(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }
}
