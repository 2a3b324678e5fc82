//! AWS Translate client
//!
//! Talks to the `TranslateText` JSON API directly over HTTPS and signs
//! requests with Signature Version 4.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::{normalize_language_code, TranslationError, Translator};
use crate::config::TranslationConfig;

type HmacSha256 = Hmac<Sha256>;

/// `X-Amz-Target` for the TranslateText operation
pub const TRANSLATE_TARGET: &str = "AWSShineFrontendService_20170701.TranslateText";

const SERVICE: &str = "translate";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-date;x-amz-target";

/// Translation Port backed by AWS Translate
pub struct AwsTranslator {
    client: Client,
    endpoint: Url,
    host: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl std::fmt::Debug for AwsTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsTranslator")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsTranslator {
    /// Build a client from configuration.
    ///
    /// Fails when the access key, secret or region is missing so that a
    /// misconfigured server never starts serving.
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslationError> {
        let access_key_id = required(&config.access_key_id, "TRANSLATE_ACCESS_KEY_ID")?;
        let secret_access_key =
            required(&config.secret_access_key, "TRANSLATE_SECRET_ACCESS_KEY")?;
        let region = required(&config.region, "TRANSLATE_REGION")?;

        let endpoint = match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => endpoint.to_string(),
            None => format!("https://translate.{}.amazonaws.com/", region),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| TranslationError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(TranslationError::InvalidEndpoint(format!(
                    "{}: no host",
                    endpoint
                )))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        tracing::info!(region = %region, endpoint = %endpoint, "AWS Translate client initialized");

        Ok(Self {
            client,
            endpoint,
            host,
            region,
            access_key_id,
            secret_access_key,
        })
    }

    /// Value of the `Authorization` header for a request sent at `now`
    fn authorization(
        &self,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(String, String), TranslationError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let canonical_request = format!(
            "POST\n{path}\n\ncontent-type:{ct}\nhost:{host}\nx-amz-date:{amz_date}\nx-amz-target:{target}\n\n{signed}\n{payload}",
            path = self.endpoint.path(),
            ct = CONTENT_TYPE,
            host = self.host,
            amz_date = amz_date,
            target = TRANSLATE_TARGET,
            signed = SIGNED_HEADERS,
            payload = hex::encode(Sha256::digest(body)),
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, SERVICE);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.secret_access_key, &date, &self.region, SERVICE)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let header = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key_id, scope, SIGNED_HEADERS, signature
        );
        Ok((amz_date, header))
    }
}

#[async_trait]
impl Translator for AwsTranslator {
    fn name(&self) -> &str {
        "aws-translate"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let source_code = normalize_language_code(source);
        let target_code = normalize_language_code(target);

        if source_code.is_empty() {
            return Err(TranslationError::UnsupportedLanguage(source.to_string()));
        }
        if target_code.is_empty() {
            return Err(TranslationError::UnsupportedLanguage(target.to_string()));
        }
        if source_code == target_code {
            return Ok(text.to_string());
        }

        tracing::debug!(
            source = %source_code,
            target = %target_code,
            chars = text.chars().count(),
            "Translating text"
        );

        let request = TranslateTextRequest {
            text,
            source_language_code: &source_code,
            target_language_code: &target_code,
        };
        let body = serde_json::to_vec(&request).map_err(|e| TranslationError::Provider {
            status: 0,
            message: format!("failed to encode request: {}", e),
        })?;

        let (amz_date, authorization) = self.authorization(&body, Utc::now())?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-date", amz_date)
            .header("x-amz-target", TRANSLATE_TARGET)
            .header("authorization", authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AwsErrorBody>(&raw)
                .ok()
                .map(|e| e.describe())
                .unwrap_or(raw);
            return Err(TranslationError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let result: TranslateTextResponse = response.json().await?;
        match result.translated_text {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(TranslationError::EmptyResult),
        }
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, TranslationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(TranslationError::MissingCredentials(name))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TranslationError> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key)
        .map_err(|e| TranslationError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// SigV4 signing key for one day, region and service
fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, TranslationError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TranslateTextRequest<'a> {
    text: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TranslateTextResponse {
    translated_text: Option<String>,
}

#[derive(Deserialize)]
struct AwsErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

impl AwsErrorBody {
    fn describe(self) -> String {
        let kind = self
            .kind
            .map(|k| k.rsplit('#').next().unwrap_or_default().to_string());
        match (kind, self.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (Some(kind), None) => kind,
            (None, Some(message)) => message,
            (None, None) => "unknown error".to_string(),
        }
    }
}
