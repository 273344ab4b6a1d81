//! Object-storage client for the asset mirror
//!
//! Thin wrapper over the S3-compatible API the remote store speaks:
//! paginated listing under a key prefix, and uploads with bounded retry.
//! Transient failures (throttling, 5xx, network) back off exponentially
//! with jitter up to a capped delay; anything else fails the object
//! immediately.

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use rand::Rng;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Endpoint used when R2_ENDPOINT is not set
pub const DEFAULT_ENDPOINT: &str =
    "https://64c6d2544469ef88b6ad4748b76cf416.r2.cloudflarestorage.com";

/// Bucket used when R2_BUCKET is not set
pub const DEFAULT_BUCKET: &str = "billybobgames";

/// Retry schedule: base delay, growth cap, and jitter window
const BACKOFF_BASE_MS: u64 = 350;
const BACKOFF_CAP_MS: u64 = 12_000;
const BACKOFF_JITTER_MS: u64 = 250;

/// Fatal setup problems: the batch aborts instead of retrying
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither AWS_* nor R2_* credential pairs are present
    #[error("missing object-storage credentials (set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY or R2_ACCESS_KEY_ID/R2_SECRET_ACCESS_KEY)")]
    MissingCredentials,
}

/// Per-operation failures against the remote store
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Listing the bucket failed
    #[error("listing remote keys failed: {0}")]
    List(String),

    /// Uploading one object failed (retries exhausted, non-retryable error,
    /// or the local file could not be read)
    #[error("upload of {key} failed after {attempts} attempt(s): {message}")]
    Upload {
        key: String,
        attempts: u32,
        message: String,
    },
}

/// Client handle for one bucket on an S3-compatible endpoint
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    bucket: String,
}

impl RemoteStore {
    /// Builds a store client; credentials come from the environment
    ///
    /// Accepts either the AWS_* or the R2_* credential variable pair.
    pub fn new(endpoint: &str, bucket: String) -> Result<Self, ConfigError> {
        let access_key = env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| env::var("R2_ACCESS_KEY_ID"))
            .map_err(|_| ConfigError::MissingCredentials)?;
        let secret_key = env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| env::var("R2_SECRET_ACCESS_KEY"))
            .map_err(|_| ConfigError::MissingCredentials)?;
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }

        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(endpoint)
            .credentials_provider(Credentials::new(access_key, secret_key, None, None, "env"))
            .build();

        Ok(Self {
            client: Client::from_conf(config),
            bucket,
        })
    }

    /// Bucket this client operates on
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Lists every object key under a prefix, following pagination
    pub async fn list_keys(&self, prefix: &str) -> Result<HashSet<String>, RemoteError> {
        let mut keys = HashSet::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|err| RemoteError::List(err.to_string()))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    keys.insert(key.to_string());
                }
            }

            if !response.is_truncated().unwrap_or(false) {
                break;
            }
            continuation = response.next_continuation_token().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        Ok(keys)
    }

    /// Uploads one local file to a key, retrying transient failures
    ///
    /// Retryable errors back off exponentially (base 350 ms, cap 12 s, with
    /// jitter) up to `max_attempts`; non-retryable errors fail the object on
    /// the spot. The caller decides what to do with a failed object; the
    /// batch tooling reports it and moves on.
    pub async fn upload_file(
        &self,
        file: &Path,
        key: &str,
        content_type: &str,
        cache_control: &str,
        max_attempts: u32,
    ) -> Result<(), RemoteError> {
        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            // The stream is consumed on failure, so rebuild it per attempt
            let body = ByteStream::from_path(file).await.map_err(|err| {
                RemoteError::Upload {
                    key: key.to_string(),
                    attempts: attempt,
                    message: err.to_string(),
                }
            })?;
            let result = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .content_type(content_type)
                .cache_control(cache_control)
                .send()
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if !is_retryable(&err) || attempt >= max_attempts {
                        return Err(RemoteError::Upload {
                            key: key.to_string(),
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }
                    let wait = backoff_delay(attempt);
                    tracing::warn!(
                        key,
                        attempt = attempt + 1,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        "retrying upload"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        unreachable!("loop either returns Ok or errors out on the last attempt")
    }
}

/// Transient errors worth another attempt: throttling, server errors,
/// timeouts, and connection-level dispatch failures
fn is_retryable<E>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            matches!(status, 429 | 500 | 502 | 503 | 504)
        }
        _ => false,
    }
}

/// Capped exponential backoff with jitter
fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let exp = BACKOFF_BASE_MS.saturating_mul(1u64 << shift).min(BACKOFF_CAP_MS);
    let jitter = rand::rng().random_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(exp.saturating_add(jitter).min(BACKOFF_CAP_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_stays_capped() {
        let first = backoff_delay(1).as_millis() as u64;
        assert!((BACKOFF_BASE_MS..BACKOFF_BASE_MS + BACKOFF_JITTER_MS).contains(&first));

        // Far into the schedule the cap holds regardless of jitter
        let late = backoff_delay(30).as_millis() as u64;
        assert_eq!(late, BACKOFF_CAP_MS);
    }
}
