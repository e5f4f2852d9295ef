//! Signed Cloudinary uploads over the REST API.

use crate::config::CloudinaryConfig;
use crate::error::ApiError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::fmt::Write as _;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const UPLOAD_FOLDER: &str = "store/products";
const MAX_BASE_LEN: usize = 60;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const REPLY_GRACE: Duration = Duration::from_secs(5);
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(20);
const QUEUE_CAPACITY: usize = 8;

static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[^/.]+$").expect("extension pattern is a valid regex"));
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("unsafe-char pattern is a valid regex"));

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cloudinary is not configured. Missing CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY, or CLOUDINARY_API_SECRET.")]
    NotConfigured,
    #[error("Cloudinary rejected the upload ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Cloudinary request failed: {0}")]
    Transport(String),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotConfigured => ApiError::Internal(err.to_string()),
            other => {
                log::warn!("{other}");
                ApiError::BadGateway("Image upload failed".to_string())
            }
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// One queued upload and where to send its outcome.
struct UploadJob {
    bytes: Vec<u8>,
    content_type: String,
    public_id: String,
    reply: Sender<Result<String, UploadError>>,
}

/// Handle to the upload worker thread.
///
/// The HTTP client is blocking, so requests run on their own thread and the
/// calling coroutine polls for the reply instead of parking a `may` worker.
pub struct CloudinaryUploader {
    jobs: Sender<UploadJob>,
}

impl CloudinaryUploader {
    pub fn from_config(config: &CloudinaryConfig) -> Result<Self, UploadError> {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let (Some(cloud_name), Some(api_key), Some(api_secret)) = (
            present(&config.cloud_name),
            present(&config.api_key),
            present(&config.api_secret),
        ) else {
            return Err(UploadError::NotConfigured);
        };
        let http = reqwest::blocking::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let client = CloudinaryClient {
            http,
            upload_url: format!(
                "{}/v1_1/{}/image/upload",
                config.api_base.trim_end_matches('/'),
                cloud_name
            ),
            api_key,
            api_secret,
        };

        let (tx, rx) = bounded(QUEUE_CAPACITY);
        thread::Builder::new()
            .name("cloudinary-uploader".to_string())
            .spawn(move || client.run(rx))
            .map_err(|e| UploadError::Transport(format!("failed to start upload worker: {e}")))?;
        Ok(Self { jobs: tx })
    }

    /// Upload `bytes` under `public_id` in the product folder; returns the HTTPS URL.
    pub fn upload(&self, bytes: Vec<u8>, content_type: &str, public_id: &str) -> Result<String, UploadError> {
        let (reply, outcome) = bounded(1);
        let job = UploadJob {
            bytes,
            content_type: content_type.to_string(),
            public_id: public_id.to_string(),
            reply,
        };
        self.jobs.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => UploadError::Transport("upload queue is full".to_string()),
            TrySendError::Disconnected(_) => {
                UploadError::Transport("upload worker stopped".to_string())
            }
        })?;

        let deadline = Instant::now() + UPLOAD_TIMEOUT + REPLY_GRACE;
        loop {
            match outcome.try_recv() {
                Ok(result) => return result,
                Err(TryRecvError::Disconnected) => {
                    return Err(UploadError::Transport("upload worker stopped".to_string()))
                }
                Err(TryRecvError::Empty) if Instant::now() >= deadline => {
                    return Err(UploadError::Transport("upload timed out".to_string()))
                }
                Err(TryRecvError::Empty) => may::coroutine::sleep(REPLY_POLL_INTERVAL),
            }
        }
    }
}

struct CloudinaryClient {
    http: reqwest::blocking::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    fn run(self, jobs: Receiver<UploadJob>) {
        for job in jobs {
            let result = self.send(&job.bytes, &job.content_type, &job.public_id);
            // The caller may have given up waiting.
            let _ = job.reply.send(result);
        }
        log::debug!("cloudinary uploader stopped");
    }

    fn send(&self, bytes: &[u8], content_type: &str, public_id: &str) -> Result<String, UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", UPLOAD_FOLDER),
                ("public_id", public_id),
                ("timestamp", &timestamp),
            ],
            &self.api_secret,
        );
        let data_uri = format!("data:{content_type};base64,{}", STANDARD.encode(bytes));

        let response = self
            .http
            .post(&self.upload_url)
            .form(&[
                ("file", data_uri.as_str()),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("folder", UPLOAD_FOLDER),
                ("public_id", public_id),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        let parsed: UploadResponse = response
            .json()
            .map_err(|e| UploadError::Transport(format!("unreadable response: {e}")))?;
        Ok(parsed.secure_url)
    }
}

/// SHA-256 over `k=v` pairs sorted by key and joined with `&`, followed by the secret.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{to_sign}{secret}").as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}

/// `<millis>_<6 random [a-z0-9]>_<sanitized file stem>`
pub fn public_id<R: Rng>(original_name: &str, now_millis: i64, rng: &mut R) -> String {
    let stem = EXTENSION.replace(original_name, "");
    let safe = UNSAFE_CHARS.replace_all(&stem, "_");
    let base: String = safe.chars().take(MAX_BASE_LEN).collect();
    let suffix: String = (0..6)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
        .collect();
    let base = if base.is_empty() { "image" } else { base.as_str() };
    format!("{now_millis}_{suffix}_{base}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_signature_matches_known_digest() {
        let signature = sign(
            &[
                ("timestamp", "1700000000"),
                ("public_id", "abc"),
                ("folder", "store/products"),
            ],
            "secret",
        );
        assert_eq!(
            signature,
            "57eb204a3a2968c221084d88a3681968760a3708686e38c7e970ffd1c5c88485"
        );
    }

    #[test]
    fn test_public_id_sanitizes_file_name() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = public_id("My Photo (1).final.PNG", 1_700_000_000_123, &mut rng);
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "1700000000123");
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(parts[2], "My_Photo__1__final");
    }

    #[test]
    fn test_public_id_truncates_and_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let long = format!("{}.jpg", "a".repeat(100));
        let id = public_id(&long, 1, &mut rng);
        assert!(id.ends_with(&"a".repeat(60)));
        assert!(!id.ends_with(&"a".repeat(61)));

        let id = public_id(".png", 1, &mut rng);
        assert!(id.ends_with("_image"), "{id}");
    }

    #[test]
    fn test_missing_settings_are_reported() {
        let config = CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: None,
            api_secret: Some("s".to_string()),
            api_base: "https://api.cloudinary.com".to_string(),
        };
        let err = CloudinaryUploader::from_config(&config).err().unwrap();
        assert!(matches!(err, UploadError::NotConfigured));
        assert_eq!(ApiError::from(err).status(), 500);
    }

    #[test]
    fn test_unreachable_host_reports_transport_error() {
        let config = CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            api_base: "http://127.0.0.1:1".to_string(),
        };
        let uploader = CloudinaryUploader::from_config(&config).unwrap();
        let err = uploader
            .upload(b"png".to_vec(), "image/png", "1_abcdef_photo")
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)), "{err}");
        assert_eq!(ApiError::from(err).status(), 502);
    }

    #[test]
    fn test_host_failures_map_to_502() {
        let err = UploadError::Rejected {
            status: 401,
            body: "bad signature".to_string(),
        };
        assert_eq!(ApiError::from(err).status(), 502);
    }
}
