use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;

use crate::constants::{
    DATA_PART_NAME, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_MIME_TYPE, DEFAULT_UPLOAD_TIMEOUT_SECS, ERROR_FAILED_TO_READ_FILE,
    FILES_PART_NAME, MAX_LOGGED_RESPONSE_CHARS, PLACEHOLDER_ENDPOINT,
};
use crate::delivery::scratch::{ScratchDir, ScratchFile};
use crate::delivery::{AttachedFile, DeliveryOutcome, FileReference};
use crate::sources::ContentResolver;
use crate::utils::mime::guess_mime;

/// One attachment copied into scratch, ready to be streamed as a multipart part.
#[derive(Debug, Clone)]
pub(crate) struct PreparedFile {
    pub name: String,
    pub mime_type: String,
    pub scratch: ScratchFile,
}

impl PreparedFile {
    fn summary(&self) -> AttachedFile {
        AttachedFile {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.scratch.size,
            sha256: self.scratch.sha256.clone(),
        }
    }
}

/// Everything that goes into one POST.
#[derive(Debug, Clone)]
pub(crate) struct UploadBatch {
    pub data: String,
    pub files: Vec<PreparedFile>,
    pub skipped: Vec<String>,
}

/// A multipart form together with the files that made it into the form.
pub(crate) struct UploadForm {
    pub form: Form,
    pub attached: Vec<AttachedFile>,
    pub skipped: Vec<String>,
}

impl UploadBatch {
    /// Number of multipart parts the batch produces
    pub fn part_count(&self) -> usize {
        1 + self.files.len()
    }

    /// Build the form. File parts stream from their scratch copies, so no
    /// attachment is held in memory. A scratch file that can no longer be
    /// opened is skipped.
    async fn into_form(self) -> reqwest::Result<UploadForm> {
        let data = Part::text(self.data).mime_str("application/json")?;
        let mut form = Form::new().part(DATA_PART_NAME, data);
        let mut attached = Vec::with_capacity(self.files.len());
        let mut skipped = self.skipped;

        for file in self.files {
            let handle = match tokio::fs::File::open(&file.scratch.path).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("{} {}: {}", ERROR_FAILED_TO_READ_FILE, file.scratch.path.display(), e);
                    skipped.push(file.name);
                    continue;
                }
            };

            let summary = file.summary();
            let body = Body::wrap_stream(ReaderStream::new(handle));
            let part = Part::stream_with_length(body, file.scratch.size)
                .file_name(file.name)
                .mime_str(&file.mime_type)?;
            form = form.part(FILES_PART_NAME, part);
            attached.push(summary);
        }

        Ok(UploadForm { form, attached, skipped })
    }
}

/// Copy every reference into scratch, hashing it on the way. A reference
/// that cannot be read is logged and left out of the batch.
pub(crate) fn prepare_batch(
    serialized: &str,
    references: &[FileReference],
    resolver: &dyn ContentResolver,
    scratch: &mut ScratchDir,
) -> UploadBatch {
    let mut files = Vec::with_capacity(references.len());
    let mut skipped = Vec::new();

    for reference in references {
        match prepare_file(reference, resolver, scratch) {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!("Skipping attachment {} ({}): {:#}", reference.name, reference.location, e);
                skipped.push(reference.name.clone());
            }
        }
    }

    UploadBatch {
        data: serialized.to_string(),
        files,
        skipped,
    }
}

fn prepare_file(reference: &FileReference, resolver: &dyn ContentResolver, scratch: &mut ScratchDir) -> Result<PreparedFile> {
    let copied = scratch
        .materialize(&reference.location, &reference.name, resolver)
        .context("Failed to copy into scratch")?;

    Ok(PreparedFile {
        name: reference.name.clone(),
        mime_type: part_mime_type(&reference.mime_type, &reference.name),
        scratch: copied,
    })
}

/// Recorded MIME type when it is a concrete `type/subtype`, otherwise inferred
/// from the file name.
fn part_mime_type(recorded: &str, name: &str) -> String {
    let recorded = recorded.trim();
    let concrete = recorded
        .split_once('/')
        .map_or(false, |(top, sub)| !top.is_empty() && !sub.is_empty() && sub != "*");
    if concrete && !recorded.contains(char::is_whitespace) {
        return recorded.to_string();
    }

    let guessed = guess_mime(name);
    if guessed == DEFAULT_MIME_TYPE && !recorded.is_empty() {
        debug!("Unusable MIME type '{}' for {}, sending as {}", recorded, name, DEFAULT_MIME_TYPE);
    }
    guessed.to_string()
}

/// Uploads snapshots to one HTTP endpoint.
pub struct DeliveryClient {
    endpoint: String,
    http: Client,
    resolver: Arc<dyn ContentResolver>,
    scratch_root: PathBuf,
}

impl DeliveryClient {
    pub fn new(endpoint: &str, resolver: Arc<dyn ContentResolver>, scratch_root: PathBuf) -> Result<Self> {
        Self::with_timeouts(
            endpoint,
            resolver,
            scratch_root,
            Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(
        endpoint: &str,
        resolver: Arc<dyn ContentResolver>,
        scratch_root: PathBuf,
        upload_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(upload_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: endpoint.trim().to_string(),
            http,
            resolver,
            scratch_root,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True when no real endpoint has been configured
    pub fn is_placeholder(&self) -> bool {
        self.endpoint.is_empty() || self.endpoint == PLACEHOLDER_ENDPOINT
    }

    /// Upload the serialized snapshot and every readable referenced file.
    ///
    /// Never returns an error: every failure is reported through the outcome.
    pub async fn deliver(&self, serialized: &str, references: &[FileReference]) -> DeliveryOutcome {
        if self.is_placeholder() {
            warn!("Upload endpoint is not configured, skipping delivery");
            return DeliveryOutcome::SkippedPlaceholder;
        }

        let scratch = match ScratchDir::create(&self.scratch_root) {
            Ok(scratch) => scratch,
            Err(e) => {
                error!("Cannot prepare attachments: {:#}", e);
                return DeliveryOutcome::Failed { reason: format!("{:#}", e) };
            }
        };

        let resolver = Arc::clone(&self.resolver);
        let data = serialized.to_string();
        let references = references.to_vec();
        let prepared = tokio::task::spawn_blocking(move || {
            let mut scratch = scratch;
            let batch = prepare_batch(&data, &references, resolver.as_ref(), &mut scratch);
            (scratch, batch)
        })
        .await;

        let (scratch, batch) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Attachment preparation aborted: {}", e);
                return DeliveryOutcome::Failed {
                    reason: format!("attachment preparation aborted: {}", e),
                };
            }
        };

        let outcome = self.send(batch).await;
        drop(scratch);
        outcome
    }

    async fn send(&self, batch: UploadBatch) -> DeliveryOutcome {
        let UploadForm { form, attached, skipped } = match batch.into_form().await {
            Ok(built) => built,
            Err(e) => {
                error!("Failed to build upload form: {}", e);
                return DeliveryOutcome::Failed {
                    reason: format!("failed to build upload form: {}", e),
                };
            }
        };

        info!(
            "Uploading snapshot with {} attachment(s) to {} ({} skipped)",
            attached.len(),
            self.endpoint,
            skipped.len()
        );

        let response = match self.http.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("upload timed out: {}", e)
                } else {
                    format!("upload failed: {}", e)
                };
                error!("{}", reason);
                return DeliveryOutcome::Failed { reason };
            }
        };

        let status = response.status();
        // Drained on every path so the connection is released
        let body = response.text().await.unwrap_or_else(|e| {
            debug!("Could not read response body: {}", e);
            String::new()
        });
        let logged: String = body.chars().take(MAX_LOGGED_RESPONSE_CHARS).collect();

        if status.is_success() {
            info!("Upload accepted with status {}", status);
            debug!("Response body: {}", logged);
            DeliveryOutcome::Delivered {
                status: status.as_u16(),
                attached,
                skipped,
            }
        } else {
            warn!("Upload rejected with status {}: {}", status, logged);
            DeliveryOutcome::Rejected {
                status: status.as_u16(),
                body: logged,
            }
        }
    }
}
