//! Scryfall bulk-data client
//!
//! Resolves dataset download locations from the bulk index and streams bulk
//! files to disk with ETag-conditional requests. Each transfer writes to its
//! own temporary `.part` file next to the destination, which is only renamed
//! over the destination once the whole body has arrived. A failed transfer
//! never clobbers the last good file, and concurrent transfers to one
//! destination never share a partial file.
//!
//! Every request goes through a [`seatbelt`] retry layer: connection failures,
//! timeouts and the configured transient status codes are retried with
//! exponential backoff.

use crate::config::HttpConfig;
use crate::error::{CacheError, Result};
use layered::{Execute, Service, Stack};
use mtg_common::{BulkDataset, BulkIndex, PrintRecord};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ETAG, IF_NONE_MATCH};
use reqwest::{Response, StatusCode};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::{RecoveryInfo, ResilienceContext};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tick::Clock;
use tokio::io::AsyncWriteExt;

/// Timeout for single-card lookups against the live API
const LIVE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded,
    NotModified,
}

/// Result of a conditional download
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub status: DownloadStatus,
    pub bytes_written: u64,
    /// Content-Length announced by the server (0 when absent)
    pub total_bytes: u64,
    pub etag: Option<String>,
    pub path: PathBuf,
}

/// One page of `/cards/search`
#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    data: Vec<PrintRecord>,
}

/// A GET request, cloned for every retry attempt
#[derive(Debug, Clone)]
struct GetRequest {
    url: String,
    query: Vec<(String, String)>,
    if_none_match: Option<String>,
    timeout: Duration,
}

impl GetRequest {
    fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            if_none_match: None,
            timeout,
        }
    }
}

/// Classify an attempt for retry purposes.
fn retry_decision(result: &Result<Response>, http: &HttpConfig) -> RecoveryInfo {
    match result {
        // Connection failures and timeouts are transient
        Err(CacheError::Network(e)) if e.is_connect() || e.is_timeout() => RecoveryInfo::retry(),
        Ok(response) if http.should_retry_status(response.status().as_u16()) => {
            RecoveryInfo::retry()
        }
        _ => RecoveryInfo::never(),
    }
}

/// Default ETag sidecar for a destination: `<path>.etag`
pub fn etag_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".etag");
    PathBuf::from(name)
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

async fn read_etag(path: &Path) -> Option<String> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    let etag = raw.trim();
    (!etag.is_empty()).then(|| etag.to_string())
}

/// Fresh temporary file beside `dest`, removed again when dropped
fn part_file_for(dest: &Path) -> Result<tempfile::TempPath> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = dest
        .file_name()
        .map_or_else(|| "download".into(), |n| n.to_string_lossy());
    let file = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// Stream a response body into `part`, returning the number of bytes written
async fn write_body(mut response: Response, part: &Path, expected: Option<u64>) -> Result<u64> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(part)
        .await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    if let Some(expected) = expected {
        if written != expected {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("received {} of {} bytes", written, expected),
            )));
        }
    }
    Ok(written)
}

/// HTTP client for the Scryfall bulk-data and card endpoints
pub struct BulkClient {
    client: reqwest::Client,
    http: HttpConfig,
}

impl BulkClient {
    pub fn new(http: HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .default_headers(headers)
            .build()?;
        log::debug!("Created bulk client (User-Agent: {})", http.user_agent);
        Ok(Self { client, http })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.http
    }

    /// Send a GET with automatic retry.
    ///
    /// Once retries are exhausted the last response is returned as-is so the
    /// caller can report its status.
    async fn resilient_get(&self, request: GetRequest) -> Result<Response> {
        let clock = Clock::new_tokio();
        let context = ResilienceContext::new(&clock).name("scryfall_get");

        let http = self.http.clone();
        let client = self.client.clone();
        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(move |result: &Result<Response>, _| {
                    retry_decision(result, &http)
                })
                .max_retry_attempts(self.http.max_retries)
                .base_delay(self.http.base_delay())
                .backoff(Backoff::Exponential)
                .on_retry(|_output, args| {
                    log::debug!(
                        "Retrying Scryfall request (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Execute::new(move |request: GetRequest| {
                let client = client.clone();
                async move {
                    let mut builder = client.get(&request.url).timeout(request.timeout);
                    if !request.query.is_empty() {
                        builder = builder.query(&request.query);
                    }
                    if let Some(etag) = &request.if_none_match {
                        builder = builder.header(IF_NONE_MATCH, etag.as_str());
                    }
                    builder.send().await.map_err(CacheError::from)
                }
            }),
        )
            .into_service();

        service.execute(request).await
    }

    /// Fetch the list of bulk datasets
    pub async fn fetch_bulk_index(&self) -> Result<Vec<BulkDataset>> {
        log::debug!("Fetching bulk index from {}", self.http.bulk_index_url);
        let response = self
            .resilient_get(GetRequest::new(
                &self.http.bulk_index_url,
                self.http.metadata_timeout,
            ))
            .await?;

        if !response.status().is_success() {
            return Err(CacheError::HttpStatus(response.status()));
        }
        let index: BulkIndex = response.json().await?;
        Ok(index.data)
    }

    /// Descriptor for one dataset kind; lookup failures are logged and reported as absent
    pub async fn bulk_metadata(&self, kind: &str) -> Option<BulkDataset> {
        match self.fetch_bulk_index().await {
            Ok(datasets) => datasets.into_iter().find(|d| d.kind == kind),
            Err(e) => {
                log::warn!("Failed to fetch bulk index: {}", e);
                None
            }
        }
    }

    /// Download location for one dataset kind
    pub async fn download_uri_for(&self, kind: &str) -> Option<String> {
        self.bulk_metadata(kind).await?.download_uri
    }

    /// Fetch one print straight from the Scryfall API.
    ///
    /// Tries `/cards/{set}/{number}` first, then an exact-name search scoped
    /// to the set and number when a name hint is given. Failures are logged
    /// and reported as absent.
    pub async fn fetch_live_print(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<PrintRecord> {
        let set = set_code.trim().to_lowercase();
        let number = collector_number.trim();
        if set.is_empty() || number.is_empty() {
            return None;
        }
        let base = self.http.api_base_url.trim_end_matches('/');

        let direct = GetRequest::new(format!("{base}/cards/{set}/{number}"), LIVE_LOOKUP_TIMEOUT);
        match self.resilient_get(direct).await {
            Ok(response) if response.status().is_success() => {
                match response.json::<PrintRecord>().await {
                    Ok(print) => return Some(print),
                    Err(e) => log::warn!("Unreadable card for {} #{}: {}", set, number, e),
                }
            }
            Ok(response) => log::debug!(
                "No card at {} #{} (HTTP {})",
                set,
                number,
                response.status()
            ),
            Err(e) => log::warn!("Card lookup for {} #{} failed: {}", set, number, e),
        }

        let name = name_hint.map(str::trim).filter(|n| !n.is_empty())?;
        let mut search = GetRequest::new(format!("{base}/cards/search"), LIVE_LOOKUP_TIMEOUT);
        search.query = vec![(
            "q".to_string(),
            format!("!\"{}\" set:{} cn:{}", name, set, number),
        )];
        match self.resilient_get(search).await {
            Ok(response) if response.status().is_success() => {
                match response.json::<CardList>().await {
                    Ok(list) => list.data.into_iter().next(),
                    Err(e) => {
                        log::warn!("Unreadable search result for {:?}: {}", name, e);
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Card search for {:?} failed: {}", name, e);
                None
            }
        }
    }

    /// Conditionally download `uri` to `dest`.
    ///
    /// Sends `If-None-Match` with the stored ETag unless `force_download` is
    /// set (which also discards the stored ETag). A `304` leaves `dest`
    /// untouched. Otherwise the body replaces `dest` atomically and the new
    /// ETag is stored next to it.
    pub async fn stream_download(
        &self,
        dest: &Path,
        uri: &str,
        etag_file: Option<&Path>,
        force_download: bool,
    ) -> Result<DownloadOutcome> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let etag_file = etag_file.map_or_else(|| etag_path_for(dest), Path::to_path_buf);

        let cached_etag = if force_download {
            remove_if_exists(&etag_file).await;
            None
        } else {
            read_etag(&etag_file).await
        };

        log::info!("Downloading {} -> {}", uri, dest.display());
        let mut request = GetRequest::new(uri, self.http.download_timeout);
        request.if_none_match = cached_etag.clone();
        let response = self.resilient_get(request).await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            log::info!("{} not modified (ETag match)", dest.display());
            return Ok(DownloadOutcome {
                status: DownloadStatus::NotModified,
                bytes_written: 0,
                total_bytes: 0,
                etag: cached_etag,
                path: dest.to_path_buf(),
            });
        }
        if !status.is_success() {
            return Err(CacheError::HttpStatus(status));
        }

        let total_bytes = response.content_length();
        let new_etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Dropping `part` on any error path deletes the partial file
        let part = part_file_for(dest)?;
        let written = write_body(response, &part, total_bytes).await?;
        part.persist(dest).map_err(|e| CacheError::Io(e.error))?;

        match &new_etag {
            Some(etag) => {
                if let Err(e) = tokio::fs::write(&etag_file, etag).await {
                    log::warn!("Failed to store ETag in {}: {}", etag_file.display(), e);
                }
            }
            None => remove_if_exists(&etag_file).await,
        }

        log::info!("Downloaded {} bytes to {}", written, dest.display());
        Ok(DownloadOutcome {
            status: DownloadStatus::Downloaded,
            bytes_written: written,
            total_bytes: total_bytes.unwrap_or(0),
            etag: new_etag,
            path: dest.to_path_buf(),
        })
    }
}

#[cfg(test)]
#[path = "bulk_tests.rs"]
mod tests;
