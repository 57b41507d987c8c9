//! File downloads from remote repositories (`http`, `https` and `file` URIs).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::repository::RemoteRepository;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a shared reqwest client for repository downloads.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            depot_util::errors::DepotError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Downloads repository files and counts every request it makes.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    requests: Arc<AtomicU64>,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of fetches issued so far, across all clones of this fetcher.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetch `relative` from `repo`.
    ///
    /// Returns `Ok(None)` when the repository does not have the file (404 or
    /// missing local file), and an error for every other failure.
    pub async fn fetch(
        &self,
        repo: &RemoteRepository,
        relative: &str,
    ) -> miette::Result<Option<Vec<u8>>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let url = repo.file_url(relative);
        if repo.is_file() {
            read_file_url(&url).await
        } else {
            download_bytes(&self.client, &url).await
        }
    }

    /// Fetch a text file (checksum sidecars).
    pub async fn fetch_text(
        &self,
        repo: &RemoteRepository,
        relative: &str,
    ) -> miette::Result<Option<String>> {
        Ok(self
            .fetch(repo, relative)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string()))
    }
}

async fn read_file_url(url: &str) -> miette::Result<Option<Vec<u8>>> {
    let path = Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| depot_util::errors::DepotError::Network {
            message: format!("Not a local file URI: {url}"),
        })?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(depot_util::errors::DepotError::Network {
            message: format!("Failed to read {url}: {e}"),
        }
        .into()),
    }
}

/// Download raw bytes from a URL, with retries.
///
/// Returns `Ok(None)` for 404 (file not found in this repo).
async fn download_bytes(client: &Client, url: &str) -> miette::Result<Option<Vec<u8>>> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(depot_util::errors::DepotError::Network {
                        message: format!("HTTP {status} fetching {url}"),
                    }
                    .into());
                }

                let bytes =
                    resp.bytes()
                        .await
                        .map_err(|e| depot_util::errors::DepotError::Network {
                            message: format!("Failed to read response from {url}: {e}"),
                        })?;
                tracing::debug!("downloaded {} bytes from {url}", bytes.len());
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(depot_util::errors::DepotError::Network {
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(depot_util::errors::DepotError::Network {
        message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
    }
    .into())
}
