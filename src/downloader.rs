use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::ProgressBar;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::LoaderConfig;
use crate::error::{FetchError, MirrorError, Result};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::file_manager::FileManager;
use crate::html_parser::{HtmlDocument, PathMapping, ReferenceClass};
use crate::naming::{self, ASSETS_DIR_SUFFIX, PAGE_SUFFIX};
use crate::resolver;

#[derive(Debug, Clone, Serialize)]
pub struct SavedAsset {
    pub url: String,
    pub path: PathBuf,
    /// Attribute values in the page that pointed at this asset.
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAsset {
    pub url: String,
    pub references: Vec<String>,
    pub reason: String,
    pub cancelled: bool,
}

/// Outcome of one page download. Failed assets keep their remote
/// references in the saved page.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub page_url: String,
    pub page_path: PathBuf,
    pub assets_dir: Option<PathBuf>,
    pub saved: Vec<SavedAsset>,
    pub failed: Vec<FailedAsset>,
    pub rewritten: usize,
    pub cancelled: bool,
}

/// Downloads one page and its same-site assets.
pub struct PageLoader {
    fetcher: Arc<dyn Fetcher>,
    config: LoaderConfig,
    classes: Vec<ReferenceClass>,
    progress: ProgressBar,
}

impl PageLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: LoaderConfig) -> Self {
        Self {
            fetcher,
            config,
            classes: ReferenceClass::ALL.to_vec(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Only look for the given kinds of references.
    pub fn with_classes(mut self, classes: &[ReferenceClass]) -> Self {
        self.classes = classes.to_vec();
        self
    }

    /// Report asset fetches on `progress`. Its length is set per download.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub async fn download(&self, url: &str, output_dir: &Path) -> Result<DownloadReport> {
        self.download_with_cancel(url, output_dir, CancellationToken::new())
            .await
    }

    /// Download `url` into `output_dir`.
    ///
    /// Cancelling `cancel` (or hitting the configured deadline) fails the
    /// outstanding asset fetches; the page is still saved with their
    /// references untouched. Cancellation before the page itself arrives is
    /// an error. The returned future is not `Send`: the document tree lives
    /// on the calling task.
    #[tracing::instrument(skip(self, output_dir, cancel))]
    pub async fn download_with_cancel(
        &self,
        url: &str,
        output_dir: &Path,
        cancel: CancellationToken,
    ) -> Result<DownloadReport> {
        let cancel = cancel.child_token();
        let _stop_watchdog = cancel.clone().drop_guard();
        if let Some(deadline) = self.config.deadline {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(deadline) => {
                        tracing::warn!(?deadline, "deadline reached, cancelling downloads");
                        token.cancel();
                    }
                }
            });
        }

        let page_url = resolver::normalize(url)?;
        let files = FileManager::new(output_dir)?;

        tracing::info!(url = %page_url, "downloading page");
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(MirrorError::Cancelled { url: page_url.to_string() });
            }
            response = self.fetcher.fetch(&page_url) => response,
        };
        let response = response.map_err(|source| MirrorError::FetchFailure {
            url: page_url.to_string(),
            source,
        })?;
        if !response.is_success() {
            return Err(MirrorError::FetchFailure {
                url: page_url.to_string(),
                source: FetchError::Status(response.status),
            });
        }

        let port = resolver::written_port(url);
        let page_name = naming::name_for_port(&page_url, port, None, Some(PAGE_SUFFIX));
        let assets_name = naming::name_for_port(&page_url, port, None, Some(ASSETS_DIR_SUFFIX));

        let mut document =
            HtmlDocument::from_bytes(&response.body, response.content_type.as_deref());
        let pending = self.plan_assets(&page_url, &document);
        tracing::debug!(assets = pending.len(), "same-site assets discovered");

        let mut report = DownloadReport {
            page_url: page_url.to_string(),
            page_path: PathBuf::new(),
            assets_dir: None,
            saved: Vec::new(),
            failed: Vec::new(),
            rewritten: 0,
            cancelled: false,
        };

        if !pending.is_empty() {
            let assets_dir = files.mkdir_if_absent(&assets_name)?;
            let mapping = self
                .fetch_assets(pending, &files, &assets_dir, &cancel, &mut report)
                .await?;
            report.rewritten = document.rewrite(&self.classes, &mapping, &assets_dir);
            report.assets_dir = Some(assets_dir);
        }

        report.cancelled = report.failed.iter().any(|f| f.cancelled);
        report.page_path = files.write_bytes(Path::new(&page_name), &document.to_bytes()?)?;
        tracing::info!(
            path = %report.page_path.display(),
            saved = report.saved.len(),
            failed = report.failed.len(),
            "page saved"
        );

        Ok(report)
    }

    /// Same-site, fetchable asset URLs mapped to the raw references that
    /// name them. Ordered by URL so runs are reproducible.
    fn plan_assets(&self, page_url: &Url, document: &HtmlDocument) -> BTreeMap<Url, Vec<String>> {
        let mut pending: BTreeMap<Url, Vec<String>> = BTreeMap::new();

        for reference in document.asset_references(&self.classes) {
            let raw = reference.raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            if !resolver::is_same_site(page_url, raw) {
                tracing::debug!(reference = raw, "skipping off-site reference");
                continue;
            }

            let absolute = match resolver::resolve(raw, page_url) {
                Ok(absolute) if resolver::is_http(&absolute) => absolute,
                Ok(_) => continue,
                Err(error) => {
                    tracing::debug!(reference = raw, %error, "skipping unresolvable reference");
                    continue;
                }
            };
            if absolute == *page_url {
                continue;
            }

            let references = pending.entry(absolute).or_default();
            if !references.contains(&reference.raw) {
                references.push(reference.raw);
            }
        }

        pending
    }

    async fn fetch_assets(
        &self,
        pending: BTreeMap<Url, Vec<String>>,
        files: &FileManager,
        assets_dir: &Path,
        cancel: &CancellationToken,
        report: &mut DownloadReport,
    ) -> Result<PathMapping> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();
        self.progress.set_length(pending.len() as u64);

        for (url, references) in pending {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let outcome = fetch_asset(fetcher.as_ref(), &url, &semaphore, &cancel).await;
                (url, references, outcome)
            });
        }

        let mut mapping = PathMapping::new();
        while let Some(joined) = tasks.join_next().await {
            let (url, references, outcome) = match joined {
                Ok(done) => done,
                Err(error) => {
                    tracing::error!(%error, "asset task aborted");
                    continue;
                }
            };
            self.progress.inc(1);

            match outcome {
                Ok(response) => {
                    let name = naming::name_for(
                        &response.final_url,
                        response.content_type.as_deref(),
                        None,
                    );
                    let path = files.write_bytes(&assets_dir.join(&name), &response.body)?;
                    tracing::info!(%url, path = %path.display(), "asset saved");
                    for raw in &references {
                        mapping.insert(raw.clone(), path.clone());
                    }
                    report.saved.push(SavedAsset {
                        url: url.to_string(),
                        path,
                        references,
                    });
                }
                Err(error) => {
                    tracing::warn!(%url, %error, "asset skipped");
                    report.failed.push(FailedAsset {
                        url: url.to_string(),
                        references,
                        reason: error.to_string(),
                        cancelled: matches!(error, FetchError::Cancelled),
                    });
                }
            }
        }

        report.saved.sort_by(|a, b| a.url.cmp(&b.url));
        report.failed.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(mapping)
    }
}

async fn fetch_asset(
    fetcher: &dyn Fetcher,
    url: &Url,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> Result<FetchResponse, FetchError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        permit = semaphore.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
    };

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        response = fetcher.fetch(url) => response?,
    };

    if !response.is_success() {
        return Err(FetchError::Status(response.status));
    }
    Ok(response)
}
