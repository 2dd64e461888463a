pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod logging;
pub mod naming;
pub mod resolver;

// Re-export main types for convenience
pub use cli::LoadCommand;
pub use config::LoaderConfig;
pub use downloader::{DownloadReport, FailedAsset, PageLoader, SavedAsset};
pub use error::{FetchError, MirrorError};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use file_manager::FileManager;
pub use html_parser::{AssetReference, HtmlDocument, PathMapping, ReferenceClass};
pub use naming::{name_for, name_for_port};
pub use resolver::{is_same_site, normalize, resolve};
