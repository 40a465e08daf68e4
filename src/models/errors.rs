use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Navigation to {url} timed out")]
    Timeout { url: String },
    #[error("Navigation to {url} failed: {reason}")]
    Failed { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Explorer returned HTTP {status} for {address}")]
    HttpStatus { address: String, status: u16 },
    #[error("Explorer reported an error for {address}: {message}")]
    Api { address: String, message: String },
    #[error("Malformed explorer response for {address}: {reason}")]
    Malformed { address: String, reason: String },
    #[error("Explorer request for {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No chain matches '{keyword}'. Pass --chain-id to resolve wallets explicitly")]
    UnresolvableChain { keyword: String },
    #[error("Missing required credential: {name}")]
    MissingCredential { name: String },
    #[error("Invalid job count {jobs}: at least one worker is required")]
    InvalidJobCount { jobs: usize },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: String, column: String },
    #[error("Failed to read URL file {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("urlscan returned HTTP {status}")]
    UrlscanStatus { status: u16 },
}
