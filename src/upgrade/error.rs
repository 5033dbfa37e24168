/// Result alias used throughout the upgrade pipeline.
pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Everything the upgrade pipeline can fail with.
///
/// The first five variants are the pipeline's own verdicts and are what callers
/// usually match on. The rest wrap errors from transport, decoding and the
/// filesystem and are passed through unchanged.
#[derive(thiserror::Error, Debug)]
pub enum UpgradeError {
    /// Release selection was handed an empty list.
    #[error("no version to select")]
    NoVersionToSelect,
    /// No eligible release carries an asset for this platform.
    #[error("no release download found for this platform")]
    NoReleaseDownload,
    /// The archive did not contain the platform binary.
    #[error("no upgrade found")]
    NoUpgradeFound,
    /// The archive did not contain `release.sig`.
    #[error("no signature found")]
    NoSignatureFound,
    /// The signature did not verify against the archive name and binary.
    #[error("signature invalid")]
    SignatureInvalid,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("release metadata: {0}")]
    Json(#[from] serde_json::Error),
    /// The compiled-in or configured public key is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}
