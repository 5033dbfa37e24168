use std::time::Duration;

/// Network reads, including the full body, that take longer than this fail.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bounds applied to every read the pipeline performs.
///
/// The current binary hovers around 10 MB, so 64 MiB leaves room to grow.
/// The archive gets the same cap: the binary compresses and the rest of the
/// archive is small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_binary_size: u64,
    pub max_signature_size: u64,
    pub max_archive_size: u64,
    /// Stop looking for the binary and signature after this many members.
    pub max_archive_members: usize,
    pub max_metadata_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_binary_size: 64 << 20,
            max_signature_size: 1 << 10,
            max_archive_size: 64 << 20,
            max_archive_members: 100,
            max_metadata_size: 100 << 10,
        }
    }
}
