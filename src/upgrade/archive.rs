use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{Result, UpgradeError};
use super::limits::Limits;
use super::platform::ArchiveFormat;
use super::release::base_name;
use super::upgrader::Upgrader;

/// Name of the detached signature member. It may sit anywhere in the archive.
pub const SIGNATURE_NAME: &str = "release.sig";

#[cfg(unix)]
pub fn make_executable(p: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perm = fs::metadata(p)?.permissions();
    perm.set_mode(0o755);
    fs::set_permissions(p, perm)
}
#[cfg(not(unix))]
pub fn make_executable(_p: &Path) -> io::Result<()> {
    Ok(())
}

/// Something worth keeping found in a single archive member.
#[derive(Debug)]
pub(crate) enum Found {
    Binary(PathBuf),
    Signature(Vec<u8>),
}

/// What a scan over the archive members has collected so far.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    binary: Option<PathBuf>,
    signature: Option<Vec<u8>>,
}

impl Scan {
    fn record(&mut self, found: Found) {
        match found {
            Found::Binary(path) => {
                if let Some(prev) = self.binary.replace(path) {
                    let _ = fs::remove_file(prev);
                }
            }
            Found::Signature(sig) => self.signature = Some(sig),
        }
    }

    fn complete(&self) -> bool {
        self.binary.is_some() && self.signature.is_some()
    }
}

/// Per-scan settings handed to the member visitor.
pub(crate) struct MemberVisitor<'a> {
    dir: &'a Path,
    binary_name: &'a str,
    limits: &'a Limits,
}

impl MemberVisitor<'_> {
    /// Look at one member and extract it if it is the binary or the signature.
    ///
    /// The binary only counts at the archive root or directly inside one
    /// top-level folder; deeper copies may be something else entirely.
    fn visit<R: Read>(&self, archive_path: &str, data: &mut R) -> Result<Option<Found>> {
        let filename = base_name(archive_path);
        debug!("considering file {}", archive_path);

        if filename == self.binary_name {
            if dir_depth(archive_path) > 1 {
                return Ok(None);
            }
            debug!("found upgrade binary {}", archive_path);
            let mut limited = data.take(self.limits.max_binary_size);
            let path = write_binary(self.dir, &mut limited)?;
            return Ok(Some(Found::Binary(path)));
        }

        if filename == SIGNATURE_NAME {
            debug!("found signature {}", archive_path);
            let mut sig = Vec::new();
            data.take(self.limits.max_signature_size).read_to_end(&mut sig)?;
            return Ok(Some(Found::Signature(sig)));
        }

        Ok(None)
    }
}

/// Number of directory components above the member's file name.
fn dir_depth(archive_path: &str) -> usize {
    let parts = archive_path
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .count();
    parts.saturating_sub(1)
}

/// Stream the binary into a new executable temp file in `dir`.
///
/// A partially written file is removed when the copy fails.
fn write_binary<R: Read>(dir: &Path, data: &mut R) -> Result<PathBuf> {
    let mut out = tempfile::Builder::new().prefix("syncthing").tempfile_in(dir)?;
    io::copy(data, &mut out)?;
    make_executable(out.path())?;
    let (_file, path) = out.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// A container format that can be scanned for the binary and signature.
///
/// Both implementations stop after `max_archive_members` members and abort the
/// scan at the first member whose declared size exceeds `max_binary_size`,
/// without reading it.
trait ArchiveReader {
    fn scan(&self, body: &mut dyn Read, visitor: &MemberVisitor<'_>) -> Result<Scan>;
}

/// Needs the whole body in memory for random access.
struct ZipReader;

/// Single streaming pass over the gzip stream.
struct TarGzReader;

impl ArchiveReader for ZipReader {
    fn scan(&self, body: &mut dyn Read, visitor: &MemberVisitor<'_>) -> Result<Scan> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        let mut archive = zip::ZipArchive::new(Cursor::new(buf))?;

        let mut scan = Scan::default();
        for i in 0..archive.len().min(visitor.limits.max_archive_members) {
            let mut file = archive.by_index(i)?;
            if file.size() > visitor.limits.max_binary_size {
                break;
            }
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if let Some(found) = visitor.visit(&name, &mut file)? {
                scan.record(found);
            }
            if scan.complete() {
                break;
            }
        }
        Ok(scan)
    }
}

impl ArchiveReader for TarGzReader {
    fn scan(&self, body: &mut dyn Read, visitor: &MemberVisitor<'_>) -> Result<Scan> {
        let mut archive = tar::Archive::new(GzDecoder::new(body));

        let mut scan = Scan::default();
        for entry in archive.entries()?.take(visitor.limits.max_archive_members) {
            let mut entry = entry?;
            if entry.size() > visitor.limits.max_binary_size {
                break;
            }
            if entry.header().entry_type().is_dir() {
                continue;
            }
            let name = entry.path()?.to_string_lossy().into_owned();
            if let Some(found) = visitor.visit(&name, &mut entry)? {
                scan.record(found);
            }
            if scan.complete() {
                break;
            }
        }
        Ok(scan)
    }
}

fn reader_for(format: ArchiveFormat) -> &'static dyn ArchiveReader {
    match format {
        ArchiveFormat::Zip => &ZipReader,
        ArchiveFormat::TarGz => &TarGzReader,
    }
}

impl Upgrader {
    /// Download the archive at `url` and extract a verified binary into `dir`.
    ///
    /// Returns the path of the temp binary, which has passed signature
    /// verification for `archive_name`.
    pub fn read_release(&self, archive_name: &str, dir: &Path, url: &str) -> Result<PathBuf> {
        debug!("loading {:?}", url);
        let mut body = self.client.get_bounded(
            url,
            Some("application/octet-stream"),
            self.limits.max_archive_size,
        )?;
        self.read_archive(archive_name, dir, &mut body)
    }

    /// Scan an already opened archive body in the platform's container format.
    pub fn read_archive(
        &self,
        archive_name: &str,
        dir: &Path,
        body: &mut dyn Read,
    ) -> Result<PathBuf> {
        let visitor = MemberVisitor {
            dir,
            binary_name: self.platform.binary_name,
            limits: &self.limits,
        };
        let scan = reader_for(self.platform.format).scan(body, &visitor)?;
        self.verify_upgrade(archive_name, scan)
    }

    /// Require both halves of the artifact, then check the signature.
    ///
    /// A missing half leaves any temp binary where it is; a bad signature
    /// deletes it.
    fn verify_upgrade(&self, archive_name: &str, scan: Scan) -> Result<PathBuf> {
        let Some(binary) = scan.binary else {
            return Err(UpgradeError::NoUpgradeFound);
        };
        let Some(signature) = scan.signature else {
            return Err(UpgradeError::NoSignatureFound);
        };
        self.verifier.verify(archive_name, &binary, &signature)?;
        Ok(binary)
    }
}
