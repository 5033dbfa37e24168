use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::{Result, UpgradeError};
use super::release::Release;
use super::upgrader::Upgrader;

/// Where the previous binary is kept: `<binary>.old`.
pub fn backup_path(binary: &Path) -> PathBuf {
    let mut s = OsString::from(binary.as_os_str());
    s.push(".old");
    PathBuf::from(s)
}

impl Upgrader {
    /// Upgrade `binary` to the first asset of `rel` built for this platform.
    pub fn upgrade_to(&self, binary: &Path, rel: &Release) -> Result<PathBuf> {
        let asset = rel
            .matching_asset(&self.platform)
            .ok_or(UpgradeError::NoReleaseDownload)?;
        self.upgrade_to_url(asset.base_name(), binary, &asset.url)
    }

    /// Download, verify and install the archive at `url` over `binary`.
    ///
    /// `archive_name` is the name the release signature was made for. On
    /// success the previous binary is left at [`backup_path`], which is
    /// returned. Callers must not run two upgrades of the same binary at once.
    pub fn upgrade_to_url(
        &self,
        archive_name: &str,
        binary: &Path,
        url: &str,
    ) -> Result<PathBuf> {
        let dir = match binary.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = self.read_release(archive_name, dir, url)?;
        replace_binary(&temp, binary)
    }
}

/// Move `binary` to its backup path, then move `temp` into its place.
///
/// If the backup rename fails nothing has changed and `temp` stays on disk.
/// If the final rename fails the backup is moved back over `binary` and
/// `temp` is removed.
fn replace_binary(temp: &Path, binary: &Path) -> Result<PathBuf> {
    let old = backup_path(binary);
    match fs::remove_file(&old) {
        Ok(()) => debug!("removed previous backup {}", old.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("couldn't remove previous backup {}: {}", old.display(), e),
    }

    fs::rename(binary, &old)?;

    if let Err(e) = fs::rename(temp, binary) {
        if let Err(restore) = fs::rename(&old, binary) {
            warn!("couldn't restore {} from backup: {}", binary.display(), restore);
        }
        let _ = fs::remove_file(temp);
        return Err(e.into());
    }
    Ok(old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    use crate::upgrade::archive::tests::tar_gz;
    use crate::upgrade::limits::Limits;
    use crate::upgrade::platform::Platform;
    use crate::upgrade::release::Asset;
    use crate::upgrade::signature::tests::{sign, test_key};
    use crate::upgrade::upgrader::tests::test_upgrader;

    const NAME: &str = "syncthing-linux-amd64-v1.2.0.tar.gz";
    const OLD: &[u8] = b"old syncthing";
    const NEW: &[u8] = b"new syncthing";

    fn linux() -> Upgrader {
        test_upgrader(Platform::for_target("linux", "x86_64"), Limits::default())
    }

    fn serve(server: &MockServer, body: Vec<u8>) -> String {
        server.mock(|when, then| {
            when.method(GET)
                .path("/a.tar.gz")
                .header("Accept", "application/octet-stream");
            then.status(200).body(body);
        });
        server.url("/a.tar.gz")
    }

    #[test]
    fn backup_path_appends_old() {
        assert_eq!(backup_path(Path::new("/usr/bin/syncthing")), Path::new("/usr/bin/syncthing.old"));
        assert_eq!(backup_path(Path::new("syncthing.exe")), Path::new("syncthing.exe.old"));
    }

    #[test]
    fn upgrade_replaces_binary_and_keeps_backup() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        let server = MockServer::start();
        let sig = sign(&test_key(), NAME, NEW);
        let url = serve(&server, tar_gz(&[("syncthing", NEW), ("release.sig", &sig)]));

        let old = linux().upgrade_to_url(NAME, &bin, &url).unwrap();
        assert_eq!(old, td.path().join("syncthing.old"));
        assert_eq!(fs::read(&bin).unwrap(), NEW);
        assert_eq!(fs::read(&old).unwrap(), OLD);
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 2);
    }

    #[test]
    fn upgrade_supersedes_existing_backup() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();
        fs::write(backup_path(&bin), b"ancient syncthing").unwrap();

        let server = MockServer::start();
        let sig = sign(&test_key(), NAME, NEW);
        let url = serve(&server, tar_gz(&[("syncthing", NEW), ("release.sig", &sig)]));

        linux().upgrade_to_url(NAME, &bin, &url).unwrap();
        assert_eq!(fs::read(backup_path(&bin)).unwrap(), OLD);
    }

    #[test]
    fn missing_signature_leaves_binary_untouched() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        let server = MockServer::start();
        let url = serve(&server, tar_gz(&[("syncthing", NEW)]));

        let err = linux().upgrade_to_url(NAME, &bin, &url).unwrap_err();
        assert!(matches!(err, UpgradeError::NoSignatureFound));
        assert_eq!(fs::read(&bin).unwrap(), OLD);
        assert!(!backup_path(&bin).exists());
    }

    #[test]
    fn signature_for_other_archive_leaves_binary_untouched() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        let server = MockServer::start();
        let sig = sign(&test_key(), "syncthing-linux-amd64-v1.1.0.tar.gz", NEW);
        let url = serve(&server, tar_gz(&[("syncthing", NEW), ("release.sig", &sig)]));

        let err = linux().upgrade_to_url(NAME, &bin, &url).unwrap_err();
        assert!(matches!(err, UpgradeError::SignatureInvalid));
        assert_eq!(fs::read(&bin).unwrap(), OLD);
        assert!(!backup_path(&bin).exists());
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1);
    }

    #[test]
    fn download_error_propagates() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone.tar.gz");
            then.status(404);
        });

        let err = linux()
            .upgrade_to_url(NAME, &bin, &server.url("/gone.tar.gz"))
            .unwrap_err();
        assert!(matches!(err, UpgradeError::Http(_)));
        assert_eq!(fs::read(&bin).unwrap(), OLD);
    }

    #[test]
    fn upgrade_to_uses_matching_asset_base_name() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        let server = MockServer::start();
        let sig = sign(&test_key(), NAME, NEW);
        let url = serve(&server, tar_gz(&[("syncthing", NEW), ("release.sig", &sig)]));

        let rel = Release {
            tag: "v1.2.0".into(),
            prerelease: false,
            assets: vec![
                Asset {
                    name: "syncthing-windows-amd64-v1.2.0.zip".into(),
                    url: "http://127.0.0.1:9/unused".into(),
                },
                Asset {
                    name: format!("dist/{}", NAME),
                    url,
                },
            ],
        };
        linux().upgrade_to(&bin, &rel).unwrap();
        assert_eq!(fs::read(&bin).unwrap(), NEW);
    }

    #[test]
    fn upgrade_to_without_platform_asset_is_no_release_download() {
        let td = tempdir().unwrap();
        let rel = Release {
            tag: "v1.2.0".into(),
            prerelease: false,
            assets: vec![Asset {
                name: "syncthing-windows-amd64-v1.2.0.zip".into(),
                url: "http://127.0.0.1:9/unused".into(),
            }],
        };
        let err = linux().upgrade_to(&td.path().join("syncthing"), &rel).unwrap_err();
        assert!(matches!(err, UpgradeError::NoReleaseDownload));
    }

    #[test]
    fn failed_backup_rename_keeps_temp_binary() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        let temp = td.path().join("syncthing-new");
        fs::write(&temp, NEW).unwrap();

        // No binary at the target path, so the backup rename fails.
        assert!(replace_binary(&temp, &bin).is_err());
        assert_eq!(fs::read(&temp).unwrap(), NEW);
        assert!(!backup_path(&bin).exists());
    }

    #[test]
    fn failed_promotion_restores_backup() {
        let td = tempdir().unwrap();
        let bin = td.path().join("syncthing");
        fs::write(&bin, OLD).unwrap();

        // The temp binary vanished, so the promotion rename fails.
        let temp = td.path().join("does-not-exist");
        assert!(replace_binary(&temp, &bin).is_err());
        assert_eq!(fs::read(&bin).unwrap(), OLD);
        assert!(!backup_path(&bin).exists());
    }
}
