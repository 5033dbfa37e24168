/// Container format the release archives use on a given platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

/// Everything platform-dependent about an upgrade, resolved once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    pub format: ArchiveFormat,
    /// Name of the executable member inside the archive.
    pub binary_name: &'static str,
}

impl Platform {
    /// Profile of the host this binary was built for.
    pub fn current() -> Self {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Profile for a Rust `(OS, ARCH)` pair, using release naming.
    pub fn for_target(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" | "darwin" => "macos",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            other => other,
        };
        let (format, binary_name) = if os == "windows" {
            (ArchiveFormat::Zip, "syncthing.exe")
        } else {
            (ArchiveFormat::TarGz, "syncthing")
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            format,
            binary_name,
        }
    }

    /// Prefix every archive for `tag` on this platform starts with,
    /// e.g. `syncthing-linux-amd64-v1.2.0.`.
    pub fn release_prefix(&self, tag: &str) -> String {
        format!("syncthing-{}-{}-{}.", self.os, self.arch, tag)
    }
}
