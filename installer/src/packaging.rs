//! Distributable msquic packages.
//!
//! The installed `msquic/` tree, with the upstream `LICENSE` added, is packed
//! into `msquic-<version>_<target>.zip` (Windows) or `.tar.gz` (everything
//! else). A `msquic.env` file next to the archive records its name and MIME
//! type for the upload step:
//!
//! ```text
//! CONTENT_TYPE=application/gzip
//! PACKAGE_NAME=msquic-v2.2.4_ubuntu-20.04_x86_64.tar.gz
//! ```

use crate::error::{InstallerError, Result};
use crate::layout::Layout;
use crate::target::Target;
use camino::Utf8PathBuf;
use log::info;
use pinbuild::ArchiveFormat;
use pinbuild::archive::pack_directory;
use pinbuild_common::{make_dir_all, remove_all};
use std::fs;

/// Name of the metadata file written next to the archive.
pub const ENV_FILE_NAME: &str = "msquic.env";

/// Inputs of [`package`] that identify the build.
#[derive(Clone, Copy, Debug)]
pub struct PackageRequest<'a> {
    /// Work directories.
    pub layout: &'a Layout,
    /// Platform that was built.
    pub target: Target,
    /// Pinned msquic version, as written in `VERSION`.
    pub msquic_version: &'a str,
}

/// What [`package`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageOutput {
    /// The archive.
    pub archive: Utf8PathBuf,
    /// Its format.
    pub format: ArchiveFormat,
    /// The `msquic.env` file.
    pub env_file: Utf8PathBuf,
}

/// File name of the archive for `version` and `target`.
///
/// # Examples
///
/// ```
/// use pinbuild_installer::packaging::package_name;
/// use pinbuild_installer::target::Target;
///
/// assert_eq!(package_name("v2.2.4", Target::WindowsX86_64), "msquic-v2.2.4_windows_x86_64.zip");
/// assert_eq!(package_name("v2.2.4", Target::Ios), "msquic-v2.2.4_ios.tar.gz");
/// ```
#[must_use]
pub fn package_name(version: &str, target: Target) -> String {
    format!(
        "msquic-{version}_{target}.{}",
        target.package_format().extension()
    )
}

/// Recreates the package directory and writes the archive and env file.
///
/// # Errors
///
/// Returns an error when the license cannot be copied, the archive cannot
/// be written, or the env file cannot be written.
pub fn package(request: &PackageRequest<'_>) -> Result<PackageOutput> {
    let layout = request.layout;
    let package_dir = layout.package_dir();
    remove_all(package_dir)?;
    make_dir_all(package_dir)?;

    let license = layout.msquic_source().join("LICENSE");
    let bundled = layout.msquic_install().join("LICENSE");
    fs::copy(&license, &bundled).map_err(|source| InstallerError::Copy {
        from: license.clone(),
        to: bundled.clone(),
        source,
    })?;

    let format = request.target.package_format();
    let name = package_name(request.msquic_version, request.target);
    let archive = package_dir.join(&name);
    let entries = pack_directory(layout.install_dir(), "msquic", &archive, format)?;
    info!("Packaged {entries} files into {archive}");

    let env_file = package_dir.join(ENV_FILE_NAME);
    let contents = format!("CONTENT_TYPE={}\nPACKAGE_NAME={name}\n", format.content_type());
    fs::write(&env_file, contents).map_err(|source| InstallerError::Write {
        path: env_file.clone(),
        source,
    })?;

    Ok(PackageOutput {
        archive,
        format,
        env_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Configuration;
    use camino::Utf8Path;
    use pinbuild::archive::extract;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Built {
        _temp: TempDir,
        layout: Layout,
    }

    fn built(target: Target) -> Built {
        let temp = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
        let layout = Layout::new(&base, target, Configuration::Release);
        layout.create().expect("create layout");
        let write = |path: &Utf8Path, content: &str| {
            fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
            fs::write(path, content).expect("write file");
        };
        write(&layout.msquic_source().join("LICENSE"), "MIT License");
        write(&layout.msquic_install().join("lib").join(target.library_name()), "lib");
        write(&layout.msquic_install().join("include/msquic.h"), "header");
        Built { _temp: temp, layout }
    }

    #[fixture]
    fn linux() -> Built {
        built(Target::Ubuntu2004X86_64)
    }

    #[rstest]
    fn tarball_package_bundles_license_and_env(linux: Built) {
        let stale = linux.layout.package_dir().join("old.tar.gz");
        fs::create_dir_all(linux.layout.package_dir()).expect("create package dir");
        fs::write(&stale, "old").expect("write stale package");

        let output = package(&PackageRequest {
            layout: &linux.layout,
            target: Target::Ubuntu2004X86_64,
            msquic_version: "v2.2.4",
        })
        .expect("package");

        assert!(!stale.exists());
        assert_eq!(output.format, ArchiveFormat::TarGz);
        assert_eq!(
            output.archive.file_name(),
            Some("msquic-v2.2.4_ubuntu-20.04_x86_64.tar.gz")
        );
        assert_eq!(
            fs::read_to_string(&output.env_file).expect("env file"),
            "CONTENT_TYPE=application/gzip\nPACKAGE_NAME=msquic-v2.2.4_ubuntu-20.04_x86_64.tar.gz\n"
        );

        let unpacked = extract(&output.archive, &linux.layout.base_dir().join("check"), "msquic", None)
            .expect("extract package");
        assert_eq!(fs::read_to_string(unpacked.join("LICENSE")).expect("license"), "MIT License");
        assert!(unpacked.join("lib/libmsquic.a").is_file());
        assert!(unpacked.join("include/msquic.h").is_file());
    }

    #[rstest]
    fn windows_package_is_a_zip() {
        let windows = built(Target::WindowsX86_64);

        let output = package(&PackageRequest {
            layout: &windows.layout,
            target: Target::WindowsX86_64,
            msquic_version: "v2.2.4",
        })
        .expect("package");

        assert_eq!(output.format, ArchiveFormat::Zip);
        let env = fs::read_to_string(&output.env_file).expect("env file");
        assert!(env.starts_with("CONTENT_TYPE=application/zip\n"));
        assert!(env.contains("PACKAGE_NAME=msquic-v2.2.4_windows_x86_64.zip"));
    }

    #[rstest]
    fn missing_license_is_reported(linux: Built) {
        fs::remove_file(linux.layout.msquic_source().join("LICENSE")).expect("remove license");

        let err = package(&PackageRequest {
            layout: &linux.layout,
            target: Target::Ubuntu2004X86_64,
            msquic_version: "v2.2.4",
        })
        .expect_err("no license");

        assert!(matches!(err, InstallerError::Copy { .. }));
    }
}
