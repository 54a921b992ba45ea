//! The file_utils module contains utility functions related to interactions with the filesystem.

use alloc::vec::Vec;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, error};
use walkdir::WalkDir;

use crate::util::error::{Error, Result};
use crate::x509::certificate::CertificateChain;

#[cfg(feature = "revocation")]
use crate::revocation::crl::{parse_crls, Crl};

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes
/// containing the contents of that file or an [Error::StdIoError].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(filename)?;
    let metadata = std::fs::metadata(filename)?;
    let mut buffer = alloc::vec![0; metadata.len() as usize];
    f.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// `files_in_folder` returns the regular files directly inside `dir`, sorted by name.
/// Subfolders are not traversed.
pub fn files_in_folder(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        error!("{} does not exist or is not a directory", dir.display());
        return Err(Error::StdIoError(std::io::ErrorKind::NotFound));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => continue,
            Err(e) => {
                error!("Failed to read entry in {}: {}", dir.display(), e);
                return Err(Error::StdIoError(
                    e.io_error()
                        .map(|ioe| ioe.kind())
                        .unwrap_or(std::io::ErrorKind::Other),
                ));
            }
        }
    }
    Ok(files)
}

impl<'a> CertificateChain<'a> {
    /// Reads `path` and parses it with [`CertificateChain::parse`]. Added certificates carry the
    /// file name as their locator.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let buf = get_file_as_byte_vec(path)?;
        let before = self.len();
        let failed = self.parse(&buf)?;
        self.set_locator(self.len() - before, &path.display().to_string());
        Ok(failed)
    }

    /// Calls [`CertificateChain::parse_file`] for every regular file directly inside `dir`.
    ///
    /// Returns the number of files that could not be parsed plus the number of PEM blocks that
    /// were skipped in the files that could.
    pub fn parse_path(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let mut failed = 0;
        for file in files_in_folder(dir.as_ref())? {
            match self.parse_file(&file) {
                Ok(n) => failed += n,
                Err(e) => {
                    debug!("Ignored {}: {}", file.display(), e);
                    failed += 1;
                }
            }
        }
        Ok(failed)
    }
}

/// Reads the CRLs in the DER or PEM file at `path`.
#[cfg(feature = "revocation")]
pub fn parse_crl_file(path: impl AsRef<Path>) -> Result<Vec<Crl>> {
    let buf = get_file_as_byte_vec(path.as_ref())?;
    parse_crls(&buf)
}

#[test]
fn non_existent_dir() {
    let mut chain = CertificateChain::new();
    let r = chain.parse_path("tests/examples/nonexistent");
    assert_eq!(Err(Error::StdIoError(std::io::ErrorKind::NotFound)), r);
    assert_eq!(
        get_file_as_byte_vec(Path::new("tests/examples/nonexistent.der")),
        Err(Error::StdIoError(std::io::ErrorKind::NotFound))
    );
}

#[test]
fn ta_store_folder() {
    let mut chain = CertificateChain::new();
    // notes.txt is not a certificate
    assert_eq!(chain.parse_path("tests/examples/ta_store").unwrap(), 1);
    assert_eq!(chain.len(), 2);
    let locators: Vec<&str> = chain.iter().filter_map(|c| c.locator.as_deref()).collect();
    assert!(locators[0].ends_with("root_ec.pem"));
    assert!(locators[1].ends_with("root_rsa.der"));
}

#[test]
fn folder_is_not_recursive() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy("tests/examples/int_rsa.der", dir.path().join("int.der")).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::copy(
        "tests/examples/root_rsa.der",
        dir.path().join("nested").join("root.der"),
    )
    .unwrap();

    let mut chain = CertificateChain::new();
    assert_eq!(chain.parse_path(dir.path()).unwrap(), 0);
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.parse_file("tests/examples/bundle.pem").unwrap(), 1);
    assert_eq!(chain.len(), 3);
}

#[cfg(feature = "revocation")]
#[test]
fn crl_file() {
    assert_eq!(parse_crl_file("tests/examples/crl_int.der").unwrap().len(), 1);
    assert!(parse_crl_file("tests/examples/root_rsa.der").is_err());
}
