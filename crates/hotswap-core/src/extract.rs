use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::error::ExtractionError;

/// Unpack every entry of the zip package into `dest`.
///
/// Entries whose names would land outside `dest` are skipped.
///
/// # Errors
/// Returns an error when the package cannot be opened or decoded, or when
/// writing any entry fails.
pub fn extract_package(package: &Path, dest: &Path) -> Result<usize, ExtractionError> {
    info!("Extracting update package {}", package.display());
    let file = std::fs::File::open(package)
        .map_err(|error| ExtractionError::io("failed to open update package", package, error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| ExtractionError::zip("failed to read zip archive", error))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| ExtractionError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ExtractionError::io("failed to create extraction directory", &out_path, error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ExtractionError::io("failed to create extraction parent directory", parent, error)
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            ExtractionError::io("failed to create extracted file", &out_path, error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            ExtractionError::io("failed to extract archive entry", &out_path, error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode()
                && let Err(error) =
                    std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
            {
                warn!(
                    "Failed to set mode {mode:o} on {}: {error}",
                    out_path.display()
                );
            }
        }
        written += 1;
    }

    debug!("Extracted {written} files to {}", dest.display());
    Ok(written)
}

/// Compare the package's SHA-256 against `expected` (hex, any case).
///
/// # Errors
/// Returns an error when the package cannot be read or the digests differ.
pub fn verify_package_checksum(package: &Path, expected: &str) -> Result<(), ExtractionError> {
    let actual = sha256_file(package)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        info!("Package checksum verified");
        return Ok(());
    }

    Err(ExtractionError::ChecksumMismatch {
        expected: expected.trim().to_ascii_lowercase(),
        actual,
    })
}

fn sha256_file(path: &Path) -> Result<String, ExtractionError> {
    let mut file = std::fs::File::open(path)
        .map_err(|error| ExtractionError::io("failed to open package for checksum", path, error))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            ExtractionError::io("failed to read package for checksum", path, error)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
