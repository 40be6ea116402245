use crate::error::RecipeError;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::ArchiveExtractor;

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        self.extract_impl(runtime, archive_path, extract_to)
            .map_err(|e| RecipeError::archive(archive_path, format!("{:#}", e)).into())
    }
}

impl ZipExtractor {
    fn extract_impl<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // zip crate requires Read + Seek, but Runtime::open returns Box<dyn Read + Send>
        let mut buffer = Vec::new();
        let mut reader = file;
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let cursor = std::io::Cursor::new(buffer);

        let mut archive = ZipArchive::new(cursor).context("Failed to parse ZIP archive")?;
        if archive.is_empty() {
            anyhow::bail!("Archive appears to be empty.");
        }

        runtime.create_dir_all(extract_to)?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            // Entries escaping the extraction root (absolute or `..`) are dropped
            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    debug!("Skipping entry with invalid path: {}", entry.name());
                    continue;
                }
            };

            let full_path = extract_to.join(&entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
        }

        info!("Extraction complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::{write_zip, zip_bytes};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;
    use zip::CompressionMethod;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    fn assert_archive_error(result: Result<()>) -> String {
        let err = result.unwrap_err();
        match err.downcast_ref::<RecipeError>() {
            Some(e @ RecipeError::Archive { .. }) => e.to_string(),
            other => panic!("Expected archive error, got {:?}", other),
        }
    }

    #[test]
    fn test_can_handle_zip() {
        let extractor = ZipExtractor;
        assert!(extractor.can_handle(Path::new("verapp-target-cmake.zip")));
        assert!(extractor.can_handle(Path::new("FILE.ZIP")));
        assert!(!extractor.can_handle(Path::new("file.tar.gz")));
    }

    #[test]
    fn test_extract_keeps_toplevel_dir() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("verapp-target-cmake.zip");

        write_zip(
            &archive_path,
            &[
                ("verapp-target-cmake-0.0.2/FindFoo.cmake", "# foo"),
                ("verapp-target-cmake-0.0.2/scripts/helper.cmake", "# helper"),
            ],
        )?;

        ZipExtractor.extract(&RealRuntime, &archive_path, dir.path())?;

        let root = dir.path().join("verapp-target-cmake-0.0.2");
        assert_eq!(fs::read_to_string(root.join("FindFoo.cmake"))?, "# foo");
        assert_eq!(
            fs::read_to_string(root.join("scripts/helper.cmake"))?,
            "# helper"
        );
        // The archive itself is left for the caller to remove
        assert!(archive_path.exists());

        Ok(())
    }

    #[test]
    fn test_extract_creates_missing_destination() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("a.zip");
        fs::write(&archive_path, zip_bytes(&[("file.txt", "x")]))?;

        let dest = dir.path().join("not/yet/there");
        ZipExtractor.extract(&RealRuntime, &archive_path, &dest)?;

        assert_eq!(fs::read_to_string(dest.join("file.txt"))?, "x");
        Ok(())
    }

    #[test]
    fn test_extract_empty_archive() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("test.zip");
        write_zip(&archive_path, &[]).unwrap();

        let msg = assert_archive_error(ZipExtractor.extract(
            &RealRuntime,
            &archive_path,
            dir.path(),
        ));
        assert!(msg.contains("empty"));
    }

    #[test]
    fn test_extract_corrupted_archive() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("test.zip");
        fs::write(&archive_path, "<html>not a zip</html>").unwrap();

        let msg = assert_archive_error(ZipExtractor.extract(
            &RealRuntime,
            &archive_path,
            dir.path(),
        ));
        assert!(msg.contains("Failed to parse ZIP archive"));
    }

    #[test]
    fn test_extract_nonexistent_archive() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("nonexistent.zip");

        let msg = assert_archive_error(ZipExtractor.extract(
            &RealRuntime,
            &archive_path,
            dir.path(),
        ));
        assert!(msg.contains("Failed to open archive"));
    }

    #[test]
    fn test_extract_archive_with_directory_entries() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("test.zip");

        {
            let file = File::create(&archive_path)?;
            let mut zip = ZipWriter::new(file);
            let options: FileOptions<()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.add_directory("verapp-target-cmake-0.0.2/empty/", options)?;

            let file_options: FileOptions<()> =
                FileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file("verapp-target-cmake-0.0.2/ci/check.cmake", file_options)?;
            zip.write_all(b"nested file")?;

            zip.finish()?;
        }

        ZipExtractor.extract(&RealRuntime, &archive_path, dir.path())?;

        let root = dir.path().join("verapp-target-cmake-0.0.2");
        assert!(root.join("empty").is_dir());
        assert_eq!(fs::read_to_string(root.join("ci/check.cmake"))?, "nested file");

        Ok(())
    }

    #[test]
    fn test_extract_skips_entries_escaping_destination() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("work");
        let archive_path = dir.path().join("evil.zip");

        write_zip(
            &archive_path,
            &[("../escaped.cmake", "bad"), ("ok/FindOk.cmake", "good")],
        )?;

        ZipExtractor.extract(&RealRuntime, &archive_path, &dest)?;

        assert!(!dir.path().join("escaped.cmake").exists());
        assert!(dest.join("ok/FindOk.cmake").exists());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_archive_preserves_file_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let archive_path = dir.path().join("test.zip");

        {
            let file = File::create(&archive_path)?;
            let mut zip = ZipWriter::new(file);

            let options: FileOptions<()> = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o755);
            zip.start_file("src/run-tests.sh", options)?;
            zip.write_all(b"#!/bin/sh\nexit 0")?;

            let options: FileOptions<()> = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644);
            zip.start_file("src/FindFoo.cmake", options)?;
            zip.write_all(b"# foo")?;

            zip.finish()?;
        }

        ZipExtractor.extract(&RealRuntime, &archive_path, dir.path())?;

        let script_mode = fs::metadata(dir.path().join("src/run-tests.sh"))?
            .permissions()
            .mode();
        assert!(
            script_mode & 0o111 != 0,
            "Expected run-tests.sh to be executable, but mode was {:o}",
            script_mode
        );

        let module_mode = fs::metadata(dir.path().join("src/FindFoo.cmake"))?
            .permissions()
            .mode();
        assert!(
            module_mode & 0o111 == 0,
            "Expected FindFoo.cmake to NOT be executable, but mode was {:o}",
            module_mode
        );

        Ok(())
    }
}
