use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use std::io::{Cursor, Write};
use std::path::Path;
#[cfg(unix)]
use std::process::Stdio;
#[cfg(unix)]
use std::time::{Duration, Instant};
use tempfile::tempdir;
use zip::ZipWriter;
use zip::write::FileOptions;

fn create_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<()> = FileOptions::default();
    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn upstream_zip(version: &str) -> Vec<u8> {
    let root = format!("verapp-target-cmake-{}", version);
    let find = format!("{}/FindFoo.cmake", root);
    let helper = format!("{}/scripts/helper.cmake", root);
    let readme = format!("{}/README.rst", root);
    create_zip(&[
        (find.as_str(), "# find foo"),
        (helper.as_str(), "# helper"),
        (readme.as_str(), "readme"),
    ])
}

/// Archive whose entries take long enough to unpack that an interrupt can
/// land mid-extraction.
#[cfg(unix)]
fn slow_zip(version: &str, entries: usize, mib_per_entry: usize) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<()> = FileOptions::default();
    let chunk = vec![0u8; 1024 * 1024];
    for i in 0..entries {
        let name = format!("verapp-target-cmake-{}/big{}.bin", version, i);
        zip.start_file(name, options).unwrap();
        for _ in 0..mib_per_entry {
            zip.write_all(&chunk).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

fn recipe_cmd() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("verapp-recipe"));
    cmd.env_remove("CONAN_VERSION_OVERRIDE");
    cmd
}

fn list_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_end_to_end_fetch_and_package() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("GET", "/archive/v0.0.2.zip")
        .with_status(200)
        .with_body(upstream_zip("0.0.2"))
        .create();

    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");
    let output_dir = root.path().join("out");

    recipe_cmd()
        .arg("fetch")
        .arg(&work_dir)
        .arg("--source-url")
        .arg(&url)
        .assert()
        .success()
        .stdout(predicates::str::contains("Fetched verapp-target-cmake 0.0.2"));

    mock.assert();
    assert!(work_dir.join("verapp-target-cmake-0.0.2").is_dir());
    assert!(!work_dir.join("verapp-target-cmake.zip").exists());

    recipe_cmd()
        .arg("package")
        .arg(&work_dir)
        .arg(&output_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("3 file(s)"));

    assert_eq!(
        list_files(&output_dir),
        vec![
            "FindFoo.cmake",
            "cmake/verapp-target-cmake/FindFoo.cmake",
            "cmake/verapp-target-cmake/scripts/helper.cmake",
        ]
    );
    assert_eq!(
        std::fs::read_to_string(output_dir.join("cmake/verapp-target-cmake/scripts/helper.cmake"))
            .unwrap(),
        "# helper"
    );
}

#[test]
fn test_version_override_from_environment() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("GET", "/archive/v9.9.9.zip")
        .with_status(200)
        .with_body(upstream_zip("9.9.9"))
        .create();

    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");
    let output_dir = root.path().join("out");

    recipe_cmd()
        .env("CONAN_VERSION_OVERRIDE", "9.9.9")
        .arg("fetch")
        .arg(&work_dir)
        .arg("--source-url")
        .arg(&url)
        .assert()
        .success();

    mock.assert();
    assert!(work_dir.join("verapp-target-cmake-9.9.9").is_dir());

    recipe_cmd()
        .env("CONAN_VERSION_OVERRIDE", "9.9.9")
        .arg("package")
        .arg(&work_dir)
        .arg(&output_dir)
        .assert()
        .success();

    assert!(output_dir.join("FindFoo.cmake").exists());
}

#[test]
fn test_package_without_fetch_fails() {
    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");
    std::fs::create_dir(&work_dir).unwrap();

    recipe_cmd()
        .arg("package")
        .arg(&work_dir)
        .arg(root.path().join("out"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("package failed"))
        .stderr(predicates::str::contains("Source directory not found"));
}

#[test]
fn test_fetch_missing_tag_fails_and_cleans_up() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("GET", "/archive/v0.0.2.zip")
        .with_status(404)
        .create();

    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");

    recipe_cmd()
        .arg("fetch")
        .arg(&work_dir)
        .arg("--source-url")
        .arg(&url)
        .assert()
        .failure()
        .stderr(predicates::str::contains("fetch failed"))
        .stderr(predicates::str::contains("HTTP 404"));

    assert!(!work_dir.join("verapp-target-cmake.zip").exists());
}

#[test]
fn test_fetch_corrupt_archive_fails() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("GET", "/archive/v0.0.2.zip")
        .with_status(200)
        .with_body("definitely not a zip")
        .create();

    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");

    recipe_cmd()
        .arg("fetch")
        .arg(&work_dir)
        .arg("--source-url")
        .arg(&url)
        .assert()
        .failure()
        .stderr(predicates::str::contains("fetch failed"))
        .stderr(predicates::str::contains("Archive error"));

    assert!(!work_dir.join("verapp-target-cmake.zip").exists());
}

#[test]
fn test_info_json() {
    let output = recipe_cmd().arg("info").arg("--json").output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["name"], "verapp-target-cmake");
    assert_eq!(value["version"], "0.0.2");
    assert_eq!(
        value["archive_url"],
        "https://github.com/polysquare/verapp-target-cmake/archive/v0.0.2.zip"
    );
    assert_eq!(value["dependencies"].as_array().unwrap().len(), 4);
}

#[test]
fn test_info_text_with_flag_override() {
    recipe_cmd()
        .arg("info")
        .arg("--version-override")
        .arg("1.2.3")
        .assert()
        .success()
        .stdout(predicates::str::contains("verapp-target-cmake 1.2.3"))
        .stdout(predicates::str::contains("archive/v1.2.3.zip"));
}

#[test]
#[cfg(unix)]
fn test_interrupt_during_extraction_cleans_up() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("GET", "/archive/v0.0.2.zip")
        .with_status(200)
        .with_body(slow_zip("0.0.2", 6, 400))
        .create();

    let root = tempdir().unwrap();
    let work_dir = root.path().join("work");
    let source_dir = work_dir.join("verapp-target-cmake-0.0.2");

    let mut child = std::process::Command::new(cargo::cargo_bin!("verapp-recipe"))
        .env_remove("CONAN_VERSION_OVERRIDE")
        .arg("fetch")
        .arg(&work_dir)
        .arg("--source-url")
        .arg(&url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Wait until extraction has started writing the first entry
    let deadline = Instant::now() + Duration::from_secs(120);
    while !source_dir.join("big0.bin").exists() {
        assert!(
            child.try_wait().unwrap().is_none(),
            "fetch finished before extraction could be interrupted"
        );
        assert!(Instant::now() < deadline, "extraction never started");
        std::thread::sleep(Duration::from_millis(5));
    }

    let status = std::process::Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(130));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Interrupted, cleaning up"));
    assert!(!source_dir.exists());
    assert!(!work_dir.join("verapp-target-cmake.zip").exists());
}
