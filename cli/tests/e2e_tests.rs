use assert_cmd::Command;
use assert_fs::prelude::*;
use std::path::PathBuf;

const IMAGE: &[u8] = b"a bootable installation image";
const IMAGE_SHA256: &str = "4782598366f1febd9bc9983e7e694c35fbac1285b3bcc0e4730507cb649f5d5b";

fn mirrorfetch() -> Command {
    Command::cargo_bin("mirrorfetch").unwrap()
}

fn stdout_path(output: &std::process::Output) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&output.stdout).trim())
}

#[test]
fn downloads_from_the_first_working_mirror() {
    let mut server = mockito::Server::new();
    let _bad = server.mock("GET", "/bad/x.iso").with_status(404).create();
    let _good = server
        .mock("GET", "/good/x.iso")
        .with_status(200)
        .with_body(IMAGE)
        .create();

    let cache_dir = assert_fs::TempDir::new().unwrap();
    let output = mirrorfetch()
        .args([
            "download",
            &format!("{}/bad/x.iso", server.url()),
            &format!("{}/good/x.iso", server.url()),
            "--checksum",
            IMAGE_SHA256,
            "--description",
            "ISO",
            "--cache-dir",
            cache_dir.path().to_string_lossy().as_ref(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let path = stdout_path(&output);
    assert!(path.starts_with(cache_dir.path()));
    assert_eq!(std::fs::read(path).unwrap(), IMAGE);
}

#[test]
fn writes_to_an_explicit_target_path() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/x.iso")
        .with_status(200)
        .with_body(IMAGE)
        .create();

    let out = assert_fs::TempDir::new().unwrap();
    let target = out.child("install.iso");
    let output = mirrorfetch()
        .args([
            "download",
            &format!("{}/x.iso", server.url()),
            "--checksum",
            IMAGE_SHA256,
            "--checksum-type",
            "sha256",
            "--target-path",
            target.path().to_string_lossy().as_ref(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_path(&output), target.path());
    target.assert(IMAGE);
}

#[test]
fn fails_when_every_mirror_fails() {
    let mut server = mockito::Server::new();
    let _m = server.mock("GET", "/x.iso").with_status(500).create();

    let cache_dir = assert_fs::TempDir::new().unwrap();
    let output = mirrorfetch()
        .args([
            "download",
            &format!("{}/x.iso", server.url()),
            "--description",
            "ISO",
            "--cache-dir",
            cache_dir.path().to_string_lossy().as_ref(),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ISO download failed."));
}

#[test]
fn rejects_a_malformed_checksum_without_downloading() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/x.iso")
        .with_status(200)
        .with_body(IMAGE)
        .expect(0)
        .create();

    let cache_dir = assert_fs::TempDir::new().unwrap();
    let output = mirrorfetch()
        .args([
            "download",
            &format!("{}/x.iso", server.url()),
            "--checksum",
            "zz",
            "--cache-dir",
            cache_dir.path().to_string_lossy().as_ref(),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error parsing checksum"));
    m.assert();
}

#[test]
fn prints_the_cache_path_of_a_url() {
    let cache_dir = assert_fs::TempDir::new().unwrap();
    let output = mirrorfetch()
        .args([
            "cache-path",
            "https://mirror.example.com/images/install.iso?token=1",
            "--cache-dir",
            cache_dir.path().to_string_lossy().as_ref(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let path = stdout_path(&output);
    assert_eq!(path.parent(), Some(cache_dir.path()));
    assert_eq!(path.extension().unwrap(), "iso");
    assert!(!path.exists());
}
