//! End-to-end runs of the mtframework-rs binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use bytes::Bytes;
use mtf_tex::{DdsImage, PixelFormat};
use predicates::prelude::*;
use tempfile::TempDir;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("mtframework-rs").unwrap();
    cmd.env_remove("MTF_ARC_DENYLIST");
    cmd
}

fn write(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn dxt1_dds() -> Vec<u8> {
    let mut image = DdsImage {
        width: 8,
        height: 8,
        mipmap_count: 2,
        format: PixelFormat::Dxt1,
        cubemap: false,
        data: Bytes::new(),
    };
    image.data = Bytes::from(vec![0xAB; image.expected_payload_len()]);
    image.to_bytes().unwrap().to_vec()
}

#[test]
fn test_help_lists_every_format() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("arc"))
        .stdout(predicate::str::contains("tex"))
        .stdout(predicate::str::contains("mod"))
        .stdout(predicate::str::contains("lmt"))
        .stdout(predicate::str::contains("sbc"));
}

#[test]
fn test_arc_pack_list_unpack() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("source");
    write(&source, "pawn/pl/pl0200.mod", b"MOD\0 not really a model");
    write(&source, "pawn/pl/pl0200_BM.tex", &[7; 2048]);
    let archive = work.path().join("pl0200.arc");

    cli()
        .args(["arc", "pack"])
        .arg(&source)
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Packed 2 members"));

    cli()
        .args(["arc", "list"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("pawn\\pl\\pl0200.mod"))
        .stdout(predicate::str::contains("pawn\\pl\\pl0200_BM.tex"));

    cli()
        .args(["arc", "list", "--filter", "*.tex"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("pl0200_BM.tex"))
        .stdout(predicate::str::contains("pl0200.mod").not());

    let destination = work.path().join("out");
    cli()
        .args(["arc", "unpack", "-o"])
        .arg(&destination)
        .arg(&archive)
        .assert()
        .success();
    assert_eq!(
        fs::read(destination.join("pawn/pl/pl0200_BM.tex")).unwrap(),
        vec![7; 2048]
    );
}

#[test]
fn test_arc_pack_honours_denylist_env() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("source");
    write(&source, "ok.tex", b"fine");
    write(&source, "crash/uOm0001.tex", b"bad");

    cli()
        .env("MTF_ARC_DENYLIST", "uOm*.tex")
        .args(["arc", "pack"])
        .arg(&source)
        .arg(work.path().join("out.arc"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("denylist"));
    assert!(!work.path().join("out.arc").exists());
}

#[test]
fn test_tex_conversion_round_trip() {
    let work = TempDir::new().unwrap();
    let dds_path = work.path().join("floor_BM.dds");
    let original = dxt1_dds();
    fs::write(&dds_path, &original).unwrap();

    cli().args(["tex", "from-dds"]).arg(&dds_path).assert().success();
    let tex_path = work.path().join("floor_BM.tex");
    assert_eq!(&fs::read(&tex_path).unwrap()[..4], b"TEX\0");

    cli()
        .args(["tex", "info", "--mipmaps"])
        .arg(&tex_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("8x8"))
        .stdout(predicate::str::contains("DXT1"));

    let back = work.path().join("back.dds");
    cli()
        .args(["tex", "to-dds"])
        .arg(&tex_path)
        .arg(&back)
        .assert()
        .success();
    assert_eq!(fs::read(&back).unwrap(), original);
}

#[test]
fn test_info_dispatches_on_magic() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("mystery.bin");
    fs::write(&path, dxt1_dds()).unwrap();

    cli()
        .arg("info")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("DDS image"))
        .stdout(predicate::str::contains("Converts to"));

    cli()
        .arg("convert")
        .arg(&path)
        .assert()
        .success();
    assert!(work.path().join("mystery.tex").exists());
}

#[test]
fn test_info_rejects_unknown_magic() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("notes.txt");
    fs::write(&path, b"hello world").unwrap();

    cli()
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognised magic"));
}

#[test]
fn test_mod_info_reports_bad_magic() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("broken.mod");
    fs::write(&path, b"XYZ\0\x9c\0\0\0").unwrap();

    cli()
        .args(["mod", "info"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse model"));
}

#[test]
fn test_completions() {
    cli()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mtframework-rs"));
}
