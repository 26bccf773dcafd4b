use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

/// Unique scratch path so parallel tests never collide.
fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("cinder-{}-{}", std::process::id(), name));
    path
}

fn cinder() -> Command {
    Command::cargo_bin("cinder").unwrap()
}

#[test]
fn runs_without_arguments() {
    cinder().assert().success();
}

#[test]
fn checks_a_clean_demo() {
    cinder()
        .arg("check")
        .arg("demos/fill.casm")
        .assert()
        .success()
        .stdout(contains("Success"));
}

#[test]
fn runs_every_demo_to_halt() {
    for demo in ["demos/fill.casm", "demos/bounce.casm", "demos/sprite.casm"] {
        cinder()
            .arg("run")
            .arg(demo)
            .assert()
            .success()
            .stdout(contains("Halted"))
            .stdout(contains("Completed"));
    }
}

#[test]
fn bare_path_is_run_shorthand() {
    cinder()
        .arg("demos/fill.casm")
        .assert()
        .success()
        .stdout(contains("Halted"));
}

#[test]
fn dump_holds_the_filled_screen() {
    let dump = temp_path("fill.bin");
    cinder()
        .arg("run")
        .arg("demos/fill.casm")
        .arg("--dump")
        .arg(&dump)
        .assert()
        .success();

    let bytes = fs::read(&dump).unwrap();
    fs::remove_file(&dump).unwrap();
    // 24K cells of 4 bytes; the video region is cells 0x3000..0x5400 and
    // every one of them holds color 7.
    assert_eq!(bytes.len(), 24 * 1024 * 4);
    let cell = |i: usize| u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
    assert!((0x3000..0x5400).all(|i| cell(i) == 7));
    // The `col` binding sits at the bottom of the data region.
    assert_eq!(cell(0x5400), 7);
}

#[test]
fn compiled_binary_runs_like_the_source() {
    let bin = temp_path("fill.cbin");
    let dump = temp_path("fill-from-bin.bin");
    cinder()
        .arg("compile")
        .arg("demos/fill.casm")
        .arg(&bin)
        .assert()
        .success()
        .stdout(contains("Saved"));

    cinder()
        .arg("run")
        .arg(&bin)
        .arg("--dump")
        .arg(&dump)
        .assert()
        .success()
        .stdout(contains("Halted"));

    let bytes = fs::read(&dump).unwrap();
    fs::remove_file(&bin).unwrap();
    fs::remove_file(&dump).unwrap();
    let cell = |i: usize| u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
    assert!((0x3000..0x5400).all(|i| cell(i) == 7));
}

#[test]
fn undefined_label_fails_the_check() {
    let src = temp_path("bad.casm");
    fs::write(&src, "jmp nowhere\nhalt\n").unwrap();
    cinder()
        .arg("check")
        .arg(&src)
        .assert()
        .failure()
        .stderr(contains("undefined label"));
    fs::remove_file(&src).unwrap();
}

#[test]
fn runtime_fault_is_reported() {
    let src = temp_path("crash.casm");
    fs::write(&src, "push 1\npush 0\ndiv\nhalt\n").unwrap();
    cinder()
        .arg("run")
        .arg(&src)
        .assert()
        .failure()
        .stdout(contains("Faulted"));
    fs::remove_file(&src).unwrap();
}

#[test]
fn unknown_extension_is_rejected() {
    cinder()
        .arg("run")
        .arg("Cargo.toml")
        .assert()
        .failure();
}
