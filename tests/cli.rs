use assert_cmd::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("yslvm-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn runs_demo_without_arguments() {
    let mut cmd = Command::cargo_bin("yslvm").unwrap();
    let output = cmd.assert().success().get_output().stdout.clone();

    let mut expected: Vec<u8> = (0..=255).collect();
    expected.push(0x00);
    assert_eq!(&output[..257], expected.as_slice());

    let dump = String::from_utf8_lossy(&output[257..]);
    assert!(dump.contains("IP:  0x0017\nSP:  0x0001\nACC: 0x0000\nDEV: 0x00"));
}

#[test]
fn missing_program_fails_before_running() {
    let mut cmd = Command::cargo_bin("yslvm").unwrap();
    cmd.arg("does/not/exist.bin");

    let output = cmd.assert().failure().get_output().clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open program"));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("===VM Info==="));
}

#[test]
fn runs_raw_bytecode() {
    // SEL 0x00; LDC 0x0041; WAW; HLT
    let path = scratch_file("hello.bin", &[0x11, 0x00, 0x12, 0x41, 0x00, 0x0F, 0xFF]);

    let mut cmd = Command::cargo_bin("yslvm").unwrap();
    cmd.arg(&path);

    let output = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(output[0], b'A');
    assert!(String::from_utf8_lossy(&output).contains("ACC: 0x0041"));

    fs::remove_file(path).unwrap();
}

#[test]
fn runs_assembler_text() {
    let path = scratch_file("hello.asm", b"SEL 0\nLDC 0x42\nWAW\nHLT\n");

    let mut cmd = Command::cargo_bin("yslvm").unwrap();
    cmd.arg("--asm").arg(&path);

    let output = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(output[0], b'B');

    fs::remove_file(path).unwrap();
}

#[test]
fn fault_fails_after_dump() {
    // NOP with nothing after it runs off the program on the next fetch
    let path = scratch_file("overrun.bin", &[0x00]);

    let mut cmd = Command::cargo_bin("yslvm").unwrap();
    cmd.arg(&path).arg("--memory").arg("16");

    let output = cmd.assert().failure().get_output().clone();
    assert!(String::from_utf8_lossy(&output.stdout).contains("IP:  0x0001"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Run terminated abnormally"));

    fs::remove_file(path).unwrap();
}
