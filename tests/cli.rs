// Runs the `mcc` binary on files in a scratch directory

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{ensure, Result};

fn mcc(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_mcc")).args(args).output()?)
}

fn demo_copy(dir: &Path) -> Result<PathBuf> {
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/basic16.mc");
    let path = dir.join("basic16.mc");
    std::fs::copy(demo, &path)?;
    Ok(path)
}

#[test]
fn emits_c_next_to_input() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = demo_copy(dir.path())?;
    let out = mcc(&[input.to_str().unwrap()])?;
    ensure!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let emitted = std::fs::read_to_string(input.with_extension("c"))?;
    assert!(emitted.contains("void emulator(uint16_t* memory) {"));
    assert!(emitted.contains("case 11: { // store"));
    Ok(())
}

#[test]
fn emits_table() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = demo_copy(dir.path())?;
    let output = dir.path().join("listing");
    let out = mcc(&[
        input.to_str().unwrap(),
        "--emit",
        "table",
        "-o",
        output.to_str().unwrap(),
    ])?;
    ensure!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let listing = std::fs::read_to_string(output)?;
    assert!(listing.starts_with("header:"));
    assert!(listing.contains("opcode 0b0100 load:"));
    Ok(())
}

#[test]
fn check_writes_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = demo_copy(dir.path())?;
    let out = mcc(&["--check", input.to_str().unwrap()])?;
    assert!(out.status.success());
    assert!(!input.with_extension("c").exists());
    Ok(())
}

#[test]
fn reports_semantic_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("broken.mc");
    std::fs::write(&input, "phase = 2;\nheader { nope; }\n")?;
    let out = mcc(&[input.to_str().unwrap()])?;
    assert!(!out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("semantic error"), "{stderr}");
    assert!(stderr.contains("`nope`"), "{stderr}");
    assert!(!input.with_extension("c").exists());
    Ok(())
}

#[test]
fn missing_input() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("absent.mc");
    let out = mcc(&[input.to_str().unwrap()])?;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("could not read file"));
    Ok(())
}
