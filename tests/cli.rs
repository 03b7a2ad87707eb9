use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn zip_crypt_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_zip-crypt"))
}

fn run(target: &Path, args: &[&str]) -> Result<Output, Box<dyn Error>> {
    Ok(zip_crypt_command()
        .arg("-t")
        .arg(target)
        .args(&["-p", "hunter2"])
        .args(args)
        .output()?)
}

#[test]
fn cli_encrypts_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("notes.txt");
    fs::write(&target, b"secretdata")?;

    let output = run(&target, &["encrypt"])?;
    assert!(
        output.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("notes.txt-encrypted was created"), "{}", stdout);
    assert!(stdout.contains("total bytes"));
    assert!(!stdout.contains("hunter2"));

    let raw = fs::read(dir.path().join("notes.txt-encrypted"))?;
    assert!(!raw.is_empty());
    assert!(!raw.windows(10).any(|window| window == b"secretdata"));
    Ok(())
}

#[test]
fn cli_missing_source_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("missing.bin");

    let output = run(&target, &["encrypt"])?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("missing.bin-encrypted was not created"), "{}", stderr);
    assert!(stderr.contains("caused by:"));
    assert!(!stderr.contains("hunter2"));
    assert!(!dir.path().join("missing.bin-encrypted").exists());
    Ok(())
}

#[test]
fn cli_help_skips_packaging() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("notes.txt");
    fs::write(&target, b"secretdata")?;

    let output = run(&target, &["encrypt", "--help"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Creates an encrypted package."), "{}", stdout);
    assert!(!dir.path().join("notes.txt-encrypted").exists());
    Ok(())
}

#[test]
fn cli_bad_command_arguments_print_usage() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("notes.txt");
    fs::write(&target, b"secretdata")?;

    let output = run(&target, &["encrypt", "--bogus"])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stdout)?.contains("USAGE"));
    assert!(!dir.path().join("notes.txt-encrypted").exists());
    Ok(())
}

#[test]
fn cli_unknown_command_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("notes.txt");

    let output = run(&target, &["decrypt"])?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("unknown command 'decrypt'"), "{}", stderr);
    assert!(stderr.contains("commands: encrypt"));
    Ok(())
}
