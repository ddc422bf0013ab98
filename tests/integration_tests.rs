//! Integration tests for denseid
//!
//! Drive the `denseid` binary end to end: exit codes, stdout, and the files
//! a run leaves behind.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use denseid::exec::JobReport;
use denseid::number::{decode_id, size_sidecar_path};
use denseid::record::{list_part_files, RecordReader, RecordWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn denseid(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_denseid"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Directory of two input files with `per_file` records each
fn write_inputs(dir: &Path, per_file: usize) {
    fs::create_dir_all(dir).unwrap();
    for file in 0..2u8 {
        let mut writer = RecordWriter::create(&dir.join(format!("in-{}", file))).unwrap();
        for i in 0..per_file {
            let key = [(i % 7) as u8, file, (i / 7) as u8];
            writer.append(&key, format!("{}-{}", file, i).as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
}

// =============================================================================
// Run Command
// =============================================================================

#[test]
fn test_cli_run_and_verify() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 50);

    let run = denseid(
        &["run", "input", "out", "--partitions", "3", "--buckets", "16", "--threads", "2"],
        temp.path(),
    );
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert_eq!(stdout(&run), "100");

    let out = temp.path().join("out");
    assert_eq!(list_part_files(&out).unwrap().len(), 3);
    assert_eq!(fs::read_to_string(size_sidecar_path(&out)).unwrap(), "100\n");
    assert!(!temp.path().join("_tmp").exists());

    let report = JobReport::read_marker(&out).unwrap();
    assert_eq!(report.job, "number.assign");
    assert_eq!(report.input_records, 100);
    assert_eq!(report.output_records, 100);

    let verify = denseid(&["verify", "out"], temp.path());
    assert!(verify.status.success());
    assert_eq!(stdout(&verify), "100");
}

#[test]
fn test_cli_ids_follow_key_prefix() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 30);

    let run = denseid(&["run", "input", "out", "-p", "4", "-b", "1024"], temp.path());
    assert!(run.status.success());

    let mut numbered = Vec::new();
    for part in list_part_files(&temp.path().join("out")).unwrap() {
        for record in RecordReader::open(&part).unwrap() {
            let record = record.unwrap();
            numbered.push(decode_id(&record.key).unwrap());
        }
    }
    assert_eq!(numbered, (0..60).collect::<Vec<u64>>());
}

#[test]
fn test_cli_raw_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("single.dat");
    let mut writer = RecordWriter::create(&input).unwrap();
    writer.append(b"\x00\x02", b"bb").unwrap();
    writer.append(b"\x00\x01", b"aa").unwrap();
    writer.finish().unwrap();

    let run = denseid(&["run", "single.dat", "out", "-p", "1", "-b", "4", "--raw"], temp.path());
    assert!(run.status.success());
    assert_eq!(stdout(&run), "2");

    let bytes = fs::read(temp.path().join("out").join("part-00000")).unwrap();
    assert_eq!(bytes, b"\x00\x00\x00\x00aa\x00\x00\x00\x01bb".to_vec());
}

#[test]
fn test_cli_custom_temp_dir() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 5);

    let run = denseid(
        &["run", "input", "out", "-p", "2", "--temp-dir", "scratch"],
        temp.path(),
    );
    assert!(run.status.success());
    assert!(!temp.path().join("scratch").exists());
    assert!(!temp.path().join("_tmp").exists());
}

// =============================================================================
// Exit Codes
// =============================================================================

#[test]
fn test_cli_missing_arguments() {
    let temp = TempDir::new().unwrap();
    let run = denseid(&["run", "input"], temp.path());
    assert_eq!(run.status.code(), Some(2));
}

#[test]
fn test_cli_missing_input() {
    let temp = TempDir::new().unwrap();
    let run = denseid(&["run", "nowhere", "out"], temp.path());
    assert_eq!(run.status.code(), Some(2));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_cli_existing_output() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 5);
    fs::create_dir(temp.path().join("out")).unwrap();

    let run = denseid(&["run", "input", "out"], temp.path());
    assert_eq!(run.status.code(), Some(2));
    assert_eq!(stdout(&run), "");
}

#[test]
fn test_cli_zero_partitions() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 5);

    let run = denseid(&["run", "input", "out", "-p", "0"], temp.path());
    assert_eq!(run.status.code(), Some(2));
}

#[test]
fn test_cli_bucket_count_too_large() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 5);

    let run = denseid(&["run", "input", "out", "-b", "4000000000"], temp.path());
    assert_eq!(run.status.code(), Some(2));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_cli_verify_raw_output() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 5);

    let run = denseid(&["run", "input", "out", "-p", "2", "--raw"], temp.path());
    assert!(run.status.success());

    let verify = denseid(&["verify", "out"], temp.path());
    assert_eq!(verify.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&verify.stderr).contains("--raw"));
}

#[test]
fn test_cli_corrupt_input() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("garbage.dat"), b"not a record file").unwrap();

    let run = denseid(&["run", "garbage.dat", "out", "-p", "2"], temp.path());
    assert_eq!(run.status.code(), Some(1));
    assert!(!temp.path().join("out").exists());
    assert!(!size_sidecar_path(&temp.path().join("out")).exists());
}

#[test]
fn test_cli_verify_tampered_output() {
    let temp = TempDir::new().unwrap();
    write_inputs(&temp.path().join("input"), 10);

    let run = denseid(&["run", "input", "out", "-p", "2"], temp.path());
    assert!(run.status.success());

    fs::remove_file(temp.path().join("out").join("part-00000")).unwrap();
    let verify = denseid(&["verify", "out"], temp.path());
    assert_eq!(verify.status.code(), Some(1));
}
