// filemask/tests/cli_batch_tests.rs
//! End-to-end tests for the `filemask` binary.
//!
//! Each test builds an isolated directory with a rule file and some inputs,
//! runs the real executable, and checks the files it wrote, its exit status,
//! and what it printed to stderr.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const RULES: &str = r#"{
  "skipLines": 1,
  "rules": [
    {"type": "type1", "name": "account", "anchor": "ACC%", "positionsString": "5-12"},
    {"type": "type2", "name": "record", "anchorStart": "BEGIN", "anchorEnd": "END",
     "skipStart": 0, "skipEnd": 1, "positionsString": "1-4"}
  ]
}"#;

const INPUT: &str = "ACC 99999999 header\nACC 12345678 ok\nBEGIN\nsecret one\nsecret two\nlast kept\nEND\n";

const MASKED: &str = "ACC 99999999 header\nACC ******** ok\nBEGIN\n****et one\n****et two\nlast kept\nEND\n";

fn filemask() -> Command {
    Command::new(assert_cmd::cargo_bin!("filemask"))
}

/// A directory holding `rules.json` and the given input files.
fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("Failed to create temporary directory");
    fs::write(dir.path().join("rules.json"), RULES).unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn masks_single_file_into_explicit_output() -> Result<()> {
    let dir = workspace(&[("data.txt", INPUT)]);
    let output = dir.path().join("result.txt");

    filemask()
        .arg("--config")
        .arg(dir.path().join("rules.json"))
        .arg(dir.path().join("data.txt"))
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Masking Summary"))
        .stderr(predicate::str::contains("account"));

    assert_eq!(fs::read_to_string(&output)?, MASKED);
    assert!(!dir.path().join("data_masked.txt").exists());
    Ok(())
}

#[test]
fn directory_input_uses_the_rule_file_beside_it() -> Result<()> {
    let dir = workspace(&[("a.txt", INPUT), ("b.log", "ACC 1\nACC 87654321\n")]);

    filemask().arg(dir.path()).arg("--no-summary").assert().success();

    assert_eq!(fs::read_to_string(dir.path().join("a_masked.txt"))?, MASKED);
    assert_eq!(
        fs::read_to_string(dir.path().join("b_masked.log"))?,
        "ACC 1\nACC ********\n"
    );
    assert!(!dir.path().join("rules_masked.json").exists());
    Ok(())
}

#[test]
fn extension_filter_and_outdir() -> Result<()> {
    let dir = workspace(&[("keep.TXT", INPUT), ("skip.csv", INPUT)]);
    let outdir = dir.path().join("out");

    filemask()
        .arg(dir.path())
        .args(["--ext", ".txt", "--quiet", "--outdir"])
        .arg(&outdir)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(outdir.join("keep_masked.TXT"))?, MASKED);
    assert!(!outdir.join("skip_masked.csv").exists());
    Ok(())
}

#[test]
fn glob_input_masks_every_match() -> Result<()> {
    let dir = workspace(&[("one.txt", INPUT), ("two.txt", INPUT), ("three.dat", INPUT)]);
    let pattern = format!("{}/*.txt", dir.path().display());

    filemask()
        .arg(&pattern)
        .arg("--config")
        .arg(dir.path().join("rules.json"))
        .arg("--no-summary")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(dir.path().join("one_masked.txt"))?, MASKED);
    assert_eq!(fs::read_to_string(dir.path().join("two_masked.txt"))?, MASKED);
    assert!(!dir.path().join("three_masked.dat").exists());
    Ok(())
}

#[test]
fn scramble_output_is_stable_across_runs() -> Result<()> {
    let dir = workspace(&[("data.txt", INPUT)]);
    let run = |outdir: PathBuf| -> Result<String> {
        filemask()
            .arg(dir.path().join("data.txt"))
            .args(["--mode", "scramble", "--quiet", "--jobs", "1", "--outdir"])
            .arg(&outdir)
            .assert()
            .success();
        Ok(fs::read_to_string(outdir.join("data_masked.txt"))?)
    };

    let first = run(dir.path().join("run1"))?;
    let second = run(dir.path().join("run2"))?;
    assert_eq!(first, second);
    assert_ne!(first, INPUT);
    assert!(!first.contains('*'));
    assert_eq!(first.len(), INPUT.len());
    assert!(first.starts_with("ACC 99999999 header\n"));
    assert!(first.ends_with("last kept\nEND\n"));
    Ok(())
}

#[test]
fn buffered_and_streaming_write_the_same_bytes() -> Result<()> {
    let crlf = INPUT.replace('\n', "\r\n");
    let dir = workspace(&[("data.txt", crlf.as_str())]);

    for strategy in ["buffered", "streaming"] {
        let outdir = dir.path().join(strategy);
        filemask()
            .arg(dir.path().join("data.txt"))
            .args(["--strategy", strategy, "--quiet", "--outdir"])
            .arg(&outdir)
            .assert()
            .success();
    }

    let buffered = fs::read(dir.path().join("buffered").join("data_masked.txt"))?;
    let streaming = fs::read(dir.path().join("streaming").join("data_masked.txt"))?;
    assert_eq!(buffered, streaming);
    assert_eq!(String::from_utf8(buffered)?, MASKED.replace('\n', "\r\n"));
    Ok(())
}

#[test]
fn undecodable_file_fails_alone() -> Result<()> {
    let dir = workspace(&[("good.txt", INPUT)]);
    fs::write(dir.path().join("bad.txt"), [0x41u8, 0x43, 0x43, 0x20, 0xff, 0xfe, b'\n'])?;

    filemask()
        .arg(dir.path())
        .arg("--no-summary")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bad.txt"))
        .stderr(predicate::str::contains("UTF-8"));

    assert_eq!(fs::read_to_string(dir.path().join("good_masked.txt"))?, MASKED);
    assert!(!dir.path().join("bad_masked.txt").exists());
    Ok(())
}

#[test]
fn rule_file_without_usable_rules_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), r#"{"rules":[{"type":"type9"}]}"#)?;
    fs::write(dir.path().join("data.txt"), INPUT)?;

    filemask()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable masking rules"));

    assert!(!dir.path().join("data_masked.txt").exists());
    Ok(())
}

#[test]
fn ambiguous_rule_files_are_rejected() -> Result<()> {
    let dir = workspace(&[("data.txt", INPUT)]);
    fs::write(dir.path().join("other.json"), RULES)?;

    filemask()
        .arg(dir.path().join("data.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Several .json files"));
    Ok(())
}

#[test]
fn report_file_describes_the_batch() -> Result<()> {
    let dir = workspace(&[("a.txt", INPUT), ("b.txt", INPUT)]);
    let report_path = dir.path().join("report.out");

    filemask()
        .arg(dir.path())
        .arg("--report")
        .arg(&report_path)
        .arg("--no-summary")
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["files_succeeded"], 2);
    assert_eq!(report["files_failed"], 0);
    assert_eq!(report["mode"], "star");
    assert_eq!(report["totals"]["total_masked"], 32);
    assert_eq!(report["totals"]["per_rule"][0]["rule_label"], "account");
    assert_eq!(report["totals"]["per_rule"][0]["masked_chars"], 16);
    assert_eq!(report["totals"]["per_rule"][1]["masked_chars"], 16);
    assert_eq!(report["files"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["config_fingerprint"].as_str().map(str::len), Some(64));

    let generated_at = report["generated_at"].as_str().unwrap_or_default();
    assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());
    Ok(())
}

#[test]
fn progress_prints_one_final_line_when_not_a_terminal() -> Result<()> {
    let dir = workspace(&[("a.txt", INPUT), ("b.txt", INPUT)]);

    filemask()
        .arg(dir.path())
        .args(["--progress", "--no-summary"])
        .assert()
        .success()
        .stderr(predicate::str::contains("2/2 file(s), 0 failed, 32 char(s) masked"))
        .stderr(predicate::str::contains("\r").not());
    Ok(())
}

#[test]
fn space_separated_extensions_select_every_listed_type() -> Result<()> {
    let dir = workspace(&[("a.txt", INPUT), ("b.sql", INPUT), ("c.csv", INPUT)]);

    filemask()
        .arg(dir.path())
        .args(["--ext", "txt", "sql", "--quiet"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(dir.path().join("a_masked.txt"))?, MASKED);
    assert_eq!(fs::read_to_string(dir.path().join("b_masked.sql"))?, MASKED);
    assert!(!dir.path().join("c_masked.csv").exists());
    Ok(())
}
