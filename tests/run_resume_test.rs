use std::fs;
use tempfile::tempdir;

fn seed_raw_cache(dir: &std::path::Path, year: i32) {
    let rule = "=".repeat(60);
    let content = format!(
        "{year}年日记原文合集\n{rule}\n生成时间: 2024-01-01 00:00:00\n共 1 篇日记\n{rule}\n\n\
\n{rule}\n【{year}年/{year}年1月/{year}年1月5日】\n{rule}\n\n早起跑步。\n\n"
    );
    fs::write(dir.join(format!("{year}年日记原文.txt")), content).expect("write raw cache");
}

#[test]
fn cache_only_run_skips_completed_years_without_touching_the_network() {
    let tmp = tempdir().expect("tempdir");
    let out = tmp.path().join("output");
    fs::create_dir_all(&out).expect("mkdir output");

    seed_raw_cache(&out, 2023);
    let yearly_path = out.join("2023_summary.txt");
    fs::write(&yearly_path, "2023年日记摘要\n已有内容\n").expect("write yearly");
    let before = fs::read_to_string(&yearly_path).expect("read yearly");

    // The API key is required at startup but no completion request is issued:
    // the existing yearly summary gates the entire year.
    assert_cmd::cargo::cargo_bin_cmd!("diary-digest")
        .current_dir(tmp.path())
        .env("ANTHROPIC_API_KEY", "test-key-never-used")
        .arg("run")
        .arg("--cache-only")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("years_skipped=1"))
        .stdout(predicates::str::contains("months_generated=0"));

    let after = fs::read_to_string(&yearly_path).expect("read yearly");
    assert_eq!(before, after);
}

#[test]
fn run_without_api_key_fails_fast_with_remediation() {
    let tmp = tempdir().expect("tempdir");
    let out = tmp.path().join("output");

    assert_cmd::cargo::cargo_bin_cmd!("diary-digest")
        .current_dir(tmp.path())
        .env_remove("ANTHROPIC_API_KEY")
        .arg("run")
        .arg("--cache-only")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicates::str::contains("ANTHROPIC_API_KEY"));
}

#[test]
fn scan_mode_without_folder_id_fails_fast() {
    let tmp = tempdir().expect("tempdir");
    let out = tmp.path().join("output");

    assert_cmd::cargo::cargo_bin_cmd!("diary-digest")
        .current_dir(tmp.path())
        .env("ANTHROPIC_API_KEY", "test-key-never-used")
        .env_remove("FOLDER_ID")
        .arg("run")
        .arg("--scan")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicates::str::contains("FOLDER_ID"));
}
