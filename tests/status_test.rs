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
fn status_reports_cached_years_and_summary_state() {
    let tmp = tempdir().expect("tempdir");
    let out = tmp.path().join("output");
    fs::create_dir_all(&out).expect("mkdir output");

    seed_raw_cache(&out, 2023);
    fs::write(out.join("2023_summary.txt"), "2023年日记摘要\n").expect("write yearly");

    assert_cmd::cargo::cargo_bin_cmd!("diary-digest")
        .current_dir(tmp.path())
        .arg("status")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("cached_years=1"))
        .stdout(predicates::str::contains("2023: months_summarized=0 yearly=done"));
}

#[test]
fn status_on_empty_directory_reports_no_cache() {
    let tmp = tempdir().expect("tempdir");
    let out = tmp.path().join("output");

    assert_cmd::cargo::cargo_bin_cmd!("diary-digest")
        .current_dir(tmp.path())
        .arg("status")
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("cached_years=0"));
}
