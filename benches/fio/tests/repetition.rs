use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use common::{
    config::Settings,
    report::{REPORT_FILENAME, Report, SUMMARY_FILENAME, summarize_dir},
};
use fio::{FIO_LOG_FILENAME, Fio, FioConfig, FioTestType};

const OUTPUT: &str = "\
job1: (groupid=0, jobs=16): err= 0: pid=1: Mon Jan  6 10:00:00 2025
  read: IOPS=2000, BW=100MiB/s (105MB/s)(6000MiB/60001msec)
     lat (usec): min=45, max=9820, avg=500.00, stdev=101.50
  write: IOPS=1000, BW=50MiB/s (52MB/s)(3000MiB/60001msec)
     lat (usec): min=45, max=9820, avg=250.00, stdev=101.50
";

/// A stand-in for fio that copies a canned output into the `--output` file.
fn fake_fio(dir: &Path, output: &str) -> PathBuf {
    let canned = dir.join("canned");
    fs::write(&canned, output).unwrap();
    let script = dir.join("fake-fio");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nfor a in \"$@\"; do case $a in --output=*) out=\"${{a#--output=}}\";; esac; done\ncat {} > \"$out\"\n",
            canned.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn settings(dir: &Path) -> Settings {
    Settings {
        test_dir: dir.to_path_buf(),
        result_dir: dir.to_path_buf(),
        repeat: 2,
        drop_caches: false,
    }
}

fn fio() -> Fio {
    Fio {
        scenarios: vec![FioTestType::Read, FioTestType::Randrw],
        request_sizes: vec!["4k".to_owned()],
        io_depths: vec![1, 8],
        ..Fio::default()
    }
}

#[tokio::test]
async fn repetitions_produce_reports_and_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let program = fake_fio(tmp.path(), OUTPUT);
    let args = FioConfig {
        program: Some(program.display().to_string()),
    };
    let fio = fio();

    for i in 0..2 {
        let dir = tmp.path().join(format!("fio_result-{i:02}"));
        fs::create_dir_all(&dir).unwrap();
        let mut done = 0;
        let ran = fio
            .run_repetition(&settings(tmp.path()), &args, &dir, |_| done += 1)
            .await
            .unwrap();
        assert_eq!(ran.len(), 4);
        assert_eq!(done, 4);
        assert!(dir.join(FIO_LOG_FILENAME).exists());
    }

    let report = Report::read(&tmp.path().join("fio_result-00").join(REPORT_FILENAME))
        .await
        .unwrap();
    // two scenarios, each a category line, a header and two data lines
    assert_eq!(report.len(), 8);
    assert_eq!(report.lines[2].fields, vec!["4", "1", "16", "100.00", "2000.00", "0.50"]);
    assert_eq!(report.lines[6].fields, vec!["4", "1", "16", "150.00", "3000.00", "0.75"]);

    let summary = summarize_dir(tmp.path()).await.unwrap().unwrap();
    assert_eq!(summary, tmp.path().join(SUMMARY_FILENAME));
    let content = fs::read_to_string(summary).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 8);
    assert_eq!(
        lines[7],
        "           4|           8|          16|      150.00|     3000.00|        0.75|"
    );
}

#[tokio::test]
async fn failing_tool_aborts_the_repetition() {
    let tmp = tempfile::tempdir().unwrap();
    let args = FioConfig {
        program: Some("false".to_owned()),
    };
    let mut done = 0;
    let result = fio()
        .run_repetition(&settings(tmp.path()), &args, tmp.path(), |_| done += 1)
        .await;
    assert!(result.is_err());
    assert_eq!(done, 0);
}

#[tokio::test]
async fn single_repetition_writes_no_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let program = fake_fio(tmp.path(), OUTPUT);
    let args = FioConfig {
        program: Some(program.display().to_string()),
    };
    let dir = tmp.path().join("fio_result-00");
    fs::create_dir_all(&dir).unwrap();
    fio()
        .run_repetition(&settings(tmp.path()), &args, &dir, |_| {})
        .await
        .unwrap();

    assert!(summarize_dir(tmp.path()).await.unwrap().is_none());
    assert!(!tmp.path().join(SUMMARY_FILENAME).exists());
}

#[tokio::test]
async fn rerun_into_same_dir_replaces_previous_report() {
    let tmp = tempfile::tempdir().unwrap();
    let program = fake_fio(tmp.path(), OUTPUT);
    let args = FioConfig {
        program: Some(program.display().to_string()),
    };
    let fio = Fio {
        scenarios: vec![FioTestType::Read],
        request_sizes: vec!["4k".to_owned()],
        io_depths: vec![1],
        ..Fio::default()
    };
    let dir = tmp.path().join("fio_result-00");
    fs::create_dir_all(&dir).unwrap();

    for _ in 0..2 {
        fio.run_repetition(&settings(tmp.path()), &args, &dir, |_| {})
            .await
            .unwrap();
    }

    let report = Report::read(&dir.join(REPORT_FILENAME)).await.unwrap();
    assert_eq!(report.len(), 3);
    let log = fs::read_to_string(dir.join(FIO_LOG_FILENAME)).unwrap();
    assert_eq!(log.matches(&"-".repeat(100)).count(), 1);
}
