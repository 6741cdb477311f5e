use std::{collections::BTreeMap, path::PathBuf};

use chrono::Local;
use common::{config::Config, report::summarize_dir};
use eyre::{Context, Result, bail};
use fio::{Fio, FioConfig};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::{copy, create_dir_all, try_exists, write};
use tracing::{debug, warn};

pub type BenchConfig = Config<Fio, FioConfig>;

/// Runs every repetition in order, then averages them into `test_summary`.
///
/// A failed fio run aborts the whole cycle before any summary is written.
pub async fn run_benchmark(
    config_file: &str,
    config: &BenchConfig,
    no_progress: bool,
) -> Result<PathBuf> {
    let file_prefix = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let results_path = config.settings.result_dir.join(format!("fio-{file_prefix}"));
    if try_exists(&results_path).await? {
        bail!("Result folder {} already exists", results_path.display());
    }
    create_dir_all(&results_path)
        .await
        .context(format!("Creating {}", results_path.display()))?;
    copy(config_file, results_path.join("config.yaml")).await?;
    println!("Results created in folder: {}", results_path.display());

    let total = (config.bench.total_runs() * config.settings.repeat) as u64;
    let pb = if no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    pb.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}",
    )?);

    let mut info = BTreeMap::new();
    for i in 0..config.settings.repeat {
        let dir_name = format!("fio_result-{i:02}");
        let result_dir = results_path.join(&dir_name);
        create_dir_all(&result_dir).await?;
        debug!("{}", result_dir.display());

        let cmds = config
            .bench
            .run_repetition(&config.settings, &config.bench_args, &result_dir, |cmd| {
                pb.set_message(format!(
                    "{} {} depth={} iter={i}",
                    cmd.scenario, cmd.request_size, cmd.io_depth
                ));
                pb.inc(1);
            })
            .await?;
        info.insert(dir_name, cmds);

        write(
            results_path.join("info.json"),
            serde_json::to_string_pretty(&info)?,
        )
        .await?;
        debug!("Done with repetition {i}");
    }
    pb.finish_and_clear();

    match summarize_dir(&results_path).await? {
        Some(summary) => println!("Summary written to {}", summary.display()),
        None => warn!("Less than two repetitions, no summary written"),
    }
    Ok(results_path)
}
