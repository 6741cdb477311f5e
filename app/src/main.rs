use std::path::PathBuf;

use clap::{Parser, Subcommand};
use common::report::summarize_dir;
use eyre::{Context, Result};
use tokio::fs::read_to_string;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod bench;

use bench::BenchConfig;

const MODULES: &[&str] = &["common", "fio"];

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = false)]
    no_progress: bool,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fio repeatedly and write an averaged summary
    Bench {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: String,
        /// Overrides settings.repeat
        #[arg(long)]
        repeat: Option<usize>,
        /// Overrides settings.test_dir
        #[arg(long)]
        test_dir: Option<PathBuf>,
        /// Overrides settings.result_dir
        #[arg(long)]
        result_dir: Option<PathBuf>,
    },
    /// Average every fio_result.RHS found below a result folder
    Summarize {
        #[arg(short, long)]
        folder: PathBuf,
    },
    /// Print generated fio commands
    Print {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("disk_bench={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    match args.command {
        Commands::Bench {
            config_file,
            repeat,
            test_dir,
            result_dir,
        } => {
            let mut config = load_config(&config_file).await?;
            if let Some(repeat) = repeat {
                config.settings.repeat = repeat;
            }
            if let Some(test_dir) = test_dir {
                config.settings.test_dir = test_dir;
            }
            if let Some(result_dir) = result_dir {
                config.settings.result_dir = result_dir;
            }
            if let Err(err) = bench::run_benchmark(&config_file, &config, args.no_progress).await {
                error!("{err:#?}");
                return Err(err);
            }
        }
        Commands::Summarize { folder } => match summarize_dir(&folder).await? {
            Some(path) => println!("Summary written to {}", path.display()),
            None => println!("Fewer than two reports in {}, nothing to summarize", folder.display()),
        },
        Commands::Print { config_file } => print_commands(&config_file).await?,
    };

    Ok(())
}

async fn load_config(config_file: &str) -> Result<BenchConfig> {
    let content = read_to_string(config_file)
        .await
        .context(format!("Reading {config_file}"))?;
    serde_yml::from_str(&content).context(format!("Parsing {config_file}"))
}

async fn print_commands(config_file: &str) -> Result<()> {
    let config = load_config(config_file).await?;
    let program = config.bench_args.program.clone().unwrap_or("fio".to_owned());
    let output = PathBuf::from(fio::FIO_OUTPUT_FILENAME);
    for scenario in &config.bench.scenarios {
        for cmd in config.bench.cmds(*scenario, &config.settings, &output) {
            println!("{program} {cmd}");
        }
    }
    Ok(())
}
