use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "B: Deserialize<'de>, A: Deserialize<'de> + Default"))]
pub struct Config<B, A> {
    pub name: String,
    pub settings: Settings,
    pub bench: B,
    #[serde(default)]
    pub bench_args: A,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Directory the benchmark files are created in
    pub test_dir: PathBuf,
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default = "default_drop_caches")]
    pub drop_caches: bool,
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_repeat() -> usize {
    3
}

fn default_drop_caches() -> bool {
    true
}
