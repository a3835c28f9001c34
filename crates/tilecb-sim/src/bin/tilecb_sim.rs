//! 分块流水线模拟器。
//!
//! # 使用方法
//! ```bash
//! RUST_LOG=tilecb_core=trace cargo run -p tilecb-sim -- crates/tilecb-sim/configs/eltwise.toml
//! ```
//! - 不带参数时使用内置配置；
//! - `--check` 只装配流水线而不运行，用于校验配置文件。

use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use tilecb_sim::{Pipeline, SimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config_path = None;
    let mut check_only = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--check" => check_only = true,
            flag if flag.starts_with("--") => bail!("未知参数: {flag}"),
            path => {
                if config_path.replace(PathBuf::from(path)).is_some() {
                    bail!("只能指定一个配置文件");
                }
            }
        }
    }

    let config = match &config_path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("加载配置 {} 失败", path.display()))?,
        None => SimConfig::default(),
    };
    let pipeline = Pipeline::new(config).context("装配流水线失败")?;
    if check_only {
        info!("configuration is valid");
        return Ok(());
    }

    let report = pipeline.run().context("运行流水线失败")?;
    for stage in &report.stages {
        info!(stage = stage.stage, tiles = stage.tiles, "stage summary");
    }
    if let Some(signals) = report.downstream_signals {
        info!(signals, "downstream monitor summary");
    }
    Ok(())
}
