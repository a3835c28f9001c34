use std::path::PathBuf;

use thiserror::Error;
use tilecb_core::{CbId, LayoutError};

/// 模拟器装配与运行阶段的错误。
///
/// # 契约说明（What）
/// - 配置与布局错误都在任何阶段线程启动之前返回；
/// - 阶段线程一旦启动便没有错误通道，只有 panic 会以 [`SimError::StagePanicked`] 的形式带回。
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse simulator config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// 配置引用了布局中不存在的缓冲。
    #[error("{role} buffer {id} is not declared in the layout")]
    MissingBuffer { id: CbId, role: &'static str },

    /// 输入与输出共用同一个缓冲会让两个生产端同时推进写计数。
    #[error("input and output both name {id}")]
    SharedEndpoint { id: CbId },

    /// 分块元素数与缓冲声明的字节数不一致。
    #[error("{id} declares {actual} bytes per tile, the configured tile needs {expected}")]
    TileSizeMismatch { id: CbId, expected: u32, actual: u32 },

    #[error("tile length must be non-zero")]
    EmptyTile,

    /// 分块字节数超出 `u32` 可表示的范围。
    #[error("tile length {tile_len} does not fit a u32 byte size")]
    TileTooLarge { tile_len: usize },

    #[error("stage `{stage}` panicked")]
    StagePanicked { stage: &'static str },
}

impl SimError {
    /// 稳定错误码，命名方式与 [`LayoutError::code`] 一致。
    pub fn code(&self) -> &'static str {
        match self {
            SimError::Io { .. } => "sim.config.io",
            SimError::Config(_) => "sim.config.parse",
            SimError::Layout(err) => err.code(),
            SimError::MissingBuffer { .. } => "sim.config.missing_buffer",
            SimError::SharedEndpoint { .. } => "sim.config.shared_endpoint",
            SimError::TileSizeMismatch { .. } => "sim.config.tile_size_mismatch",
            SimError::EmptyTile => "sim.config.empty_tile",
            SimError::TileTooLarge { .. } => "sim.config.tile_too_large",
            SimError::StagePanicked { .. } => "sim.run.stage_panicked",
        }
    }
}
