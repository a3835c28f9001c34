//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 握手协议的四个操作没有错误通道：前置条件由调用方保证，违反即为程序错误；
//! - 真正可以失败的只有装配阶段：缓冲布局描述可能越界、重复或容量为零。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，在 `no_std` 下同样可用；
//! - 每个变体暴露稳定的 `<域>.<语义>` 错误码，供日志与告警做机读分类。

use thiserror::Error;

/// 装配环形缓冲表时的错误域。
#[derive(Debug, Error)]
pub enum LayoutError {
    /// 标识符超出缓冲表容量。
    #[error("circular buffer id {id} exceeds the table size of {max}", max = crate::NUM_CIRCULAR_BUFFERS)]
    IdOutOfRange { id: u8 },

    /// 容量为零的缓冲永远无法满足任何等待。
    #[error("circular buffer cb{id} declares zero capacity")]
    ZeroCapacity { id: u8 },

    /// 分块字节数为零，存储协作者无法寻址。
    #[error("circular buffer cb{id} declares a zero tile size")]
    ZeroTileSize { id: u8 },

    /// 同一标识被配置两次。
    #[error("circular buffer cb{id} is configured more than once")]
    DuplicateId { id: u8 },

    /// 布局中没有任何缓冲。
    #[error("pipeline layout declares no circular buffers")]
    EmptyLayout,

    /// TOML 布局文本解析失败。
    #[cfg(feature = "toml_layout")]
    #[error("failed to parse pipeline layout: {0}")]
    Parse(#[from] toml::de::Error),
}

impl LayoutError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::IdOutOfRange { .. } => "cb.layout.id_out_of_range",
            LayoutError::ZeroCapacity { .. } => "cb.layout.zero_capacity",
            LayoutError::ZeroTileSize { .. } => "cb.layout.zero_tile_size",
            LayoutError::DuplicateId { .. } => "cb.layout.duplicate_id",
            LayoutError::EmptyLayout => "cb.layout.empty",
            #[cfg(feature = "toml_layout")]
            LayoutError::Parse(_) => "cb.layout.parse",
        }
    }
}
