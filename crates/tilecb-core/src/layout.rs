//! 缓冲布局描述：外部装配协作者向缓冲表提供的全部输入。

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::id::CbId;

/// 单个环形缓冲的配置。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub id: CbId,
    /// 可容纳的分块数。
    pub capacity: u32,
    /// 单个分块的字节数。
    pub tile_size: u32,
}

impl BufferSpec {
    pub const fn new(id: CbId, capacity: u32, tile_size: u32) -> Self {
        Self {
            id,
            capacity,
            tile_size,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), LayoutError> {
        if self.capacity == 0 {
            return Err(LayoutError::ZeroCapacity { id: self.id.get() });
        }
        if self.tile_size == 0 {
            return Err(LayoutError::ZeroTileSize { id: self.id.get() });
        }
        Ok(())
    }
}

/// 一条流水线段的完整缓冲布局。
///
/// 启用 `toml_layout` 时可直接从 TOML 文本读取：
///
/// ```toml
/// [[buffers]]
/// id = 0
/// capacity = 8
/// tile_size = 2048
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLayout {
    #[serde(default)]
    pub buffers: Vec<BufferSpec>,
}

impl PipelineLayout {
    /// 追加一个缓冲配置，便于链式构建。
    pub fn with_buffer(mut self, spec: BufferSpec) -> Self {
        self.buffers.push(spec);
        self
    }

    /// 从 TOML 文本解析布局；只做语法与取值范围解析，结构校验在装配缓冲表时进行。
    #[cfg(feature = "toml_layout")]
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        Ok(toml::from_str(text)?)
    }
}
