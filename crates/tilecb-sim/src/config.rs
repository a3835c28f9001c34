//! 模拟器配置。
//!
//! ```toml
//! tile_len = 256
//! tiles = 64
//! input = 0
//! output = 16
//! forward_downstream = true
//! op = { kind = "scale", value = 2.0 }
//!
//! [[layout.buffers]]
//! id = 0
//! capacity = 8
//! tile_size = 1024
//!
//! [[layout.buffers]]
//! id = 16
//! capacity = 8
//! tile_size = 1024
//! ```

use std::{fs, mem, path::Path};

use serde::{Deserialize, Serialize};
use tilecb_core::{BufferSpec, CbId, PipelineLayout};

use crate::compute::MathOp;
use crate::error::SimError;

const DEFAULT_TILE_LEN: usize = 256;
const DEFAULT_INPUT: CbId = CbId::of(0);
const DEFAULT_OUTPUT: CbId = CbId::of(16);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// 每个分块的 `f32` 元素数。
    #[serde(default = "default_tile_len")]
    pub tile_len: usize,
    /// reader 灌入的分块总数。
    pub tiles: u32,
    pub input: CbId,
    pub output: CbId,
    #[serde(default)]
    pub op: MathOp,
    /// pack 提交时是否同时通知第二个下游阶段。
    #[serde(default)]
    pub forward_downstream: bool,
    pub layout: PipelineLayout,
}

fn default_tile_len() -> usize {
    DEFAULT_TILE_LEN
}

impl Default for SimConfig {
    fn default() -> Self {
        let tile_size = (DEFAULT_TILE_LEN * mem::size_of::<f32>()) as u32;
        Self {
            tile_len: DEFAULT_TILE_LEN,
            tiles: 64,
            input: DEFAULT_INPUT,
            output: DEFAULT_OUTPUT,
            op: MathOp::Scale(2.0),
            forward_downstream: false,
            layout: PipelineLayout::default()
                .with_buffer(BufferSpec::new(DEFAULT_INPUT, 8, tile_size))
                .with_buffer(BufferSpec::new(DEFAULT_OUTPUT, 8, tile_size)),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// 单个分块的字节数。
    pub fn tile_size(&self) -> Result<u32, SimError> {
        if self.tile_len == 0 {
            return Err(SimError::EmptyTile);
        }
        self.tile_len
            .checked_mul(mem::size_of::<f32>())
            .and_then(|bytes| u32::try_from(bytes).ok())
            .ok_or(SimError::TileTooLarge {
                tile_len: self.tile_len,
            })
    }

    /// 检查缓冲引用与分块大小；布局本身的合法性在装配缓冲表时检查。
    pub fn validate(&self) -> Result<(), SimError> {
        let tile_size = self.tile_size()?;
        if self.input == self.output {
            return Err(SimError::SharedEndpoint { id: self.input });
        }
        for (id, role) in [(self.input, "input"), (self.output, "output")] {
            let spec = self
                .layout
                .buffers
                .iter()
                .find(|spec| spec.id == id)
                .ok_or(SimError::MissingBuffer { id, role })?;
            if spec.tile_size != tile_size {
                return Err(SimError::TileSizeMismatch {
                    id,
                    expected: tile_size,
                    actual: spec.tile_size,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        tile_len = 4
        tiles = 12
        input = 1
        output = 17
        forward_downstream = true
        op = { kind = "offset", value = 1.5 }

        [[layout.buffers]]
        id = 1
        capacity = 2
        tile_size = 16

        [[layout.buffers]]
        id = 17
        capacity = 3
        tile_size = 16
    "#;

    #[test]
    fn parses_full_config() {
        let config = SimConfig::from_toml_str(SAMPLE).expect("配置合法");
        assert_eq!(config.tile_len, 4);
        assert_eq!(config.tiles, 12);
        assert_eq!(config.input, CbId::of(1));
        assert_eq!(config.op, MathOp::Offset(1.5));
        assert!(config.forward_downstream);
        assert_eq!(config.layout.buffers.len(), 2);
        config.validate().expect("引用与分块大小一致");
    }

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().expect("内置配置必须合法");
    }

    #[test]
    fn rejects_missing_output_buffer() {
        let mut config = SimConfig::default();
        config.output = CbId::of(20);
        let err = config.validate().expect_err("输出缓冲不存在");
        assert!(matches!(err, SimError::MissingBuffer { role: "output", .. }));
        assert_eq!(err.code(), "sim.config.missing_buffer");
    }

    #[test]
    fn rejects_shared_endpoint_and_size_mismatch() {
        let mut config = SimConfig::default();
        config.output = config.input;
        assert!(matches!(config.validate(), Err(SimError::SharedEndpoint { .. })));

        let mut config = SimConfig::default();
        config.tile_len = 8;
        assert!(matches!(
            config.validate(),
            Err(SimError::TileSizeMismatch { expected: 32, actual: 1024, .. })
        ));

        config.tile_len = 0;
        assert!(matches!(config.validate(), Err(SimError::EmptyTile)));
    }

    #[test]
    fn oversized_tile_is_not_reported_as_empty() {
        let mut config = SimConfig::default();
        config.tile_len = 2_000_000_000;
        let err = config.tile_size().expect_err("字节数超出 u32");
        assert!(matches!(
            err,
            SimError::TileTooLarge {
                tile_len: 2_000_000_000
            }
        ));
        assert_eq!(err.code(), "sim.config.tile_too_large");
        assert!(matches!(
            config.validate(),
            Err(SimError::TileTooLarge { .. })
        ));
    }

    #[test]
    fn reports_parse_errors_with_stable_code() {
        let err = SimConfig::from_toml_str("tiles = \"many\"").expect_err("类型错误");
        assert_eq!(err.code(), "sim.config.parse");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimConfig::load("/nonexistent/tilecb-sim.toml").expect_err("文件不存在");
        assert_eq!(err.code(), "sim.config.io");
    }
}
