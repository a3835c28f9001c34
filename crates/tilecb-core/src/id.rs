use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// 单条流水线内可配置的环形缓冲数量上限。
pub const NUM_CIRCULAR_BUFFERS: usize = 32;

/// 环形缓冲标识符。
///
/// # 契约说明（What）
/// - 取值范围 `0..NUM_CIRCULAR_BUFFERS`，构造时完成校验，协议调用路径不再重复检查；
/// - 在同一条流水线内唯一，唯一性由 [`CircularBufferSet`](crate::CircularBufferSet) 在装配阶段保证。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CbId(u8);

impl CbId {
    /// 校验并构造标识符。
    pub fn new(raw: u8) -> Result<Self, LayoutError> {
        if usize::from(raw) < NUM_CIRCULAR_BUFFERS {
            Ok(Self(raw))
        } else {
            Err(LayoutError::IdOutOfRange { id: raw })
        }
    }

    /// 编译期常量构造，越界时在常量求值阶段失败。
    ///
    /// ```
    /// use tilecb_core::CbId;
    ///
    /// const IN0: CbId = CbId::of(0);
    /// assert_eq!(IN0.index(), 0);
    /// ```
    pub const fn of(raw: u8) -> Self {
        assert!((raw as usize) < NUM_CIRCULAR_BUFFERS, "环形缓冲标识越界");
        Self(raw)
    }

    /// 返回原始编号。
    pub const fn get(self) -> u8 {
        self.0
    }

    /// 作为缓冲表下标使用。
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for CbId {
    type Error = LayoutError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<CbId> for u8 {
    fn from(id: CbId) -> Self {
        id.0
    }
}

impl fmt::Display for CbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb{}", self.0)
    }
}
