//! 原子类型的统一入口。
//!
//! 启用 `--cfg loom`（或 `--cfg tilecb_loom`）时切换到 Loom 提供的原子类型，
//! 让模型检查器能够穷举计数器读写的全部调度交错；其余情况下直接使用 `core` 原子。

#[cfg(not(any(loom, tilecb_loom)))]
pub(crate) use core::sync::atomic::{AtomicU64, Ordering};
#[cfg(any(loom, tilecb_loom))]
pub(crate) use loom::sync::atomic::{AtomicU64, Ordering};
