#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![allow(private_bounds)]
#![doc = "tilecb-core: 分块流水线各执行阶段之间的环形缓冲握手协议。"]
#![doc = ""]
#![doc = "生产阶段与消费阶段运行在互相独立的执行单元上，彼此之间没有共享指令流，也没有调度器仲裁；"]
#![doc = "双方唯一的交汇点是每个环形缓冲上的计数器。协议只有四个操作："]
#![doc = ""]
#![doc = "| 操作 | 调用方 | 前置条件 | 后置条件 |"]
#![doc = "|---|---|---|---|"]
#![doc = "| `wait_for_data` | 消费端 | 无 | 返回时 `ready >= n` |"]
#![doc = "| `release_consumed` | 消费端 | `ready >= n` | `ready -= n; free += n` |"]
#![doc = "| `wait_for_space` | 生产端 | 无 | 返回时 `free >= n` |"]
#![doc = "| `commit_produced` | 生产端 | `free >= n` | `free -= n; ready += n` |"]
#![doc = ""]
#![doc = "等待操作是纯轮询，没有超时、没有取消；条件永远无法满足时调用线程会一直停在原地。"]

extern crate alloc;

mod sealed;
mod sync;

pub mod buffer;
pub mod engine;
pub mod error;
pub mod flags;
pub mod id;
pub mod layout;
pub mod primitive;
pub mod table;

pub use buffer::{CbSnapshot, CircularBuffer, DownstreamTap};
pub use engine::{
    Active, ConsumerPath, DataMovement, Engine, EngineRole, Inert, Math, Pack, ProducerPath,
    Unpack,
};
pub use error::LayoutError;
pub use flags::{CbFlags, DefaultFlags, SyncFlags, SyncOrdering};
pub use id::{CbId, NUM_CIRCULAR_BUFFERS};
pub use layout::{BufferSpec, PipelineLayout};
pub use table::{CircularBufferSet, CircularBufferSetBuilder};

/// 轮询放松策略，直接沿用 `spin` 的定义。
pub use spin::relax::{RelaxStrategy, Spin};
