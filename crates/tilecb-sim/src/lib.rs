#![deny(unsafe_code)]
#![doc = "tilecb-sim: 在宿主线程上运行一条完整的分块流水线，驱动 tilecb-core 的握手协议。"]
#![doc = ""]
#![doc = "reader 与 writer 以数据搬运角色读写外部缓冲，计算核由 unpack、math、pack 三个线程"]
#![doc = "执行同一份核程序。分块内容存放在 [`tile::TileStorage`] 中，协议层只负责计数。"]

pub mod compute;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod pipeline;
pub mod tile;

pub use compute::{ComputeKernel, CoreContext, CoreRegisters, CoreThread, EltwiseKernel, MathOp};
pub use config::SimConfig;
pub use error::SimError;
pub use pipeline::{Pipeline, RunReport, StageCount};
pub use tile::{L1, Tile, TileStorage};
