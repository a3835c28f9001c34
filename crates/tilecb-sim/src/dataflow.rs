//! 数据搬运阶段：reader 向输入缓冲灌入分块，writer 从输出缓冲取走结果。
//!
//! 两者都以数据搬运角色调用握手协议，一次只搬一个分块。

use tilecb_core::{CbId, DataMovement, DownstreamTap, Engine};
use tracing::debug;

use crate::tile::{L1, Tile};

/// 把 `tiles` 依次写入 `cb`，返回写入的分块数。
pub fn reader(l1: &L1, cb: CbId, tiles: impl IntoIterator<Item = Tile>) -> u32 {
    let engine = Engine::<DataMovement>::new(l1.buffers());
    let buffer = l1.buffers().buffer(cb);
    let storage = l1.storage(cb);
    let mut moved = 0;
    for tile in tiles {
        engine.wait_for_space(cb, 1);
        storage.write(buffer.write_pos(), 0, tile);
        engine.commit_produced(cb, 1);
        moved += 1;
    }
    debug!(%cb, tiles = moved, "reader drained its source");
    moved
}

/// 从 `cb` 取走 `tiles` 个分块，按提交顺序返回。
pub fn writer(l1: &L1, cb: CbId, tiles: u32) -> Vec<Tile> {
    let engine = Engine::<DataMovement>::new(l1.buffers());
    let buffer = l1.buffers().buffer(cb);
    let storage = l1.storage(cb);
    let mut out = Vec::with_capacity(tiles as usize);
    for _ in 0..tiles {
        engine.wait_for_data(cb, 1);
        out.push(storage.read(buffer.read_pos(), 0));
        engine.release_consumed(cb, 1);
    }
    debug!(%cb, tiles, "writer collected all tiles");
    out
}

/// 第二个下游阶段：只跟随信号计数，不读取也不释放分块。
///
/// 游标须在生产端开始提交之前创建，否则起点之前的信号不会被计入。
pub fn monitor(mut tap: DownstreamTap<'_>, tiles: u32) -> u64 {
    for _ in 0..tiles {
        tap.wait_for(1);
    }
    debug!(signals = tap.observed(), "monitor observed downstream signals");
    tap.observed()
}
