//! 执行单元侧的底层等待/更新原语。
//!
//! 每个原语直接作用在某个 [`CircularBuffer`] 上，以 `(缓冲, 分块数, 编译期开关)` 为参数，
//! 没有返回值也没有错误通道。等待原语是紧凑的轮询循环：调用线程在条件满足前不会让出给
//! 任何调度器，`S::relax()` 只是插入一次 CPU 自旋提示。
//!
//! 角色分派由 [`engine`](crate::engine) 完成；这里的函数不关心调用者是哪种执行单元。

use spin::relax::RelaxStrategy;

use crate::buffer::CircularBuffer;
use crate::flags::SyncFlags;

/// 忙等直到缓冲中至少有 `tiles` 个就绪分块。
#[inline]
pub fn wait_tiles<F: SyncFlags, S: RelaxStrategy>(cb: &CircularBuffer, tiles: u32) {
    debug_assert!(tiles <= cb.capacity(), "{}: 等待的分块数超过容量", cb.id());
    while cb.ready_for_consumer(F::ORDERING.load()) < tiles {
        S::relax();
    }
}

/// 归还已读取的 `tiles` 个分块。写入即对生产端可见，无需后续调用。
#[inline]
pub fn pop_tiles<F: SyncFlags>(cb: &CircularBuffer, tiles: u32) {
    cb.advance_acked(tiles, F::ORDERING.store());
}

/// 忙等直到缓冲中至少有 `tiles` 个空闲槽位。
#[inline]
pub fn wait_for_free_tiles<F: SyncFlags, S: RelaxStrategy>(cb: &CircularBuffer, tiles: u32) {
    debug_assert!(tiles <= cb.capacity(), "{}: 等待的槽位数超过容量", cb.id());
    while cb.free_for_producer(F::ORDERING.load()) < tiles {
        S::relax();
    }
}

/// 发布已写入的 `tiles` 个分块。
///
/// 开启 `SIGNAL_DOWNSTREAM` 时，在就绪计数发布之后再推进下游信号计数，
/// 观测到信号的下游阶段因此必然也能观测到对应的分块。
#[inline]
pub fn push_tiles<F: SyncFlags>(cb: &CircularBuffer, tiles: u32) {
    cb.advance_received(tiles, F::ORDERING.store());
    if F::SIGNAL_DOWNSTREAM {
        cb.advance_signalled(tiles, F::ORDERING.store());
    }
}
