use core::{fmt, hint, marker::PhantomData};

use spin::relax::{RelaxStrategy, Spin};

use crate::id::CbId;
use crate::sync::{AtomicU64, Ordering};

/// 单个环形缓冲的共享状态。
///
/// # 设计背景（Why）
/// - 生产阶段与消费阶段运行在互不共享指令流的执行单元上，唯一的交汇点就是这里的计数器；
/// - 每个字段只有一个写端：`received` 只由生产端推进，`acked` 只由消费端推进，
///   `signalled` 只由生产端在需要通知下游时推进，因此无需锁，也不存在写写竞争。
///
/// # 逻辑解析（How）
/// - 三个计数器均为单调递增的 64 位累计值；
/// - `ready = received - acked`，`free = capacity - ready`，两者之和恒等于容量；
/// - `write_pos = received mod capacity`、`read_pos = acked mod capacity`，
///   计数与位置来自同一次原子写，观测方不可能只看到其中之一。
///
/// # 契约说明（What）
/// - 容量在装配时确定，之后不可变；
/// - `advance_*` 方法只允许对应一侧调用，调用次序由协议层保证。
pub struct CircularBuffer {
    id: CbId,
    capacity: u32,
    tile_size: u32,
    received: AtomicU64,
    acked: AtomicU64,
    signalled: AtomicU64,
}

impl CircularBuffer {
    pub(crate) fn new(id: CbId, capacity: u32, tile_size: u32) -> Self {
        Self {
            id,
            capacity,
            tile_size,
            received: AtomicU64::new(0),
            acked: AtomicU64::new(0),
            signalled: AtomicU64::new(0),
        }
    }

    /// 缓冲标识。
    pub fn id(&self) -> CbId {
        self.id
    }

    /// 可容纳的最大分块数。
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 单个分块的字节数，供存储协作者寻址。
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// 消费端读指针。
    ///
    /// 由消费端在 `wait_for_data` 与 `release_consumed` 之间调用时，
    /// 得到的是本轮待读取区域的起点。
    pub fn read_pos(&self) -> u32 {
        self.wrap(self.acked.load(Ordering::Acquire))
    }

    /// 生产端写指针，语义与 [`read_pos`](Self::read_pos) 对称。
    pub fn write_pos(&self) -> u32 {
        self.wrap(self.received.load(Ordering::Acquire))
    }

    /// 读取一份自洽的计数快照。
    ///
    /// 先后读取 `acked`、`received`、`acked`，两次 `acked` 相同才返回；计数器单调递增，
    /// 因此该快照对应某个真实存在的时刻，即使从第三个线程读取也满足
    /// `ready + free == capacity`。仅用于装配、诊断与测试，不属于握手协议的操作面。
    pub fn snapshot(&self) -> CbSnapshot {
        loop {
            let acked = self.acked.load(Ordering::Acquire);
            let received = self.received.load(Ordering::Acquire);
            if self.acked.load(Ordering::Acquire) == acked {
                let ready = self.occupancy(received, acked);
                return CbSnapshot {
                    capacity: self.capacity,
                    ready,
                    free: self.capacity - ready,
                    read_pos: self.wrap(acked),
                    write_pos: self.wrap(received),
                };
            }
            hint::spin_loop();
        }
    }

    /// 创建观测下游信号的游标，起点为当前已发出的信号总数。
    pub fn downstream_tap(&self) -> DownstreamTap<'_> {
        DownstreamTap::with_relax(self)
    }

    /// 消费端视角的就绪分块数：对端计数按 `order` 观测，本端计数只有自己写。
    pub(crate) fn ready_for_consumer(&self, order: Ordering) -> u32 {
        let received = self.received.load(order);
        let acked = self.acked.load(Ordering::Relaxed);
        self.occupancy(received, acked)
    }

    /// 生产端视角的空闲槽位数。
    pub(crate) fn free_for_producer(&self, order: Ordering) -> u32 {
        let acked = self.acked.load(order);
        let received = self.received.load(Ordering::Relaxed);
        self.capacity - self.occupancy(received, acked)
    }

    pub(crate) fn advance_acked(&self, tiles: u32, order: Ordering) {
        let acked = self.acked.load(Ordering::Relaxed);
        debug_assert!(
            self.occupancy(self.received.load(Ordering::Acquire), acked) >= tiles,
            "{}: 释放的分块数超过就绪数量",
            self.id
        );
        self.acked.store(acked + u64::from(tiles), order);
    }

    pub(crate) fn advance_received(&self, tiles: u32, order: Ordering) {
        let received = self.received.load(Ordering::Relaxed);
        debug_assert!(
            self.capacity - self.occupancy(received, self.acked.load(Ordering::Acquire)) >= tiles,
            "{}: 提交的分块数超过空闲槽位",
            self.id
        );
        self.received.store(received + u64::from(tiles), order);
    }

    pub(crate) fn advance_signalled(&self, tiles: u32, order: Ordering) {
        let signalled = self.signalled.load(Ordering::Relaxed);
        self.signalled.store(signalled + u64::from(tiles), order);
    }

    fn occupancy(&self, received: u64, acked: u64) -> u32 {
        let ready = received.wrapping_sub(acked);
        debug_assert!(ready <= u64::from(self.capacity), "{}: 计数越过容量", self.id);
        ready as u32
    }

    fn wrap(&self, count: u64) -> u32 {
        (count % u64::from(self.capacity)) as u32
    }
}

impl fmt::Debug for CircularBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("id", &self.id)
            .field("tile_size", &self.tile_size)
            .field("state", &self.snapshot())
            .finish()
    }
}

/// 某一时刻的计数快照。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CbSnapshot {
    pub capacity: u32,
    pub ready: u32,
    pub free: u32,
    pub read_pos: u32,
    pub write_pos: u32,
}

/// 第二个下游阶段对某个缓冲的只读观测游标。
///
/// 生产端以携带 `SIGNAL_DOWNSTREAM` 的配置提交分块时，会额外推进缓冲的信号计数；
/// 游标在本地记录已经消费过的信号数量，不回写缓冲的任何字段。
pub struct DownstreamTap<'a, S = Spin> {
    buffer: &'a CircularBuffer,
    seen: u64,
    _relax: PhantomData<fn() -> S>,
}

impl<'a, S: RelaxStrategy> DownstreamTap<'a, S> {
    /// 以指定轮询策略创建游标。
    pub fn with_relax(buffer: &'a CircularBuffer) -> Self {
        Self {
            buffer,
            seen: buffer.signalled.load(Ordering::Acquire),
            _relax: PhantomData,
        }
    }

    /// 忙等直到游标之后至少又有 `tiles` 个分块被通知，然后越过它们。
    pub fn wait_for(&mut self, tiles: u32) {
        let target = self.seen + u64::from(tiles);
        while self.buffer.signalled.load(Ordering::Acquire) < target {
            S::relax();
        }
        self.seen = target;
    }

    /// 游标已越过的信号总数。
    pub fn observed(&self) -> u64 {
        self.seen
    }
}

impl<S> fmt::Debug for DownstreamTap<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamTap")
            .field("cb", &self.buffer.id)
            .field("seen", &self.seen)
            .finish()
    }
}
