//! 执行单元分派层。
//!
//! # 模块定位（Why）
//! - 同一份计算核源码会针对 unpack、math、pack 三个硬件线程各编译一次，
//!   每个线程只执行属于自己的那一半握手：unpack 消费输入缓冲，pack 填充输出缓冲，math 两者都不碰；
//! - 数据搬运单元（reader/writer）则两侧操作都会执行。
//!
//! # 结构概览（How）
//! - 角色标记 [`Unpack`]、[`Math`]、[`Pack`]、[`DataMovement`] 通过 [`EngineRole`] 的两个关联类型
//!   选出消费侧与生产侧路径：[`Active`] 委托给 [`primitive`](crate::primitive)，[`Inert`] 什么都不做；
//! - [`Engine`] 以 `(角色, 开关, 轮询策略)` 三个类型参数单态化，调用点不存在按角色的运行时分支。
//!
//! # 契约说明（What）
//! - 分派层本身不含任何缓冲状态逻辑；
//! - 在 `Inert` 路径上调用不会查找缓冲表，因此 math 线程可以引用其他线程才配置的缓冲。

use core::{fmt, marker::PhantomData};

use spin::relax::{RelaxStrategy, Spin};
use tracing::trace;

use crate::flags::{DefaultFlags, SyncFlags};
use crate::id::CbId;
use crate::primitive;
use crate::sealed::Sealed;
use crate::table::CircularBufferSet;

/// 执行单元角色。
pub trait EngineRole: Sealed + Send + Sync + 'static {
    /// 日志中使用的角色名。
    const NAME: &'static str;
    /// 消费侧（`wait_for_data`/`release_consumed`）的实际路径。
    type Consumer: ConsumerPath;
    /// 生产侧（`wait_for_space`/`commit_produced`）的实际路径。
    type Producer: ProducerPath;
}

/// 消费侧路径。
pub trait ConsumerPath: Sealed {
    fn wait_for_data<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    );

    fn release_consumed<R: EngineRole, F: SyncFlags>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    );
}

/// 生产侧路径。
pub trait ProducerPath: Sealed {
    fn wait_for_space<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    );

    fn commit_produced<R: EngineRole, F: SyncFlags>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    );
}

/// 真正执行计数器等待/更新的路径。
#[derive(Clone, Copy, Debug)]
pub struct Active;

/// 被编译掉的路径：调用即返回。
#[derive(Clone, Copy, Debug)]
pub struct Inert;

impl Sealed for Active {}
impl Sealed for Inert {}

impl ConsumerPath for Active {
    #[inline]
    fn wait_for_data<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    ) {
        primitive::wait_tiles::<F, S>(buffers.buffer(cb), tiles);
    }

    #[inline]
    fn release_consumed<R: EngineRole, F: SyncFlags>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    ) {
        primitive::pop_tiles::<F>(buffers.buffer(cb), tiles);
        trace!(role = R::NAME, %cb, tiles, "released consumed tiles");
    }
}

impl ProducerPath for Active {
    #[inline]
    fn wait_for_space<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    ) {
        primitive::wait_for_free_tiles::<F, S>(buffers.buffer(cb), tiles);
    }

    #[inline]
    fn commit_produced<R: EngineRole, F: SyncFlags>(
        buffers: &CircularBufferSet,
        cb: CbId,
        tiles: u32,
    ) {
        primitive::push_tiles::<F>(buffers.buffer(cb), tiles);
        trace!(
            role = R::NAME,
            %cb,
            tiles,
            downstream = F::SIGNAL_DOWNSTREAM,
            "committed produced tiles"
        );
    }
}

impl ConsumerPath for Inert {
    #[inline(always)]
    fn wait_for_data<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        _: &CircularBufferSet,
        _: CbId,
        _: u32,
    ) {
    }

    #[inline(always)]
    fn release_consumed<R: EngineRole, F: SyncFlags>(_: &CircularBufferSet, _: CbId, _: u32) {}
}

impl ProducerPath for Inert {
    #[inline(always)]
    fn wait_for_space<R: EngineRole, F: SyncFlags, S: RelaxStrategy>(
        _: &CircularBufferSet,
        _: CbId,
        _: u32,
    ) {
    }

    #[inline(always)]
    fn commit_produced<R: EngineRole, F: SyncFlags>(_: &CircularBufferSet, _: CbId, _: u32) {}
}

/// 解包单元：从输入缓冲取数，只执行消费侧。
#[derive(Clone, Copy, Debug)]
pub struct Unpack;

/// 计算单元：不直接参与缓冲握手。
#[derive(Clone, Copy, Debug)]
pub struct Math;

/// 打包单元：向输出缓冲写结果，只执行生产侧。
#[derive(Clone, Copy, Debug)]
pub struct Pack;

/// 数据搬运单元：reader/writer 两侧都会用到。
#[derive(Clone, Copy, Debug)]
pub struct DataMovement;

impl Sealed for Unpack {}
impl Sealed for Math {}
impl Sealed for Pack {}
impl Sealed for DataMovement {}

impl EngineRole for Unpack {
    const NAME: &'static str = "unpack";
    type Consumer = Active;
    type Producer = Inert;
}

impl EngineRole for Math {
    const NAME: &'static str = "math";
    type Consumer = Inert;
    type Producer = Inert;
}

impl EngineRole for Pack {
    const NAME: &'static str = "pack";
    type Consumer = Inert;
    type Producer = Active;
}

impl EngineRole for DataMovement {
    const NAME: &'static str = "data_movement";
    type Consumer = Active;
    type Producer = Active;
}

/// 某个执行单元对缓冲表的握手入口。
///
/// # 契约说明（What）
/// - `R`：调用线程的硬件角色，决定哪些操作真正执行；
/// - `F`：编译期同步开关，默认 [`DefaultFlags`]；
/// - `S`：轮询时的放松策略，默认 [`Spin`]（仅插入自旋提示，不让出线程）。
///
/// 四个操作的前置条件（`tiles <= capacity`，释放/提交不超过此前等待到的数量）由调用方保证，
/// 调试构建下以断言形式检查。
///
/// ```
/// use tilecb_core::{BufferSpec, CbId, CircularBufferSet, DataMovement, Engine};
///
/// const CB: CbId = CbId::of(0);
/// let buffers = CircularBufferSet::builder()
///     .buffer(BufferSpec::new(CB, 8, 2048))?
///     .build()?;
/// let engine = Engine::<DataMovement>::new(&buffers);
///
/// engine.wait_for_space(CB, 4);
/// engine.commit_produced(CB, 4);
/// engine.wait_for_data(CB, 4);
/// engine.release_consumed(CB, 4);
/// assert_eq!(buffers.buffer(CB).snapshot().free, 8);
/// # Ok::<(), tilecb_core::LayoutError>(())
/// ```
pub struct Engine<'a, R, F = DefaultFlags, S = Spin> {
    buffers: &'a CircularBufferSet,
    _config: PhantomData<fn() -> (R, F, S)>,
}

impl<'a, R: EngineRole> Engine<'a, R> {
    /// 以默认开关与默认轮询策略创建入口。
    pub fn new(buffers: &'a CircularBufferSet) -> Self {
        Self::with_config(buffers)
    }
}

impl<'a, R, F, S> Engine<'a, R, F, S>
where
    R: EngineRole,
    F: SyncFlags,
    S: RelaxStrategy,
{
    /// 以任意开关与轮询策略创建入口，类型参数即全部配置。
    pub fn with_config(buffers: &'a CircularBufferSet) -> Self {
        Self {
            buffers,
            _config: PhantomData,
        }
    }

    /// 入口所引用的缓冲表。
    pub fn buffers(&self) -> &'a CircularBufferSet {
        self.buffers
    }

    /// 阻塞直到 `cb` 中至少有 `tiles` 个就绪分块。
    #[inline]
    pub fn wait_for_data(&self, cb: CbId, tiles: u32) {
        R::Consumer::wait_for_data::<R, F, S>(self.buffers, cb, tiles);
    }

    /// 归还 `tiles` 个已读取分块。
    #[inline]
    pub fn release_consumed(&self, cb: CbId, tiles: u32) {
        R::Consumer::release_consumed::<R, F>(self.buffers, cb, tiles);
    }

    /// 阻塞直到 `cb` 中至少有 `tiles` 个空闲槽位。
    #[inline]
    pub fn wait_for_space(&self, cb: CbId, tiles: u32) {
        R::Producer::wait_for_space::<R, F, S>(self.buffers, cb, tiles);
    }

    /// 发布 `tiles` 个已写入分块。
    #[inline]
    pub fn commit_produced(&self, cb: CbId, tiles: u32) {
        R::Producer::commit_produced::<R, F>(self.buffers, cb, tiles);
    }
}

impl<R, F, S> Clone for Engine<'_, R, F, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, F, S> Copy for Engine<'_, R, F, S> {}

impl<R: EngineRole, F, S> fmt::Debug for Engine<'_, R, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("role", &R::NAME)
            .field("buffers", &self.buffers.len())
            .finish()
    }
}

#[cfg(all(test, not(any(loom, tilecb_loom))))]
mod tests {
    use super::*;
    use crate::layout::BufferSpec;

    const IN: CbId = CbId::of(0);
    const OUT: CbId = CbId::of(16);

    fn buffers() -> CircularBufferSet {
        CircularBufferSet::builder()
            .buffer(BufferSpec::new(IN, 4, 2048))
            .and_then(|b| b.buffer(BufferSpec::new(OUT, 4, 2048)))
            .and_then(|b| b.build())
            .expect("测试布局必须合法")
    }

    #[test]
    fn unpack_only_drives_consumer_side() {
        let set = buffers();
        Engine::<DataMovement>::new(&set).commit_produced(IN, 2);

        let unpack = Engine::<Unpack>::new(&set);
        unpack.commit_produced(OUT, 3);
        assert_eq!(set.buffer(OUT).snapshot().ready, 0, "unpack 的生产侧已被编译掉");

        unpack.wait_for_data(IN, 2);
        unpack.release_consumed(IN, 2);
        assert_eq!(set.buffer(IN).snapshot().free, 4);
    }

    #[test]
    fn pack_only_drives_producer_side() {
        let set = buffers();
        let pack = Engine::<Pack>::new(&set);
        pack.wait_for_space(OUT, 4);
        pack.commit_produced(OUT, 4);
        pack.release_consumed(OUT, 4);
        assert_eq!(set.buffer(OUT).snapshot().ready, 4, "pack 的消费侧已被编译掉");
    }

    #[test]
    fn math_never_blocks_and_never_touches_counters() {
        let set = buffers();
        let math = Engine::<Math>::new(&set);
        // 空缓冲上等待数据、满额等待空间都会立即返回。
        math.wait_for_data(IN, 4);
        math.commit_produced(OUT, 4);
        math.wait_for_space(OUT, 4);
        // 未配置的缓冲同样不会被查找。
        math.wait_for_data(CbId::of(7), 1);
        assert_eq!(set.buffer(OUT).snapshot().ready, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "等待的分块数超过容量")]
    fn waiting_for_more_data_than_capacity_is_a_programmer_error() {
        let set = buffers();
        Engine::<DataMovement>::new(&set).wait_for_data(IN, 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "等待的槽位数超过容量")]
    fn waiting_for_more_space_than_capacity_is_a_programmer_error() {
        let set = buffers();
        Engine::<DataMovement>::new(&set).wait_for_space(OUT, 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "释放的分块数超过就绪数量")]
    fn releasing_on_empty_buffer_is_a_programmer_error() {
        let set = buffers();
        Engine::<Unpack>::new(&set).release_consumed(IN, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "提交的分块数超过空闲槽位")]
    fn committing_into_full_buffer_is_a_programmer_error() {
        let set = buffers();
        let pack = Engine::<Pack>::new(&set);
        pack.wait_for_space(OUT, 4);
        pack.commit_produced(OUT, 4);
        pack.commit_produced(OUT, 1);
    }

    #[test]
    fn debug_output_names_role() {
        let set = buffers();
        let rendered = format!("{:?}", Engine::<Pack>::new(&set));
        assert!(rendered.contains("pack"));
    }
}
