//! 计算核：同一份核函数源码由 unpack、math、pack 三个线程各执行一遍。
//!
//! # 设计背景（Why）
//! - 硬件上三个线程共享一份核程序，每个线程只保留属于自己的那部分调用，其余调用编译为空；
//! - 宿主模拟沿用同样的写法：[`ComputeKernel::run`] 以角色为类型参数单态化，
//!   [`CoreContext`] 上的 `unpack_tile`/`math`/`pack_tile` 与 [`Engine`] 的握手操作
//!   都只在对应角色上生效。
//!
//! # 逻辑解析（How）
//! - unpack 从输入缓冲读出分块，经内部源寄存器缓冲（容量 1）交给 math；
//! - math 变换后写入内部目的寄存器缓冲（容量 2，双缓冲），pack 从中取出并写入输出缓冲；
//! - 内部交接直接使用 [`primitive`] 原语，与外部缓冲遵循同一套计数协议。

use core::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tilecb_core::{
    BufferSpec, CbId, CircularBufferSet, DefaultFlags, Engine, EngineRole, LayoutError, Math, Pack,
    Spin, SyncFlags, Unpack, primitive,
};

use crate::tile::{L1, Tile, TileStorage};

const SRC_A: CbId = CbId::of(0);
const DST: CbId = CbId::of(1);

/// 目的寄存器分两半，math 写一半的同时 pack 读另一半。
const DST_HALVES: u32 = 2;

/// 逐元素运算。
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MathOp {
    #[default]
    Copy,
    Scale(f32),
    Offset(f32),
}

impl MathOp {
    pub fn apply(self, tile: &Tile) -> Tile {
        match self {
            MathOp::Copy => tile.clone(),
            MathOp::Scale(factor) => tile.map(|x| x * factor),
            MathOp::Offset(delta) => tile.map(|x| x + delta),
        }
    }
}

/// 计算核内部的寄存器交接区。
pub struct CoreRegisters {
    hand_off: CircularBufferSet,
    src_a: TileStorage,
    dst: TileStorage,
}

impl CoreRegisters {
    pub fn new(tile_len: usize, tile_size: u32) -> Result<Self, LayoutError> {
        let hand_off = CircularBufferSet::builder()
            .buffer(BufferSpec::new(SRC_A, 1, tile_size))?
            .buffer(BufferSpec::new(DST, DST_HALVES, tile_size))?
            .build()?;
        Ok(Self {
            hand_off,
            src_a: TileStorage::new(1, tile_len),
            dst: TileStorage::new(DST_HALVES, tile_len),
        })
    }

    fn push(&self, cb: CbId, storage: &TileStorage, tile: Tile) {
        let buffer = self.hand_off.buffer(cb);
        primitive::wait_for_free_tiles::<DefaultFlags, Spin>(buffer, 1);
        storage.write(buffer.write_pos(), 0, tile);
        primitive::push_tiles::<DefaultFlags>(buffer, 1);
    }

    fn pop(&self, cb: CbId, storage: &TileStorage) -> Tile {
        let buffer = self.hand_off.buffer(cb);
        primitive::wait_tiles::<DefaultFlags, Spin>(buffer, 1);
        let tile = storage.read(buffer.read_pos(), 0);
        primitive::pop_tiles::<DefaultFlags>(buffer, 1);
        tile
    }
}

/// 计算核线程。默认实现全部为空，每个角色只覆盖属于自己的那一步。
pub trait CoreThread: EngineRole + Sized {
    /// 把输入缓冲中读指针之后第 `offset` 个分块送入源寄存器。
    fn unpack_tile(_l1: &L1, _regs: &CoreRegisters, _cb: CbId, _offset: u32) {}

    /// 对源寄存器中的分块做运算，结果写入目的寄存器。
    fn math(_regs: &CoreRegisters, _op: MathOp) {}

    /// 把目的寄存器中的分块写到输出缓冲写指针之后第 `offset` 个槽位。
    fn pack_tile(_l1: &L1, _regs: &CoreRegisters, _cb: CbId, _offset: u32) {}
}

impl CoreThread for Unpack {
    fn unpack_tile(l1: &L1, regs: &CoreRegisters, cb: CbId, offset: u32) {
        let pos = l1.buffers().buffer(cb).read_pos();
        let tile = l1.storage(cb).read(pos, offset);
        regs.push(SRC_A, &regs.src_a, tile);
    }
}

impl CoreThread for Math {
    fn math(regs: &CoreRegisters, op: MathOp) {
        let tile = regs.pop(SRC_A, &regs.src_a);
        regs.push(DST, &regs.dst, op.apply(&tile));
    }
}

impl CoreThread for Pack {
    fn pack_tile(l1: &L1, regs: &CoreRegisters, cb: CbId, offset: u32) {
        let tile = regs.pop(DST, &regs.dst);
        let pos = l1.buffers().buffer(cb).write_pos();
        l1.storage(cb).write(pos, offset, tile);
    }
}

/// 某个计算核线程看到的执行环境。
///
/// `F` 决定该线程握手时使用的同步开关；输出缓冲需要通知第二个下游阶段时，
/// 三个线程使用同一组开关编译，只有 pack 的提交真正推进信号。
pub struct CoreContext<'a, R, F = DefaultFlags> {
    l1: &'a L1,
    regs: &'a CoreRegisters,
    _thread: PhantomData<fn() -> (R, F)>,
}

impl<'a, R: CoreThread, F: SyncFlags> CoreContext<'a, R, F> {
    pub fn new(l1: &'a L1, regs: &'a CoreRegisters) -> Self {
        Self {
            l1,
            regs,
            _thread: PhantomData,
        }
    }

    /// 本线程的握手入口。
    pub fn engine(&self) -> Engine<'a, R, F> {
        Engine::with_config(self.l1.buffers())
    }

    pub fn unpack_tile(&self, cb: CbId, offset: u32) {
        R::unpack_tile(self.l1, self.regs, cb, offset);
    }

    pub fn math(&self, op: MathOp) {
        R::math(self.regs, op);
    }

    pub fn pack_tile(&self, cb: CbId, offset: u32) {
        R::pack_tile(self.l1, self.regs, cb, offset);
    }
}

/// 计算核程序。返回本线程处理的分块数。
pub trait ComputeKernel: Sync {
    fn run<R: CoreThread, F: SyncFlags>(&self, core: &CoreContext<'_, R, F>) -> u32;
}

/// 单输入单输出的逐元素核：每次处理一个分块。
#[derive(Clone, Copy, Debug)]
pub struct EltwiseKernel {
    pub input: CbId,
    pub output: CbId,
    pub tiles: u32,
    pub op: MathOp,
}

impl ComputeKernel for EltwiseKernel {
    fn run<R: CoreThread, F: SyncFlags>(&self, core: &CoreContext<'_, R, F>) -> u32 {
        let engine = core.engine();
        for _ in 0..self.tiles {
            engine.wait_for_data(self.input, 1);
            core.unpack_tile(self.input, 0);
            engine.release_consumed(self.input, 1);

            core.math(self.op);

            engine.wait_for_space(self.output, 1);
            core.pack_tile(self.output, 0);
            engine.commit_produced(self.output, 1);
        }
        self.tiles
    }
}
