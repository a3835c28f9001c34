use std::thread::{self, ScopedJoinHandle};

use tilecb_core::{CbFlags, DefaultFlags, Math, Pack, SyncFlags, Unpack};
use tracing::{error, info};

use crate::compute::{ComputeKernel, CoreContext, CoreRegisters, EltwiseKernel};
use crate::config::SimConfig;
use crate::dataflow;
use crate::error::SimError;
use crate::tile::{L1, Tile};

/// pack 提交时同时通知第二个下游阶段的开关组合。
type Forwarding = CbFlags<false, true>;

/// 一条完整的分块流水线：reader → unpack → math → pack → writer。
///
/// # 设计背景（Why）
/// - 五个阶段各占一个宿主线程，相互之间只通过环形缓冲的计数握手，没有任何其他同步；
/// - 装配在 [`Pipeline::new`] 中一次完成，所有可失败的检查都在线程启动前结束。
///
/// # 契约说明（What）
/// - 握手协议没有超时与取消，某个阶段 panic 后其上下游会一直等待；
///   [`SimError::StagePanicked`] 只能报告在其余阶段全部完成后才 panic 的阶段。
pub struct Pipeline {
    config: SimConfig,
    l1: L1,
    regs: CoreRegisters,
}

/// 单个阶段处理的分块数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageCount {
    pub stage: &'static str,
    pub tiles: u32,
}

/// 一次运行的结果。
#[derive(Debug)]
pub struct RunReport {
    /// writer 取回的分块，按提交顺序排列。
    pub output: Vec<Tile>,
    pub stages: Vec<StageCount>,
    /// 开启下游通知时，第二个下游阶段观察到的信号总数。
    pub downstream_signals: Option<u64>,
}

impl Pipeline {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let tile_size = config.tile_size()?;
        let l1 = L1::from_layout(&config.layout, config.tile_len)?;
        let regs = CoreRegisters::new(config.tile_len, tile_size)?;
        Ok(Self { config, l1, regs })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// 启动全部阶段并等待它们结束。同一个 `Pipeline` 可以反复运行，计数器延续上一次的位置。
    pub fn run(&self) -> Result<RunReport, SimError> {
        if self.config.forward_downstream {
            self.run_with::<Forwarding>()
        } else {
            self.run_with::<DefaultFlags>()
        }
    }

    fn run_with<F: SyncFlags>(&self) -> Result<RunReport, SimError> {
        let config = &self.config;
        let tiles = config.tiles;
        let kernel = EltwiseKernel {
            input: config.input,
            output: config.output,
            tiles,
            op: config.op,
        };
        info!(
            tiles,
            input = %config.input,
            output = %config.output,
            op = ?config.op,
            forward_downstream = F::SIGNAL_DOWNSTREAM,
            "pipeline starting"
        );

        // 游标必须在 pack 第一次提交之前就位。
        let tap = F::SIGNAL_DOWNSTREAM
            .then(|| self.l1.buffers().buffer(config.output).downstream_tap());

        let (reader, unpack, math, pack, writer, monitor) = thread::scope(|scope| {
            let l1 = &self.l1;
            let regs = &self.regs;
            let kernel = &kernel;

            let reader = scope.spawn(move || {
                let source = (0..tiles).map(|index| Tile::ramp(index, config.tile_len));
                dataflow::reader(l1, config.input, source)
            });
            let unpack = scope.spawn(move || kernel.run(&CoreContext::<Unpack, F>::new(l1, regs)));
            let math = scope.spawn(move || kernel.run(&CoreContext::<Math, F>::new(l1, regs)));
            let pack = scope.spawn(move || kernel.run(&CoreContext::<Pack, F>::new(l1, regs)));
            let writer = scope.spawn(move || dataflow::writer(l1, config.output, tiles));
            let monitor = tap.map(|tap| scope.spawn(move || dataflow::monitor(tap, tiles)));

            (
                join("reader", reader),
                join("unpack", unpack),
                join("math", math),
                join("pack", pack),
                join("writer", writer),
                monitor.map(|handle| join("monitor", handle)),
            )
        });

        let output = writer?;
        let stages = vec![
            StageCount { stage: "reader", tiles: reader? },
            StageCount { stage: "unpack", tiles: unpack? },
            StageCount { stage: "math", tiles: math? },
            StageCount { stage: "pack", tiles: pack? },
            StageCount { stage: "writer", tiles: output.len() as u32 },
        ];
        let downstream_signals = monitor.transpose()?;

        info!(tiles = output.len(), ?downstream_signals, "pipeline finished");
        Ok(RunReport {
            output,
            stages,
            downstream_signals,
        })
    }
}

fn join<T>(stage: &'static str, handle: ScopedJoinHandle<'_, T>) -> Result<T, SimError> {
    handle.join().map_err(|_| {
        error!(stage, "pipeline stage panicked");
        SimError::StagePanicked { stage }
    })
}
