//! 编译期同步配置。
//!
//! 同一条调用点在构建时即确定两项开关：计数器发布/观测使用的内存序，以及提交时是否额外
//! 通知第二个下游阶段。开关以关联常量表达，单态化后调用路径中不存在运行时分支。

use crate::sealed::Sealed;
use crate::sync::Ordering;

/// 计数器读写所采用的内存序档位。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOrdering {
    /// 写端 `Release`，轮询端 `Acquire`。
    AcquireRelease,
    /// 双端均为 `SeqCst`，与其他 `SeqCst` 访问构成全序。
    SequentiallyConsistent,
}

impl SyncOrdering {
    /// 轮询对端计数器时使用的读序。
    pub const fn load(self) -> Ordering {
        match self {
            SyncOrdering::AcquireRelease => Ordering::Acquire,
            SyncOrdering::SequentiallyConsistent => Ordering::SeqCst,
        }
    }

    /// 推进本端计数器时使用的写序。
    pub const fn store(self) -> Ordering {
        match self {
            SyncOrdering::AcquireRelease => Ordering::Release,
            SyncOrdering::SequentiallyConsistent => Ordering::SeqCst,
        }
    }
}

/// 一组编译期同步开关。
///
/// # 契约说明（What）
/// - `ORDERING`：计数器的发布/观测内存序；
/// - `SIGNAL_DOWNSTREAM`：`commit_produced` 是否同时推进下游信号计数，
///   供第二个下游阶段通过 [`DownstreamTap`](crate::DownstreamTap) 观测。
pub trait SyncFlags: Sealed + Send + Sync + 'static {
    const ORDERING: SyncOrdering;
    const SIGNAL_DOWNSTREAM: bool;
}

/// 以常量泛型承载的开关组合。
///
/// ```
/// use tilecb_core::{CbFlags, SyncFlags, SyncOrdering};
///
/// type Forwarding = CbFlags<false, true>;
/// assert_eq!(Forwarding::ORDERING, SyncOrdering::AcquireRelease);
/// assert!(Forwarding::SIGNAL_DOWNSTREAM);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct CbFlags<const SEQ_CST: bool, const SIGNAL_DOWNSTREAM: bool>;

impl<const SEQ_CST: bool, const SIGNAL: bool> Sealed for CbFlags<SEQ_CST, SIGNAL> {}

impl<const SEQ_CST: bool, const SIGNAL: bool> SyncFlags for CbFlags<SEQ_CST, SIGNAL> {
    const ORDERING: SyncOrdering = if SEQ_CST {
        SyncOrdering::SequentiallyConsistent
    } else {
        SyncOrdering::AcquireRelease
    };
    const SIGNAL_DOWNSTREAM: bool = SIGNAL;
}

/// 默认组合：`Acquire/Release`，不通知下游。
pub type DefaultFlags = CbFlags<false, false>;
