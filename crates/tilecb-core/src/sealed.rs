//! 内部 sealed 模块用于控制角色与配置标记的实现边界。
//!
//! # 设计背景（Why）
//! - 执行角色（`Unpack`/`Math`/`Pack`/`DataMovement`）对应固定的硬件线程，
//!   外部 crate 新增角色会绕开分派表，使某条调用路径在错误的线程上执行计数器更新。
//! - 通过 `Sealed` 标记，角色集合与同步路径集合只能在本 crate 内扩展。
//!
//! # 契约说明（What）
//! - `Sealed` 仅由本 crate 内的角色标记、路径标记与 [`CbFlags`](crate::flags::CbFlags) 实现；
//! - 公开 Trait 的前置条件与返回契约仍在各自定义处描述。
pub(crate) trait Sealed {}
