#![cfg(any(loom, tilecb_loom))]

//! 握手协议的 Loom 模型。
//!
//! 运行方式：`RUSTFLAGS="--cfg tilecb_loom" cargo test -p tilecb-core --features loom-model --test loom_protocol`。
//! 计数器在该配置下切换为 Loom 原子，槽位同样使用 Loom 原子并以 `Relaxed` 读写，
//! 因而槽位内容是否可见完全取决于计数器上的 Release/Acquire 配对。

use loom::{
    model,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};
use spin::relax::RelaxStrategy;
use tilecb_core::{
    BufferSpec, CbFlags, CbId, CircularBufferSet, DataMovement, DefaultFlags, DownstreamTap,
    Engine,
};

const CB: CbId = CbId::of(0);

/// 轮询时让出给 Loom 调度器，否则忙等循环会让模型无法前进。
struct LoomYield;

impl RelaxStrategy for LoomYield {
    fn relax() {
        thread::yield_now();
    }
}

fn buffers(capacity: u32) -> Arc<CircularBufferSet> {
    let set = CircularBufferSet::builder()
        .buffer(BufferSpec::new(CB, capacity, 64))
        .and_then(|builder| builder.build())
        .expect("模型布局必须合法");
    Arc::new(set)
}

fn slots(capacity: u32) -> Arc<Vec<AtomicU64>> {
    Arc::new((0..capacity).map(|_| AtomicU64::new(u64::MAX)).collect())
}

#[test]
fn committed_tiles_are_visible_before_counts() {
    //
    // 教案级说明：
    // - **Why**：消费端观测到 `ready >= n` 时，生产端在提交前写入的槽位必须已经可见；
    // - **How**：容量 2、共 3 个分块，强制至少一次回绕与一次满缓冲等待；
    // - **What**：消费端按序读到 0、1、2，结束时计数回到初始状态。
    model(|| {
        const TOTAL: u64 = 3;
        let set = buffers(2);
        let storage = slots(2);

        let producer = {
            let set = Arc::clone(&set);
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                let engine = Engine::<DataMovement, DefaultFlags, LoomYield>::with_config(&set);
                for value in 0..TOTAL {
                    engine.wait_for_space(CB, 1);
                    let pos = set.buffer(CB).write_pos() as usize;
                    storage[pos].store(value, Ordering::Relaxed);
                    engine.commit_produced(CB, 1);
                }
            })
        };

        let consumer = {
            let set = Arc::clone(&set);
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                let engine = Engine::<DataMovement, DefaultFlags, LoomYield>::with_config(&set);
                let mut seen = Vec::new();
                for _ in 0..TOTAL {
                    engine.wait_for_data(CB, 1);
                    let pos = set.buffer(CB).read_pos() as usize;
                    seen.push(storage[pos].load(Ordering::Relaxed));
                    engine.release_consumed(CB, 1);
                }
                seen
            })
        };

        producer.join().expect("生产线程不应 panic");
        let seen = consumer.join().expect("消费线程不应 panic");
        assert_eq!(seen, vec![0, 1, 2], "消费顺序必须与提交顺序一致");

        let snap = set.buffer(CB).snapshot();
        assert_eq!((snap.ready, snap.free), (0, 2));
        assert_eq!(snap.read_pos, snap.write_pos);
    });
}

#[test]
fn released_slots_are_safe_to_overwrite() {
    //
    // 教案级说明：
    // - **Why**：生产端在 `wait_for_space` 返回后覆写的槽位，消费端必须已经读完；
    // - **How**：容量 1，消费端先读取再释放，生产端随即覆写同一个槽位；
    // - **What**：消费端读到的两个值都未被提前覆写。
    model(|| {
        let set = buffers(1);
        let storage = slots(1);

        let consumer = {
            let set = Arc::clone(&set);
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                let engine = Engine::<DataMovement, DefaultFlags, LoomYield>::with_config(&set);
                let mut seen = Vec::new();
                for _ in 0..2 {
                    engine.wait_for_data(CB, 1);
                    seen.push(storage[0].load(Ordering::Relaxed));
                    engine.release_consumed(CB, 1);
                }
                seen
            })
        };

        let engine = Engine::<DataMovement, DefaultFlags, LoomYield>::with_config(&set);
        for value in [10, 20] {
            engine.wait_for_space(CB, 1);
            storage[0].store(value, Ordering::Relaxed);
            engine.commit_produced(CB, 1);
        }

        let seen = consumer.join().expect("消费线程不应 panic");
        assert_eq!(seen, vec![10, 20]);
    });
}

#[test]
fn downstream_signal_implies_tile_visibility() {
    //
    // 教案级说明：
    // - **Why**：第二个下游阶段只看信号计数，不参与握手；信号可见时分块内容也必须可见；
    // - **How**：生产端以 `SIGNAL_DOWNSTREAM` 提交一个分块，观察线程通过游标等待信号后读取槽位；
    // - **What**：观察线程读到生产端写入的值，且信号不改变就绪计数。
    model(|| {
        type Forwarding = CbFlags<false, true>;

        let set = buffers(2);
        let storage = slots(2);

        let watcher = {
            let set = Arc::clone(&set);
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                let mut tap = DownstreamTap::<LoomYield>::with_relax(set.buffer(CB));
                // 游标创建时信号可能已经发出，此时起点即为 1。
                if tap.observed() == 0 {
                    tap.wait_for(1);
                }
                storage[0].load(Ordering::Relaxed)
            })
        };

        let engine = Engine::<DataMovement, Forwarding, LoomYield>::with_config(&set);
        engine.wait_for_space(CB, 1);
        storage[0].store(7, Ordering::Relaxed);
        engine.commit_produced(CB, 1);

        assert_eq!(watcher.join().expect("观察线程不应 panic"), 7);
        assert_eq!(set.buffer(CB).snapshot().ready, 1);
    });
}
