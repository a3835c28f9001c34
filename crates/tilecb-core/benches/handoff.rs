use criterion::{Criterion, black_box};
use std::{env, thread, time::Duration};
use tilecb_core::{BufferSpec, CbId, CircularBufferSet, DataMovement, Engine, Pack, Unpack};

const CB: CbId = CbId::of(0);

fn buffers(capacity: u32) -> CircularBufferSet {
    CircularBufferSet::builder()
        .buffer(BufferSpec::new(CB, capacity, 2048))
        .and_then(|builder| builder.build())
        .expect("基准布局必须合法")
}

/// 单线程下一轮完整握手的成本。
///
/// # 设计背景（Why）
/// - 四个操作在条件已满足时应退化为几次原子读写，这一基准用于发现热路径上的回归；
/// - 使用数据搬运角色，两侧操作都真实执行。
fn bench_single_thread_cycle(c: &mut Criterion) {
    let set = buffers(8);
    let engine = Engine::<DataMovement>::new(&set);
    c.bench_function("handoff_cycle_single_thread", |b| {
        b.iter(|| {
            engine.wait_for_space(CB, black_box(4));
            engine.commit_produced(CB, 4);
            engine.wait_for_data(CB, black_box(4));
            engine.release_consumed(CB, 4);
        });
    });
}

/// 两个线程通过容量为 2 的缓冲逐块交接 1024 个分块。
///
/// # 逻辑解析（How）
/// - 每次迭代新建缓冲表并以作用域线程运行生产端，消费端在基准线程上运行；
/// - 结果包含线程创建开销，只适合做相对比较。
fn bench_two_thread_ping_pong(c: &mut Criterion) {
    const TILES: u32 = 1024;
    c.bench_function("handoff_ping_pong_1024_tiles", |b| {
        b.iter(|| {
            let set = buffers(2);
            thread::scope(|scope| {
                scope.spawn(|| {
                    let pack = Engine::<Pack>::new(&set);
                    for _ in 0..TILES {
                        pack.wait_for_space(CB, 1);
                        pack.commit_produced(CB, 1);
                    }
                });
                let unpack = Engine::<Unpack>::new(&set);
                for _ in 0..TILES {
                    unpack.wait_for_data(CB, 1);
                    unpack.release_consumed(CB, 1);
                }
            });
            black_box(set.buffer(CB).snapshot())
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_single_thread_cycle(&mut criterion);
    bench_two_thread_ping_pong(&mut criterion);
    criterion.final_summary();
}
