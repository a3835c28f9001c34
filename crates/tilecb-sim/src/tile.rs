//! 分块数据与缓冲背后的存储槽位。
//!
//! 协议层只管计数，槽位内容由这里的存储协作者负责：写入发生在 `wait_for_space` 与
//! `commit_produced` 之间，读取发生在 `wait_for_data` 与 `release_consumed` 之间。
//! 计数器上的 Release/Acquire 已经保证了槽位的独占，`spin::Mutex` 只为在安全 Rust 中
//! 表达内部可变性，实际运行时不会出现争用。

use std::collections::BTreeMap;

use spin::Mutex;
use tilecb_core::{CbId, CircularBufferSet, LayoutError, PipelineLayout};

/// 一个分块：定长的 `f32` 元素序列。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tile(Vec<f32>);

impl Tile {
    /// 全零分块。
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// 第 `index` 个输入分块：元素依次为 `index * len + j`。
    pub fn ramp(index: u32, len: usize) -> Self {
        let base = index as usize * len;
        Self((0..len).map(|j| (base + j) as f32).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// 逐元素变换。
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.iter().copied().map(f).collect())
    }
}

impl From<Vec<f32>> for Tile {
    fn from(elements: Vec<f32>) -> Self {
        Self(elements)
    }
}

/// 单个环形缓冲的槽位数组，下标为 `(位置 + 偏移) mod 容量`。
pub struct TileStorage {
    slots: Box<[Mutex<Tile>]>,
}

impl TileStorage {
    pub fn new(capacity: u32, tile_len: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(Tile::zeroed(tile_len))).collect(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// 把 `tile` 写入 `pos` 之后第 `offset` 个槽位。
    pub fn write(&self, pos: u32, offset: u32, tile: Tile) {
        *self.slot(pos, offset).lock() = tile;
    }

    /// 复制出 `pos` 之后第 `offset` 个槽位的内容。
    pub fn read(&self, pos: u32, offset: u32) -> Tile {
        self.slot(pos, offset).lock().clone()
    }

    fn slot(&self, pos: u32, offset: u32) -> &Mutex<Tile> {
        let index = (u64::from(pos) + u64::from(offset)) % self.slots.len() as u64;
        &self.slots[index as usize]
    }
}

/// 片上存储：缓冲表与每个缓冲的槽位数组。
pub struct L1 {
    buffers: CircularBufferSet,
    storage: BTreeMap<CbId, TileStorage>,
}

impl L1 {
    /// 按布局装配缓冲表，并为每个缓冲分配 `capacity` 个长度为 `tile_len` 的槽位。
    pub fn from_layout(layout: &PipelineLayout, tile_len: usize) -> Result<Self, LayoutError> {
        let buffers = CircularBufferSet::from_layout(layout)?;
        let storage = buffers
            .iter()
            .map(|cb| (cb.id(), TileStorage::new(cb.capacity(), tile_len)))
            .collect();
        Ok(Self { buffers, storage })
    }

    pub fn buffers(&self) -> &CircularBufferSet {
        &self.buffers
    }

    /// 查找缓冲的槽位数组；与 [`CircularBufferSet::buffer`] 相同，未配置的缓冲属于程序错误。
    #[track_caller]
    pub fn storage(&self, cb: CbId) -> &TileStorage {
        match self.storage.get(&cb) {
            Some(storage) => storage,
            None => panic!("tile storage for {cb} is not allocated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecb_core::BufferSpec;

    #[test]
    fn slots_wrap_around_capacity() {
        let storage = TileStorage::new(3, 2);
        storage.write(2, 1, Tile::from(vec![1.0, 2.0]));
        assert_eq!(storage.read(0, 0).as_slice(), &[1.0, 2.0]);
        assert_eq!(storage.read(1, 0), Tile::zeroed(2));
    }

    #[test]
    fn ramp_tiles_are_contiguous() {
        assert_eq!(Tile::ramp(2, 3).as_slice(), &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn l1_allocates_storage_per_buffer() {
        let layout = PipelineLayout::default()
            .with_buffer(BufferSpec::new(CbId::of(0), 4, 16))
            .with_buffer(BufferSpec::new(CbId::of(16), 2, 16));
        let l1 = L1::from_layout(&layout, 4).expect("布局合法");
        assert_eq!(l1.storage(CbId::of(0)).capacity(), 4);
        assert_eq!(l1.storage(CbId::of(16)).capacity(), 2);
    }
}
