use core::{array, fmt};

use tracing::debug;

use crate::buffer::CircularBuffer;
use crate::error::LayoutError;
use crate::id::{CbId, NUM_CIRCULAR_BUFFERS};
use crate::layout::{BufferSpec, PipelineLayout};

/// 一条流水线段内全部环形缓冲组成的固定表。
///
/// # 设计背景（Why）
/// - 握手操作只以缓冲标识寻址，因此所有缓冲集中在一张按标识下标的表中；
/// - 表在流水线运行前一次装配完成，运行期间不增删、不调整容量。
///
/// # 契约说明（What）
/// - 通过 [`builder`](Self::builder) 或 [`from_layout`](Self::from_layout) 构造，装配阶段完成全部校验；
/// - 表本身只读共享（`&CircularBufferSet` 可跨线程），计数器更新由协议层按单写者纪律完成。
pub struct CircularBufferSet {
    slots: [Option<CircularBuffer>; NUM_CIRCULAR_BUFFERS],
    configured: usize,
}

impl CircularBufferSet {
    pub fn builder() -> CircularBufferSetBuilder {
        CircularBufferSetBuilder::default()
    }

    /// 依照布局描述装配缓冲表。
    pub fn from_layout(layout: &PipelineLayout) -> Result<Self, LayoutError> {
        layout
            .buffers
            .iter()
            .try_fold(Self::builder(), |builder, spec| builder.buffer(*spec))?
            .build()
    }

    /// 查找已配置的缓冲。
    pub fn get(&self, id: CbId) -> Option<&CircularBuffer> {
        self.slots[id.index()].as_ref()
    }

    /// 查找协议调用所引用的缓冲。
    ///
    /// # Panics
    /// 引用未配置的缓冲属于程序构造错误，握手协议没有错误通道，此处直接终止调用线程。
    #[track_caller]
    pub fn buffer(&self, id: CbId) -> &CircularBuffer {
        match self.get(id) {
            Some(buffer) => buffer,
            None => panic!("circular buffer {id} is not configured"),
        }
    }

    /// 按标识升序遍历已配置的缓冲。
    pub fn iter(&self) -> impl Iterator<Item = &CircularBuffer> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.configured
    }

    pub fn is_empty(&self) -> bool {
        self.configured == 0
    }
}

impl fmt::Debug for CircularBufferSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// 缓冲表装配器，逐个登记缓冲配置并即时校验。
#[derive(Debug)]
pub struct CircularBufferSetBuilder {
    specs: [Option<BufferSpec>; NUM_CIRCULAR_BUFFERS],
}

impl Default for CircularBufferSetBuilder {
    fn default() -> Self {
        Self {
            specs: array::from_fn(|_| None),
        }
    }
}

impl CircularBufferSetBuilder {
    /// 登记一个缓冲。容量或分块大小为零、标识重复时返回错误。
    pub fn buffer(mut self, spec: BufferSpec) -> Result<Self, LayoutError> {
        spec.validate()?;
        let slot = &mut self.specs[spec.id.index()];
        if slot.is_some() {
            return Err(LayoutError::DuplicateId { id: spec.id.get() });
        }
        *slot = Some(spec);
        Ok(self)
    }

    /// 完成装配，所有计数器处于初始状态 `(ready = 0, free = capacity)`。
    pub fn build(self) -> Result<CircularBufferSet, LayoutError> {
        let configured = self.specs.iter().flatten().count();
        if configured == 0 {
            return Err(LayoutError::EmptyLayout);
        }
        let slots = self.specs.map(|spec| {
            spec.map(|spec| {
                debug!(
                    cb = %spec.id,
                    capacity = spec.capacity,
                    tile_size = spec.tile_size,
                    "circular buffer configured"
                );
                CircularBuffer::new(spec.id, spec.capacity, spec.tile_size)
            })
        });
        Ok(CircularBufferSet { slots, configured })
    }
}
