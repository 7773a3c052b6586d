//! DedupBinaryHeap - 元素唯一的数组二叉堆
//!
//! 和普通二叉堆的区别：`push` 先线性扫描是否已有相等元素（比较器意义），
//! 有就原地覆盖，没有才入堆。代价是 add/remove 都是 O(n)，换来实现简单，
//! 用来和 BalancedTreeSet 做基准对比。
//!
//! - peek: O(1)
//! - push/remove: O(n) 扫描 + O(log n) 上浮/下沉
//! - ordered_elements: O(n log n)，复制后排序，仅用于诊断/测试

use super::KeyOrder;
use std::cmp::Ordering;

/// 扩容倍数
const GROW_FACTOR: usize = 2;

/// 每次扩容至少增加的槽位
const MINIMUM_GROW: usize = 4;

/// 最大元素个数（与常见运行时的最大数组长度一致）
pub const MAX_CAPACITY: usize = 0x7FFF_FFC7;

/// 堆无法再扩容
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("heap capacity exceeded: {requested} elements requested, maximum is {max}")]
pub struct CapacityError {
    pub requested: usize,
    pub max: usize,
}

/// 唯一元素二叉堆，根是比较器意义下的最小元素
pub struct DedupBinaryHeap<T, C> {
    queue: Vec<T>,
    /// 逻辑容量，按 GROW_FACTOR 翻倍增长
    capacity: usize,
    max_capacity: usize,
    order: C,
}

impl<T: Copy, C: KeyOrder<T>> DedupBinaryHeap<T, C> {
    pub fn with_capacity(capacity: usize, order: C) -> Self {
        Self::with_limits(capacity, MAX_CAPACITY, order)
    }

    /// 指定绝对容量上限
    pub fn with_limits(capacity: usize, max_capacity: usize, order: C) -> Self {
        assert!(capacity <= max_capacity, "Initial capacity exceeds the maximum");
        Self {
            queue: Vec::with_capacity(capacity),
            capacity,
            max_capacity,
            order,
        }
    }

    /// 根元素
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.queue.first()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 插入或覆盖
    ///
    /// # 返回
    /// - `Ok(true)`: 新元素已入堆
    /// - `Ok(false)`: 已有相等元素，已原地覆盖（比较器相等，堆序不变）
    /// - `Err(CapacityError)`: 超过绝对容量上限
    pub fn push(&mut self, item: T) -> Result<bool, CapacityError> {
        if let Some(index) = self.index_of(&item) {
            self.queue[index] = item;
            return Ok(false);
        }

        let size = self.queue.len();
        if size >= self.capacity {
            self.grow(size + 1)?;
        }

        self.queue.push(item);
        self.sift_up(size, item);
        Ok(true)
    }

    /// 删除相等元素，不存在返回 false
    pub fn remove(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// 复制后排序，不影响堆本身
    pub fn ordered_elements(&self) -> Vec<T> {
        let mut copy = self.queue.clone();
        copy.sort_by(|a, b| self.order.compare(a, b));
        copy
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// 线性扫描 O(n)
    fn index_of(&self, item: &T) -> Option<usize> {
        self.queue
            .iter()
            .position(|e| self.order.compare(item, e) == Ordering::Equal)
    }

    fn remove_at(&mut self, index: usize) {
        let last = self.queue.len() - 1;
        let moved = match self.queue.pop() {
            Some(moved) => moved,
            None => return,
        };
        if index == last {
            return;
        }

        // 不知道失衡方向：先尝试下沉，没动就上浮
        if self.sift_down(index, moved) == index {
            self.sift_up(index, moved);
        }
    }

    fn sift_up(&mut self, mut k: usize, x: T) {
        while k > 0 {
            let parent = (k - 1) >> 1;
            let e = self.queue[parent];
            if self.order.compare(&x, &e) != Ordering::Less {
                break;
            }
            self.queue[k] = e;
            k = parent;
        }
        self.queue[k] = x;
    }

    /// 返回 `x` 最终落下的位置
    fn sift_down(&mut self, mut k: usize, x: T) -> usize {
        let n = self.queue.len();
        let half = n >> 1;
        while k < half {
            let mut child = (k << 1) + 1;
            let mut c = self.queue[child];
            let right = child + 1;
            if right < n && self.order.compare(&c, &self.queue[right]) == Ordering::Greater {
                child = right;
                c = self.queue[child];
            }
            if self.order.compare(&x, &c) != Ordering::Greater {
                break;
            }
            self.queue[k] = c;
            k = child;
        }
        self.queue[k] = x;
        k
    }

    fn grow(&mut self, min_capacity: usize) -> Result<(), CapacityError> {
        let mut new_capacity = self
            .capacity
            .saturating_mul(GROW_FACTOR)
            .min(self.max_capacity);
        // 保证最小增量
        new_capacity = new_capacity.max(self.capacity + MINIMUM_GROW);
        if new_capacity < min_capacity {
            new_capacity = min_capacity;
        }
        if new_capacity > self.max_capacity {
            if min_capacity > self.max_capacity {
                return Err(CapacityError {
                    requested: min_capacity,
                    max: self.max_capacity,
                });
            }
            new_capacity = self.max_capacity;
        }

        self.queue.reserve_exact(new_capacity - self.queue.len());
        self.capacity = new_capacity;
        Ok(())
    }
}
