//! Left-Right 双缓冲读写单元
//!
//! 两份完全相同的实例：读者总是读"当前"那份，写者先改另一份，
//! 切换当前指示，等旧的读者全部离开后，再把同样的修改应用到另一份。
//!
//! ```text
//!            current ──┐
//!                      ▼
//!   instances: [  slot 0  ][  slot 1  ]
//!   readers:   [ epoch 0 count ][ epoch 1 count ]
//!                      ▲
//!            epoch ────┘
//! ```
//!
//! - 读：wait-free，只有两次原子计数
//! - 写：parking_lot::Mutex 只在写者之间互斥，从不阻塞读者
//! - 写操作会被调用**两次**，必须只修改传入的实例，且结果与起始状态无关
//!
//! 读闭包如果不返回（死循环/阻塞），写者会一直自旋等待，没有超时。

use crate::shared::metrics::METRICS;
use crossbeam::utils::{Backoff, CachePadded};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// 双缓冲并发单元
///
/// # 写操作契约
/// `write` 的闭包会对两份实例各执行一次。闭包必须：
/// - 只修改传入的 `&mut T`，不产生其他副作用
/// - 幂等：两份实例起始状态相同，执行后结束状态也必须相同
///
/// 违反契约会让两份实例分叉，读者在后续写入之间看到不同的数据。
pub struct ConcurrentReadWriteCell<T> {
    instances: [UnsafeCell<T>; 2],
    /// 读者应该读的槽位 (0/1)
    current: AtomicUsize,
    /// 读者登记用的计数器下标 (0/1)
    epoch: AtomicUsize,
    /// 每个 epoch 的在途读者数
    readers: [CachePadded<AtomicUsize>; 2],
    /// 写者互斥
    writer: Mutex<()>,
}

// 安全性：读者只拿到 &T（需要 T: Sync），写者在互斥锁内独占非当前槽位，
// 并且只在该槽位的读者全部离开后才修改它（需要 T: Send）。
unsafe impl<T: Send + Sync> Sync for ConcurrentReadWriteCell<T> {}
unsafe impl<T: Send> Send for ConcurrentReadWriteCell<T> {}

/// 离开时一定递减计数器，读闭包 panic 也不例外
struct ReaderGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for ReaderGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T> ConcurrentReadWriteCell<T> {
    /// 用工厂函数构造两份相同的实例
    pub fn new<F: Fn() -> T>(factory: F) -> Self {
        Self {
            instances: [UnsafeCell::new(factory()), UnsafeCell::new(factory())],
            current: AtomicUsize::new(0),
            epoch: AtomicUsize::new(0),
            readers: [
                CachePadded::new(AtomicUsize::new(0)),
                CachePadded::new(AtomicUsize::new(0)),
            ],
            writer: Mutex::new(()),
        }
    }

    /// 在当前实例上执行只读闭包。wait-free，不会被写者阻塞。
    #[inline]
    pub fn read<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let counter = &*self.readers[epoch];
        counter.fetch_add(1, Ordering::SeqCst);
        let _guard = ReaderGuard { counter };

        let index = self.current.load(Ordering::SeqCst);
        // 安全性：写者不会修改 current 指向的槽位，直到本读者登记的计数归零
        let instance = unsafe { &*self.instances[index].get() };
        f(instance)
    }

    /// 对两份实例依次执行 `f`，返回第一次（读者随后看到的那份）的结果。
    ///
    /// `f` 会被调用两次，见类型文档中的契约。
    pub fn write<R, F: FnMut(&mut T) -> R>(&self, mut f: F) -> R {
        let _lock = self.writer.lock();

        let index = self.current.load(Ordering::SeqCst);
        let write_index = index ^ 1;

        // 安全性：持有写锁；write_index 不是 current，上一次写入结束前
        // 已等待它的读者全部离开，此后新读者只会读 index
        let result = f(unsafe { &mut *self.instances[write_index].get() });

        // 切换，之后到达的读者读新修改的实例
        self.current.store(write_index, Ordering::SeqCst);

        let started = Instant::now();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let next_epoch = epoch ^ 1;
        Self::wait_for_readers(&self.readers[next_epoch]);
        self.epoch.store(next_epoch, Ordering::SeqCst);
        Self::wait_for_readers(&self.readers[epoch]);
        METRICS
            .writer_drain_micros
            .observe(started.elapsed().as_secs_f64() * 1_000_000.0);

        // 安全性：两个 epoch 都排空过，没有读者还持有旧槽位
        f(unsafe { &mut *self.instances[index].get() });
        result
    }

    /// 自旋直到该 epoch 的在途读者全部离开
    #[inline]
    fn wait_for_readers(counter: &AtomicUsize) {
        let backoff = Backoff::new();
        while counter.load(Ordering::SeqCst) != 0 {
            backoff.snooze();
        }
    }

    /// 当前在途读者数（诊断用）
    pub fn active_readers(&self) -> usize {
        self.readers[0].load(Ordering::SeqCst) + self.readers[1].load(Ordering::SeqCst)
    }
}
