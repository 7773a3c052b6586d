//! 多读者 + 多写者压力测试：读者永远看不到写了一半的状态
use price_point_book::domain::events::{PriceLevel, SnapshotEvent, UpdateEvent};
use price_point_book::domain::orderbook::{HeapLevels, LevelContainer, ThreadSafeOrderBook, TreeLevels};
use price_point_book::shared::concurrency::ConcurrentReadWriteCell;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const LEVELS: i64 = 32;
const WRITES: i64 = 500;

/// 所有价位统一报同一个数量 generation
fn uniform_event(symbol: &str, generation: i64) -> UpdateEvent {
    let side: Vec<_> = (1..=LEVELS)
        .map(|i| PriceLevel::new(Decimal::new(i, 2), Decimal::from(generation)))
        .collect();
    UpdateEvent::new(symbol, side.clone(), side)
}

fn uniform_snapshot() -> SnapshotEvent {
    let event = uniform_event("", 1);
    SnapshotEvent::new(event.bids, event.asks)
}

/// 一侧的每个价位数量相同，价位数完整，排序正确
fn assert_consistent(levels: &[PriceLevel], descending: bool) -> Decimal {
    assert_eq!(levels.len(), LEVELS as usize, "torn read: missing levels");
    let quantity = levels[0].quantity;
    assert!(levels.iter().all(|l| l.quantity == quantity), "torn read: mixed generations");
    assert!(levels.windows(2).all(|w| (w[0].price > w[1].price) == descending));
    quantity
}

fn stress<C>(book: Arc<ThreadSafeOrderBook<C>>)
where
    C: LevelContainer + Send + Sync + 'static,
{
    book.initialize("X", &uniform_snapshot()).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let book = Arc::clone(&book);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_bid = Decimal::ZERO;
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let bid = assert_consistent(&book.ordered_bids("X"), true);
                    assert_consistent(&book.ordered_asks("X"), false);
                    // 写者串行，同一个读者看到的代数不会倒退
                    assert!(bid >= last_bid, "generation went backwards");
                    last_bid = bid;
                    assert_eq!(book.best_bid_price("X").unwrap(), Some(Decimal::new(LEVELS, 2)));
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let writer = {
        let book = Arc::clone(&book);
        thread::spawn(move || {
            for generation in 2..=WRITES {
                assert!(book.update(&uniform_event("X", generation)).unwrap());
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    let bids = book.ordered_bids("X");
    assert_eq!(assert_consistent(&bids, true), Decimal::from(WRITES));
}

#[test]
fn tree_readers_never_see_torn_updates() {
    stress(Arc::new(ThreadSafeOrderBook::<TreeLevels>::new()));
}

#[test]
fn heap_readers_never_see_torn_updates() {
    stress(Arc::new(ThreadSafeOrderBook::<HeapLevels>::new()));
}

#[test]
fn concurrent_writers_are_serialized() {
    let cell = Arc::new(ConcurrentReadWriteCell::new(|| vec![0u64; 16]));
    let writers: Vec<_> = (0..4)
        .map(|_| {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for _ in 0..250 {
                    // 两份实例从同一状态出发，各加一次，结果一致
                    cell.write(|values| values.iter_mut().for_each(|v| *v += 1));
                }
            })
        })
        .collect();

    let reader = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            for _ in 0..10_000 {
                cell.read(|values| assert!(values.iter().all(|&v| v == values[0])));
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    cell.read(|values| assert!(values.iter().all(|&v| v == 1000)));
    assert_eq!(cell.active_readers(), 0);
}

#[test]
fn clear_during_reads_is_safe() {
    let book = Arc::new(ThreadSafeOrderBook::<HeapLevels>::new());
    book.initialize("X", &uniform_snapshot()).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let book = Arc::clone(&book);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let bids = book.ordered_bids("X");
                // 要么完整要么不存在
                assert!(bids.is_empty() || bids.len() == LEVELS as usize);
            }
        })
    };

    for _ in 0..200 {
        book.clear("X");
        book.initialize("X", &uniform_snapshot()).unwrap();
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();
}
