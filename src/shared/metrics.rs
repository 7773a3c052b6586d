//! Prometheus Metrics Module
//!
//! 订单簿的核心运行指标
//!
//! ## 指标类型
//! - **Counter**: 快照初始化次数、增量更新次数（按结果）、清空次数、错误次数
//! - **Histogram**: left-right 写者等待读者排空的时间
//!
//! ## 使用示例
//! ```rust,ignore
//! use price_point_book::shared::metrics::METRICS;
//!
//! METRICS.updates_total.with_label_values(&["applied"]).inc();
//! println!("{}", METRICS.export());
//! ```

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// 全局Metrics实例
    pub static ref METRICS: Metrics = Metrics::new();
}

/// 订单簿指标
pub struct Metrics {
    /// 快照初始化次数
    pub snapshots_total: IntCounter,

    /// 增量更新次数 (outcome: applied/ignored)
    pub updates_total: IntCounterVec,

    /// 清空次数
    pub clears_total: IntCounter,

    /// 错误总数 (按类型)
    pub errors_total: IntCounterVec,

    /// 写者排空读者的等待时间 (微秒)
    pub writer_drain_micros: Histogram,
}

impl Metrics {
    fn new() -> Self {
        Self {
            snapshots_total: register_int_counter!(
                "price_point_book_snapshots_total",
                "Total number of snapshots applied"
            )
            .unwrap(),

            updates_total: register_int_counter_vec!(
                "price_point_book_updates_total",
                "Total number of update events by outcome",
                &["outcome"]
            )
            .unwrap(),

            clears_total: register_int_counter!(
                "price_point_book_clears_total",
                "Total number of symbol clears"
            )
            .unwrap(),

            errors_total: register_int_counter_vec!(
                "price_point_book_errors_total",
                "Total number of errors",
                &["error_type"]
            )
            .unwrap(),

            writer_drain_micros: register_histogram!(
                "price_point_book_writer_drain_microseconds",
                "Time a left-right writer spent waiting for readers to drain",
                vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 1000.0]
            )
            .unwrap(),
        }
    }

    /// 导出Prometheus文本格式
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
