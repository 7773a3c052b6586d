// 全局内存分配器：使用 jemalloc
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// 分层：shared（基础数据结构/并发/指标） -> domain（订单簿） -> interfaces（CLI/数据生成）
pub mod shared;
pub mod domain;
pub mod interfaces;
