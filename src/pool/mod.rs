//! # Pool de Workers
//! src/pool/mod.rs
//!
//! - `cancel`: token de cancelación y timer del deadline
//! - `barrier`: barrera de finalización (latch contador)
//! - `worker`: loop de cada worker
//! - `observer`: hooks de progreso
//! - `collector`: agregador y reporte final
//! - `manager`: arranque, cierre ordenado y `PoolHandle`

pub mod barrier;
pub mod cancel;
pub mod collector;
pub mod manager;
pub mod observer;
pub mod worker;

pub use barrier::CompletionBarrier;
pub use cancel::{CancelReason, CancellationToken, TokenState};
pub use collector::{order_by_job_id, Accumulate, Aggregator, PoolReport};
pub use manager::{
    collect, run_pool, PoolConfig, PoolHandle, PoolState, WorkerPool, MAX_WORKERS,
};
pub use observer::{LogObserver, NoopObserver, ProgressObserver};
pub use worker::{JobFn, WorkerExit, WorkerReport};
