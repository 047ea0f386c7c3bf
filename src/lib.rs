//! # Job Pool
//! src/lib.rs
//!
//! Pool de workers con cola de jobs acotada, cancelación cooperativa por
//! deadline y agregación de resultados. Demuestra conceptos de sistemas
//! operativos: concurrencia, sincronización y cierre ordenado.
//!
//! ## Arquitectura
//!
//! - `jobs`: `Job`, `JobResult` y las colas acotadas
//! - `pool`: workers, token de cancelación, barrera y agregador
//! - `metrics`: latencias por job
//! - `config`: configuración CLI del binario
//! - `tasks`: funciones de job de ejemplo
//!
//! ## Ejemplo de uso
//!
//! ```rust
//! use job_pool::jobs::submit_jobs;
//! use job_pool::pool::run_pool;
//! use job_pool::tasks::square;
//! use std::time::Duration;
//!
//! let jobs = submit_jobs(1..=10i64);
//! let pool = run_pool(3, jobs, Duration::from_secs(2), square).unwrap();
//! let report = pool.collect();
//!
//! assert_eq!(report.total, 385);
//! assert_eq!(report.jobs_completed, 10);
//! assert!(!report.cancelled);
//! ```

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod pool;
pub mod tasks;

pub use error::{PoolError, Result};
pub use jobs::{submit_jobs, Job, JobId, JobQueue, JobQueueHandle, JobResult};
pub use pool::{collect, run_pool, PoolConfig, PoolHandle, PoolReport, WorkerPool};
