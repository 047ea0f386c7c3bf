//! # Sistema de Jobs
//!
//! Tipos de datos y colas del pipeline:
//!
//! ```text
//! Productor → JobQueue → [Worker₁…Workerₙ] → ResultQueue → Agregador
//! ```
//!
//! - `job`: `Job` y `JobResult`
//! - `queue`: cola de jobs acotada con cierre explícito
//! - `results`: cola de resultados, cerrada por el pool

pub mod job;
pub mod queue;
pub(crate) mod results;

pub use job::{Job, JobId, JobResult};
pub use queue::{submit_jobs, JobQueue, JobQueueHandle};
