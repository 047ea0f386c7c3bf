//! # Observadores de Progreso
//! src/pool/observer.rs
//!
//! Ganchos opcionales que los workers invocan desde su propio thread.
//! Deben ser baratos: corren dentro del loop del worker.

use crate::jobs::JobId;
use crate::pool::worker::{WorkerExit, WorkerReport};
use tracing::info;

/// Recibe el progreso de los workers
pub trait ProgressObserver: Send + Sync {
    /// Un worker tomó un job de la cola
    fn on_job_started(&self, _worker_id: usize, _job_id: JobId) {}

    /// Un worker publicó el resultado de un job
    fn on_job_finished(&self, _worker_id: usize, _job_id: JobId) {}

    /// Un worker terminó (drenado o abortado)
    fn on_worker_exit(&self, _report: &WorkerReport) {}
}

/// No observa nada
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Reporta el progreso por `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_job_started(&self, worker_id: usize, job_id: JobId) {
        info!("worker {} processing job {}", worker_id, job_id);
    }

    fn on_worker_exit(&self, report: &WorkerReport) {
        match report.exit {
            WorkerExit::Drained => info!(
                "worker {} found no more jobs, exiting ({} processed)",
                report.worker_id, report.jobs_processed
            ),
            WorkerExit::Aborted => info!(
                "worker {} cancelled ({} processed)",
                report.worker_id, report.jobs_processed
            ),
        }
    }
}
