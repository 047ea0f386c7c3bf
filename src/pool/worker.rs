//! # Worker
//! src/pool/worker.rs
//!
//! Loop de un worker:
//!
//! 1. Si el token está cancelado, sale (`Aborted`) sin consumir más
//! 2. Toma un job; si la cola está cerrada y vacía, sale (`Drained`)
//! 3. Calcula la salida; esto NO se interrumpe a mitad de camino
//! 4. Publica el resultado y vuelve a 1
//!
//! Por cualquier camino de salida (incluido un panic del job) llega una
//! única vez a la barrera de finalización.

use crate::jobs::results::ResultSink;
use crate::jobs::{Job, JobResult};
use crate::metrics::MetricsCollector;
use crate::pool::barrier::CompletionBarrier;
use crate::pool::cancel::CancellationToken;
use crate::pool::observer::ProgressObserver;
use crossbeam_channel::{select, Receiver};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Función que procesa la entrada de un job
pub type JobFn<I, O> = Arc<dyn Fn(&I) -> O + Send + Sync>;

/// Cómo terminó un worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerExit {
    /// La cola se cerró y quedó vacía
    Drained,

    /// Observó el token cancelado
    Aborted,
}

/// Resumen de un worker al terminar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub jobs_processed: u64,
    pub exit: WorkerExit,
}

/// Lo que sale de la cola en cada vuelta
enum Pull<I> {
    Job(Job<I>),
    Closed,
    Cancelled,
}

pub(crate) struct Worker<I, O> {
    pub(crate) id: usize,
    pub(crate) jobs: Receiver<Job<I>>,
    pub(crate) results: ResultSink<O>,
    pub(crate) token: CancellationToken,
    pub(crate) job_fn: JobFn<I, O>,
    pub(crate) observer: Arc<dyn ProgressObserver>,
    pub(crate) metrics: MetricsCollector,
}

impl<I, O> Worker<I, O> {
    /// Ejecuta el loop hasta drenar la cola o ver la cancelación
    pub(crate) fn run(self, barrier: CompletionBarrier) -> WorkerReport {
        // Declarada primero: se suelta al final, después del sink, así no
        // hay escrituras posteriores a la llegada.
        let arrival = barrier.arrival();
        let Worker {
            id,
            jobs,
            results,
            token,
            job_fn,
            observer,
            metrics,
        } = self;

        debug!(worker = id, "worker started");
        let mut processed = 0u64;

        let exit = loop {
            if token.is_cancelled() {
                break WorkerExit::Aborted;
            }

            let job = match Self::pull(&jobs, &token) {
                Pull::Job(job) => job,
                Pull::Closed => break WorkerExit::Drained,
                Pull::Cancelled => break WorkerExit::Aborted,
            };

            let job_id = job.id();
            trace!(worker = id, job = job_id, "picked up job");
            observer.on_job_started(id, job_id);

            let started = Instant::now();
            let output = (*job_fn)(job.input());
            metrics.record_job(started.elapsed());

            if !results.push(JobResult::new(job_id, output)) {
                warn!(worker = id, job = job_id, "result queue has no reader, stopping");
                break WorkerExit::Aborted;
            }

            processed += 1;
            observer.on_job_finished(id, job_id);
        };

        let report = WorkerReport {
            worker_id: id,
            jobs_processed: processed,
            exit,
        };
        debug!(worker = id, processed, exit = ?exit, "worker exiting");
        observer.on_worker_exit(&report);

        drop(results);
        drop(arrival);
        report
    }

    /// Espera un job o la cancelación, lo que llegue primero
    fn pull(jobs: &Receiver<Job<I>>, token: &CancellationToken) -> Pull<I> {
        select! {
            recv(jobs) -> msg => match msg {
                Ok(job) => Pull::Job(job),
                Err(_) => Pull::Closed,
            },
            recv(token.signal()) -> _ => Pull::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::results::ResultQueue;
    use crate::jobs::JobQueue;
    use crate::pool::cancel::CancelReason;
    use crate::pool::observer::NoopObserver;
    use std::thread;
    use std::time::Duration;

    fn worker_for(
        queue: &JobQueue<i64>,
        results: &ResultQueue<i64>,
        token: &CancellationToken,
    ) -> Worker<i64, i64> {
        Worker {
            id: 1,
            jobs: queue.handle().receiver(),
            results: results.sink(),
            token: token.clone(),
            job_fn: Arc::new(|x: &i64| x * x),
            observer: Arc::new(NoopObserver),
            metrics: MetricsCollector::new(),
        }
    }

    #[test]
    fn test_worker_drains_queue() {
        let mut queue = JobQueue::new(3);
        for n in [2, 3, 4] {
            queue.submit(n);
        }
        queue.close();

        let results = ResultQueue::new(3);
        let token = CancellationToken::new();
        let barrier = CompletionBarrier::new(1);

        let report = worker_for(&queue, &results, &token).run(barrier.clone());

        assert_eq!(report.exit, WorkerExit::Drained);
        assert_eq!(report.jobs_processed, 3);
        assert!(barrier.is_satisfied());

        let outputs: Vec<i64> = results.stream().try_iter().map(JobResult::into_output).collect();
        assert_eq!(outputs, vec![4, 9, 16]);
    }

    #[test]
    fn test_worker_aborts_when_cancelled_first() {
        let mut queue = JobQueue::new(2);
        queue.submit(1);
        queue.submit(2);
        queue.close();

        let results = ResultQueue::new(2);
        let token = CancellationToken::new();
        token.cancel(CancelReason::Caller);
        let barrier = CompletionBarrier::new(1);

        let report = worker_for(&queue, &results, &token).run(barrier.clone());

        assert_eq!(report.exit, WorkerExit::Aborted);
        assert_eq!(report.jobs_processed, 0);
        assert_eq!(queue.len(), 2);
        assert!(barrier.is_satisfied());
    }

    #[test]
    fn test_blocked_worker_wakes_on_cancel() {
        // Cola abierta y vacía: el worker queda bloqueado esperando
        let queue = JobQueue::<i64>::new(1);
        let results = ResultQueue::new(1);
        let token = CancellationToken::new();
        let barrier = CompletionBarrier::new(1);

        let worker = worker_for(&queue, &results, &token);
        let handle = {
            let barrier = barrier.clone();
            thread::spawn(move || worker.run(barrier))
        };

        thread::sleep(Duration::from_millis(30));
        assert!(!barrier.is_satisfied());

        token.cancel(CancelReason::Deadline);
        let report = handle.join().unwrap();
        assert_eq!(report.exit, WorkerExit::Aborted);
        assert!(barrier.is_satisfied());
    }

    #[test]
    fn test_in_flight_job_is_not_interrupted() {
        let mut queue = JobQueue::new(2);
        queue.submit(5);
        queue.submit(6);
        queue.close();

        let results = ResultQueue::new(2);
        let token = CancellationToken::new();
        let barrier = CompletionBarrier::new(1);

        let mut worker = worker_for(&queue, &results, &token);
        let cancel_token = token.clone();
        worker.job_fn = Arc::new(move |x: &i64| {
            // Se cancela en medio del primer job
            cancel_token.cancel(CancelReason::Caller);
            thread::sleep(Duration::from_millis(20));
            x * x
        });

        let report = worker.run(barrier);
        assert_eq!(report.exit, WorkerExit::Aborted);
        assert_eq!(report.jobs_processed, 1);

        let outputs: Vec<i64> = results.stream().try_iter().map(JobResult::into_output).collect();
        assert_eq!(outputs, vec![25]);
    }
}
