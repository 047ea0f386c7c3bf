//! # Gestor del Pool
//! src/pool/manager.rs
//!
//! Coordina la ejecución: arranca el deadline, los N workers, el agregador
//! y el thread que cierra la cola de resultados.
//!
//! ## Secuencia de cierre
//!
//! 1. Todos los workers llegan a la barrera (drenados o abortados)
//! 2. Se desarma el deadline
//! 3. Se juntan los reportes de los workers
//! 4. Se cierra la cola de resultados, una sola vez
//! 5. El agregador ve el fin de stream y publica el snapshot final
//!
//! El paso 4 ocurre solo después del 1: ningún worker puede escribir en
//! una cola ya cerrada.

use crate::error::{PoolError, Result};
use crate::jobs::results::ResultQueue;
use crate::jobs::{JobQueueHandle, JobResult};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pool::barrier::CompletionBarrier;
use crate::pool::cancel::{CancelReason, CancellationToken, DeadlineTimer};
use crate::pool::collector::{
    drain, order_by_job_id, settled_reason, Accumulate, Collected, PoolReport, Slot,
};
use crate::pool::observer::{NoopObserver, ProgressObserver};
use crate::pool::worker::{JobFn, Worker, WorkerReport};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Máximo de workers por pool
pub const MAX_WORKERS: usize = 1024;

/// Configuración del pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Número de workers (1..=`MAX_WORKERS`)
    pub worker_count: usize,

    /// Plazo total, medido desde el arranque (> 0)
    pub deadline: Duration,
}

impl PoolConfig {
    pub fn new(worker_count: usize, deadline: Duration) -> Self {
        Self {
            worker_count,
            deadline,
        }
    }

    /// Valida la configuración antes de arrancar cualquier thread
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(PoolError::InvalidWorkerCount {
                value: self.worker_count,
            });
        }
        if self.deadline.is_zero() {
            return Err(PoolError::InvalidDeadline);
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            deadline: Duration::from_secs(2),
        }
    }
}

/// Estado derivado del pool (solo para reportes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    /// Workers activos, sin cancelación
    Running,

    /// Token cancelado, workers todavía saliendo
    Cancelling,

    /// Todos los workers drenaron la cola
    Completed,

    /// Todos los workers salieron después de una cancelación
    Cancelled,
}

impl PoolState {
    fn derive(finished: bool, cancelled: bool) -> Self {
        match (finished, cancelled) {
            (false, false) => PoolState::Running,
            (false, true) => PoolState::Cancelling,
            (true, false) => PoolState::Completed,
            (true, true) => PoolState::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Running => "running",
            PoolState::Cancelling => "cancelling",
            PoolState::Completed => "completed",
            PoolState::Cancelled => "cancelled",
        }
    }
}

/// Estado compartido entre el handle y los threads internos
struct Shared<O> {
    token: CancellationToken,
    barrier: CompletionBarrier,
    metrics: MetricsCollector,

    /// Lo llena el thread de cierre antes de cerrar la cola
    workers: Slot<Vec<WorkerReport>>,

    /// Lo llena el agregador al ver el fin de stream
    collected: Slot<Collected<O>>,
}

fn spawn_error(what: impl Into<String>) -> impl FnOnce(io::Error) -> PoolError {
    let what = what.into();
    move |source| PoolError::Spawn { what, source }
}

/// Pool de N workers sobre una función de job
pub struct WorkerPool<I, O> {
    config: PoolConfig,
    job_fn: JobFn<I, O>,
    observer: Arc<dyn ProgressObserver>,
}

impl<I, O> WorkerPool<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    /// Crea un pool (todavía sin threads)
    pub fn new<F>(config: PoolConfig, job_fn: F) -> Self
    where
        F: Fn(&I) -> O + Send + Sync + 'static,
    {
        Self {
            config,
            job_fn: Arc::new(job_fn),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Instala un observador de progreso
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Arranca el pool sobre la cola dada
    ///
    /// Falla sin arrancar nada si la configuración es inválida. Si falla
    /// la creación de un thread, cancela lo que ya estaba corriendo.
    pub fn start(self, jobs: JobQueueHandle<I>) -> Result<PoolHandle<O>> {
        self.config.validate()?;

        let PoolConfig {
            worker_count,
            deadline,
        } = self.config;

        let shared = Arc::new(Shared {
            token: CancellationToken::new(),
            barrier: CompletionBarrier::new(worker_count),
            metrics: MetricsCollector::new(),
            workers: Slot::new(),
            collected: Slot::new(),
        });

        let results = ResultQueue::new(jobs.capacity());
        let stream = results.stream();

        // El deadline corre desde el arranque del pool
        let timer = DeadlineTimer::start(deadline, shared.token.clone())
            .map_err(spawn_error("deadline"))?;

        info!(
            workers = worker_count,
            deadline_ms = deadline.as_millis() as u64,
            pending = jobs.len(),
            "starting worker pool"
        );

        let mut handles: Vec<JoinHandle<WorkerReport>> = Vec::new();
        for id in 1..=worker_count {
            let worker = Worker {
                id,
                jobs: jobs.receiver(),
                results: results.sink(),
                token: shared.token.clone(),
                job_fn: Arc::clone(&self.job_fn),
                observer: Arc::clone(&self.observer),
                metrics: shared.metrics.clone(),
            };
            let barrier = shared.barrier.clone();

            let spawned = thread::Builder::new()
                .name(format!("pool-worker-{}", id))
                .spawn(move || worker.run(barrier));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    shared.token.cancel(CancelReason::Caller);
                    return Err(spawn_error(format!("worker {}", id))(source));
                }
            }
        }

        // Agregador: drena hasta el cierre y publica el snapshot
        let collector = {
            let shared = Arc::clone(&shared);
            move || {
                let results = drain(stream);
                let workers = shared.workers.wait();
                shared.collected.fill(Collected {
                    results,
                    cancel_reason: settled_reason(&workers, &shared.token),
                    workers: Vec::clone(&workers),
                    metrics: shared.metrics.snapshot(),
                });
            }
        };
        if let Err(source) = thread::Builder::new()
            .name("pool-collector".to_string())
            .spawn(collector)
        {
            shared.token.cancel(CancelReason::Caller);
            return Err(spawn_error("collector")(source));
        }

        // Cierre: barrera → deadline → reportes → cola de resultados
        let closer = {
            let shared = Arc::clone(&shared);
            move || {
                let mut timer = timer;
                shared.barrier.wait();
                timer.disarm();

                let mut reports = Vec::with_capacity(handles.len());
                for handle in handles {
                    match handle.join() {
                        Ok(report) => reports.push(report),
                        Err(_) => error!("a worker panicked while processing a job"),
                    }
                }
                reports.sort_by_key(|report| report.worker_id);

                shared.workers.fill(reports);
                results.close();
            }
        };
        if let Err(source) = thread::Builder::new()
            .name("pool-closer".to_string())
            .spawn(closer)
        {
            // El agregador no debe quedar esperando reportes que no llegarán
            shared.token.cancel(CancelReason::Caller);
            shared.workers.fill(Vec::new());
            return Err(spawn_error("closer")(source));
        }

        Ok(PoolHandle { shared })
    }
}

/// Arranca `worker_count` workers sobre `jobs` con el deadline dado
pub fn run_pool<I, O, F>(
    worker_count: usize,
    jobs: JobQueueHandle<I>,
    deadline: Duration,
    job_fn: F,
) -> Result<PoolHandle<O>>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
    F: Fn(&I) -> O + Send + Sync + 'static,
{
    WorkerPool::new(PoolConfig::new(worker_count, deadline), job_fn).start(jobs)
}

/// Forma libre de `PoolHandle::collect`
pub fn collect<O>(pool: &PoolHandle<O>) -> PoolReport<O>
where
    O: Accumulate,
{
    pool.collect()
}

/// Handle de un pool en marcha
///
/// Puede compartirse (`&PoolHandle` o `Arc<PoolHandle>`) entre varios
/// observadores. Soltarlo antes de que termine cancela el pool.
pub struct PoolHandle<O> {
    shared: Arc<Shared<O>>,
}

impl<O> PoolHandle<O> {
    /// Copia de solo lectura del token del pool
    pub fn token(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    /// Cancela el pool
    ///
    /// Los jobs en curso terminan; los pendientes se abandonan. Retorna
    /// `false` si ya estaba cancelado o si todos los workers ya salieron.
    ///
    /// Si el último worker termina justo mientras se cancela, puede
    /// retornar `true` y aun así el reporte dirá `cancelled = false`: solo
    /// cuenta la cancelación que algún worker llegó a observar.
    pub fn cancel(&self) -> bool {
        if self.shared.barrier.is_satisfied() {
            return false;
        }
        let won = self.shared.token.cancel(CancelReason::Caller);
        if won {
            info!("pool cancelled by caller");
        }
        won
    }

    /// Bloquea hasta que todos los workers hayan salido
    pub fn await_completion(&self) {
        self.shared.barrier.wait();
    }

    /// Como `await_completion`, con límite de tiempo
    pub fn await_completion_timeout(&self, timeout: Duration) -> bool {
        self.shared.barrier.wait_timeout(timeout)
    }

    /// Verifica si todos los workers ya salieron
    pub fn is_finished(&self) -> bool {
        self.shared.barrier.is_satisfied()
    }

    pub fn state(&self) -> PoolState {
        if !self.shared.barrier.is_satisfied() {
            return PoolState::derive(false, self.shared.token.is_cancelled());
        }
        // Todos salieron: el thread de cierre publica los reportes enseguida
        let workers = self.shared.workers.wait();
        PoolState::derive(true, settled_reason(&workers, &self.shared.token).is_some())
    }

    /// Métricas en vivo
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl<O: Clone> PoolHandle<O> {
    /// Resultados en orden de llegada (bloquea hasta el cierre)
    pub fn results(&self) -> Vec<JobResult<O>> {
        self.shared.collected.wait().results.clone()
    }

    /// Resultados reordenados por `job_id` (bloquea hasta el cierre)
    pub fn results_by_id(&self) -> Vec<JobResult<O>> {
        order_by_job_id(self.results())
    }
}

impl<O> PoolHandle<O>
where
    O: Accumulate,
{
    /// Bloquea hasta que la cola de resultados se cierre y retorna el
    /// reporte final. Llamadas repetidas retornan el mismo reporte.
    pub fn collect(&self) -> PoolReport<O> {
        let collected = self.shared.collected.wait();
        PoolReport::from_collected(&collected)
    }

    /// Como `collect`, sin bloquear
    pub fn try_collect(&self) -> Option<PoolReport<O>> {
        self.shared
            .collected
            .get()
            .map(|collected| PoolReport::from_collected(&collected))
    }
}

impl<O> Drop for PoolHandle<O> {
    fn drop(&mut self) {
        if !self.shared.barrier.is_satisfied() && self.shared.token.cancel(CancelReason::Caller) {
            debug!("pool handle dropped before completion, cancelling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{submit_jobs, JobQueue};
    use crate::pool::worker::WorkerExit;
    use std::sync::Mutex;
    use std::time::Instant;

    fn square(x: &i64) -> i64 {
        x * x
    }

    fn slow_square(delay: Duration) -> impl Fn(&i64) -> i64 + Send + Sync + 'static {
        move |x: &i64| {
            thread::sleep(delay);
            x * x
        }
    }

    // ==================== Config Validation ====================

    #[test]
    fn test_validate_success() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_workers() {
        let config = PoolConfig::new(0, Duration::from_secs(1));
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidWorkerCount { value: 0 })
        ));
    }

    #[test]
    fn test_validate_zero_deadline() {
        let config = PoolConfig::new(2, Duration::ZERO);
        assert!(matches!(config.validate(), Err(PoolError::InvalidDeadline)));
    }

    #[test]
    fn test_validate_too_many_workers() {
        assert!(PoolConfig::new(MAX_WORKERS, Duration::from_secs(1))
            .validate()
            .is_ok());

        let config = PoolConfig::new(usize::MAX, Duration::from_secs(1));
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidWorkerCount { value: usize::MAX })
        ));
    }

    #[test]
    fn test_start_rejects_huge_worker_count() {
        let result = run_pool(usize::MAX, submit_jobs(vec![1i64]), Duration::from_secs(5), square);
        assert!(matches!(
            result.err(),
            Some(PoolError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let result = run_pool(0, submit_jobs(vec![1i64]), Duration::from_secs(1), square);
        assert!(result.is_err());
    }

    // ==================== Pool State ====================

    #[test]
    fn test_state_derivation() {
        assert_eq!(PoolState::derive(false, false), PoolState::Running);
        assert_eq!(PoolState::derive(false, true), PoolState::Cancelling);
        assert_eq!(PoolState::derive(true, false), PoolState::Completed);
        assert_eq!(PoolState::derive(true, true), PoolState::Cancelled);
        assert_eq!(PoolState::Cancelling.as_str(), "cancelling");
    }

    #[test]
    fn test_completed_pool_state() {
        let pool = run_pool(2, submit_jobs(1..=4i64), Duration::from_secs(5), square).unwrap();
        let report = pool.collect();

        assert_eq!(report.total, 30);
        assert!(pool.is_finished());
        assert_eq!(pool.state(), PoolState::Completed);
        // Ya terminó: cancelar no cambia nada
        assert!(!pool.cancel());
        assert_eq!(pool.state(), PoolState::Completed);
    }

    // ==================== Execution ====================

    #[test]
    fn test_all_workers_report() {
        let pool = run_pool(3, submit_jobs(1..=9i64), Duration::from_secs(5), square).unwrap();
        let report = pool.collect();

        assert_eq!(report.workers.len(), 3);
        let ids: Vec<usize> = report.workers.iter().map(|w| w.worker_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(report.workers.iter().all(|w| w.exit == WorkerExit::Drained));

        let processed: u64 = report.workers.iter().map(|w| w.jobs_processed).sum();
        assert_eq!(processed, 9);
        assert_eq!(report.metrics.jobs_processed, 9);
    }

    #[test]
    fn test_deadline_after_drain_is_not_reported() {
        let mut queue = JobQueue::new(2);
        queue.submit(5i64);
        queue.close();

        let pool = run_pool(2, queue.handle(), Duration::from_secs(5), square).unwrap();
        pool.await_completion();

        // El deadline "dispara" cuando ya no queda trabajo
        pool.shared.token.cancel(CancelReason::Deadline);

        let report = pool.collect();
        assert_eq!(report.total, 25);
        assert!(!report.cancelled);
        assert_eq!(report.cancel_reason, None);
        assert_eq!(pool.state(), PoolState::Completed);
    }

    #[test]
    fn test_explicit_cancel() {
        let pool = run_pool(
            1,
            submit_jobs(1..=20i64),
            Duration::from_secs(30),
            slow_square(Duration::from_millis(20)),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(pool.cancel());
        assert!(!pool.cancel());

        let report = pool.collect();
        assert!(report.cancelled);
        assert_eq!(report.cancel_reason, Some(CancelReason::Caller));
        assert!(report.jobs_completed < 20);
        assert_eq!(pool.state(), PoolState::Cancelled);
        assert_eq!(report.workers[0].exit, WorkerExit::Aborted);
    }

    #[test]
    fn test_await_completion_from_many_threads() {
        let pool = Arc::new(
            run_pool(
                2,
                submit_jobs(1..=6i64),
                Duration::from_secs(5),
                slow_square(Duration::from_millis(5)),
            )
            .unwrap(),
        );

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    pool.await_completion();
                    pool.is_finished()
                })
            })
            .collect();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
        assert!(pool.await_completion_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_try_collect_before_and_after() {
        let mut queue = JobQueue::new(2);
        queue.submit(3i64);
        let pool = run_pool(1, queue.handle(), Duration::from_secs(5), square).unwrap();

        // Cola abierta: el pool no puede terminar
        thread::sleep(Duration::from_millis(20));
        assert!(pool.try_collect().is_none());
        assert_eq!(pool.state(), PoolState::Running);

        queue.close();
        let report = pool.collect();
        assert_eq!(report.total, 9);
        assert_eq!(pool.try_collect(), Some(report));
    }

    #[test]
    fn test_observer_sees_every_job() {
        #[derive(Default)]
        struct Seen {
            started: Mutex<Vec<u64>>,
            exits: Mutex<usize>,
        }

        impl ProgressObserver for Seen {
            fn on_job_started(&self, _worker_id: usize, job_id: u64) {
                self.started.lock().unwrap().push(job_id);
            }

            fn on_worker_exit(&self, _report: &WorkerReport) {
                *self.exits.lock().unwrap() += 1;
            }
        }

        let seen = Arc::new(Seen::default());
        let pool = WorkerPool::new(PoolConfig::new(2, Duration::from_secs(5)), square)
            .with_observer(seen.clone())
            .start(submit_jobs(1..=5i64))
            .unwrap();
        pool.collect();

        let mut started = seen.started.lock().unwrap().clone();
        started.sort_unstable();
        assert_eq!(started, vec![1, 2, 3, 4, 5]);
        assert_eq!(*seen.exits.lock().unwrap(), 2);
    }

    #[test]
    fn test_drop_cancels_running_pool() {
        let pool = run_pool(
            1,
            submit_jobs(1..=50i64),
            Duration::from_secs(30),
            slow_square(Duration::from_millis(10)),
        )
        .unwrap();
        let token = pool.token();

        drop(pool);
        assert_eq!(token.reason(), Some(CancelReason::Caller));
    }

    #[test]
    fn test_deadline_shutdown_latency_bounded_by_one_job() {
        let start = Instant::now();
        let pool = run_pool(
            2,
            submit_jobs(1..=40i64),
            Duration::from_millis(60),
            slow_square(Duration::from_millis(30)),
        )
        .unwrap();

        let report = pool.collect();
        assert!(report.cancelled);
        assert_eq!(report.cancel_reason, Some(CancelReason::Deadline));
        // deadline + un job en curso, con margen para el scheduler
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
