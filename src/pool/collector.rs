//! # Agregador de Resultados
//! src/pool/collector.rs
//!
//! Drena la cola de resultados hasta que se cierra y pliega cada salida en
//! un total. El drenado ocurre una sola vez por pool; todo lo que se
//! reporta después sale de ese snapshot, así `collect` es idempotente.
//!
//! Los totales enteros saturan en vez de desbordar.

use crate::jobs::JobResult;
use crate::metrics::MetricsSnapshot;
use crate::pool::cancel::{CancelReason, CancellationToken};
use crate::pool::worker::{WorkerExit, WorkerReport};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use tracing::debug;

/// Salidas que se pueden acumular en un total
pub trait Accumulate: Default + Clone {
    /// Suma `other` al total; nunca entra en pánico
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! saturating_accumulate {
    ($($t:ty),*) => {
        $(
            impl Accumulate for $t {
                fn accumulate(self, other: Self) -> Self {
                    self.saturating_add(other)
                }
            }
        )*
    };
}

saturating_accumulate!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Accumulate for f32 {
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl Accumulate for f64 {
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

/// Suma de salidas y cantidad de jobs completados
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregator<O> {
    total: O,
    jobs_completed: usize,
}

impl<O> Aggregator<O>
where
    O: Accumulate,
{
    pub fn new() -> Self {
        Self {
            total: O::default(),
            jobs_completed: 0,
        }
    }

    /// Pliega un resultado en el total
    pub fn fold(&mut self, result: &JobResult<O>) {
        let total = std::mem::take(&mut self.total);
        self.total = total.accumulate(result.output().clone());
        self.jobs_completed += 1;
    }

    pub fn total(&self) -> &O {
        &self.total
    }

    pub fn jobs_completed(&self) -> usize {
        self.jobs_completed
    }
}

impl<O> Default for Aggregator<O>
where
    O: Accumulate,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Lee la cola hasta que se cierra, en orden de llegada
pub(crate) fn drain<O>(stream: Receiver<JobResult<O>>) -> Vec<JobResult<O>> {
    let results: Vec<JobResult<O>> = stream.iter().collect();
    debug!(results = results.len(), "result stream drained");
    results
}

/// Reordena resultados por `job_id`
pub fn order_by_job_id<O>(mut results: Vec<JobResult<O>>) -> Vec<JobResult<O>> {
    results.sort_by_key(JobResult::job_id);
    results
}

/// Motivo de cancelación que se reporta, fijado al cerrar el pool
///
/// Un token cancelado cuenta solo si algún worker salió abortado: si el
/// deadline (o un `cancel`) llega después de que todos drenaron la cola,
/// el pool completó todo su trabajo.
pub(crate) fn settled_reason(
    workers: &[WorkerReport],
    token: &CancellationToken,
) -> Option<CancelReason> {
    if workers.iter().any(|w| w.exit == WorkerExit::Aborted) {
        token.reason()
    } else {
        None
    }
}

/// Todo lo observado cuando la cola de resultados se cerró
pub(crate) struct Collected<O> {
    /// En orden de llegada
    pub(crate) results: Vec<JobResult<O>>,
    pub(crate) cancel_reason: Option<CancelReason>,
    pub(crate) workers: Vec<WorkerReport>,
    pub(crate) metrics: MetricsSnapshot,
}

/// Resultado final de un pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolReport<O> {
    /// Suma de las salidas de los jobs completados
    pub total: O,

    pub jobs_completed: usize,

    /// `true` si el token quedó cancelado (deadline o caller)
    pub cancelled: bool,

    pub cancel_reason: Option<CancelReason>,

    /// Un reporte por worker que terminó, ordenado por id
    pub workers: Vec<WorkerReport>,

    pub metrics: MetricsSnapshot,
}

impl<O> PoolReport<O>
where
    O: Accumulate,
{
    pub(crate) fn from_collected(collected: &Collected<O>) -> Self {
        let mut aggregator = Aggregator::new();
        for result in &collected.results {
            aggregator.fold(result);
        }

        Self {
            jobs_completed: aggregator.jobs_completed(),
            total: aggregator.total,
            cancelled: collected.cancel_reason.is_some(),
            cancel_reason: collected.cancel_reason,
            workers: collected.workers.clone(),
            metrics: collected.metrics.clone(),
        }
    }
}

/// Casilla de escritura única: un thread la llena, muchos la esperan
pub(crate) struct Slot<T> {
    value: Mutex<Option<Arc<T>>>,
    filled: Condvar,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            filled: Condvar::new(),
        }
    }

    /// Llena la casilla; una segunda llamada se ignora
    pub(crate) fn fill(&self, value: T) {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(Arc::new(value));
            self.filled.notify_all();
        }
    }

    /// Bloquea hasta que la casilla esté llena
    pub(crate) fn wait(&self) -> Arc<T> {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = slot.as_ref() {
                return Arc::clone(value);
            }
            slot = self
                .filled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
