//! # Cola de Resultados
//! src/jobs/results.rs
//!
//! Canal acotado entre los workers y el agregador. Cada worker escribe con
//! su propio `ResultSink`; la cola se cierra una sola vez con `close`, y el
//! stream termina cuando el emisor maestro y todos los sinks se soltaron.
//!
//! Quien cierra es quien espera la barrera de finalización, después de que
//! ésta se cumple: así ningún worker puede escribir después del cierre.

use crate::jobs::job::JobResult;
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

/// Extremo de escritura de un worker
pub(crate) struct ResultSink<O> {
    sender: Sender<JobResult<O>>,
}

impl<O> ResultSink<O> {
    /// Publica un resultado, bloqueando si la cola está llena
    ///
    /// Retorna `false` si ya nadie lee la cola.
    pub(crate) fn push(&self, result: JobResult<O>) -> bool {
        self.sender.send(result).is_ok()
    }
}

impl<O> Clone for ResultSink<O> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Cola de resultados del pool
pub(crate) struct ResultQueue<O> {
    /// Emisor maestro
    sender: Sender<JobResult<O>>,

    receiver: Receiver<JobResult<O>>,
}

impl<O> ResultQueue<O> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Nuevo extremo de escritura
    pub(crate) fn sink(&self) -> ResultSink<O> {
        ResultSink {
            sender: self.sender.clone(),
        }
    }

    /// Extremo de lectura para el agregador
    pub(crate) fn stream(&self) -> Receiver<JobResult<O>> {
        self.receiver.clone()
    }

    /// Suelta el emisor maestro; consumir `self` garantiza un único cierre
    pub(crate) fn close(self) {
        debug!(pending = self.receiver.len(), "result queue closed");
    }
}
