//! # Errores del Pool
//! src/error.rs
//!
//! Solo los errores de configuración (y la imposibilidad de crear threads)
//! llegan al caller. La cancelación NO es un error: viaja como resultado
//! en el `PoolReport`.

use std::io;
use thiserror::Error;

/// Errores fatales al construir o arrancar un pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// Se pidió un pool sin workers o con más de `MAX_WORKERS`
    #[error("worker count must be between 1 and 1024, got {value}")]
    InvalidWorkerCount { value: usize },

    /// El deadline debe ser estrictamente positivo
    #[error("deadline must be > 0")]
    InvalidDeadline,

    /// El sistema operativo no pudo crear un thread
    #[error("failed to spawn {what} thread")]
    Spawn {
        what: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PoolError>;
