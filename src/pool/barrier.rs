//! # Barrera de Finalización
//! src/pool/barrier.rs
//!
//! Latch contador: empieza en N, cada worker lo decrementa una vez al
//! salir y se cumple al llegar a cero. Cualquier cantidad de threads puede
//! esperarlo; todos se desbloquean juntos.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Barrera contadora thread-safe
pub struct CompletionBarrier {
    /// Llegadas pendientes
    remaining: Arc<Mutex<usize>>,

    /// Notifica cuando `remaining` llega a cero
    condvar: Arc<Condvar>,
}

impl CompletionBarrier {
    /// Crea una barrera que espera `count` llegadas
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Arc::new(Mutex::new(count)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra una llegada
    ///
    /// Llegadas de más no la dejan en negativo.
    pub fn arrive(&self) {
        let mut remaining = self.lock();
        if *remaining > 0 {
            *remaining -= 1;
            if *remaining == 0 {
                self.condvar.notify_all();
            }
        }
    }

    /// Guard que llega a la barrera al soltarse, incluso durante un panic
    pub(crate) fn arrival(&self) -> Arrival {
        Arrival {
            barrier: self.clone(),
        }
    }

    /// Bloquea hasta que la barrera se cumpla
    pub fn wait(&self) {
        let remaining = self.lock();
        let _satisfied = self
            .condvar
            .wait_while(remaining, |remaining| *remaining > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Como `wait`, con límite de tiempo
    ///
    /// Retorna `true` si la barrera se cumplió.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let remaining = self.lock();
        let (remaining, _) = self
            .condvar
            .wait_timeout_while(remaining, timeout, |remaining| *remaining > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *remaining == 0
    }

    pub fn is_satisfied(&self) -> bool {
        *self.lock() == 0
    }

    /// Llegadas que faltan
    pub fn remaining(&self) -> usize {
        *self.lock()
    }
}

impl Clone for CompletionBarrier {
    fn clone(&self) -> Self {
        Self {
            remaining: Arc::clone(&self.remaining),
            condvar: Arc::clone(&self.condvar),
        }
    }
}

/// Llegada diferida a una `CompletionBarrier`
pub(crate) struct Arrival {
    barrier: CompletionBarrier,
}

impl Drop for Arrival {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}
