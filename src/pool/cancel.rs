//! # Señal de Cancelación y Deadline
//! src/pool/cancel.rs
//!
//! `CancellationToken` es un flag atómico de una sola transición:
//! `Active → Cancelled(razón)`. Nunca vuelve a `Active`, y el primer
//! `cancel` gana (los siguientes son no-op).
//!
//! La cancelación es cooperativa: los workers la observan entre jobs,
//! nunca durante uno. Para que un worker bloqueado en una cola vacía se
//! entere, el token además desconecta un canal al cancelarse.
//!
//! `DeadlineTimer` dispara la cancelación al vencer el plazo, salvo que
//! se desarme antes.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

const ACTIVE: u8 = 0;
const BY_DEADLINE: u8 = 1;
const BY_CALLER: u8 = 2;

/// Quién canceló
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelReason {
    /// Venció el deadline del pool
    Deadline,

    /// Cancelación explícita del caller
    Caller,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Deadline => "deadline exceeded",
            CancelReason::Caller => "canceled by caller",
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CancelReason::Deadline => BY_DEADLINE,
            CancelReason::Caller => BY_CALLER,
        }
    }
}

/// Estado observable del token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Cancelled(CancelReason),
}

/// Datos compartidos del token
struct TokenInner {
    state: AtomicU8,

    /// Se suelta al cancelar para desconectar `signal`
    wake: Mutex<Option<Sender<()>>>,

    /// Nunca recibe mensajes: solo se desconecta
    signal: Receiver<()>,
}

/// Token de cancelación compartido por todos los workers y el timer
///
/// Cualquiera que tenga una copia puede observarlo; solo el pool
/// (deadline o `PoolHandle::cancel`) puede activarlo.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub(crate) fn new() -> Self {
        let (wake, signal) = bounded(0);
        Self {
            inner: Arc::new(TokenInner {
                state: AtomicU8::new(ACTIVE),
                wake: Mutex::new(Some(wake)),
                signal,
            }),
        }
    }

    /// Pasa a `Cancelled(reason)` si todavía está activo
    ///
    /// Retorna `true` solo para la llamada que hizo la transición.
    pub(crate) fn cancel(&self, reason: CancelReason) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(ACTIVE, reason.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if won {
            // Despertar a los workers bloqueados en `select!`
            let mut wake = self.inner.wake.lock().unwrap_or_else(PoisonError::into_inner);
            wake.take();
        }

        won
    }

    /// Verifica si el token fue cancelado
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != ACTIVE
    }

    /// Razón de la cancelación, si la hubo
    pub fn reason(&self) -> Option<CancelReason> {
        match self.inner.state.load(Ordering::Acquire) {
            BY_DEADLINE => Some(CancelReason::Deadline),
            BY_CALLER => Some(CancelReason::Caller),
            _ => None,
        }
    }

    pub fn state(&self) -> TokenState {
        match self.reason() {
            Some(reason) => TokenState::Cancelled(reason),
            None => TokenState::Active,
        }
    }

    /// Canal que se desconecta al cancelar (para `select!`)
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("state", &self.state())
            .finish()
    }
}

/// Timer de un solo disparo que cancela el token al vencer el deadline
pub(crate) struct DeadlineTimer {
    /// Soltarlo desarma el timer
    disarm: Option<Sender<()>>,

    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Arranca el timer; el plazo corre desde ahora
    pub(crate) fn start(deadline: Duration, token: CancellationToken) -> std::io::Result<Self> {
        let (disarm, armed) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("pool-deadline".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = armed.recv_timeout(deadline) {
                    if token.cancel(CancelReason::Deadline) {
                        warn!(deadline_ms = deadline.as_millis() as u64, "deadline exceeded, cancelling pool");
                    }
                }
            })?;

        Ok(Self {
            disarm: Some(disarm),
            handle: Some(handle),
        })
    }

    /// Desarma el timer y espera a su thread. Idempotente.
    pub(crate) fn disarm(&mut self) {
        self.disarm.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
