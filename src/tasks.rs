//! # Funciones de Job
//! src/tasks.rs
//!
//! Cómputos de ejemplo para alimentar el pool.

use std::thread;
use std::time::Duration;

/// Cuadrado de un entero (satura en vez de desbordar)
pub fn square(x: &i64) -> i64 {
    x.saturating_mul(*x)
}

/// Envuelve `f` con un retardo artificial por job
///
/// Simula trabajo lento; el retardo no se interrumpe por cancelación.
pub fn with_delay<I, O, F>(delay: Duration, f: F) -> impl Fn(&I) -> O + Send + Sync
where
    F: Fn(&I) -> O + Send + Sync + 'static,
{
    move |input: &I| {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        f(input)
    }
}
