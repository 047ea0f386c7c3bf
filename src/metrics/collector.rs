//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta latencias de procesamiento de los workers en tiempo real.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar (para calcular percentiles)
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
struct MetricsData {
    /// Contador total de jobs procesados
    jobs_processed: u64,

    /// Latencias registradas (en microsegundos)
    latencies: Vec<u64>,
}

impl MetricsCollector {
    /// Crea un nuevo collector; el reloj arranca ahora
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                jobs_processed: 0,
                latencies: Vec::new(),
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un job procesado y su latencia
    pub fn record_job(&self, latency: Duration) {
        let mut data = self.lock();

        data.jobs_processed += 1;

        // Si tenemos demasiadas latencias, eliminar las más antiguas
        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.remove(0);
        }
        data.latencies.push(latency.as_micros() as u64);
    }

    /// Jobs procesados hasta ahora
    pub fn jobs_processed(&self) -> u64 {
        self.lock().jobs_processed
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let (p50, p95, p99, avg) = calculate_percentiles(&data.latencies);

        MetricsSnapshot {
            jobs_processed: data.jobs_processed,
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calcula percentiles de latencia: (p50, p95, p99, promedio)
fn calculate_percentiles(latencies: &[u64]) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];

    let sum: u64 = sorted.iter().sum();
    let avg = sum / len as u64;

    (p50, p95, p99, avg)
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_processed: u64,
    pub elapsed_ms: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
}
