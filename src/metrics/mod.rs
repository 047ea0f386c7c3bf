//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección de métricas del pool:
//! - Jobs procesados
//! - Latencias de procesamiento por job (p50, p95, p99)
//! - Tiempo transcurrido desde el arranque

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
