//! # Configuración del Pool
//! src/config.rs
//!
//! Configuración del binario `job_pool` con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./job_pool --workers 4 \
//!   --deadline-ms 1500 \
//!   --job-delay-ms 100 \
//!   --inputs 1,2,3,4,5
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! POOL_WORKERS=4 POOL_DEADLINE_MS=500 ./job_pool --json
//! ```

use crate::error::PoolError;
use crate::pool::PoolConfig;
use clap::Parser;
use std::time::Duration;

/// Configuración del pool de workers
#[derive(Debug, Clone, Parser)]
#[command(name = "job_pool")]
#[command(about = "Pool de workers con deadline para Principios de Sistemas Operativos")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Número de workers
    #[arg(short, long, default_value = "3", env = "POOL_WORKERS")]
    pub workers: usize,

    /// Deadline total en milisegundos, medido desde el arranque del pool
    #[arg(long = "deadline-ms", default_value = "2000", env = "POOL_DEADLINE_MS")]
    pub deadline_ms: u64,

    /// Trabajo artificial por job en milisegundos
    #[arg(long = "job-delay-ms", default_value = "200", env = "POOL_JOB_DELAY_MS")]
    pub job_delay_ms: u64,

    /// Entradas separadas por coma
    #[arg(
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        default_values_t = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        env = "POOL_INPUTS"
    )]
    pub inputs: Vec<i64>,

    /// Imprime el reporte final como JSON
    #[arg(long)]
    pub json: bool,

    /// Nivel de log si `RUST_LOG` no está definido
    #[arg(long = "log-level", default_value = "info", env = "POOL_LOG")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    ///
    /// Un argumento inválido (por ejemplo `--workers -1`) termina el
    /// proceso con código 1, igual que cualquier error de configuración.
    pub fn new() -> Self {
        Config::try_parse().unwrap_or_else(|err| {
            let code = exit_code(&err);
            let _ = err.print();
            std::process::exit(code)
        })
    }

    /// Configuración del núcleo derivada de la CLI
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.workers, Duration::from_millis(self.deadline_ms))
    }

    pub fn job_delay(&self) -> Duration {
        Duration::from_millis(self.job_delay_ms)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), PoolError> {
        self.pool_config().validate()
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║          Job Pool Configuration              ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("   ┌──────────────┬────────────────────┐");
        println!("   │ Workers      │ {:>18} │", self.workers);
        println!("   │ Deadline     │ {:>15} ms │", self.deadline_ms);
        println!("   │ Job delay    │ {:>15} ms │", self.job_delay_ms);
        println!("   │ Jobs         │ {:>18} │", self.inputs.len());
        println!("   └──────────────┴────────────────────┘");
        println!();
    }
}

/// Código de salida para un error de clap: 0 para `--help`/`--version`,
/// 1 para cualquier argumento inválido
pub fn exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 3,
            deadline_ms: 2_000,
            job_delay_ms: 200,
            inputs: (1..=10).collect(),
            json: false,
            log_level: "info".to_string(),
        }
    }
}
