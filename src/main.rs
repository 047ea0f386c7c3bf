//! # Job Pool - Entry Point
//! src/main.rs
//!
//! Eleva al cuadrado cada entrada en paralelo, con un deadline total, e
//! imprime la suma o el aviso de cancelación.

use job_pool::config::Config;
use job_pool::jobs::submit_jobs;
use job_pool::pool::{LogObserver, PoolReport, WorkerPool};
use job_pool::tasks::{square, with_delay};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &PoolReport<i64>) {
    if report.cancelled {
        let reason = report
            .cancel_reason
            .map(|reason| reason.as_str())
            .unwrap_or("cancelled");
        println!("operation cancelled ({})", reason);
        println!("   Completed:    {} jobs", report.jobs_completed);
        println!("   Partial sum:  {}", report.total);
    } else {
        println!("sum of squares: {}", report.total);
    }

    println!();
    for worker in &report.workers {
        println!(
            "   worker {:<3} {:>4} jobs  ({:?})",
            worker.worker_id, worker.jobs_processed, worker.exit
        );
    }
    println!(
        "   latency p50/p95/p99: {}/{}/{} us  elapsed: {} ms",
        report.metrics.latency_p50_us,
        report.metrics.latency_p95_us,
        report.metrics.latency_p99_us,
        report.metrics.elapsed_ms
    );
}

fn main() {
    let config = Config::new();
    init_tracing(&config.log_level);

    if let Err(e) = config.validate() {
        error!("invalid configuration: {}", e);
        eprintln!("💥 Error de configuración: {}", e);
        std::process::exit(1);
    }

    if !config.json {
        config.print_summary();
    }

    let jobs = submit_jobs(config.inputs.iter().copied());
    let job_fn = with_delay(config.job_delay(), square);

    let pool = match WorkerPool::new(config.pool_config(), job_fn)
        .with_observer(Arc::new(LogObserver))
        .start(jobs)
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("failed to start pool: {}", e);
            eprintln!("💥 Error fatal: {}", e);
            std::process::exit(1);
        }
    };

    let report = pool.collect();
    info!(
        total = report.total,
        completed = report.jobs_completed,
        cancelled = report.cancelled,
        "pool finished"
    );

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("💥 Error serializando reporte: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_report(&report);
    }
}
