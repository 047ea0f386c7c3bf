//! # Estructura de Job
//! src/jobs/job.rs
//!
//! Un `Job` es una unidad de trabajo inmutable: un id único asignado por
//! el productor y un valor de entrada. Un `JobResult` es la salida de
//! procesar exactamente un job.

use serde::Serialize;

/// Identificador de job, asignado de forma monótona por la cola (desde 1)
pub type JobId = u64;

/// Trabajo pendiente
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job<I> {
    /// ID único dentro de su cola
    id: JobId,

    /// Valor de entrada
    input: I,
}

impl<I> Job<I> {
    /// Solo la cola crea jobs, así los ids no se repiten
    pub(crate) fn new(id: JobId, input: I) -> Self {
        Self { id, input }
    }

    /// ID del job
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Entrada del job
    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn into_input(self) -> I {
        self.input
    }
}

/// Resultado de un job procesado completamente
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult<O> {
    job_id: JobId,
    output: O,
}

impl<O> JobResult<O> {
    /// Solo los workers producen resultados
    pub(crate) fn new(job_id: JobId, output: O) -> Self {
        Self { job_id, output }
    }

    /// ID del job que originó este resultado
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Salida calculada
    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(7, 42i64);
        assert_eq!(job.id(), 7);
        assert_eq!(*job.input(), 42);
        assert_eq!(job.into_input(), 42);
    }

    #[test]
    fn test_job_result_accessors() {
        let result = JobResult::new(3, 9i64);
        assert_eq!(result.job_id(), 3);
        assert_eq!(*result.output(), 9);
        assert_eq!(result.into_output(), 9);
    }

    #[test]
    fn test_job_result_json_shape() {
        let result = JobResult::new(4, 16i64);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"job_id": 4, "output": 16}));
    }

    #[test]
    fn test_job_json_shape() {
        let job = Job::new(1, "hola".to_string());
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(json, r#"{"id":1,"input":"hola"}"#);
    }
}
