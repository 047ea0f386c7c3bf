//! # Cola de Jobs
//! src/jobs/queue.rs
//!
//! Cola FIFO acotada y thread-safe entre el productor y los workers.
//!
//! - `submit` bloquea si la cola está llena (backpressure)
//! - `close` avisa que no llegarán más jobs; los consumidores ven
//!   fin de stream después de vaciarla
//! - encolar después de `close` es un bug del caller y aborta (panic)
//!
//! Soltar la `JobQueue` equivale a cerrarla.

use crate::jobs::job::{Job, JobId};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

/// Lado productor de la cola
pub struct JobQueue<I> {
    /// `None` una vez cerrada
    sender: Option<Sender<Job<I>>>,

    /// Copia del receptor para poder entregar handles
    receiver: Receiver<Job<I>>,

    /// Capacidad máxima de la cola
    capacity: usize,

    /// Próximo id a asignar
    next_id: JobId,
}

impl<I> JobQueue<I> {
    /// Crea una cola abierta con capacidad máxima `capacity`
    ///
    /// Una capacidad 0 se trata como 1: un canal sin buffer obligaría al
    /// productor a esperar a un worker en cada job.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);

        Self {
            sender: Some(sender),
            receiver,
            capacity,
            next_id: 1,
        }
    }

    /// Encola un job con la entrada dada y retorna su id
    ///
    /// Bloquea mientras la cola esté llena.
    ///
    /// # Panics
    ///
    /// Si la cola ya fue cerrada.
    pub fn submit(&mut self, input: I) -> JobId {
        let Some(sender) = self.sender.as_ref() else {
            panic!("submit on a closed job queue (job would be #{})", self.next_id);
        };

        let id = self.next_id;
        self.next_id += 1;

        // La cola guarda su propio receptor, así que el canal no puede
        // estar desconectado mientras `self` exista.
        let _ = sender.send(Job::new(id, input));

        id
    }

    /// Cierra la cola. Idempotente.
    pub fn close(&mut self) {
        if self.sender.take().is_some() {
            debug!(submitted = self.submitted(), "job queue closed");
        }
    }

    /// Verifica si la cola ya fue cerrada
    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Cantidad de jobs encolados hasta ahora
    pub fn submitted(&self) -> u64 {
        self.next_id - 1
    }

    /// Jobs pendientes (aún no tomados por un worker)
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Retorna la capacidad máxima
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle del lado consumidor, para entregar al pool
    pub fn handle(&self) -> JobQueueHandle<I> {
        JobQueueHandle {
            receiver: self.receiver.clone(),
            capacity: self.capacity,
        }
    }
}

/// Lado consumidor de una `JobQueue`
pub struct JobQueueHandle<I> {
    receiver: Receiver<Job<I>>,
    capacity: usize,
}

impl<I> JobQueueHandle<I> {
    /// Jobs pendientes
    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Capacidad de la cola de origen
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn receiver(&self) -> Receiver<Job<I>> {
        self.receiver.clone()
    }
}

impl<I> Clone for JobQueueHandle<I> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
            capacity: self.capacity,
        }
    }
}

/// Punto de entrada del productor para un conjunto finito de entradas
///
/// Crea una cola con capacidad igual a la cantidad de entradas (el
/// productor nunca bloquea), encola todo en orden, la cierra y retorna el
/// handle para el pool.
pub fn submit_jobs<I, T>(inputs: T) -> JobQueueHandle<I>
where
    T: IntoIterator<Item = I>,
{
    let inputs: Vec<I> = inputs.into_iter().collect();
    let mut queue = JobQueue::new(inputs.len());

    for input in inputs {
        queue.submit(input);
    }
    queue.close();

    queue.handle()
}
