//! One-shot background requests tagged with the id they were issued for

use std::future::Future;
use tokio::sync::oneshot::{self, error::TryRecvError};

pub enum Settled<T> {
    Waiting,
    Done(T),
    /// The task went away without answering
    Dropped,
}

pub struct Pending<T> {
    id: String,
    rx: oneshot::Receiver<T>,
}

impl<T: Send + 'static> Pending<T> {
    /// Run `fut` on the runtime, answering through this handle
    pub fn spawn<F>(id: &str, fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
        Self {
            id: id.to_string(),
            rx,
        }
    }

    #[cfg(test)]
    pub fn ready(id: &str, value: T) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(value);
        Self {
            id: id.to_string(),
            rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn try_take(&mut self) -> Settled<T> {
        match self.rx.try_recv() {
            Ok(value) => Settled::Done(value),
            Err(TryRecvError::Empty) => Settled::Waiting,
            Err(TryRecvError::Closed) => Settled::Dropped,
        }
    }
}
