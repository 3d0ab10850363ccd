//! A simple oneshot channel for single-use responses.
//! Uses std::sync::mpsc under the hood.

use std::sync::mpsc;
use std::time::Duration;

pub struct Sender<T>(mpsc::SyncSender<T>);
pub struct Receiver<T>(mpsc::Receiver<T>);

impl<T> Sender<T> {
    /// Fails (returning the value) if the receiver is gone.
    pub fn send(self, value: T) -> Result<(), T> {
        self.0.send(value).map_err(|e| e.0)
    }
}

impl<T> Receiver<T> {
    pub fn blocking_recv(self) -> Result<T, RecvError> {
        self.0.recv().map_err(|_| RecvError::Closed)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvError> {
        self.0.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => RecvError::Timeout,
            mpsc::RecvTimeoutError::Disconnected => RecvError::Closed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    Closed,
    Timeout,
}

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    // Buffer of 1 for oneshot semantics
    let (tx, rx) = mpsc::sync_channel(1);
    (Sender(tx), Receiver(rx))
}
