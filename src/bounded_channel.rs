// SPDX-License-Identifier: Apache-2.0

//! Thin wrappers around flume channels used to connect pipeline stages.
//!
//! Every stage of the pipeline is connected with a [`rendezvous`] channel: a send only
//! completes once the receiving stage has taken the item, so a slow consumer stalls
//! its producer instead of buffering work in memory. The channel closes when every
//! sender is dropped, which is how shutdown propagates from one stage to the next.

use flume::{Receiver, Sender};
use std::fmt;

pub struct BoundedSender<T> {
    tx: Sender<T>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SendError<T> {
    /// The receiving stage is gone. The undelivered item is handed back.
    Disconnected(T),
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Disconnected(_) => write!(f, "channel disconnected"),
        }
    }
}

impl<T> BoundedSender<T> {
    pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.tx
            .send_async(item)
            .await
            .map_err(|e| SendError::Disconnected(e.into_inner()))
    }

    /// Blocking send - blocks until the receiver has taken the item.
    /// Use this from non-async contexts (e.g., dedicated OS threads).
    pub fn send_blocking(&self, item: T) -> Result<(), SendError<T>> {
        self.tx
            .send(item)
            .map_err(|e| SendError::Disconnected(e.into_inner()))
    }
}

impl<T> Clone for BoundedSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

pub struct BoundedReceiver<T> {
    rx: Receiver<T>,
}

impl<T> BoundedReceiver<T> {
    /// Returns `None` once every sender has been dropped and nothing is left to take.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv_async().await.ok()
    }

    /// Blocking receive with timeout - blocks until an item is available or timeout.
    /// Returns None if timeout expires or channel is disconnected.
    #[cfg(test)]
    pub(crate) fn recv_timeout(&self, timeout: std::time::Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }
}

pub fn bounded<T>(size: usize) -> (BoundedSender<T>, BoundedReceiver<T>) {
    let (tx, rx) = flume::bounded::<T>(size);

    (BoundedSender { tx }, BoundedReceiver { rx })
}

/// Zero-capacity channel: every send waits for a matching receive.
pub fn rendezvous<T>() -> (BoundedSender<T>, BoundedReceiver<T>) {
    bounded(0)
}
