//! Simple stateless pub-sub event handler
//!
//! This module provides a small hook system that lets components subscribe to payment engine events and react to
//! them off the request path. The handler is stateless: subscribers receive the event itself and nothing else.
//! Handlers can be async, and each delivery runs in its own task, so a slow or failing subscriber never delays the
//! producer side (which, for this engine, is the synchronous webhook-response path).
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // drop our own sender so the loop ends once the last producer is dropped
        drop(self.sender);
        let mut in_flight = Vec::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            in_flight.push(tokio::spawn(async move {
                (handler)(ev).await;
                trace!("📬️ Event handled");
            }));
            in_flight.retain(|job| !job.is_finished());
        }
        debug!("📬️ Waiting for in-flight event jobs to complete");
        for job in in_flight {
            if let Err(e) = job.await {
                warn!("📬️ An event job panicked: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
