//! Single-consumer command queue.
//!
//! Every mutation of the indicator is a [`Command`] run by one dedicated
//! consumer thread, strictly in arrival order. The consumer owns the context
//! the commands act on; it is built on the consumer thread itself, so the
//! context never has to be `Send`.
//!
//! Commands run on the consumer must not use the blocking
//! [`CommandSender::send`] on their own queue; a full queue would never
//! drain.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};

use super::error::SerializerError;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 32;

/// A unit of work against the consumer-owned context.
pub type Command<C> = Box<dyn FnOnce(&mut C) + Send>;

enum Envelope<C> {
    Run(Command<C>),
    Flush(Sender<()>),
    Shutdown,
}

// ============================================================================
// CommandSender
// ============================================================================

/// Producer side of the queue. Cheap to clone.
pub struct CommandSender<C> {
    tx: Sender<Envelope<C>>,
}

impl<C> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C: 'static> CommandSender<C> {
    /// Enqueues `command`, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Disconnected`] once the consumer stopped.
    pub fn send<F>(&self, command: F) -> Result<(), SerializerError>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.tx
            .send(Envelope::Run(Box::new(command)))
            .map_err(|_| SerializerError::Disconnected)
    }

    /// Enqueues `command` only if there is room right now.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Full`] if the queue is at capacity, or
    /// [`SerializerError::Disconnected`] once the consumer stopped.
    pub fn try_send<F>(&self, command: F) -> Result<(), SerializerError>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.tx
            .try_send(Envelope::Run(Box::new(command)))
            .map_err(|err| match err {
                TrySendError::Full(_) => SerializerError::Full,
                TrySendError::Disconnected(_) => SerializerError::Disconnected,
            })
    }

    /// Blocks until every command enqueued before this call has run.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Disconnected`] once the consumer stopped.
    pub fn flush(&self) -> Result<(), SerializerError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.tx
            .send(Envelope::Flush(ack_tx))
            .map_err(|_| SerializerError::Disconnected)?;
        ack_rx.recv().map_err(|_| SerializerError::Disconnected)
    }

    /// Number of envelopes waiting for the consumer.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl<C> std::fmt::Debug for CommandSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

// ============================================================================
// CommandSerializer
// ============================================================================

/// Owns the consumer thread.
pub struct CommandSerializer<C> {
    sender: CommandSender<C>,
    thread: Option<JoinHandle<()>>,
}

impl<C: 'static> CommandSerializer<C> {
    /// Spawns the consumer with a queue of `capacity` commands.
    ///
    /// `make_context` runs on the consumer thread and receives a sender for
    /// the same queue, so the context can schedule follow-up commands from
    /// timers it owns.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::SpawnFailed`] if the thread cannot start.
    pub fn spawn<M>(capacity: usize, make_context: M) -> Result<Self, SerializerError>
    where
        M: FnOnce(CommandSender<C>) -> C + Send + 'static,
    {
        let (tx, rx) = bounded::<Envelope<C>>(capacity.max(1));
        let sender = CommandSender { tx };
        let own_sender = sender.clone();

        let thread = thread::Builder::new()
            .name("indicator".to_string())
            .spawn(move || {
                let mut context = make_context(own_sender);
                tracing::debug!("インジケーターのコンシューマーを開始しました");
                for envelope in rx {
                    match envelope {
                        Envelope::Run(command) => command(&mut context),
                        Envelope::Flush(ack) => {
                            let _ = ack.send(());
                        }
                        Envelope::Shutdown => break,
                    }
                }
                drop(context);
                tracing::debug!("インジケーターのコンシューマーを終了しました");
            })
            .map_err(|err| SerializerError::SpawnFailed(err.to_string()))?;

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Returns a new producer handle.
    pub fn sender(&self) -> CommandSender<C> {
        self.sender.clone()
    }

    /// Runs every command already queued, drops the context and joins the
    /// consumer thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.sender.tx.send(Envelope::Shutdown).is_err() {
            tracing::debug!("インジケーターのコンシューマーは既に終了しています");
        }
        if thread.join().is_err() {
            tracing::error!("インジケーターのコンシューマーがパニックしました");
        }
    }
}

impl<C> Drop for CommandSerializer<C> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.sender.tx.send(Envelope::Shutdown);
            let _ = thread.join();
        }
    }
}

impl<C> std::fmt::Debug for CommandSerializer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSerializer")
            .field("sender", &self.sender)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};

    type Log = Arc<Mutex<Vec<u32>>>;

    fn spawn_logger() -> (CommandSerializer<Vec<u32>>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let serializer = CommandSerializer::spawn(4, |_sender| Vec::new()).unwrap();
        (serializer, log)
    }

    mod order_tests {
        use super::*;

        #[test]
        fn test_runs_in_arrival_order() {
            let (serializer, log) = spawn_logger();
            let sender = serializer.sender();
            for i in 0..20 {
                sender.send(move |ctx: &mut Vec<u32>| ctx.push(i)).unwrap();
            }
            let out = Arc::clone(&log);
            sender
                .send(move |ctx: &mut Vec<u32>| out.lock().unwrap().extend(ctx.iter()))
                .unwrap();
            sender.flush().unwrap();

            assert_eq!(*log.lock().unwrap(), (0..20).collect::<Vec<_>>());
        }

        #[test]
        fn test_per_producer_order_across_threads() {
            let (serializer, log) = spawn_logger();
            let handles: Vec<_> = (0..3u32)
                .map(|producer| {
                    let sender = serializer.sender();
                    let log = Arc::clone(&log);
                    thread::spawn(move || {
                        for i in 0..10 {
                            let log = Arc::clone(&log);
                            sender
                                .send(move |_: &mut Vec<u32>| {
                                    log.lock().unwrap().push(producer * 100 + i)
                                })
                                .unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            serializer.sender().flush().unwrap();

            let log = log.lock().unwrap();
            assert_eq!(log.len(), 30);
            for producer in 0..3u32 {
                let own: Vec<u32> = log.iter().copied().filter(|v| v / 100 == producer).collect();
                let mut sorted = own.clone();
                sorted.sort_unstable();
                assert_eq!(own, sorted);
            }
        }
    }

    mod backpressure_tests {
        use super::*;

        #[test]
        fn test_try_send_reports_full() {
            let (serializer, _log) = spawn_logger();
            let sender = serializer.sender();
            let gate = Arc::new(Barrier::new(2));

            // Park the consumer so the queue fills up.
            let consumer_gate = Arc::clone(&gate);
            sender
                .send(move |_: &mut Vec<u32>| {
                    consumer_gate.wait();
                })
                .unwrap();
            while !sender.is_empty() {
                thread::yield_now();
            }
            for i in 0..4 {
                sender.try_send(move |ctx: &mut Vec<u32>| ctx.push(i)).unwrap();
            }
            assert_eq!(
                sender.try_send(|ctx: &mut Vec<u32>| ctx.push(99)),
                Err(SerializerError::Full)
            );

            gate.wait();
            sender.flush().unwrap();
        }
    }

    mod shutdown_tests {
        use super::*;

        #[test]
        fn test_shutdown_drains_queue() {
            let (serializer, log) = spawn_logger();
            let sender = serializer.sender();
            for i in 0..3 {
                let log = Arc::clone(&log);
                sender
                    .send(move |_: &mut Vec<u32>| log.lock().unwrap().push(i))
                    .unwrap();
            }
            serializer.shutdown();

            assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
            assert_eq!(
                sender.send(|_: &mut Vec<u32>| {}),
                Err(SerializerError::Disconnected)
            );
            assert_eq!(sender.flush(), Err(SerializerError::Disconnected));
        }

        #[test]
        fn test_context_dropped_on_consumer_thread() {
            struct DropWitness(Arc<Mutex<Option<String>>>);
            impl Drop for DropWitness {
                fn drop(&mut self) {
                    *self.0.lock().unwrap() = thread::current().name().map(String::from);
                }
            }

            let dropped_on = Arc::new(Mutex::new(None));
            let witness = Arc::clone(&dropped_on);
            let serializer = CommandSerializer::spawn(1, move |_| DropWitness(witness)).unwrap();
            serializer.shutdown();

            assert_eq!(dropped_on.lock().unwrap().as_deref(), Some("indicator"));
        }
    }
}
