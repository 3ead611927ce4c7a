/*!
Full-duplex chat session over a [`SecureChannel`].

The channel is split and two loops run on their own threads: one pulls text
from a [`MessageSource`] and sends it, the other receives frames and hands
plaintext to a [`MessageSink`]. Whichever loop ends first decides the
session's [`EndReason`]; the shared shutdown flag is raised and the
connection is closed exactly once, which also unblocks the other loop.

The receive loop is always joined. The send loop may be parked inside a
blocking source (a console read, for instance) that cannot be interrupted;
it is joined only if it has already finished and is otherwise left to exit
on its own once its source returns.
*/

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::core::error::{Error, Result};
use crate::invalid_state_err;
use crate::protocol::channel::{ChannelReceiver, ChannelSender, SecureChannel};

/// Supplies outgoing chat lines. `None` ends the session locally.
pub trait MessageSource: Send + 'static {
    fn next_message(&mut self) -> Option<String>;
}

/// Receives decrypted chat lines
pub trait MessageSink: Send + 'static {
    fn deliver(&mut self, text: &str);

    /// Called when a frame failed authentication and was dropped
    fn decrypt_failed(&mut self) {}
}

impl MessageSource for mpsc::Receiver<String> {
    fn next_message(&mut self) -> Option<String> {
        self.recv().ok()
    }
}

impl MessageSource for std::vec::IntoIter<String> {
    fn next_message(&mut self) -> Option<String> {
        self.next()
    }
}

impl MessageSink for mpsc::Sender<String> {
    fn deliver(&mut self, text: &str) {
        // The consumer hanging up only means nobody is reading any more
        let _ = self.send(text.to_string());
    }
}

/// Why a session ended
#[derive(Debug)]
pub enum EndReason {
    /// The local source ran out (EOF or the quit command)
    LocalEnd,
    /// The peer closed its sending direction
    PeerClosed,
    /// A terminal transport or crypto error
    Failed(Error),
}

/// Outcome of [`DuplexSession::run`]
#[derive(Debug)]
pub struct SessionSummary {
    pub reason: EndReason,
    /// Messages handed to the transport
    pub sent: usize,
    /// Messages delivered to the sink
    pub received: usize,
    /// Frames dropped because they failed authentication
    pub decrypt_failures: usize,
    /// Whether this session performed the close of the connection
    pub closed_here: bool,
}

#[derive(Default)]
struct Counters {
    sent: AtomicUsize,
    received: AtomicUsize,
    decrypt_failures: AtomicUsize,
}

/// Duplex driver that owns a secure channel
pub struct DuplexSession {
    channel: SecureChannel,
}

impl DuplexSession {
    pub fn new(channel: SecureChannel) -> Self {
        Self { channel }
    }

    /// Run until the source ends, the peer closes, or a terminal error occurs.
    ///
    /// Returns `Err` only if the session could not be started at all,
    /// including when the channel was already closed.
    pub fn run<S, K>(self, source: S, sink: K) -> Result<SessionSummary>
    where
        S: MessageSource,
        K: MessageSink,
    {
        if self.channel.is_closed() {
            return invalid_state_err!("open channel", "closed channel");
        }
        let (sender, receiver) = self.channel.split()?;
        let closer = sender.close_handle().clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let (done_tx, done_rx) = mpsc::channel::<EndReason>();

        let send_thread = {
            let flag = Arc::clone(&shutdown);
            let counters = Arc::clone(&counters);
            let done_tx = done_tx.clone();
            thread::Builder::new()
                .name("e2ee-send".to_string())
                .spawn(move || send_loop(sender, source, &flag, &counters, done_tx))?
        };

        let recv_thread = {
            let flag = Arc::clone(&shutdown);
            let counters = Arc::clone(&counters);
            let spawned = thread::Builder::new()
                .name("e2ee-recv".to_string())
                .spawn(move || receive_loop(receiver, sink, &flag, &counters, done_tx));
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    shutdown.store(true, Ordering::Release);
                    closer.close();
                    return Err(e.into());
                }
            }
        };

        let reason = done_rx.recv().unwrap_or_else(|_| {
            EndReason::Failed(Error::Io(io::Error::other("session loops exited without a reason")))
        });
        log::info!("session ending: {:?}", reason);

        shutdown.store(true, Ordering::Release);
        let closed_here = closer.close();

        if recv_thread.join().is_err() {
            log::error!("receive loop panicked");
        }
        if send_thread.is_finished() {
            if send_thread.join().is_err() {
                log::error!("send loop panicked");
            }
        } else {
            log::debug!("send loop still waiting on its source; detaching");
        }

        Ok(SessionSummary {
            reason,
            sent: counters.sent.load(Ordering::Acquire),
            received: counters.received.load(Ordering::Acquire),
            decrypt_failures: counters.decrypt_failures.load(Ordering::Acquire),
            closed_here,
        })
    }
}

fn send_loop<S: MessageSource>(
    mut sender: ChannelSender,
    mut source: S,
    shutdown: &AtomicBool,
    counters: &Counters,
    done: mpsc::Sender<EndReason>,
) {
    let reason = loop {
        if shutdown.load(Ordering::Acquire) {
            break None;
        }
        let Some(text) = source.next_message() else {
            break Some(EndReason::LocalEnd);
        };
        if shutdown.load(Ordering::Acquire) {
            break None;
        }
        match sender.send_message(&text) {
            Ok(()) => {
                counters.sent.fetch_add(1, Ordering::AcqRel);
            }
            Err(_) if shutdown.load(Ordering::Acquire) => break None,
            // Closed through a cloned handle rather than by the session itself
            Err(_) if sender.close_handle().is_closed() => break Some(EndReason::LocalEnd),
            Err(e) => break Some(EndReason::Failed(e)),
        }
    };

    if let Some(reason) = reason {
        let _ = done.send(reason);
    }
}

fn receive_loop<K: MessageSink>(
    mut receiver: ChannelReceiver,
    mut sink: K,
    shutdown: &AtomicBool,
    counters: &Counters,
    done: mpsc::Sender<EndReason>,
) {
    let reason = loop {
        if shutdown.load(Ordering::Acquire) {
            break None;
        }
        match receiver.receive_message() {
            Ok(text) => {
                counters.received.fetch_add(1, Ordering::AcqRel);
                sink.deliver(&text);
            }
            Err(Error::DecryptFailed) => {
                counters.decrypt_failures.fetch_add(1, Ordering::AcqRel);
                log::warn!("dropped a message that failed authentication");
                sink.decrypt_failed();
            }
            Err(_) if shutdown.load(Ordering::Acquire) => break None,
            Err(_) if receiver.close_handle().is_closed() => break Some(EndReason::LocalEnd),
            Err(Error::PeerClosed) => break Some(EndReason::PeerClosed),
            Err(e) => break Some(EndReason::Failed(e)),
        }
    };

    if let Some(reason) = reason {
        let _ = done.send(reason);
    }
}
