//! The UDP I/O server: one ephemeral socket, a send loop, a receive loop,
//! and an inactivity watchdog that is the pipeline's sole liveness gate.
//!
//! The Go source strokes an unbounded "awake" channel on every read, write
//! and dispatch and runs a `time.After`-based select loop as the watchdog;
//! this crate represents "instant of last activity" as a
//! `tokio::sync::watch::Sender<Option<Instant>>` (`None` until the first
//! stroke arms the watchdog) and cancels the send/receive loops through a
//! shared `Arc<Notify>` rather than Go's per-loop kill channel — same
//! effect, each loop observes cancellation at its next suspension point.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, watch, Notify};

use crate::message::{ConsoleMsg, MessageSink};
use crate::packet::Packet;

const RECV_BUF_SIZE: usize = 2048;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles returned by [`spawn`]: the send side of the outbound channel, the
/// receive side of the inbound channel, and a one-shot fired once the
/// watchdog has torn down both I/O loops.
pub struct UdpServerHandles {
    pub send_tx: mpsc::UnboundedSender<Packet>,
    pub recv_rx: mpsc::UnboundedReceiver<Packet>,
    pub done: oneshot::Receiver<()>,
}

/// Tracks, per remote address, the instant of the most recent successful
/// send — used to compute `Packet::ping_ms` on the matching inbound
/// packet. A host with several outstanding sub-requests only gets the most
/// recent send instant; good enough for an approximate round-trip figure.
type SendTimes = Arc<Mutex<HashMap<String, Instant>>>;

/// Binds an ephemeral `0.0.0.0:0` UDP socket and starts the send loop,
/// receive loop and watchdog. Returns once the socket is bound and the
/// loops are spawned — there is no separate async "initialized" wait beyond
/// awaiting this function, since `UdpSocket::bind` already suspends until
/// the bind completes.
pub async fn spawn(timeout: Duration, messages: MessageSink) -> io::Result<UdpServerHandles> {
    let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);

    let (send_tx, send_rx) = mpsc::unbounded_channel::<Packet>();
    let (recv_tx, recv_rx) = mpsc::unbounded_channel::<Packet>();
    let (done_tx, done_rx) = oneshot::channel();
    let (activity_tx, activity_rx) = watch::channel::<Option<Instant>>(None);
    let cancel = Arc::new(Notify::new());
    let send_times: SendTimes = Arc::new(Mutex::new(HashMap::new()));

    let send_task = tokio::spawn(send_loop(
        socket.clone(),
        send_rx,
        activity_tx.clone(),
        messages.clone(),
        cancel.clone(),
        send_times.clone(),
    ));
    let recv_task = tokio::spawn(recv_loop(socket, recv_tx, activity_tx, messages.clone(), cancel.clone(), send_times));
    tokio::spawn(watchdog(activity_rx, timeout, cancel, send_task, recv_task, done_tx, messages));

    Ok(UdpServerHandles { send_tx, recv_rx, done: done_rx })
}

fn stroke(activity_tx: &watch::Sender<Option<Instant>>) {
    let _ = activity_tx.send(Some(Instant::now()));
}

async fn send_loop(
    socket: Arc<UdpSocket>,
    mut send_rx: mpsc::UnboundedReceiver<Packet>,
    activity_tx: watch::Sender<Option<Instant>>,
    messages: MessageSink,
    cancel: Arc<Notify>,
    send_times: SendTimes,
) {
    loop {
        let packet = tokio::select! {
            _ = cancel.notified() => break,
            packet = send_rx.recv() => match packet {
                Some(p) => p,
                None => break,
            },
        };

        match socket.send_to(&packet.data, &packet.remote_addr).await {
            Ok(n) => {
                let now = Instant::now();
                send_times.lock().expect("send_times lock poisoned").insert(packet.remote_addr.clone(), now);
                stroke(&activity_tx);
                messages.send(ConsoleMsg::debug(format!("Sent {n} bytes to {}.", packet.remote_addr)));
            }
            Err(e) => {
                messages.send(ConsoleMsg::minor(format!("Send to {} failed: {e}", packet.remote_addr)));
            }
        }
    }
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    recv_tx: mpsc::UnboundedSender<Packet>,
    activity_tx: watch::Sender<Option<Instant>>,
    messages: MessageSink,
    cancel: Arc<Notify>,
    send_times: SendTimes,
) {
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    loop {
        let result = tokio::select! {
            _ = cancel.notified() => break,
            result = socket.recv_from(&mut buf) => result,
        };

        match result {
            Ok((n, from)) => {
                let recv_at = Instant::now();
                let from_addr = from.to_string();
                let sent_at = send_times.lock().expect("send_times lock poisoned").get(&from_addr).copied();
                let packet = Packet::inbound(from_addr, buf[..n].to_vec(), sent_at, recv_at);
                stroke(&activity_tx);
                if recv_tx.send(packet).is_err() {
                    break;
                }
            }
            Err(e) => {
                messages.send(ConsoleMsg::debug(format!("Receive failed: {e}")));
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn watchdog(
    mut activity_rx: watch::Receiver<Option<Instant>>,
    timeout: Duration,
    cancel: Arc<Notify>,
    send_task: tokio::task::JoinHandle<()>,
    recv_task: tokio::task::JoinHandle<()>,
    done_tx: oneshot::Sender<()>,
    messages: MessageSink,
) {
    // Armed by the first stroke; until then there is nothing to time out.
    while activity_rx.borrow().is_none() {
        if activity_rx.changed().await.is_err() {
            return;
        }
    }

    loop {
        let last = activity_rx.borrow().expect("armed above");
        let deadline = last + timeout;
        tokio::select! {
            changed = activity_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline.into()) => {
                break;
            }
        }
    }

    messages.send(ConsoleMsg::debug("Watchdog: inactivity timeout, shutting down I/O loops."));
    cancel.notify_waiters();
    let _ = send_task.await;
    let _ = recv_task.await;
    let _ = done_tx.send(());
}
