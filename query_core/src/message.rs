//! The leveled, user-facing console message bus.
//!
//! This is distinct from the `tracing` events used for operator-facing
//! engineering diagnostics (task lifecycle, I/O errors): the message bus is
//! the user-facing console output, filtered by `output-lvl` and written to a
//! sink (stdout by default); `tracing` is for internal diagnostics and is
//! not gated by that threshold.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MsgLevel {
    Major = 0,
    Minor = 1,
    Debug = 2,
}

impl MsgLevel {
    pub fn from_i32(v: i32) -> Self {
        match v {
            v if v <= 0 => MsgLevel::Major,
            1 => MsgLevel::Minor,
            _ => MsgLevel::Debug,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleMsg {
    pub level: MsgLevel,
    pub text: String,
}

impl ConsoleMsg {
    pub fn major(text: impl Into<String>) -> Self {
        Self { level: MsgLevel::Major, text: text.into() }
    }

    pub fn minor(text: impl Into<String>) -> Self {
        Self { level: MsgLevel::Minor, text: text.into() }
    }

    pub fn debug(text: impl Into<String>) -> Self {
        Self { level: MsgLevel::Debug, text: text.into() }
    }
}

/// One end of the message bus: cheap to clone, handed to every protocol
/// handler and I/O loop.
#[derive(Clone)]
pub struct MessageSink(mpsc::UnboundedSender<ConsoleMsg>);

impl MessageSink {
    pub fn send(&self, msg: ConsoleMsg) {
        // The only failure mode is the sink task having been dropped, which
        // only happens after shutdown; a message lost at that point is fine.
        let _ = self.0.send(msg);
    }
}

/// The single-consumer sink: filters by `threshold` and writes to stdout.
pub struct MessageBus {
    sink: MessageSink,
    rx: mpsc::UnboundedReceiver<ConsoleMsg>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { sink: MessageSink(tx), rx }
    }

    pub fn sink(&self) -> MessageSink {
        self.sink.clone()
    }

    /// Drains messages at or below `threshold`, writing each to stdout,
    /// until the bus is closed (all senders dropped).
    pub async fn run(mut self, threshold: MsgLevel) {
        while let Some(msg) = self.rx.recv().await {
            if msg.level <= threshold {
                println!("{}", msg.text);
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
