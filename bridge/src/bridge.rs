//! Process bridge: lifecycle, supervision and message exchange
//!
//! Owns the companion process and the two threads speaking to it:
//! `bridge-reader` decodes command lines from the companion's merged
//! output stream, `bridge-sender` drains the outbound queue into its
//! stdin. Everything is coordinated through one atomic running flag plus
//! the queue's own condition variable; no error escapes a loop boundary.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use shared::{ChildCommand, OutboundMessage};

use crate::core::envelope::EventEnvelope;
use crate::core::pool::ObjectPool;
use crate::core::queue::OutboundQueue;
use crate::error::{BridgeError, BridgeResult};
use crate::events::HostEvent;
use crate::traits::{ExecutableBuilder, Host, Messenger};

/// Bridge tuning knobs; defaults are the production values.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Soft cap on the outbound queue.
    pub queue_soft_cap: usize,
    /// Flush after every write while fewer than this many messages pend.
    pub flush_threshold: usize,
    /// Longest the sender sleeps on an empty queue.
    pub idle_wait: Duration,
    /// Grace period after the cooperative terminate signal.
    pub terminate_timeout: Duration,
    /// Grace period after the forced kill.
    pub kill_timeout: Duration,
    /// Pause between stop and start during a restart.
    pub restart_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_soft_cap: 1000,
            flush_threshold: 10,
            idle_wait: Duration::from_millis(50),
            terminate_timeout: Duration::from_secs(3),
            kill_timeout: Duration::from_secs(1),
            restart_delay: Duration::from_millis(100),
        }
    }
}

/// Point-in-time bridge counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeStats {
    pub running: bool,
    /// Messages read from plus written to the companion since start.
    pub messages_processed: u64,
    pub queue_depth: usize,
    pub pool_entries: usize,
}

type SharedWriter = Arc<Mutex<Option<BufWriter<ChildStdin>>>>;

/// Everything owned per companion process; replaced wholesale on restart.
struct ChildHandle {
    child: Child,
    writer: SharedWriter,
    reader: thread::JoinHandle<()>,
    sender: thread::JoinHandle<()>,
}

/// The bridge between the host and its companion process.
///
/// Collaborators are injected at construction; the bridge holds no global
/// state and can be torn down and rebuilt freely.
pub struct ProcessBridge<H, B, M>
where
    H: Host + 'static,
    B: ExecutableBuilder,
    M: Messenger + 'static,
{
    host: Arc<H>,
    builder: B,
    messenger: Arc<M>,
    pool: Arc<ObjectPool>,
    queue: Arc<OutboundQueue>,
    running: Arc<AtomicBool>,
    counter: Arc<AtomicU64>,
    sequence: AtomicU64,
    handle: Mutex<Option<ChildHandle>>,
    config: BridgeConfig,
}

impl<H, B, M> ProcessBridge<H, B, M>
where
    H: Host + 'static,
    B: ExecutableBuilder,
    M: Messenger + 'static,
{
    pub fn new(host: Arc<H>, builder: B, messenger: Arc<M>, pool: Arc<ObjectPool>) -> Self {
        Self::with_config(host, builder, messenger, pool, BridgeConfig::default())
    }

    pub fn with_config(
        host: Arc<H>,
        builder: B,
        messenger: Arc<M>,
        pool: Arc<ObjectPool>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            host,
            builder,
            messenger,
            pool,
            queue: Arc::new(OutboundQueue::with_soft_cap(config.queue_soft_cap)),
            running: Arc::new(AtomicBool::new(false)),
            counter: Arc::new(AtomicU64::new(0)),
            sequence: AtomicU64::new(0),
            handle: Mutex::new(None),
            config,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            running: self.is_running(),
            messages_processed: self.counter.load(Ordering::Acquire),
            queue_depth: self.queue.len(),
            pool_entries: self.pool.len(),
        }
    }

    /// Produce the companion executable, spawn it, and launch both loops.
    ///
    /// A build failure is a setup failure: logged as a warning, bridge
    /// left stopped, `Ok(())` returned. Calling `start` on a running
    /// bridge is rejected; use [`restart`](Self::restart) instead.
    pub fn start(&self) -> BridgeResult<()> {
        if self.is_running() {
            return Err(BridgeError::AlreadyRunning);
        }

        let executable = match self.builder.build() {
            Ok(path) => path,
            Err(e) => {
                warn!("Companion executable unavailable, bridge not started: {e}");
                return Ok(());
            }
        };

        let mut command = Command::new(&executable);
        command.stdin(Stdio::piped());
        let output = configure_output(&mut command)?;

        let mut child = command.spawn().map_err(|e| BridgeError::SpawnFailed {
            message: format!("{}: {e}", executable.display()),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| BridgeError::SpawnFailed {
            message: "companion stdin was not captured".to_string(),
        })?;
        let writer: SharedWriter = Arc::new(Mutex::new(Some(BufWriter::new(stdin))));
        let stream = output.into_reader(&mut child)?;

        // Flag first, so neither loop can observe a false flag at launch.
        self.running.store(true, Ordering::Release);

        let reader = {
            let host = Arc::clone(&self.host);
            let running = Arc::clone(&self.running);
            let counter = Arc::clone(&self.counter);
            spawn_loop("bridge-reader", &mut child, self.running.as_ref(), move || {
                run_reader(stream, host, running, counter)
            })?
        };

        let sender = {
            let queue = Arc::clone(&self.queue);
            let writer = Arc::clone(&writer);
            let running = Arc::clone(&self.running);
            let counter = Arc::clone(&self.counter);
            let flush_threshold = self.config.flush_threshold;
            let idle_wait = self.config.idle_wait;
            spawn_loop("bridge-sender", &mut child, self.running.as_ref(), move || {
                run_sender(queue, writer, running, counter, flush_threshold, idle_wait)
            })?
        };

        *self.handle.lock() = Some(ChildHandle {
            child,
            writer,
            reader,
            sender,
        });

        info!("🚀 Companion process started: {}", executable.display());
        Ok(())
    }

    /// Tear the bridge down, containing a hung or dead companion.
    ///
    /// The sequence is fixed: clear the running flag, drain the queue,
    /// best-effort shutdown line, close the write stream, cooperative
    /// terminate, bounded wait, forced kill, bounded wait, join the
    /// loops, release the handle, report and reset the counter. Safe to
    /// call on a bridge that never started.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.queue.clear();

        if let Some(ChildHandle {
            mut child,
            writer,
            reader,
            sender,
        }) = self.handle.lock().take()
        {
            // Final control line, then close the companion's stdin.
            {
                let mut guard = writer.lock();
                if let Some(mut out) = guard.take() {
                    match OutboundMessage::shutdown().to_line() {
                        Ok(farewell) => {
                            if let Err(e) = writeln!(out, "{farewell}").and_then(|_| out.flush())
                            {
                                warn!("Error sending shutdown message: {e}");
                            }
                        }
                        Err(e) => warn!("Error encoding shutdown message: {e}"),
                    }
                }
            }

            terminate_child(
                &mut child,
                self.config.terminate_timeout,
                self.config.kill_timeout,
            );

            if sender.join().is_err() {
                warn!("bridge-sender thread panicked");
            }
            if reader.join().is_err() {
                warn!("bridge-reader thread panicked");
            }
        }

        let processed = self.counter.swap(0, Ordering::AcqRel);
        info!("🛑 Process bridge stopped. Messages processed: {processed}");
    }

    /// `stop`, a short settling pause, then `start`.
    pub fn restart(&self) -> BridgeResult<()> {
        self.stop();
        thread::sleep(self.config.restart_delay);
        self.start()
    }

    /// Queue one host event for the companion and fan it out.
    ///
    /// Never blocks. Returns false when the bridge is stopped or the
    /// queue is over its soft cap (the event is dropped with a warning).
    /// The enqueue (which wakes the sender) completes before the envelope
    /// is re-published, so a slow subscriber cannot delay the
    /// send-to-child path.
    pub fn send_event(&self, name: &str, args: Vec<String>) -> bool {
        if !self.is_running() {
            return false;
        }

        let envelope = EventEnvelope::new(name, args);
        let message = OutboundMessage::event(name, envelope.args().to_vec());

        if !self.queue.offer(message.clone()) {
            warn!("Outbound queue full, dropping event: {name}");
            return false;
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.pool.insert(format!("event_{name}_{seq}"), message.to_json());

        self.host.publish_event(&envelope);
        self.messenger.broadcast_event(name, envelope.args());
        true
    }

    /// [`send_event`](Self::send_event) for a catalog event.
    pub fn handle_host_event(&self, event: &HostEvent) -> bool {
        self.send_event(event.name(), event.args())
    }
}

/// Platform-specific plumbing for the companion's output side.
enum ChildOutput {
    #[cfg(unix)]
    Merged(std::os::fd::OwnedFd),
    #[cfg(not(unix))]
    StdoutOnly,
}

impl ChildOutput {
    fn into_reader(self, _child: &mut Child) -> BridgeResult<Box<dyn BufRead + Send>> {
        match self {
            #[cfg(unix)]
            ChildOutput::Merged(fd) => {
                Ok(Box::new(BufReader::new(std::fs::File::from(fd))))
            }
            #[cfg(not(unix))]
            ChildOutput::StdoutOnly => {
                let stdout = _child.stdout.take().ok_or_else(|| BridgeError::SpawnFailed {
                    message: "companion stdout was not captured".to_string(),
                })?;
                Ok(Box::new(BufReader::new(stdout)))
            }
        }
    }
}

/// Wire the companion's stdout and stderr into one readable stream.
///
/// On unix a manually created pipe is handed to the child as both
/// descriptors, so the reader genuinely sees one merged stream.
#[cfg(unix)]
fn configure_output(command: &mut Command) -> BridgeResult<ChildOutput> {
    let (read_end, write_end) = nix::unistd::pipe().map_err(|e| BridgeError::SpawnFailed {
        message: format!("output pipe: {e}"),
    })?;
    let write_clone = write_end.try_clone().map_err(|e| BridgeError::SpawnFailed {
        message: format!("output pipe dup: {e}"),
    })?;
    command.stdout(Stdio::from(write_end));
    command.stderr(Stdio::from(write_clone));
    Ok(ChildOutput::Merged(read_end))
}

/// Without unix fds there is no safe pre-spawn merge; stderr stays on the
/// host console and the reader follows stdout alone.
#[cfg(not(unix))]
fn configure_output(command: &mut Command) -> BridgeResult<ChildOutput> {
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());
    Ok(ChildOutput::StdoutOnly)
}

fn spawn_loop(
    name: &str,
    child: &mut Child,
    running: &AtomicBool,
    body: impl FnOnce() + Send + 'static,
) -> BridgeResult<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| {
            running.store(false, Ordering::Release);
            let _ = child.kill();
            let _ = child.wait();
            BridgeError::SpawnFailed {
                message: format!("{name} thread: {e}"),
            }
        })
}

/// Reader loop: one JSON command per line until EOF or shutdown.
fn run_reader<H: Host>(
    stream: Box<dyn BufRead + Send>,
    host: Arc<H>,
    running: Arc<AtomicBool>,
    counter: Arc<AtomicU64>,
) {
    let mut lines = stream.lines();
    while running.load(Ordering::Acquire) {
        match lines.next() {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match ChildCommand::parse(&line) {
                    Ok(command) => {
                        dispatch_command(host.as_ref(), command);
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => warn!("Failed to parse companion message: {line}"),
                }
            }
            Some(Err(e)) => {
                if running.load(Ordering::Acquire) {
                    error!("Error reading from companion process: {e}");
                }
                break;
            }
            None => break,
        }
    }
    debug!("bridge-reader exited");
}

/// Route one companion command to its host-side effect.
fn dispatch_command<H: Host>(host: &H, command: ChildCommand) {
    match command {
        ChildCommand::Broadcast { message } => host.broadcast(&message),
        ChildCommand::Whisper { player, message } => {
            if !host.whisper(&player, &message) {
                debug!("Whisper target not connected, dropped: {player}");
            }
        }
        ChildCommand::Console { message } => host.console(&message),
        ChildCommand::Unknown { action } => warn!("Unknown action: {action}"),
    }
}

/// Sender loop: serialize, write one line, flush only when shallow.
fn run_sender(
    queue: Arc<OutboundQueue>,
    writer: SharedWriter,
    running: Arc<AtomicBool>,
    counter: Arc<AtomicU64>,
    flush_threshold: usize,
    idle_wait: Duration,
) {
    while running.load(Ordering::Acquire) {
        let Some(message) = queue.poll_timeout(idle_wait) else {
            continue;
        };

        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping unserializable outbound message: {e}");
                continue;
            }
        };

        let mut guard = writer.lock();
        let Some(out) = guard.as_mut() else {
            break;
        };

        if let Err(e) = writeln!(out, "{line}") {
            if running.load(Ordering::Acquire) {
                warn!("Error sending message to companion: {e}");
            }
            break;
        }

        // Batch flush syscalls under load, stay prompt when idle.
        if queue.len() < flush_threshold {
            if let Err(e) = out.flush() {
                if running.load(Ordering::Acquire) {
                    warn!("Error flushing companion stream: {e}");
                }
                break;
            }
        }
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // Nothing already dequeued may be lost: one final flush.
    if let Some(out) = writer.lock().as_mut() {
        let _ = out.flush();
    }
    debug!("bridge-sender exited");
}

/// Two-phase shutdown escalation: cooperative signal, bounded wait,
/// forced kill, bounded wait. A hung companion can never block the host
/// past the two timeouts.
fn terminate_child(child: &mut Child, terminate_timeout: Duration, kill_timeout: Duration) {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        match signal::kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
            Ok(()) => debug!("Sent SIGTERM to companion (PID: {})", child.id()),
            Err(nix::errno::Errno::ESRCH) => return,
            Err(e) => warn!("Failed to signal companion process: {e}"),
        }
    }

    if wait_with_timeout(child, terminate_timeout) {
        return;
    }

    warn!("🔨 Companion did not terminate cooperatively, forcing kill");
    if let Err(e) = child.kill() {
        warn!("Failed to kill companion process: {e}");
    }
    if !wait_with_timeout(child, kill_timeout) {
        warn!("Companion process still alive after forced kill");
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(e) => {
                warn!("Error waiting for companion process: {e}");
                return false;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
