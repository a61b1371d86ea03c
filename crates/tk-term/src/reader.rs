// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader: collects raw bytes off the consumer thread.
//
// A dedicated thread produces byte chunks and sends them through a standard
// channel. The consumer (the screen's event stream in timeout mode) waits
// with `recv_timeout()`, so it can report a `Timeout` while the reader sits
// in its own wait.
//
// Shutdown: the stdin loop polls the descriptor with a short timeout and
// checks an `AtomicBool` stop flag between polls, so `stop()` never leaves
// the thread stuck in a blocking `read()`. The channel closes when the
// thread exits; the consumer treats that as end of input.

#[cfg(unix)]
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

/// Byte chunk size for a single read.
const READ_BUF_SIZE: usize = 4096;

/// How often the reader thread checks the stop flag (milliseconds).
const POLL_TIMEOUT_MS: i32 = 50;

// ─── Scripted Input ─────────────────────────────────────────────────────────

/// One step of scripted input for headless sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Deliver these bytes as one read.
    Bytes(Vec<u8>),
    /// Deliver nothing for this long.
    Pause(Duration),
}

// ─── InputReader ────────────────────────────────────────────────────────────

/// Background reader thread feeding a channel of raw byte chunks.
///
/// The thread runs until [`stop`](Self::stop) is called, the reader is
/// dropped, its input ends, or the receiving side hangs up.
///
/// # Example
///
/// ```no_run
/// use tk_term::reader::InputReader;
///
/// let (reader, rx) = InputReader::stdin()?;
/// while let Ok(bytes) = rx.recv() {
///     println!("got {} bytes", bytes.len());
/// }
/// drop(reader);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct InputReader {
    /// `None` after `stop()` joins it.
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn a thread reading the process's stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn stdin() -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::spawn("stdin-reader", stdin_loop)
    }

    /// Spawn a thread that replays `script`, then closes the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn scripted(script: Vec<ScriptStep>) -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::spawn("script-reader", move |tx, stop| script_loop(script, &tx, &stop))
    }

    fn spawn<F>(name: &str, body: F) -> std::io::Result<(Self, Receiver<Vec<u8>>)>
    where
        F: FnOnce(Sender<Vec<u8>>, Arc<AtomicBool>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            debug!(thread = %thread_name, "input reader started");
            body(tx, stop_flag);
            debug!(thread = %thread_name, "input reader stopped");
        })?;

        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Signal the reader thread to stop and wait for it to exit.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Reader Loops ───────────────────────────────────────────────────────────

/// Poll stdin, read what is available, send it. Exits on stop, EOF, read
/// error, or a disconnected receiver.
#[cfg(unix)]
#[allow(clippy::needless_pass_by_value)] // Owned values moved into thread closure.
fn stdin_loop(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    use std::os::unix::io::AsRawFd;

    let stdin_fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: stdin_fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };

        // Timeout or EINTR: loop back to check the stop flag.
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(stdin_fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }

        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        let chunk = buf[..n as usize].to_vec();
        if tx.send(chunk).is_err() {
            break;
        }
    }
}

/// Non-unix fallback: blocking reads, so `stop()` waits for the next input.
#[cfg(not(unix))]
#[allow(clippy::needless_pass_by_value)]
fn stdin_loop(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    use std::io::Read;

    let stdin = std::io::stdin();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        match stdin.lock().read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

fn script_loop(script: Vec<ScriptStep>, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    for step in script {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match step {
            ScriptStep::Bytes(bytes) => {
                if tx.send(bytes).is_err() {
                    return;
                }
            }
            ScriptStep::Pause(pause) => sleep_unless_stopped(pause, stop),
        }
    }
}

/// Sleep for `pause`, waking early if `stop` is set.
fn sleep_unless_stopped(pause: Duration, stop: &AtomicBool) {
    let slice = Duration::from_millis(u64::from(POLL_TIMEOUT_MS.unsigned_abs()));
    let deadline = Instant::now() + pause;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
