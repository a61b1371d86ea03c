// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, size queries, signals, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, sigaction, and raw fd reads and
// writes. These are the POSIX interfaces for terminal control; each unsafe
// block is minimal.
#![allow(unsafe_code)]
//
// `Terminal` is the `TerminalIo` adapter for the real tty. Raw mode is
// process-wide state, so only one `Terminal` may exist at a time: a global
// guard makes a second `Terminal::new()` fail with `SessionActive` until the
// first is dropped.
//
// Three restore paths exist: `Screen::close` (normal), `Drop` (early return
// or `?`), and a panic hook that writes a pre-built restore sequence
// straight to fd 1, bypassing the stdout lock in case the panic happened
// while it was held.
//
// SIGINT is caught by a handler installed without SA_RESTART. It only sets
// a flag; the interrupted blocking read returns and the session unwinds
// through its normal restore path. SIGWINCH gets the same kind of handler,
// installed only while `wait_resize` is blocked.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, TermError};
use crate::event::Position;
use crate::io::TerminalIo;
use crate::reader::InputReader;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Used when the size cannot be queried.
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };

    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }

    /// Whether `pos` lies on screen.
    #[inline]
    #[must_use]
    pub const fn contains(self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.cols as i32 && pos.y < self.rows as i32
    }
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Session Guard ──────────────────────────────────────────────────────────

/// Set while a `Terminal` exists.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Set by the SIGINT handler, cleared when a session starts.
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

fn acquire_session() -> Result<()> {
    SESSION_ACTIVE
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(|_| ())
        .map_err(|_| TermError::SessionActive)
}

fn release_session() {
    SESSION_ACTIVE.store(false, Ordering::Release);
}

// ─── Signals ────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler while `Terminal::wait_resize` runs.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// How often `wait_resize` checks its flags.
const RESIZE_POLL: Duration = Duration::from_millis(10);

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
extern "C" fn on_sigwinch(_signal: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

/// Install a flag-setting `handler` for `signal`, returning the previous
/// action.
#[cfg(unix)]
fn install_flag_handler(
    signal: libc::c_int,
    handler: extern "C" fn(libc::c_int),
) -> io::Result<libc::sigaction> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as *const () as libc::sighandler_t;
        // No SA_RESTART: a blocking read must return EINTR.
        action.sa_flags = 0;
        libc::sigemptyset(&raw mut action.sa_mask);

        let mut previous: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(signal, &raw const action, &raw mut previous) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(previous)
    }
}

#[cfg(unix)]
fn restore_handler(signal: libc::c_int, previous: &libc::sigaction) {
    unsafe {
        let _ = libc::sigaction(signal, previous, std::ptr::null_mut());
    }
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Original termios, reachable from the panic hook.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Everything a session may have switched on, switched off again: reset SGR
/// attributes, disable mouse reporting, show cursor, exit alternate screen.
///
/// The alternate screen exit is last so the shell content comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[0m\
    \x1b[?1015l\x1b[?1006l\x1b[?1003l\x1b[?1002l\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install (once per process) a panic hook that restores the terminal
/// before the original hook prints the panic message.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if SESSION_ACTIVE.load(Ordering::Acquire) {
                emergency_restore();

                #[cfg(unix)]
                restore_termios_from_backup();
            }

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// The process's real terminal.
///
/// A SIGINT only sets a flag (raw mode disables the terminal's own Ctrl+C
/// handling, so this mostly means `kill -INT`). The flag is seen by the next
/// [`Events`](crate::screen::Events) step or by
/// [`Screen::interrupted`](crate::Screen::interrupted); an application that
/// is not reading events should check the latter between frames.
///
/// # Example
///
/// ```no_run
/// use tk_term::{Screen, ScreenConfig, Terminal};
///
/// let terminal = Terminal::new()?;
/// let mut screen = Screen::open(terminal, ScreenConfig::default())?;
/// // ... draw, handle events ...
/// screen.close()?;
/// # Ok::<(), tk_term::TermError>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    #[cfg(unix)]
    previous_sigint: Option<libc::sigaction>,
}

impl Terminal {
    /// Claim the terminal for this process.
    ///
    /// # Errors
    ///
    /// [`TermError::SessionActive`] if another `Terminal` is alive, or an
    /// I/O error if the signal handler cannot be installed.
    pub fn new() -> Result<Self> {
        acquire_session()?;
        install_panic_hook();
        SIGINT_RECEIVED.store(false, Ordering::Relaxed);

        #[cfg(unix)]
        let previous_sigint = match install_flag_handler(libc::SIGINT, on_sigint) {
            Ok(previous) => Some(previous),
            Err(e) => {
                release_session();
                return Err(e.into());
            }
        };

        debug!("terminal claimed");
        Ok(Self {
            #[cfg(unix)]
            original_termios: None,
            #[cfg(unix)]
            previous_sigint,
        })
    }

    /// Whether raw mode is currently enabled through this handle.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        #[cfg(unix)]
        {
            self.original_termios.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Block until the terminal is resized (SIGWINCH) and return the new
    /// size.
    ///
    /// Returns `None` when `timeout` passes first or a SIGINT arrives. On
    /// non-unix platforms there is no resize signal and this returns `None`
    /// right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler cannot be installed.
    #[cfg(unix)]
    pub fn wait_resize(&self, timeout: Option<Duration>) -> Result<Option<Size>> {
        SIGWINCH_RECEIVED.store(false, Ordering::Relaxed);
        let previous = install_flag_handler(libc::SIGWINCH, on_sigwinch)?;
        let deadline = timeout.map(|t| Instant::now() + t);

        let resized = loop {
            if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                break true;
            }
            if SIGINT_RECEIVED.load(Ordering::Relaxed)
                || deadline.is_some_and(|d| Instant::now() >= d)
            {
                break false;
            }
            thread::sleep(RESIZE_POLL);
        };

        restore_handler(libc::SIGWINCH, &previous);
        let size = resized.then(|| self.size());
        debug!(?size, "resize wait finished");
        Ok(size)
    }

    #[cfg(not(unix))]
    pub fn wait_resize(&self, _timeout: Option<Duration>) -> Result<Option<Size>> {
        Ok(None)
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if self.original_termios.is_some() || !is_tty() {
            return Ok(());
        }

        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            // cfmakeraw equivalent: disable all line processing.
            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &=
                !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;

            // VMIN=1, VTIME=0: read() blocks until at least 1 byte available.
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if let Some(ref original) = self.original_termios {
            let fd = io::stdin().as_raw_fd();
            unsafe {
                if libc::tcsetattr(fd, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }
            self.original_termios = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Blocking read from stdin, retrying after signals other than SIGINT.
    #[cfg(unix)]
    fn read_stdin(blocking: bool) -> io::Result<Vec<u8>> {
        let mut buf = [0u8; 4096];
        loop {
            if !blocking {
                let ready = unsafe {
                    let mut pfd = libc::pollfd {
                        fd: libc::STDIN_FILENO,
                        events: libc::POLLIN,
                        revents: 0,
                    };
                    libc::poll(&raw mut pfd, 1, 0)
                };
                if ready <= 0 {
                    return Ok(Vec::new());
                }
            }

            let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
            if n >= 0 {
                #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
                return Ok(buf[..n as usize].to_vec());
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
            if SIGINT_RECEIVED.load(Ordering::Relaxed) {
                return Ok(Vec::new());
            }
        }
    }

    #[cfg(not(unix))]
    fn read_stdin(_blocking: bool) -> io::Result<Vec<u8>> {
        use std::io::Read;

        let mut buf = [0u8; 4096];
        let n = io::stdin().lock().read(&mut buf)?;
        Ok(buf[..n].to_vec())
    }
}

impl TerminalIo for Terminal {
    fn size(&self) -> Size {
        get_size().unwrap_or(Size::FALLBACK)
    }

    fn read_raw(&mut self, blocking: bool) -> io::Result<Vec<u8>> {
        Self::read_stdin(blocking)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        if enabled {
            self.enable_raw_mode()
        } else {
            self.disable_raw_mode()
        }
    }

    fn spawn_reader(&mut self) -> io::Result<(InputReader, Receiver<Vec<u8>>)> {
        InputReader::stdin()
    }

    fn interrupted(&self) -> bool {
        SIGINT_RECEIVED.load(Ordering::Relaxed)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Safety net only: Screen restores modes before dropping its adapter.
        let _ = self.disable_raw_mode();

        #[cfg(unix)]
        if let Some(previous) = self.previous_sigint.take() {
            restore_handler(libc::SIGINT, &previous);
        }

        release_session();
        debug!("terminal released");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
