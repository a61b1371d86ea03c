// SPDX-License-Identifier: MIT
//
// termkit: a live event viewer built on tk-term and tk-style.
//
// Opens a full-screen session, then logs every input event it receives:
// keys, named keys, clicks, drags, wheel scrolls and timeouts. It exercises
// the whole pipeline:
//
//   stdin → InputReader → split_reads → parse_event → Event
//   Viewer::paint → Screen::put_str → Renderer diff → one write()
//
// Usage:
//
//   termkit [--timeout-ms N] [--log FILE] [--debug]
//
//   --timeout-ms N   emit a Timeout event after N ms without input
//   --log FILE       write tracing output to FILE (filter: TERMKIT_LOG)
//   --debug          show the mean draw time in the window title
//
// Press `q` to quit. Ctrl-C closes the screen as well.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tk_style::{Align, Color, FormatStr};
use tk_term::{Event, Position, Screen, ScreenConfig, Size, Terminal, TerminalIo};

/// Maximum number of events kept in the scrolling log.
const MAX_LOG_ENTRIES: usize = 200;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "TERMKIT_LOG";

// ─── Options ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    timeout: Option<Duration>,
    log_file: Option<PathBuf>,
    debug: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--timeout-ms" => {
                let value = args.next().ok_or("--timeout-ms needs a value")?;
                let ms: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid timeout: {value}"))?;
                opts.timeout = Some(Duration::from_millis(ms));
            }
            "--log" => {
                let path = args.next().ok_or("--log needs a file path")?;
                opts.log_file = Some(PathBuf::from(path));
            }
            "--debug" => opts.debug = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(opts)
}

/// Send tracing output to `path`. Stderr would draw over the screen, so
/// without a log file nothing is installed.
fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ─── Viewer ─────────────────────────────────────────────────────────────────

/// Palette, built once.
struct Palette {
    header_fg: Color,
    header_bg: Color,
    key: Color,
    mouse: Color,
    scroll: Color,
    other: Color,
    dim: Color,
}

impl Palette {
    fn new() -> Self {
        Self {
            header_fg: Color::rgb(0, 0, 0),
            header_bg: Color::rgb(100, 200, 255),
            key: Color::rgb(130, 220, 130),
            mouse: Color::rgb(180, 180, 255),
            scroll: Color::rgb(255, 200, 100),
            other: Color::rgb(200, 200, 200),
            dim: Color::rgb(80, 80, 80),
        }
    }

    fn for_event(&self, event: &Event) -> &Color {
        match event {
            Event::KeyPressed { .. } | Event::ModifierKey { .. } => &self.key,
            Event::MouseMove { .. }
            | Event::MouseClick { .. }
            | Event::MouseRightClick { .. }
            | Event::MouseDrag { .. }
            | Event::MouseRightDrag { .. } => &self.mouse,
            Event::ScrollUp { .. } | Event::ScrollDown { .. } => &self.scroll,
            Event::Timeout | Event::ScreenClosed | Event::Unknown { .. } => &self.other,
        }
    }
}

/// Event log plus the drawing code.
struct Viewer {
    log: VecDeque<(String, Color)>,
    event_count: u64,
    palette: Palette,
}

impl Viewer {
    fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            event_count: 0,
            palette: Palette::new(),
        }
    }

    fn record(&mut self, event: &Event) {
        self.event_count += 1;
        if self.log.len() == MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        let color = self.palette.for_event(event).clone();
        self.log.push_back((describe(event), color));
    }

    fn paint<T: TerminalIo>(&self, screen: &mut Screen<T>) {
        let Size { cols, rows } = screen.size();
        let width = usize::from(cols);
        let p = &self.palette;

        let title = format!(" termkit | {cols}x{rows} | {} events ", self.event_count);
        let header = FormatStr::from(clip(&title, width))
            .justify(width, Align::Left, " ")
            .unwrap_or_else(|_| FormatStr::from(title.as_str()));
        screen.put_str(
            Position::new(0, 0),
            FormatStr::styled(header.as_str(), Some(&p.header_fg), Some(&p.header_bg)),
        );

        let mouse = screen.mouse_position();
        let status = if mouse == Position::UNKNOWN {
            " q to quit | mouse: -".to_string()
        } else {
            format!(" q to quit | mouse: {},{}", mouse.x, mouse.y)
        };
        let last_row = i32::from(rows) - 1;
        screen.put_str(
            Position::new(0, last_row),
            FormatStr::styled(&clip(&status, width), Some(&p.dim), None),
        );

        let visible = usize::from(rows.saturating_sub(2));
        let skip = self.log.len().saturating_sub(visible);
        for (row, (entry, color)) in (1..).zip(self.log.iter().skip(skip)) {
            screen.put_str(
                Position::new(0, row),
                FormatStr::styled(&clip(entry, width), Some(color), None),
            );
        }
    }
}

/// First `width` chars of `text`.
fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn describe(event: &Event) -> String {
    match event {
        Event::KeyPressed { ch: ' ', .. } => "key: Space".into(),
        Event::KeyPressed { ch, .. } => format!("key: {ch:?}"),
        Event::ModifierKey { key, .. } => format!("key: {key:?}"),
        Event::MouseMove { x, y, .. } => format!("mouse move at ({x}, {y})"),
        Event::MouseClick { x, y, .. } => format!("mouse click at ({x}, {y})"),
        Event::MouseRightClick { x, y, .. } => format!("mouse right click at ({x}, {y})"),
        Event::MouseDrag {
            x, y, from_x, from_y, ..
        } => format!("mouse drag ({from_x}, {from_y}) -> ({x}, {y})"),
        Event::MouseRightDrag {
            x, y, from_x, from_y, ..
        } => format!("mouse right drag ({from_x}, {from_y}) -> ({x}, {y})"),
        Event::ScrollUp { x, y, times, .. } => format!("scroll up x{times} at ({x}, {y})"),
        Event::ScrollDown { x, y, times, .. } => format!("scroll down x{times} at ({x}, {y})"),
        Event::Timeout => "timeout".into(),
        Event::ScreenClosed => "screen closed".into(),
        Event::Unknown { raw } => format!("unknown: {raw:?}"),
    }
}

/// Drive the viewer until `q` or the end of input. Returns the event count.
fn run<T: TerminalIo>(screen: &mut Screen<T>, timeout: Option<Duration>) -> tk_term::Result<u64> {
    let mut viewer = Viewer::new();
    viewer.paint(screen);
    screen.flush()?;

    let mut events = screen.events(timeout);
    while let Some(event) = events.next() {
        if matches!(event, Event::KeyPressed { ch: 'q', .. } | Event::ScreenClosed) {
            break;
        }
        viewer.record(&event);
        viewer.paint(events.screen());
        events.screen().flush()?;
    }
    Ok(viewer.event_count)
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("termkit: {e}");
            eprintln!("usage: termkit [--timeout-ms N] [--log FILE] [--debug]");
            return ExitCode::from(2);
        }
    };

    if let Some(path) = &opts.log_file {
        if let Err(e) = init_logging(path) {
            eprintln!("termkit: cannot open log file {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    let config = ScreenConfig {
        debug: opts.debug,
        ..ScreenConfig::default()
    };
    let result = Terminal::new()
        .and_then(|terminal| Screen::open(terminal, config))
        .and_then(|mut screen| {
            let count = run(&mut screen, opts.timeout);
            let closed = screen.close();
            let count = count?;
            closed?;
            Ok(count)
        });

    match result {
        Ok(count) => {
            info!(count, "viewer finished");
            println!("termkit: {count} events");
            ExitCode::SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "viewer failed");
            eprintln!("termkit: {e}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tk_term::MemoryTerminal;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    // ── Arguments ───────────────────────────────────────────────────────

    #[test]
    fn no_args_gives_defaults() {
        assert_eq!(parse_args(args(&[])).unwrap(), Options::default());
    }

    #[test]
    fn all_flags() {
        let opts = parse_args(args(&["--timeout-ms", "250", "--log", "out.log", "--debug"])).unwrap();
        assert_eq!(
            opts,
            Options {
                timeout: Some(Duration::from_millis(250)),
                log_file: Some(PathBuf::from("out.log")),
                debug: true,
            }
        );
    }

    #[test]
    fn bad_args_are_rejected() {
        assert!(parse_args(args(&["--timeout-ms"])).is_err());
        assert!(parse_args(args(&["--timeout-ms", "soon"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
    }

    // ── Descriptions ────────────────────────────────────────────────────

    #[test]
    fn describes_events() {
        let drag = Event::MouseDrag {
            x: 4,
            y: 1,
            from_x: 2,
            from_y: 1,
            raw: String::new(),
        };
        assert_eq!(describe(&drag), "mouse drag (2, 1) -> (4, 1)");
        assert_eq!(
            describe(&Event::KeyPressed {
                ch: ' ',
                raw: " ".into()
            }),
            "key: Space"
        );
        assert_eq!(describe(&Event::Timeout), "timeout");
    }

    // ── Session ─────────────────────────────────────────────────────────

    #[test]
    fn run_logs_until_q() {
        let mut term = MemoryTerminal::new(Size { cols: 40, rows: 6 });
        term.push_input("a");
        term.push_input("\x1b[<35;3;2M");
        term.push_input("q");
        term.push_input("never read");

        let mut screen = Screen::open(term, ScreenConfig::default()).unwrap();
        let count = run(&mut screen, None).unwrap();
        assert_eq!(count, 2);

        let out = screen.io().output_str();
        assert!(out.contains("key: 'a'"), "{out:?}");
        assert!(out.contains("mouse move at (2, 1)"));
        assert_eq!(screen.mouse_position(), Position::new(2, 1));
    }

    #[test]
    fn run_stops_when_input_ends() {
        let mut term = MemoryTerminal::new(Size { cols: 40, rows: 6 });
        term.push_input("x");
        let mut screen = Screen::open(term, ScreenConfig::default()).unwrap();
        assert_eq!(run(&mut screen, None).unwrap(), 1);
    }

    #[test]
    fn tiny_screen_does_not_panic() {
        let term = MemoryTerminal::new(Size { cols: 3, rows: 1 });
        let mut screen = Screen::open(term, ScreenConfig::default()).unwrap();
        assert_eq!(run(&mut screen, None).unwrap(), 0);
    }
}
