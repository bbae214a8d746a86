//! Interactive command console (`-i`).
//!
//! One command per line:
//!
//! | Input | Action                              |
//! |-------|-------------------------------------|
//! | `l`   | list devices                        |
//! | `o`   | open all devices                    |
//! | `c`   | close all devices                   |
//! | `<n>` | open/close the device with id `n`   |
//! | `t`   | toggle the MIDI trace table         |
//! | `h`   | help                                |
//! | `q`   | quit                                |

use std::io::BufRead;
use std::sync::Arc;

use midi_bridge_core::{Direction, EndpointInfo};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::application::{DeviceRegistry, TraceLog};

const HELP: &str = "\
Commands:
  l    list devices
  o    open all devices
  c    close all devices
  <n>  open/close device n
  t    toggle MIDI trace
  h    show this help
  q    quit";

const TABLE_RULE: &str = "----+--------+--------------+----------------------------------";

/// Error type for console input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (h for help)")]
    Unknown(String),
}

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    OpenAll,
    CloseAll,
    Toggle(usize),
    Trace,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line.
    ///
    /// ```rust
    /// use midi_bridge::infrastructure::console::ConsoleCommand;
    ///
    /// assert_eq!(ConsoleCommand::parse(" 3 "), Ok(ConsoleCommand::Toggle(3)));
    /// assert_eq!(ConsoleCommand::parse("q"), Ok(ConsoleCommand::Quit));
    /// ```
    pub fn parse(line: &str) -> Result<Self, ConsoleError> {
        let line = line.trim();
        match line {
            "" => Err(ConsoleError::Empty),
            "l" | "L" => Ok(Self::List),
            "o" | "O" => Ok(Self::OpenAll),
            "c" | "C" => Ok(Self::CloseAll),
            "t" | "T" => Ok(Self::Trace),
            "h" | "H" | "?" => Ok(Self::Help),
            "q" | "Q" => Ok(Self::Quit),
            other => other
                .parse::<usize>()
                .map(Self::Toggle)
                .map_err(|_| ConsoleError::Unknown(other.to_string())),
        }
    }
}

/// Renders the device list as a table, inputs then outputs.
pub fn render_device_table(devices: &[EndpointInfo]) -> String {
    let mut lines = vec![
        TABLE_RULE.to_string(),
        " ID |  TYPE  |    STATUS    | DEVICE NAME".to_string(),
        TABLE_RULE.to_string(),
    ];
    for direction in [Direction::Input, Direction::Output] {
        for dev in devices.iter().filter(|d| d.endpoint.direction == direction) {
            let status = if dev.open { "Active" } else { "" };
            let row = format!(
                " {:>2} | {:<6} | {:<12} | {}",
                dev.global_id, direction, status, dev.name
            );
            lines.push(row.trim_end().to_string());
        }
        lines.push(TABLE_RULE.to_string());
    }
    lines.join("\n")
}

/// Executes console commands against the registry.
pub struct Console {
    registry: Arc<DeviceRegistry>,
    trace: Arc<TraceLog>,
    shutdown: watch::Sender<bool>,
}

impl Console {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        trace: Arc<TraceLog>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            registry,
            trace,
            shutdown,
        }
    }

    /// Runs `command` and returns the text to show the user.
    pub fn execute(&self, command: ConsoleCommand) -> String {
        match command {
            ConsoleCommand::List => self.device_table(),
            ConsoleCommand::OpenAll => {
                self.registry.open_all();
                self.device_table()
            }
            ConsoleCommand::CloseAll => {
                self.registry.close_all();
                self.device_table()
            }
            ConsoleCommand::Toggle(id) => {
                self.registry.toggle(id);
                self.device_table()
            }
            ConsoleCommand::Trace => {
                let enabled = self.trace.toggle();
                let msg = format!("MIDI trace {}", if enabled { "on" } else { "off" });
                info!("{msg}");
                msg
            }
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Quit => {
                self.shutdown.send_replace(true);
                "Shutting down.".to_string()
            }
        }
    }

    fn device_table(&self) -> String {
        render_device_table(&self.registry.enumerate_all())
    }

    /// Reads commands from `lines` until `q` or until the input closes,
    /// writing responses to `output`.
    pub async fn run<W>(
        &self,
        mut lines: mpsc::Receiver<String>,
        mut output: W,
    ) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        output.write_all(format!("{}\n{HELP}\n", self.device_table()).as_bytes()).await?;
        output.flush().await?;

        while let Some(line) = lines.recv().await {
            let (response, quit) = match ConsoleCommand::parse(&line) {
                Ok(command) => (self.execute(command), command == ConsoleCommand::Quit),
                Err(ConsoleError::Empty) => continue,
                Err(e) => (e.to_string(), false),
            };
            output.write_all(format!("{response}\n").as_bytes()).await?;
            output.flush().await?;
            if quit {
                break;
            }
        }
        Ok(())
    }
}

/// Reads stdin on a dedicated thread and forwards each line.
///
/// The thread blocks in `read_line` and is not joined; it ends with the
/// process or when the receiver is dropped and the next line arrives.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

// ── Tests ─────────────────────────────────────────────────────────────────────
