//! Request dispatcher.
//!
//! Turns text commands into controller calls and JSON replies. Transport
//! agnostic: the binary feeds it stdin lines, tests call it directly.
//!
//! # Commands
//!
//! | Command          | Effect                                  |
//! |------------------|-----------------------------------------|
//! | `on` / `off`     | Press on the default (first) host       |
//! | `<host> on/off`  | Press on the named host                 |
//! | `health`         | Liveness reply                          |
//! | `hosts`          | List hosts with timings and state       |

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::board::PowerBoard;
use crate::controller::{ControllerError, LifecycleState};

/// Which press to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PressAction {
    /// Short press.
    PowerOn,
    /// Long press.
    PowerOff,
}

impl fmt::Display for PressAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerOn => write!(f, "power_on"),
            Self::PowerOff => write!(f, "power_off"),
        }
    }
}

impl FromStr for PressAction {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "power_on" => Ok(Self::PowerOn),
            "off" | "power_off" => Ok(Self::PowerOff),
            _ => Err(DispatchError::InvalidCommand(format!(
                "unknown action '{s}' (expected 'on' or 'off')"
            ))),
        }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Press the button of `host`, or of the default host.
    Press {
        /// Target host; `None` means the default host.
        host: Option<String>,
        /// Press kind.
        action: PressAction,
    },
    /// Liveness check.
    Health,
    /// List configured hosts.
    Hosts,
}

impl FromStr for Command {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        match words.as_slice() {
            [word] if word.eq_ignore_ascii_case("health") => Ok(Self::Health),
            [word] if word.eq_ignore_ascii_case("hosts") => Ok(Self::Hosts),
            [action] => Ok(Self::Press {
                host: None,
                action: action.parse()?,
            }),
            [host, action] => Ok(Self::Press {
                host: Some((*host).to_string()),
                action: action.parse()?,
            }),
            [] => Err(DispatchError::InvalidCommand("empty command".to_string())),
            _ => Err(DispatchError::InvalidCommand(format!(
                "too many words in '{}'",
                s.trim()
            ))),
        }
    }
}

/// Reply to a press.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressReply {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Press performed.
    pub action: PressAction,
    /// Host pressed.
    pub host: String,
    /// Line pulsed.
    pub line: u32,
    /// Pulse length applied, seconds.
    pub pulse_seconds: f64,
}

/// Reply to `health`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReply {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// One entry of a `hosts` reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSummary {
    /// Host name.
    pub name: String,
    /// Line number.
    pub line: u32,
    /// Short press, seconds.
    pub short_press_seconds: f64,
    /// Long press, seconds.
    pub long_press_seconds: f64,
    /// Controller lifecycle state.
    pub state: LifecycleState,
}

/// Reply to `hosts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostsReply {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Hosts in config order.
    pub hosts: Vec<HostSummary>,
}

/// Any successful reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// See [`PressReply`].
    Press(PressReply),
    /// See [`HealthReply`].
    Health(HealthReply),
    /// See [`HostsReply`].
    Hosts(HostsReply),
}

#[derive(Serialize)]
struct ErrorReply {
    status: &'static str,
    error: String,
}

/// Dispatch failures.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Command text could not be parsed.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// No host with that name.
    #[error("Unknown host: {0}")]
    UnknownHost(String),

    /// The press itself failed.
    #[error("Host '{host}': {source}")]
    Press {
        /// Host name.
        host: String,
        /// Controller failure.
        #[source]
        source: ControllerError,
    },
}

/// Routes commands to the board's controllers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    board: Arc<PowerBoard>,
}

impl Dispatcher {
    /// Create a dispatcher over `board`.
    pub fn new(board: Arc<PowerBoard>) -> Self {
        Self { board }
    }

    /// Execute `command`. Presses block for the pulse duration.
    pub fn dispatch(&self, command: &Command) -> Result<Reply, DispatchError> {
        match command {
            Command::Health => Ok(Reply::Health(HealthReply { status: "ok" })),
            Command::Hosts => Ok(Reply::Hosts(self.hosts_reply())),
            Command::Press { host, action } => self.press(host.as_deref(), *action),
        }
    }

    fn press(&self, host: Option<&str>, action: PressAction) -> Result<Reply, DispatchError> {
        let bound = match host {
            Some(name) => self
                .board
                .hosts()
                .iter()
                .find(|h| h.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| DispatchError::UnknownHost(name.to_string()))?,
            None => self
                .board
                .default_host()
                .ok_or_else(|| DispatchError::UnknownHost("<default>".to_string()))?,
        };
        let controller = bound.controller();

        let (result, pulse) = match action {
            PressAction::PowerOn => (controller.power_on(), controller.short_press()),
            PressAction::PowerOff => (controller.power_off(), controller.long_press()),
        };
        result.map_err(|source| DispatchError::Press {
            host: bound.name().to_string(),
            source,
        })?;

        debug!("{} on host '{}' done", action, bound.name());
        Ok(Reply::Press(PressReply {
            status: "ok",
            action,
            host: bound.name().to_string(),
            line: controller.line_id().offset(),
            pulse_seconds: pulse.as_secs_f64(),
        }))
    }

    fn hosts_reply(&self) -> HostsReply {
        let hosts = self
            .board
            .hosts()
            .iter()
            .map(|h| {
                let c = h.controller();
                HostSummary {
                    name: h.name().to_string(),
                    line: c.line_id().offset(),
                    short_press_seconds: c.short_press().as_secs_f64(),
                    long_press_seconds: c.long_press().as_secs_f64(),
                    state: c.state(),
                }
            })
            .collect();
        HostsReply {
            status: "ok",
            hosts,
        }
    }

    /// Parse, dispatch and render one request line as JSON.
    ///
    /// Failures are rendered as `{"status":"error","error":"..."}`.
    pub fn handle_line(&self, line: &str) -> String {
        let outcome = line.parse::<Command>().and_then(|cmd| self.dispatch(&cmd));
        match outcome {
            Ok(reply) => render(&reply),
            Err(e) => {
                warn!("Request '{}' failed: {}", line.trim(), e);
                render(&ErrorReply {
                    status: "error",
                    error: e.to_string(),
                })
            }
        }
    }
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"status":"error","error":"failed to encode reply: {e}"}}"#)
    })
}
