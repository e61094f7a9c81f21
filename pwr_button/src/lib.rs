//! # pwr_button Library
//!
//! Emulates a finger on a computer's power button header: an output line is
//! held high for a short press (power on) or a long press (forced power off),
//! then returned low.
//!
//! # Module Structure
//!
//! - [`controller`] - `LineController`, pulse control over one line
//! - [`board`] - `PowerBoard`, one controller per configured host
//! - [`dispatcher`] - Text commands to presses, JSON replies
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Line driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     pwr_button (single crate)                 │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐   │
//! │  │ Dispatcher  │───►│  PowerBoard  │◄───│ Driver Registry │   │
//! │  │ (commands)  │    │ (hosts)      │    │                 │   │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────┘   │
//! │                            │ one per host                     │
//! │                            ▼                                  │
//! │                   ┌────────────────┐                          │
//! │                   │ LineController │ guard + lifecycle        │
//! │                   └───────┬────────┘                          │
//! │                           ▼                                   │
//! │                   ┌────────────────┐                          │
//! │                   │  LineDriver    │ (shared trait object)    │
//! │                   └────────────────┘                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod board;
pub mod controller;
pub mod dispatcher;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::board::{BoardError, BoundHost, PowerBoard};
pub use crate::controller::{ControllerError, LifecycleState, LineController};
pub use crate::dispatcher::{Command, DispatchError, Dispatcher, PressAction, Reply};
pub use crate::driver_registry::DriverRegistry;
