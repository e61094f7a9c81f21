//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `LineDriver` trait in memory. It
//! tracks which lines are requested, their last written level, and records
//! every call in a bounded journal so tests and `--simulate` runs can
//! inspect the exact write sequence. Failures can be injected per line.

use super::journal::{Journal, LineEvent, LineOp, DEFAULT_JOURNAL_CAPACITY};
use parking_lot::Mutex;
use pwr_common::consts::SIMULATION_DRIVER;
use pwr_common::line::config::DriverConfig;
use pwr_common::line::driver::{LineDriver, LineError};
use pwr_common::line::types::{Level, LineId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};

/// Per-line simulated state.
#[derive(Debug, Clone, Copy, Default)]
struct SimLine {
    requested: bool,
    active_low: bool,
    level: Level,
    releases: u32,
}

#[derive(Debug, Default)]
struct SimState {
    init_count: u32,
    lines: HashMap<LineId, SimLine>,
    journal: Journal,
    /// Next write of `(line, level)` fails once.
    write_failures: Vec<(LineId, Level)>,
    /// `configure_output` on these lines fails.
    configure_failures: HashSet<LineId>,
}

/// In-memory driver implementing the LineDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    state: Mutex<SimState>,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    ///
    /// The journal keeps the last [`DEFAULT_JOURNAL_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_journal_capacity(DEFAULT_JOURNAL_CAPACITY)
    }

    /// Create a driver whose journal keeps at most `capacity` events.
    ///
    /// With 0 nothing is recorded; line state is tracked either way.
    pub fn with_journal_capacity(capacity: usize) -> Self {
        Self {
            name: SIMULATION_DRIVER,
            version: env!("CARGO_PKG_VERSION"),
            state: Mutex::new(SimState {
                journal: Journal::with_capacity(capacity),
                ..SimState::default()
            }),
        }
    }

    /// Number of successful `init()` calls that did work (0 or 1).
    pub fn init_count(&self) -> u32 {
        self.state.lock().init_count
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> Vec<LineEvent> {
        self.state.lock().journal.events().copied().collect()
    }

    /// Events evicted from the full journal since the last clear.
    pub fn dropped_events(&self) -> u64 {
        self.state.lock().journal.dropped()
    }

    /// Recorded operations on one line, oldest first.
    pub fn ops(&self, line: LineId) -> Vec<LineOp> {
        self.state.lock().journal.for_line(line).map(|e| e.op).collect()
    }

    /// Recorded events on one line, oldest first.
    pub fn line_events(&self, line: LineId) -> Vec<LineEvent> {
        self.state.lock().journal.for_line(line).copied().collect()
    }

    /// Levels written to one line through `write_level()`, oldest first.
    pub fn writes(&self, line: LineId) -> Vec<Level> {
        self.state
            .lock()
            .journal
            .for_line(line)
            .filter_map(|e| match e.op {
                LineOp::Write(level) => Some(level),
                _ => None,
            })
            .collect()
    }

    /// Number of `release()` calls that reached a requested line.
    pub fn release_count(&self, line: LineId) -> u32 {
        self.state
            .lock()
            .lines
            .get(&line)
            .map_or(0, |l| l.releases)
    }

    /// Whether `line` is currently requested as output.
    pub fn is_requested(&self, line: LineId) -> bool {
        self.state
            .lock()
            .lines
            .get(&line)
            .is_some_and(|l| l.requested)
    }

    /// Physical pin level, accounting for active-low wiring.
    pub fn pin_level(&self, line: LineId) -> Option<Level> {
        let state = self.state.lock();
        let sim = state.lines.get(&line)?;
        Some(match (sim.level, sim.active_low) {
            (level, false) => level,
            (Level::Low, true) => Level::High,
            (Level::High, true) => Level::Low,
        })
    }

    /// Make the next write of `level` to `line` fail once.
    pub fn fail_next_write(&self, line: LineId, level: Level) {
        self.state.lock().write_failures.push((line, level));
    }

    /// Make every `configure_output()` on `line` fail.
    pub fn fail_configure(&self, line: LineId) {
        self.state.lock().configure_failures.insert(line);
    }

    /// Forget all recorded events. Line state is kept.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&self, config: &DriverConfig) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if state.init_count > 0 {
            debug!("Simulation driver already initialized");
            return Ok(());
        }
        state.init_count = 1;
        info!(
            "Initializing simulation driver (standing in for {})",
            config.chip.display()
        );
        Ok(())
    }

    fn configure_output(&self, line: LineId, initial: Level) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if state.init_count == 0 {
            return Err(LineError::InitFailed(
                "simulation driver not initialized".to_string(),
            ));
        }
        if state.configure_failures.contains(&line) {
            return Err(LineError::CommunicationError(format!(
                "simulated request failure on {line}"
            )));
        }

        let sim = state.lines.entry(line).or_default();
        if sim.requested {
            return Err(LineError::ConfigError(format!("{line} already requested")));
        }
        sim.requested = true;
        sim.level = initial;
        state.journal.record(line, LineOp::Configure(initial));
        debug!("Simulated {} configured as output ({})", line, initial);
        Ok(())
    }

    fn write_level(&self, line: LineId, level: Level) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if !state.lines.get(&line).is_some_and(|l| l.requested) {
            return Err(LineError::LineNotRequested(line));
        }
        if let Some(idx) = state
            .write_failures
            .iter()
            .position(|&(l, lv)| l == line && lv == level)
        {
            state.write_failures.remove(idx);
            return Err(LineError::CommunicationError(format!(
                "simulated write failure on {line} ({level})"
            )));
        }

        if let Some(sim) = state.lines.get_mut(&line) {
            sim.level = level;
        }
        state.journal.record(line, LineOp::Write(level));
        trace!("Simulated {} -> {}", line, level);
        Ok(())
    }

    fn release(&self, line: LineId) -> Result<(), LineError> {
        let mut state = self.state.lock();
        let Some(sim) = state.lines.get_mut(&line).filter(|l| l.requested) else {
            return Err(LineError::LineNotRequested(line));
        };
        sim.requested = false;
        sim.releases += 1;
        state.journal.record(line, LineOp::Release);
        debug!("Simulated {} released", line);
        Ok(())
    }

    fn level(&self, line: LineId) -> Option<Level> {
        self.state.lock().lines.get(&line).map(|l| l.level)
    }

    fn set_active_low(&self, line: LineId) -> Result<(), LineError> {
        let mut state = self.state.lock();
        let sim = state.lines.entry(line).or_default();
        if sim.requested {
            return Err(LineError::ConfigError(format!(
                "{line} polarity must be set before it is requested"
            )));
        }
        sim.active_low = true;
        state.journal.record(line, LineOp::ActiveLow);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_driver() -> SimulationDriver {
        let sim = SimulationDriver::new();
        sim.init(&DriverConfig::default()).unwrap();
        sim
    }

    #[test]
    fn init_is_idempotent() {
        let sim = SimulationDriver::new();
        sim.init(&DriverConfig::default()).unwrap();
        sim.init(&DriverConfig::default()).unwrap();
        assert_eq!(sim.init_count(), 1);
    }

    #[test]
    fn configure_requires_init() {
        let sim = SimulationDriver::new();
        assert!(matches!(
            sim.configure_output(LineId(4), Level::Low),
            Err(LineError::InitFailed(_))
        ));
    }

    #[test]
    fn write_requires_requested_line() {
        let sim = ready_driver();
        assert!(matches!(
            sim.write_level(LineId(4), Level::High),
            Err(LineError::LineNotRequested(LineId(4)))
        ));

        sim.configure_output(LineId(4), Level::Low).unwrap();
        sim.write_level(LineId(4), Level::High).unwrap();
        sim.release(LineId(4)).unwrap();
        assert!(matches!(
            sim.write_level(LineId(4), Level::Low),
            Err(LineError::LineNotRequested(_))
        ));
    }

    #[test]
    fn double_configure_rejected() {
        let sim = ready_driver();
        sim.configure_output(LineId(4), Level::Low).unwrap();
        assert!(matches!(
            sim.configure_output(LineId(4), Level::Low),
            Err(LineError::ConfigError(_))
        ));
    }

    #[test]
    fn release_unrequested_rejected() {
        let sim = ready_driver();
        assert!(sim.release(LineId(9)).is_err());
        assert_eq!(sim.release_count(LineId(9)), 0);
    }

    #[test]
    fn injected_write_failure_fires_once() {
        let sim = ready_driver();
        sim.configure_output(LineId(4), Level::Low).unwrap();
        sim.fail_next_write(LineId(4), Level::High);

        assert!(sim.write_level(LineId(4), Level::Low).is_ok());
        assert!(sim.write_level(LineId(4), Level::High).is_err());
        assert!(sim.write_level(LineId(4), Level::High).is_ok());
        assert_eq!(sim.writes(LineId(4)), vec![Level::Low, Level::High]);
    }

    #[test]
    fn active_low_inverts_pin() {
        let sim = ready_driver();
        sim.set_active_low(LineId(4)).unwrap();
        sim.configure_output(LineId(4), Level::Low).unwrap();

        assert_eq!(sim.level(LineId(4)), Some(Level::Low));
        assert_eq!(sim.pin_level(LineId(4)), Some(Level::High));
        assert!(sim.set_active_low(LineId(4)).is_err());
    }

    #[test]
    fn lines_are_independent() {
        let sim = ready_driver();
        sim.configure_output(LineId(17), Level::Low).unwrap();
        sim.configure_output(LineId(27), Level::Low).unwrap();
        sim.write_level(LineId(17), Level::High).unwrap();

        assert_eq!(sim.level(LineId(17)), Some(Level::High));
        assert_eq!(sim.level(LineId(27)), Some(Level::Low));
        assert!(sim.is_requested(LineId(27)));
        assert_eq!(sim.ops(LineId(27)), vec![LineOp::Configure(Level::Low)]);
        assert_eq!(sim.line_events(LineId(17)).len(), 2);

        sim.clear_journal();
        assert!(sim.events().is_empty());
        assert_eq!(sim.level(LineId(17)), Some(Level::High));
    }

    #[test]
    fn journal_is_bounded_but_state_is_not() {
        let sim = SimulationDriver::with_journal_capacity(4);
        sim.init(&DriverConfig::default()).unwrap();
        sim.configure_output(LineId(17), Level::Low).unwrap();
        for _ in 0..100 {
            sim.write_level(LineId(17), Level::High).unwrap();
            sim.write_level(LineId(17), Level::Low).unwrap();
        }

        assert_eq!(sim.events().len(), 4);
        assert_eq!(sim.dropped_events(), 197);
        assert_eq!(
            sim.writes(LineId(17)),
            vec![Level::High, Level::Low, Level::High, Level::Low]
        );
        assert_eq!(sim.level(LineId(17)), Some(Level::Low));
        assert!(sim.is_requested(LineId(17)));
    }

    #[test]
    fn default_journal_capacity() {
        let sim = ready_driver();
        sim.configure_output(LineId(4), Level::Low).unwrap();
        for _ in 0..DEFAULT_JOURNAL_CAPACITY {
            sim.write_level(LineId(4), Level::High).unwrap();
        }
        assert_eq!(sim.events().len(), DEFAULT_JOURNAL_CAPACITY);
        assert_eq!(sim.dropped_events(), 1);
        assert_eq!(sim.ops(LineId(4))[0], LineOp::Write(Level::High));
    }
}
