//! PowerBoard and Dispatcher integration tests.

use pwr_button::drivers::simulation::{LineOp, SimulationDriver};
use pwr_button::{
    BoardError, Command, DispatchError, Dispatcher, DriverRegistry, LifecycleState, PowerBoard,
    PressAction, Reply,
};
use pwr_common::config::ConfigLoader;
use pwr_common::line::config::{ButtonConfig, HostConfig};
use pwr_common::line::driver::LineDriver;
use pwr_common::line::types::{Level, LineId};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const FAST_CONFIG: &str = r#"
[shared]
log_level = "debug"

[driver]
name = "simulation"

[[hosts]]
name = "windows"
line = 17
short_press_secs = 0.01
long_press_secs = 0.05

[[hosts]]
name = "linux"
line = 27
short_press_secs = 0.02
long_press_secs = 0.06
"#;

fn fast_config() -> ButtonConfig {
    ButtonConfig::from_toml(FAST_CONFIG).expect("valid test config")
}

fn sim_board() -> (Arc<SimulationDriver>, Arc<PowerBoard>) {
    let sim = Arc::new(SimulationDriver::new());
    let board = PowerBoard::with_driver(&fast_config(), sim.clone()).expect("board");
    (sim, Arc::new(board))
}

#[test]
fn test_board_from_registry() {
    let registry = DriverRegistry::with_builtin_drivers();
    let board = PowerBoard::from_config(&fast_config(), &registry, None).unwrap();

    assert_eq!(board.driver_name(), "simulation");
    let names: Vec<_> = board.hosts().iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["windows", "linux"]);
    assert_eq!(
        board.controller("linux").map(|c| c.short_press()),
        Some(Duration::from_millis(20))
    );
}

#[test]
fn test_board_rolls_back_on_partial_init_failure() {
    let sim = Arc::new(SimulationDriver::new());
    sim.fail_configure(LineId(27));

    let result = PowerBoard::with_driver(&fast_config(), sim.clone());
    match result {
        Err(BoardError::Controller { host, .. }) => assert_eq!(host, "linux"),
        other => panic!("expected controller error, got {other:?}"),
    }

    // First host was acquired, then released again.
    assert_eq!(
        sim.ops(LineId(17)),
        vec![
            LineOp::Configure(Level::Low),
            LineOp::Write(Level::Low),
            LineOp::Release
        ]
    );
    assert!(!sim.is_requested(LineId(17)));
    assert!(sim.ops(LineId(27)).is_empty());
}

#[test]
fn test_board_shutdown_is_idempotent() {
    let (sim, board) = sim_board();

    board.shutdown().unwrap();
    board.shutdown().unwrap();
    drop(board);

    for line in [LineId(17), LineId(27)] {
        assert_eq!(sim.release_count(line), 1);
        assert_eq!(sim.level(line), Some(Level::Low));
    }
}

#[test]
fn test_board_shutdown_reports_failure_but_releases_all() {
    let (sim, board) = sim_board();
    sim.fail_next_write(LineId(17), Level::Low);

    match board.shutdown() {
        Err(BoardError::Controller { host, .. }) => assert_eq!(host, "windows"),
        other => panic!("expected controller error, got {other:?}"),
    }
    assert_eq!(sim.release_count(LineId(17)), 1);
    assert_eq!(sim.release_count(LineId(27)), 1);
    for host in board.hosts() {
        assert_eq!(host.controller().state(), LifecycleState::Released);
    }
}

#[test]
fn test_host_name_with_space_is_rejected_before_binding() {
    let mut config = fast_config();
    config.hosts.push(HostConfig::new("rack 2", 22));
    let sim = Arc::new(SimulationDriver::new());

    let err = PowerBoard::with_driver(&config, sim.clone()).unwrap_err();
    assert!(matches!(err, BoardError::Config(_)));
    assert!(err.to_string().contains("rack 2"));
    assert_eq!(sim.init_count(), 0);
    assert!(sim.ops(LineId(22)).is_empty());
}

#[test]
fn test_active_low_host() {
    let mut config = fast_config();
    config.hosts.push(HostConfig {
        active_low: true,
        ..HostConfig::new("nas", 22)
    });
    let sim = Arc::new(SimulationDriver::new());
    let _board = PowerBoard::with_driver(&config, sim.clone()).unwrap();

    assert_eq!(sim.ops(LineId(22))[0], LineOp::ActiveLow);
    assert_eq!(sim.level(LineId(22)), Some(Level::Low));
    assert_eq!(sim.pin_level(LineId(22)), Some(Level::High));
}

#[test]
fn test_dispatch_routes_to_named_host() {
    let (sim, board) = sim_board();
    let dispatcher = Dispatcher::new(board);

    let reply = dispatcher
        .dispatch(&"linux off".parse::<Command>().unwrap())
        .unwrap();
    match reply {
        Reply::Press(press) => {
            assert_eq!(press.action, PressAction::PowerOff);
            assert_eq!(press.host, "linux");
            assert_eq!(press.line, 27);
            assert!((press.pulse_seconds - 0.06).abs() < 1e-6);
        }
        other => panic!("expected press reply, got {other:?}"),
    }
    assert_eq!(sim.writes(LineId(27)), vec![Level::High, Level::Low]);
    assert!(sim.writes(LineId(17)).is_empty());
}

#[test]
fn test_dispatch_defaults_to_first_host() {
    let (sim, board) = sim_board();
    let dispatcher = Dispatcher::new(board);

    let reply = dispatcher
        .dispatch(&Command::Press {
            host: None,
            action: PressAction::PowerOn,
        })
        .unwrap();
    assert!(matches!(reply, Reply::Press(ref p) if p.host == "windows"));
    assert_eq!(sim.writes(LineId(17)), vec![Level::High, Level::Low]);
}

#[test]
fn test_dispatch_unknown_host() {
    let (sim, board) = sim_board();
    let dispatcher = Dispatcher::new(board);

    let err = dispatcher
        .dispatch(&"bsd on".parse::<Command>().unwrap())
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownHost(ref h) if h == "bsd"));
    assert!(sim.writes(LineId(17)).is_empty());
    assert!(sim.writes(LineId(27)).is_empty());
}

#[test]
fn test_dispatch_after_shutdown_reports_not_initialized() {
    let (_sim, board) = sim_board();
    board.shutdown().unwrap();
    let dispatcher = Dispatcher::new(board);

    let err = dispatcher.dispatch(&"on".parse::<Command>().unwrap()).unwrap_err();
    assert!(matches!(err, DispatchError::Press { ref host, .. } if host == "windows"));
    assert!(err.to_string().contains("not initialized"));
}

#[test]
fn test_handle_line_json_shapes() {
    let (_sim, board) = sim_board();
    let dispatcher = Dispatcher::new(board);

    let press: Value = serde_json::from_str(&dispatcher.handle_line("WINDOWS on")).unwrap();
    assert_eq!(press["status"], "ok");
    assert_eq!(press["action"], "power_on");
    assert_eq!(press["host"], "windows");
    assert_eq!(press["line"], 17);
    assert!((press["pulse_seconds"].as_f64().unwrap() - 0.01).abs() < 1e-6);

    let health: Value = serde_json::from_str(&dispatcher.handle_line("health")).unwrap();
    assert_eq!(health, serde_json::json!({ "status": "ok" }));

    let hosts: Value = serde_json::from_str(&dispatcher.handle_line("hosts")).unwrap();
    assert_eq!(hosts["status"], "ok");
    assert_eq!(hosts["hosts"][1]["name"], "linux");
    assert!((hosts["hosts"][1]["long_press_seconds"].as_f64().unwrap() - 0.06).abs() < 1e-6);
    assert_eq!(hosts["hosts"][1]["state"], "ready");

    let error: Value = serde_json::from_str(&dispatcher.handle_line("reboot now please")).unwrap();
    assert_eq!(error["status"], "error");
    assert!(error["error"].as_str().unwrap().contains("Invalid command"));
}

#[test]
fn test_concurrent_dispatch_across_hosts() {
    let mut config = fast_config();
    for host in &mut config.hosts {
        host.short_press_secs = 0.2;
    }
    let sim = Arc::new(SimulationDriver::new());
    let dispatcher = Dispatcher::new(Arc::new(PowerBoard::with_driver(&config, sim).unwrap()));

    let start = Instant::now();
    let handles: Vec<_> = ["windows on", "linux on"]
        .into_iter()
        .map(|cmd| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || dispatcher.handle_line(cmd))
        })
        .collect();
    for h in handles {
        let reply: Value = serde_json::from_str(&h.join().unwrap()).unwrap();
        assert_eq!(reply["status"], "ok");
    }
    assert!(start.elapsed() < Duration::from_millis(400));
}
