//! Threaded device tests on the simulation backend.
//!
//! These run the real worker threads and the simulated echo responder, so
//! timing assertions are kept loose.

use hcsr04_common::ranging::{ClockSource, RangingParams};
use hcsr04_ranging::error::{LineError, RangingError};
use hcsr04_ranging::lines::simulation::{EchoProfile, SimulatedLines};
use hcsr04_ranging::{ControllerState, DeviceSlot, Readiness, ResultCode, SystemClock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn params(timeout_us: u32, blocking: bool) -> RangingParams {
    RangingParams {
        trigger_line: 4,
        echo_line: 17,
        pulse_width_us: 10,
        timeout_us,
        blocking,
        clock: ClockSource::Monotonic,
    }
}

fn clock() -> Arc<SystemClock> {
    Arc::new(SystemClock::new(ClockSource::Monotonic))
}

/// Echo delayed well past the trigger so the controller is always in
/// `Triggered` when the rise arrives.
fn echoing_lines() -> SimulatedLines {
    SimulatedLines::new(EchoProfile::echo(
        Duration::from_millis(5),
        Duration::from_micros(1160),
    ))
}

#[test]
fn test_blocking_cycle_with_echo() {
    let mut lines = echoing_lines();
    let monitor = lines.monitor();
    let mut slot = DeviceSlot::new();
    slot.init(&params(300_000, true), &mut lines, clock()).unwrap();
    assert!(monitor.is_subscribed());

    slot.start().unwrap();
    let report = slot.read_result().unwrap();

    assert_eq!(report.code, ResultCode::Success);
    let delta = report.delta_time.expect("delta on success");
    assert!(delta > Duration::ZERO);
    assert!(delta < Duration::from_millis(300));
    assert!(report.end_time >= report.start_time);
    assert_eq!(monitor.trigger_history(), vec![true, false]);
    assert_eq!(slot.get().unwrap().readiness(), Readiness::Ready);
}

#[test]
fn test_blocking_cycle_times_out() {
    let mut lines = SimulatedLines::new(EchoProfile::silent());
    let mut slot = DeviceSlot::new();
    slot.init(&params(20_000, true), &mut lines, clock()).unwrap();

    let started = Instant::now();
    slot.start().unwrap();
    let report = slot.read_result().unwrap();

    assert_eq!(report.code, ResultCode::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(report.delta_time, None);
}

#[test]
fn test_non_blocking_reads_until_done() {
    let mut lines = SimulatedLines::new(EchoProfile::silent());
    let mut slot = DeviceSlot::new();
    slot.init(&params(200_000, false), &mut lines, clock()).unwrap();

    slot.start().unwrap();
    assert_eq!(slot.read_result().unwrap().code, ResultCode::InProgress);
    assert!(slot.start().unwrap_err().is_conflict());

    let deadline = Instant::now() + Duration::from_secs(5);
    let code = loop {
        let code = slot.read_result().unwrap().code;
        if code != ResultCode::InProgress || Instant::now() > deadline {
            break code;
        }
        thread::sleep(Duration::from_millis(5));
    };
    assert_eq!(code, ResultCode::TimedOut);
}

#[test]
fn test_repeated_cycles() {
    let mut lines = echoing_lines();
    let mut slot = DeviceSlot::new();
    slot.init(&params(300_000, true), &mut lines, clock()).unwrap();

    for _ in 0..3 {
        slot.start().unwrap();
        assert_eq!(slot.read_result().unwrap().code, ResultCode::Success);
        assert!(matches!(slot.start(), Err(RangingError::BadState { .. })));
        slot.reset().unwrap();
        assert_eq!(slot.read_result().unwrap().code, ResultCode::NotStarted);
    }
}

#[test]
fn test_init_twice_rejected() {
    let mut lines = echoing_lines();
    let mut slot = DeviceSlot::new();
    slot.init(&params(300_000, true), &mut lines, clock()).unwrap();

    let mut other = echoing_lines();
    assert!(matches!(
        slot.init(&params(300_000, true), &mut other, clock()),
        Err(RangingError::AlreadyInitialized)
    ));
    assert!(slot.is_initialized());
}

#[test]
fn test_init_unwinds_on_unavailable_echo() {
    let mut lines = echoing_lines().with_unavailable(17);
    let monitor = lines.monitor();
    let mut slot = DeviceSlot::new();

    let result = slot.init(&params(300_000, true), &mut lines, clock());
    assert!(matches!(
        result,
        Err(RangingError::Line(LineError::Unavailable { line: 17 }))
    ));
    assert!(!slot.is_initialized());
    assert!(!monitor.is_claimed(4), "trigger line returned");
    assert!(!monitor.is_subscribed());
}

#[test]
fn test_release_returns_lines() {
    let mut lines = SimulatedLines::new(EchoProfile::silent());
    let monitor = lines.monitor();
    let mut slot = DeviceSlot::new();
    slot.init(&params(5_000_000, true), &mut lines, clock()).unwrap();

    // Release with a cycle outstanding.
    slot.start().unwrap();
    assert!(slot.get().unwrap().snapshot().state.is_in_flight());
    slot.release();

    assert!(!slot.is_initialized());
    assert!(!monitor.is_claimed(4));
    assert!(!monitor.is_claimed(17));
    assert!(!monitor.is_subscribed());
    assert!(matches!(slot.start(), Err(RangingError::NotInitialized)));
    assert!(matches!(slot.reset(), Err(RangingError::NotInitialized)));
    assert!(matches!(slot.read_result(), Err(RangingError::NotInitialized)));

    // Release on an empty slot is a no-op; the lines can be claimed again.
    slot.release();
    slot.init(&params(300_000, true), &mut lines, clock()).unwrap();
    assert_eq!(
        slot.get().unwrap().snapshot().state,
        ControllerState::Idle
    );
}
