//! Controller scenarios replayed on the deterministic stepper.
//!
//! Each test drives one core through virtual time: trigger phases fire when
//! time is advanced past their deadline and echo edges are injected by hand.

use hcsr04_common::ranging::RangingParams;
use hcsr04_ranging::error::{LineError, RangingError};
use hcsr04_ranging::lines::TriggerLine;
use hcsr04_ranging::lines::simulation::{EchoProfile, SimMonitor, SimulatedLines};
use hcsr04_ranging::{
    ControllerState, Evidence, IrqReturn, LineConfig, Readiness, ResultCode, Stepper,
};
use proptest::prelude::*;
use std::time::Duration;

const PULSE: Duration = Duration::from_micros(10);
const TIMEOUT: Duration = Duration::from_micros(300_000);

fn params(pulse_width_us: u32, timeout_us: u32) -> RangingParams {
    RangingParams {
        trigger_line: 4,
        echo_line: 17,
        pulse_width_us,
        timeout_us,
        blocking: true,
        ..Default::default()
    }
}

fn setup() -> (Stepper, SimMonitor) {
    setup_with(params(10, 300_000))
}

fn setup_with(params: RangingParams) -> (Stepper, SimMonitor) {
    let mut lines = SimulatedLines::new(EchoProfile::silent());
    let monitor = lines.monitor();
    let stepper = Stepper::from_params(&params, &mut lines).expect("claim lines");
    (stepper, monitor)
}

/// Start a cycle and send the trigger pulse; leaves the core in `Triggered`.
fn trigger(stepper: &Stepper) {
    stepper.start().expect("start");
    stepper.advance(PULSE);
    assert_eq!(stepper.state(), ControllerState::Triggered);
}

struct FailingTrigger;

impl TriggerLine for FailingTrigger {
    fn line(&self) -> u32 {
        4
    }

    fn set_level(&mut self, _high: bool) -> Result<(), LineError> {
        Err(LineError::Gpio("line driver gone".to_string()))
    }
}

#[test]
fn test_echo_pulse_completes_cycle() {
    let (stepper, monitor) = setup();

    stepper.start().unwrap();
    assert_eq!(stepper.state(), ControllerState::TriggerLo);
    assert_eq!(stepper.readiness(), Readiness::Busy);
    assert_eq!(monitor.trigger_history(), vec![true]);

    stepper.advance(PULSE);
    assert_eq!(stepper.state(), ControllerState::Triggered);
    assert_eq!(monitor.trigger_history(), vec![true, false]);
    assert!(!monitor.trigger_level());

    let rise_at = stepper.now();
    assert_eq!(stepper.edge(), IrqReturn::Handled);
    assert_eq!(stepper.phase_deadline(), None, "timeout cancelled by the rise");

    stepper.advance(Duration::from_nanos(1160));
    assert_eq!(stepper.edge(), IrqReturn::Handled);

    assert_eq!(stepper.state(), ControllerState::Completed);
    assert_eq!(stepper.readiness(), Readiness::Ready);

    let report = stepper.read_result();
    assert_eq!(report.code, ResultCode::Success);
    assert_eq!(report.start_time, Some(rise_at));
    assert_eq!(report.delta_time, Some(Duration::from_nanos(1160)));
    assert!(report.end_time >= report.start_time);
    assert_eq!(report.delta_nanos(), 1160);
}

#[test]
fn test_no_echo_times_out_at_deadline() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);

    stepper.advance(TIMEOUT - Duration::from_micros(1));
    assert_eq!(stepper.state(), ControllerState::Triggered);
    assert_eq!(stepper.read_result().code, ResultCode::InProgress);

    stepper.advance(Duration::from_micros(1));
    assert_eq!(stepper.state(), ControllerState::TimedOut);
    assert_eq!(stepper.readiness(), Readiness::Ready);

    let report = stepper.read_result();
    assert_eq!(report.code, ResultCode::TimedOut);
    assert_eq!(report.start_time, None);
    assert_eq!(report.delta_time, None);
}

#[test]
fn test_timeout_unaffected_by_late_edges() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);
    stepper.advance(TIMEOUT);
    assert_eq!(stepper.state(), ControllerState::TimedOut);

    assert_eq!(stepper.edge(), IrqReturn::None);
    assert_eq!(stepper.edge(), IrqReturn::None);
    stepper.advance(Duration::from_millis(1));

    assert_eq!(stepper.state(), ControllerState::TimedOut);
    assert_eq!(stepper.read_result().code, ResultCode::TimedOut);
    assert!(!stepper.snapshot().evidence.contains(Evidence::ECHO_RISE));
}

#[test]
fn test_second_start_conflicts_without_mutation() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);
    stepper.edge();

    let before = stepper.snapshot();
    let err = stepper.start().unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(
        err,
        RangingError::Conflict {
            state: ControllerState::Triggered
        }
    ));

    let after = stepper.snapshot();
    assert_eq!(after.state, before.state);
    assert_eq!(after.evidence, before.evidence);
    assert_eq!(after.range, before.range);
    assert_eq!(stepper.readiness(), Readiness::Busy);
}

#[test]
fn test_start_before_trigger_phase_conflicts() {
    let (stepper, _monitor) = setup();
    stepper.start().unwrap();
    assert!(matches!(
        stepper.start(),
        Err(RangingError::Conflict {
            state: ControllerState::TriggerLo
        })
    ));
}

#[test]
fn test_unacknowledged_result_requires_reset() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);
    stepper.advance(TIMEOUT);

    assert!(matches!(
        stepper.start(),
        Err(RangingError::BadState {
            state: ControllerState::TimedOut
        })
    ));

    stepper.reset().unwrap();
    assert_eq!(stepper.state(), ControllerState::Idle);
    assert_eq!(stepper.read_result().code, ResultCode::NotStarted);

    stepper.start().unwrap();
    let record = stepper.snapshot();
    assert_eq!(record.evidence, Evidence::TRIGGER_HI);
    assert_eq!(record.range.delta_time, Duration::ZERO);
}

#[test]
fn test_reset_semantics() {
    let (stepper, _monitor) = setup();

    // Idle
    stepper.reset().unwrap();
    assert_eq!(stepper.state(), ControllerState::Idle);

    // In flight
    trigger(&stepper);
    assert!(matches!(
        stepper.reset(),
        Err(RangingError::Conflict {
            state: ControllerState::Triggered
        })
    ));
    assert_eq!(stepper.state(), ControllerState::Triggered);

    // Completed
    stepper.edge();
    stepper.advance(Duration::from_micros(580));
    stepper.edge();
    assert_eq!(stepper.state(), ControllerState::Completed);
    stepper.reset().unwrap();
    assert_eq!(stepper.state(), ControllerState::Idle);
    assert_eq!(stepper.readiness(), Readiness::Ready);
}

#[test]
fn test_duplicate_edges_captured_once() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);

    assert_eq!(stepper.edge(), IrqReturn::Handled);
    stepper.advance(Duration::from_micros(100));
    assert_eq!(stepper.edge(), IrqReturn::Handled);
    let captured = stepper.snapshot().range;

    stepper.advance(Duration::from_micros(100));
    assert_eq!(stepper.edge(), IrqReturn::None);
    assert_eq!(stepper.edge(), IrqReturn::None);

    assert_eq!(stepper.snapshot().range, captured);
    assert_eq!(captured.delta_time, Duration::from_micros(100));
}

#[test]
fn test_rise_without_fall_stays_in_progress() {
    let (stepper, _monitor) = setup();
    trigger(&stepper);

    assert_eq!(stepper.edge(), IrqReturn::Handled);
    stepper.advance(TIMEOUT * 3);

    assert_eq!(stepper.state(), ControllerState::Triggered);
    assert_eq!(stepper.phase_deadline(), None);
    assert_eq!(stepper.readiness(), Readiness::Busy);
    assert_eq!(stepper.read_result().code, ResultCode::InProgress);
    assert!(stepper.reset().unwrap_err().is_conflict());

    // A late fall still completes the cycle.
    assert_eq!(stepper.edge(), IrqReturn::Handled);
    assert_eq!(stepper.read_result().code, ResultCode::Success);
}

#[test]
fn test_foreign_and_idle_edges_not_handled() {
    let (stepper, _monitor) = setup();
    assert_eq!(stepper.edge(), IrqReturn::None);

    trigger(&stepper);
    let irq = stepper.snapshot().gpio.echo_irq;
    assert_eq!(stepper.edge_on(irq + 1), IrqReturn::None);
    assert!(stepper.snapshot().evidence.contains(Evidence::TRIGGER_LO));
    assert!(!stepper.snapshot().evidence.contains(Evidence::ECHO_RISE));
}

#[test]
fn test_edge_during_trigger_pulse_is_protocol_fault() {
    let (stepper, monitor) = setup();
    stepper.start().unwrap();
    assert_eq!(stepper.state(), ControllerState::TriggerLo);
    assert!(monitor.trigger_level());

    assert_eq!(stepper.edge(), IrqReturn::Handled);
    assert_eq!(stepper.state(), ControllerState::Invalid);
    assert_eq!(stepper.readiness(), Readiness::Ready);
    assert!(!monitor.trigger_level());
    assert_eq!(monitor.trigger_history(), vec![true, false]);
    assert_eq!(stepper.read_result().code, ResultCode::Unknown);

    // The stale pulse deadline was replaced by the release firing.
    stepper.advance(PULSE);
    assert_eq!(stepper.state(), ControllerState::Invalid);
}

#[test]
fn test_trigger_failure_is_protocol_fault() {
    let gpio = LineConfig {
        trigger_line: 4,
        echo_line: 17,
        echo_irq: 17,
        pulse_width_us: 10,
        timeout_us: 300_000,
    };
    let stepper = Stepper::new(gpio, Box::new(FailingTrigger), false);

    stepper.start().unwrap();
    assert_eq!(stepper.state(), ControllerState::Invalid);
    assert_eq!(stepper.readiness(), Readiness::Ready);
    assert_eq!(stepper.read_result().code, ResultCode::Unknown);

    stepper.reset().unwrap();
    assert_eq!(stepper.read_result().code, ResultCode::NotStarted);
}

proptest! {
    #[test]
    fn prop_echo_within_timeout_succeeds(
        pulse_width_us in 1u32..=1000,
        timeout_us in 1_000u32..=1_000_000,
        rise_permille in 0u64..1000,
        width_ns in 1u64..=25_000_000,
    ) {
        let (stepper, _monitor) = setup_with(params(pulse_width_us, timeout_us));
        stepper.start().unwrap();
        stepper.advance(Duration::from_micros(u64::from(pulse_width_us)));
        prop_assert_eq!(stepper.state(), ControllerState::Triggered);

        let rise_after = Duration::from_micros(u64::from(timeout_us) * rise_permille / 1000);
        stepper.advance(rise_after);
        prop_assert_eq!(stepper.edge(), IrqReturn::Handled);
        stepper.advance(Duration::from_nanos(width_ns));
        prop_assert_eq!(stepper.edge(), IrqReturn::Handled);

        let report = stepper.read_result();
        prop_assert_eq!(report.code, ResultCode::Success);
        prop_assert!(report.end_time >= report.start_time);
        prop_assert_eq!(report.delta_time, Some(Duration::from_nanos(width_ns)));
    }

    #[test]
    fn prop_silence_times_out_exactly(
        pulse_width_us in 1u32..=1000,
        timeout_us in 1u32..=1_000_000,
    ) {
        let (stepper, _monitor) = setup_with(params(pulse_width_us, timeout_us));
        stepper.start().unwrap();
        stepper.advance(Duration::from_micros(u64::from(pulse_width_us)));

        let timeout = Duration::from_micros(u64::from(timeout_us));
        stepper.advance(timeout - Duration::from_nanos(1));
        prop_assert_eq!(stepper.read_result().code, ResultCode::InProgress);
        stepper.advance(Duration::from_nanos(1));
        prop_assert_eq!(stepper.read_result().code, ResultCode::TimedOut);
    }
}
