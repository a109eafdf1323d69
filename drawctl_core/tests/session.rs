use drawctl_core::mocks::{NoFlow, RecordingValve, ScriptedFlow, StuckValve, ValveEvent};
use drawctl_core::{DrawCfg, DrawError, DrawRequest, DrawSession, FlowIntegrator};
use drawctl_hardware::simulated_rig;
use drawctl_traits::ManualClock;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

fn cfg() -> DrawCfg {
    DrawCfg {
        integrator: FlowIntegrator::default(),
        timeout: Duration::from_secs(180),
        poll_interval: Duration::from_millis(10),
    }
}

#[rstest]
fn calibration_worth_of_edges_draws_one_unit() {
    let clock = ManualClock::new();
    let mut valve = RecordingValve::default();
    // First poll drains stale edges, then one edge per poll
    let mut meter = ScriptedFlow::new(std::iter::once(0).chain(std::iter::repeat_n(1, 476)));
    let r = DrawSession::new(&mut valve, &mut meter, cfg(), &clock)
        .run(DrawRequest::new(1.0))
        .unwrap();
    assert_eq!(r.volume, 1.0);
    assert_eq!(r.pulses, 476);
    assert_eq!(r.duration_seconds, 4.76);
    assert!(!r.timed_out);
    assert_eq!(valve.events(), vec![ValveEvent::Open, ValveEvent::Close]);
}

#[rstest]
fn dry_line_times_out_with_partial_result() {
    let clock = ManualClock::new();
    let mut valve = RecordingValve::default();
    let mut meter = NoFlow;
    let r = DrawSession::new(&mut valve, &mut meter, cfg(), &clock)
        .run(DrawRequest::new(1.0))
        .unwrap();
    assert!(r.timed_out);
    assert_eq!(r.volume, 0.0);
    assert!(
        (180.0..=180.02).contains(&r.duration_seconds),
        "duration {}",
        r.duration_seconds
    );
    assert!(!valve.is_open());
}

#[rstest]
#[case(0.0)]
#[case(-1.5)]
#[case(f64::NAN)]
fn degenerate_target_is_noop(#[case] target: f64) {
    let clock = ManualClock::new();
    let mut valve = RecordingValve::default();
    let mut meter = NoFlow;
    let r = DrawSession::new(&mut valve, &mut meter, cfg(), &clock)
        .run(DrawRequest::new(target))
        .unwrap();
    assert_eq!((r.volume, r.duration_seconds, r.timed_out), (0.0, 0.0, false));
    assert!(valve.events().is_empty());
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[rstest]
fn simulated_rig_half_unit_at_fifty_per_second() {
    let clock = ManualClock::new();
    let (mut valve, mut meter) = simulated_rig(50.0, Arc::new(clock.clone()));
    let r = DrawSession::new(&mut valve, &mut meter, cfg(), &clock)
        .run(DrawRequest::new(0.5))
        .unwrap();
    assert_eq!(r.pulses, 238);
    assert_eq!(r.volume, 0.5);
    assert_eq!(r.duration_seconds, 4.76);
    assert!(!valve.is_open());
}

#[rstest]
fn valve_that_cannot_open_is_a_hardware_error() {
    let clock = ManualClock::new();
    let mut valve = StuckValve;
    let mut meter = NoFlow;
    let err = DrawSession::new(&mut valve, &mut meter, cfg(), &clock)
        .run(DrawRequest::new(1.0))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DrawError>(),
        Some(DrawError::Hardware(_))
    ));
    assert!(format!("{err:#}").contains("valve open"));
}
