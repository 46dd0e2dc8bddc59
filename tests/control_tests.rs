//! Integration tests for the control loop

use rs_motorctl::{
    config::Config,
    hal::sim::{MotorModel, SimPlant},
    hal::{MockClock, MockDelay, MockEncoder, MockMotor, MockStop},
    run_until_stopped, Axis, Clock, ControlMode, DriveSequence, FixedRateScheduler, Interpolation,
    Maneuver, OutputMapper, PidController, PidGains, Program, Segment, Sequencer, Throttle,
    Trajectory, WheelLayout,
};

const DT: f32 = 0.01;

fn mock_axis(name: &str, mode: ControlMode) -> Axis<MockEncoder, MockMotor> {
    Config::default()
        .axis(name, mode, MockEncoder::new(), MockMotor::new())
        .unwrap()
}

// ============================================================================
// PID
// ============================================================================

#[test]
fn output_shrinks_as_measurement_approaches_setpoint() {
    let mut pid = PidController::new(PidGains::new(0.14, 0.0, 0.0022), DT).unwrap();
    pid.setpoint = 90.0;
    pid.prime(0.0);

    let outputs: Vec<f32> = (0..=7).map(|i| pid.calculate(i as f32 * 10.0)).collect();

    assert!((outputs[0] - 12.6).abs() < 1e-4);
    for pair in outputs.windows(2) {
        assert!(
            pair[1].abs() < pair[0].abs(),
            "expected {} to be smaller than {}",
            pair[1],
            pair[0]
        );
    }
}

#[test]
fn measurement_at_setpoint_gives_zero_output() {
    let mut pid = PidController::new(PidGains::new(0.14, 0.0, 0.0022), DT).unwrap();
    pid.setpoint = 45.0;
    pid.prime(45.0);
    for _ in 0..5 {
        assert_eq!(pid.calculate(45.0), 0.0);
    }
}

#[test]
fn calculate_carries_state_between_calls() {
    let mut pid = PidController::new(PidGains::new(1.0, 2.0, 0.0), DT).unwrap();
    pid.setpoint = 10.0;
    let first = pid.calculate(0.0);
    let second = pid.calculate(0.0);
    assert_ne!(first, second);
    assert!((pid.error_sum() - 0.2).abs() < 1e-6);
}

#[test]
fn velocity_mapper_adds_scaled_acceleration() {
    let mapper = OutputMapper::new(ControlMode::Velocity, 5.4, DT).unwrap();
    let next = mapper.map(5.4, Throttle::Drive(0.0));
    assert!((next.as_f32() - 0.01).abs() < 1e-6);

    let after = mapper.map(5.4, next);
    assert!((after.as_f32() - 0.02).abs() < 1e-6);
}

// ============================================================================
// Trajectories
// ============================================================================

#[test]
fn cosine_hits_start_middle_and_end() {
    let seg = Segment::hold(10.0, 50.0, Interpolation::Cosine);
    assert!((seg.value_at(0.0) - 10.0).abs() < 1e-4);
    assert!((seg.value_at(0.5) - 30.0).abs() < 1e-4);
    assert!((seg.value_at(1.0) - 50.0).abs() < 1e-4);
}

#[test]
fn trajectory_walks_through_segment() {
    let mut traj = Trajectory::oscillate(0.0, 100.0, Interpolation::Linear, 4);
    let mut seen = Vec::new();
    for _ in 0..8 {
        seen.push(traj.setpoint());
        traj.advance();
    }
    assert_eq!(seen, vec![0.0, 25.0, 50.0, 75.0, 100.0, 75.0, 50.0, 25.0]);
}

#[test]
fn random_walk_segments_join_up() {
    let mut seg = Segment::random_walk(180.0, Interpolation::Cosine, 42).unwrap();
    assert_eq!(seg.start(), 0.0);
    for _ in 0..50 {
        let end = seg.end();
        assert!((-180.0..=180.0).contains(&end));
        seg.rotate();
        assert_eq!(seg.start(), end);
    }
}

#[test]
fn oscillate_returns_after_two_segments() {
    let mut traj = Trajectory::oscillate(0.0, 270.0, Interpolation::Cosine, 3);
    for _ in 0..6 {
        traj.advance();
    }
    assert_eq!((traj.start(), traj.end()), (0.0, 270.0));
}

// ============================================================================
// Sequencer with mocks
// ============================================================================

#[test]
fn shared_program_applies_polarity() {
    let program = Program::Shared {
        segment: Segment::oscillate(0.0, 100.0, Interpolation::Linear),
        polarity: [1.0, -1.0],
    };
    let axes = [
        mock_axis("A", ControlMode::Position),
        mock_axis("B", ControlMode::Position),
    ];
    let mut seq = Sequencer::new(axes, program, 4).unwrap();

    seq.tick().unwrap();
    let report = seq.tick().unwrap();
    assert_eq!(report.setpoints, [25.0, -25.0]);
    assert_eq!(report.throttles[0].as_f32(), -report.throttles[1].as_f32());
}

#[test]
fn drive_program_cycles_maneuvers() {
    let axes = core::array::from_fn::<_, 4, _>(|i| {
        mock_axis(["RR", "RL", "FL", "FR"][i], ControlMode::Velocity)
    });
    let sequence = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
    let mut seq = Sequencer::new(axes, Program::Drive(sequence), 2).unwrap();

    let mut by_tick = Vec::new();
    for _ in 0..16 {
        let maneuver = seq.program().maneuver();
        let report = seq.tick().unwrap();
        by_tick.push((maneuver, report.setpoints));
    }

    assert_eq!(by_tick[0], (Some(Maneuver::Forward), [1.0; 4]));
    assert_eq!(by_tick[2], (Some(Maneuver::Reverse), [-1.0; 4]));
    assert_eq!(
        by_tick[4],
        (Some(Maneuver::TurnRight), [-1.0, 1.0, 1.0, -1.0])
    );
    assert_eq!(
        by_tick[8],
        (Some(Maneuver::StrafeRight), [1.0, -1.0, 1.0, -1.0])
    );
    assert_eq!(by_tick[12], (Some(Maneuver::Stop), [0.0; 4]));
    assert_eq!(by_tick[14], (Some(Maneuver::Forward), [1.0; 4]));
    assert_eq!(seq.segments(), 8);
}

#[test]
fn stop_button_ends_run_and_coasts() {
    let axes = [mock_axis("A", ControlMode::Position)];
    let program = Program::shared(Segment::oscillate(0.0, 90.0, Interpolation::Cosine));
    let mut seq = Sequencer::new(axes, program, 100).unwrap();

    let clock = MockClock::new();
    let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
    let mut stop = MockStop::after(5);

    let summary = run_until_stopped(&mut seq, &mut sched, &mut stop, None).unwrap();

    assert!(summary.stopped);
    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.overruns, 0);
    assert_eq!(clock.now_us(), 50_000);
    assert_eq!(seq.axes()[0].motor().throttle, Throttle::Coast);
}

#[test]
fn max_ticks_ends_run_without_stop() {
    let axes = [mock_axis("A", ControlMode::Velocity)];
    let program = Program::shared(Segment::hold(1.0, 1.0, Interpolation::Step));
    let mut seq = Sequencer::new(axes, program, 10).unwrap();

    let clock = MockClock::new();
    let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 50).unwrap();

    let summary =
        run_until_stopped(&mut seq, &mut sched, &mut rs_motorctl::NeverStop, Some(25)).unwrap();

    assert!(!summary.stopped);
    assert_eq!(summary.ticks, 25);
    assert_eq!(seq.segments(), 2);
    assert_eq!(clock.now_us(), 500_000);
}

// ============================================================================
// Closed loop against the simulated plant
// ============================================================================

fn sim_axis(
    plant: &mut SimPlant,
    config: &Config,
    mode: ControlMode,
) -> Axis<rs_motorctl::hal::sim::SimEncoder, rs_motorctl::hal::sim::SimMotor> {
    let (encoder, motor) = plant.add_motor(MotorModel::default());
    config.axis("shaft", mode, encoder, motor).unwrap()
}

#[test]
fn position_loop_settles_on_target() {
    let config = Config::default();
    let mut plant = SimPlant::new();
    let axis = sim_axis(&mut plant, &config, ControlMode::Position);
    let program = Program::shared(Segment::hold(90.0, 90.0, Interpolation::Step));
    let mut seq = Sequencer::new([axis], program, 100).unwrap();

    for _ in 0..300 {
        seq.tick().unwrap();
        plant.step(DT);
    }

    let degrees = seq.axes()[0].encoder().degrees();
    assert!((degrees - 90.0).abs() < 5.0, "settled at {degrees}");
}

#[test]
fn velocity_loop_tracks_speed() {
    let config = Config::default();
    let mut plant = SimPlant::new();
    let axis = sim_axis(&mut plant, &config, ControlMode::Velocity);
    let program = Program::shared(Segment::hold(1.0, 1.0, Interpolation::Step));
    let mut seq = Sequencer::new([axis], program, 100).unwrap();

    for _ in 0..300 {
        seq.tick().unwrap();
        plant.step(DT);
    }

    let speed = plant.velocity(0).unwrap();
    assert!((speed - 1.0).abs() < 0.25, "running at {speed}");
}

#[test]
fn reversed_wiring_still_converges() {
    let config = Config::default().with_motor(
        rs_motorctl::config::MotorConfig::default().with_reversed(true, true),
    );
    let mut plant = SimPlant::new();
    let axis = sim_axis(&mut plant, &config, ControlMode::Position);
    let program = Program::shared(Segment::hold(45.0, 45.0, Interpolation::Step));
    let mut seq = Sequencer::new([axis], program, 100).unwrap();

    for _ in 0..300 {
        seq.tick().unwrap();
        plant.step(DT);
    }

    // Plant turns the other way; the reader sees it as positive
    assert!(plant.revolutions(0).unwrap() < 0.0);
    let degrees = seq.axes()[0].encoder().degrees();
    assert!((degrees - 45.0).abs() < 5.0, "settled at {degrees}");
}
