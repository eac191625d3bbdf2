//! # Course Compiler and Control Tick Benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tour_lib::{
    course::{compile, Params},
    ctrl_loop::Controllers,
    eqpt::{BatterySource, CurrentSensor, MotorSink, PoseSource, Snapshot},
    geom::{down, left, right, up, Angle, WheelPair},
    path::{first_move, move_by, Command}
};

struct Still(Snapshot);
struct Battery;
struct Motors;
struct Currents;

impl PoseSource for Still {
    fn snapshot(&self) -> Snapshot {
        self.0
    }
}

impl BatterySource for Battery {
    fn voltage(&mut self) -> f64 {
        8.0
    }
}

impl MotorSink for Motors {
    fn set_power(&mut self, pwm: WheelPair<i32>) {
        black_box(pwm);
    }
}

impl CurrentSensor for Currents {
    fn current_magnitudes(&mut self) -> WheelPair<f64> {
        WheelPair::splat(0.1)
    }
}

fn commands() -> Vec<Command> {
    vec![
        first_move(),
        move_by(up() * 2.0),
        move_by(left() + up()),
        move_by(left()).stop(),
        move_by(down() * 2.0).reverse(),
        move_by(right() * 3.0),
        move_by(up()).last_move()
    ]
}

fn compile_benchmark(c: &mut Criterion) {
    let params = Params::default();
    let commands = commands();

    c.bench_function("compile", |b| {
        b.iter(|| compile(black_box(&commands), black_box(60.0), &params))
    });
}

fn tick_benchmark(c: &mut Criterion) {
    let course = compile(&commands(), 60.0, &Params::default());

    let mut ctrl = Controllers::new(
        course,
        util::params::parse(include_str!("../../params/follower.toml")).unwrap(),
        util::params::parse(include_str!("../../params/velocity_reg.toml")).unwrap(),
        util::params::parse(include_str!("../../params/current_reg.toml")).unwrap(),
        50
    );

    let pose = Still(Snapshot {
        heading: Angle::new(std::f64::consts::PI / 2.0),
        ..Default::default()
    });

    c.bench_function("control_tick", |b| {
        b.iter(|| {
            ctrl.tick(
                &pose,
                &mut Battery,
                &mut Motors,
                &mut Currents,
                black_box(0.1),
                black_box(0.0005)
            )
        })
    });
}

criterion_group!(benches, compile_benchmark, tick_benchmark);
criterion_main!(benches);
