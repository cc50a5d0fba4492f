use minerva::error::Result;
use minerva::systems::assign_thermal_velocities;
use minerva::{
    MdConfig, MdSystem, Particle, RigidBody, RigidBodySystem, RigidBodySystemConfig, System, Vec3,
    World,
};

/// Writes the world clock into every body's x position.
struct ClockWriter;

impl System for ClockWriter {
    fn name(&self) -> &str {
        "clock_writer"
    }
    fn step(&mut self, world: &mut World, _dt: f64) {
        for rb in &mut world.rigid_bodies {
            rb.position.x = world.time;
        }
    }
}

/// Doubles every body's x position.
struct Doubler;

impl System for Doubler {
    fn name(&self) -> &str {
        "doubler"
    }
    fn step(&mut self, world: &mut World, _dt: f64) {
        for rb in &mut world.rigid_bodies {
            rb.position.x *= 2.0;
        }
    }
}

/// Registration order is execution order: the writer runs before the
/// doubler, so one tick leaves x == 2 * dt on every body.
#[test]
fn systems_run_in_registration_order() -> Result<()> {
    let mut world = World::new();
    world.rigid_bodies.push(RigidBody::default());
    world.rigid_bodies.push(RigidBody::default());

    world.scheduler.register(Box::new(ClockWriter), 1)?;
    world.scheduler.register(Box::new(Doubler), 1)?;

    let dt = 0.02;
    world.step(dt);

    for rb in &world.rigid_bodies {
        assert!(
            (rb.position.x - 2.0 * dt).abs() < 1e-15,
            "expected 2 * dt = {}, got {}",
            2.0 * dt,
            rb.position.x
        );
    }
    Ok(())
}

/// An empty world still advances its clock by exactly dt per tick.
#[test]
fn empty_world_tick_advances_time() {
    let mut world = World::new();
    for _ in 0..4 {
        world.step(0.125);
    }
    assert!((world.time - 0.5).abs() < 1e-15);
}

fn mixed_scene() -> Result<World> {
    let mut world = World::new();

    for i in 0..4 {
        let mut rb = RigidBody::at(Vec3::new(i as f64 * 1.1, 2.0 + 0.3 * i as f64, 0.0));
        rb.radius = 0.4;
        rb.velocity = Vec3::new(0.2 * i as f64 - 0.3, 0.0, 0.1);
        world.rigid_bodies.push(rb);
    }
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                world.md_particles.push(Particle::at(Vec3::new(
                    8.0 + i as f64 * 1.25,
                    j as f64 * 1.25,
                    k as f64 * 1.25,
                )));
            }
        }
    }
    assign_thermal_velocities(&mut world.md_particles, 1.0, 555);

    world.scheduler.register(
        Box::new(RigidBodySystem::new(RigidBodySystemConfig::default())?),
        2,
    )?;
    world
        .scheduler
        .register(Box::new(MdSystem::new(MdConfig::default())?), 1)?;
    Ok(world)
}

/// Single-threaded determinism: two runs of the same tick sequence over the
/// same initial state end bitwise equal.
#[test]
fn repeated_runs_are_bitwise_identical() -> Result<()> {
    let run = || -> Result<World> {
        let mut world = mixed_scene()?;
        for _ in 0..50 {
            world.step(1.0 / 120.0);
        }
        Ok(world)
    };

    let a = run()?;
    let b = run()?;

    assert_eq!(a.time.to_bits(), b.time.to_bits());
    for (x, y) in a.rigid_bodies.iter().zip(&b.rigid_bodies) {
        for (p, q) in [
            (x.position.x, y.position.x),
            (x.position.y, y.position.y),
            (x.position.z, y.position.z),
            (x.velocity.x, y.velocity.x),
            (x.velocity.y, y.velocity.y),
            (x.velocity.z, y.velocity.z),
        ] {
            assert_eq!(p.to_bits(), q.to_bits(), "rigid body state diverged");
        }
    }
    for (x, y) in a.md_particles.iter().zip(b.md_particles.iter()) {
        for (p, q) in [
            (x.position.x, y.position.x),
            (x.position.y, y.position.y),
            (x.position.z, y.position.z),
            (x.velocity.x, y.velocity.x),
            (x.velocity.y, y.velocity.y),
            (x.velocity.z, y.velocity.z),
        ] {
            assert_eq!(p.to_bits(), q.to_bits(), "particle state diverged");
        }
    }
    Ok(())
}

/// Writes from an earlier system are visible to a later one within the same
/// tick, across the later system's substeps.
#[test]
fn substep_counts_split_the_tick_evenly() -> Result<()> {
    struct DtCollector {
        seen: std::rc::Rc<std::cell::RefCell<Vec<f64>>>,
    }
    impl System for DtCollector {
        fn name(&self) -> &str {
            "dt_collector"
        }
        fn step(&mut self, _world: &mut World, dt: f64) {
            self.seen.borrow_mut().push(dt);
        }
    }

    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let mut world = World::new();
    world.scheduler.register(
        Box::new(DtCollector {
            seen: std::rc::Rc::clone(&seen),
        }),
        4,
    )?;

    world.step(0.2);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    for dt in seen.iter() {
        assert!((dt - 0.05).abs() < 1e-15, "unequal substep {dt}");
    }
    Ok(())
}
