use crate::error::{Error, Result};
use crate::world::World;

/// A physics module advanced by the scheduler.
///
/// Systems are registered once, owned by the scheduler, and stepped in
/// registration order. `step` receives one sub-interval of the tick and may
/// not fail; degenerate state is handled by documented in-system defaults.
pub trait System {
    fn name(&self) -> &str;
    fn step(&mut self, world: &mut World, dt: f64);
}

struct Entry {
    system: Box<dyn System>,
    substeps: u32,
}

/// Ordered system list with per-system substep counts.
///
/// `tick` divides the incoming `dt` by each entry's substep count and steps
/// that system to completion before the next begins. Execution order equals
/// registration order; there is no parallelism, cancellation, or skipping.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system to the end of the execution order.
    ///
    /// Errors with `InvalidParam` when `substeps` is zero.
    pub fn register(&mut self, system: Box<dyn System>, substeps: u32) -> Result<()> {
        if substeps == 0 {
            return Err(Error::InvalidParam(format!(
                "system '{}' registered with zero substeps",
                system.name()
            )));
        }
        self.entries.push(Entry { system, substeps });
        Ok(())
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drive one tick: each system in order, `substeps` equal sub-intervals.
    pub fn tick(&mut self, world: &mut World, dt: f64) {
        for entry in &mut self.entries {
            let h = dt / f64::from(entry.substeps);
            for _ in 0..entry.substeps {
                entry.system.step(world, h);
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.system.name()).collect();
        f.debug_struct("Scheduler").field("systems", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every (name, dt) step call into a shared trace.
    struct Recorder {
        name: &'static str,
        trace: Rc<RefCell<Vec<(&'static str, f64)>>>,
    }

    impl System for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn step(&mut self, _world: &mut World, dt: f64) {
            self.trace.borrow_mut().push((self.name, dt));
        }
    }

    #[test]
    fn zero_substeps_rejected() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();
        let sys = Recorder {
            name: "a",
            trace,
        };
        assert!(sched.register(Box::new(sys), 0).is_err());
        assert!(sched.is_empty());
    }

    #[test]
    fn registration_order_and_substep_split() -> crate::error::Result<()> {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut sched = Scheduler::new();
        sched.register(
            Box::new(Recorder {
                name: "a",
                trace: Rc::clone(&trace),
            }),
            2,
        )?;
        sched.register(
            Box::new(Recorder {
                name: "b",
                trace: Rc::clone(&trace),
            }),
            1,
        )?;

        let mut world = World::new();
        sched.tick(&mut world, 0.1);

        let got = trace.borrow().clone();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].0, "a");
        assert_eq!(got[1].0, "a");
        assert_eq!(got[2].0, "b");
        // Substeps are equal sub-intervals of the tick.
        assert!((got[0].1 - 0.05).abs() < 1e-15);
        assert!((got[1].1 - 0.05).abs() < 1e-15);
        assert!((got[2].1 - 0.1).abs() < 1e-15);
        Ok(())
    }
}
