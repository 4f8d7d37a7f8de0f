//! Clock and reset sequencing.

use crate::error::SimError;
use crate::harness::Phase;
use crate::model::HardwareModel;

/// Direction of a clock toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// 0 to 1.
    Rising,
    /// 1 to 0.
    Falling,
}

/// Sole owner of the model's clock line.
///
/// Every toggle is followed by exactly one model evaluation.
#[derive(Debug, Default)]
pub struct ClockDriver {
    toggles: u64,
    rising_edges: u64,
}

impl ClockDriver {
    /// Creates a driver with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts the model into its initial state: clock low, reset asserted,
    /// RX idle high. Evaluates once.
    pub fn power_on(&mut self, model: &mut dyn HardwareModel) {
        model.set_clk(false);
        model.set_rst_n(false);
        model.set_uart_rx(true);
        model.eval();
    }

    /// Flips the clock and evaluates the model.
    pub fn step(&mut self, model: &mut dyn HardwareModel) -> Edge {
        let level = !model.clk();
        model.set_clk(level);
        model.eval();
        self.toggles += 1;
        if level {
            self.rising_edges += 1;
            Edge::Rising
        } else {
            Edge::Falling
        }
    }

    /// Runs the fixed reset window.
    ///
    /// Toggles `reset_toggles` times with reset asserted, releases reset and
    /// evaluates, then toggles `warmup_toggles` more times. `after_step` runs
    /// after every toggle with the phase the toggle belongs to; an error from
    /// it aborts the sequence.
    pub fn reset_sequence<F>(
        &mut self,
        model: &mut dyn HardwareModel,
        reset_toggles: u64,
        warmup_toggles: u64,
        mut after_step: F,
    ) -> Result<(), SimError>
    where
        F: FnMut(Phase, &mut dyn HardwareModel) -> Result<(), SimError>,
    {
        model.set_rst_n(false);
        for _ in 0..reset_toggles {
            self.step(model);
            after_step(Phase::Resetting, model)?;
        }

        model.set_rst_n(true);
        model.eval();
        log::debug!("reset released after {reset_toggles} toggles");

        for _ in 0..warmup_toggles {
            self.step(model);
            after_step(Phase::WarmingUp, model)?;
        }
        Ok(())
    }

    /// Toggles performed so far.
    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    /// Rising edges performed so far.
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every evaluation as (clk, rst_n).
    #[derive(Default)]
    struct Recorder {
        clk: bool,
        rst_n: bool,
        rx: bool,
        evals: Vec<(bool, bool)>,
    }

    impl HardwareModel for Recorder {
        fn set_clk(&mut self, level: bool) {
            self.clk = level;
        }
        fn clk(&self) -> bool {
            self.clk
        }
        fn set_rst_n(&mut self, level: bool) {
            self.rst_n = level;
        }
        fn rst_n(&self) -> bool {
            self.rst_n
        }
        fn set_uart_rx(&mut self, level: bool) {
            self.rx = level;
        }
        fn uart_rx(&self) -> bool {
            self.rx
        }
        fn eval(&mut self) {
            self.evals.push((self.clk, self.rst_n));
        }
        fn finished(&self) -> bool {
            false
        }
        fn dump_enabled(&self) -> bool {
            true
        }
    }

    #[test]
    fn power_on_state() {
        let mut m = Recorder::default();
        ClockDriver::new().power_on(&mut m);
        assert_eq!(m.evals, vec![(false, false)]);
        assert!(m.rx);
    }

    #[test]
    fn step_alternates_edges() {
        let mut m = Recorder::default();
        let mut clk = ClockDriver::new();
        assert_eq!(clk.step(&mut m), Edge::Rising);
        assert_eq!(clk.step(&mut m), Edge::Falling);
        assert_eq!(clk.step(&mut m), Edge::Rising);
        assert_eq!(clk.toggles(), 3);
        assert_eq!(clk.rising_edges(), 2);
        assert_eq!(m.evals.len(), 3);
    }

    #[test]
    fn reset_sequence_phases() {
        let mut m = Recorder::default();
        let mut clk = ClockDriver::new();
        let mut phases = Vec::new();
        clk.reset_sequence(&mut m, 4, 6, |phase, model| {
            phases.push((phase, model.rst_n()));
            Ok(())
        })
        .unwrap();

        assert_eq!(phases.len(), 10);
        assert!(phases[..4].iter().all(|p| *p == (Phase::Resetting, false)));
        assert!(phases[4..].iter().all(|p| *p == (Phase::WarmingUp, true)));
        // 4 toggles, one release eval, 6 toggles.
        assert_eq!(m.evals.len(), 11);
        assert_eq!(clk.toggles(), 10);
        assert!(m.rst_n);
    }

    #[test]
    fn reset_sequence_stops_on_error() {
        let mut m = Recorder::default();
        let mut clk = ClockDriver::new();
        let mut calls = 0;
        let err = clk
            .reset_sequence(&mut m, 5, 5, |_, _| {
                calls += 1;
                if calls == 2 {
                    Err(SimError::Unsupported {
                        reason: "stop".into(),
                    })
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, SimError::Unsupported { .. }));
        assert_eq!(clk.toggles(), 2);
        assert!(!m.rst_n);
    }
}
