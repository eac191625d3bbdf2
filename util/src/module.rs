//! Cyclic module interface
//!
//! The follower and the regulators are stepped once per control-loop tick.
//! Each takes an input by reference and produces its output alongside a
//! status report, which the loop archives.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A module stepped by a control loop.
pub trait State {
    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;

    /// Main module processing function.
    ///
    /// # Inputs
    /// - `input_data`: The data required for processing by the module.
    ///
    /// # Outputs
    /// - A tuple of the output data and status report. Cyclic processing
    ///   cannot fail: invalid conditions are reported in the status report
    ///   and a safe output is produced.
    fn proc(&mut self, input_data: &Self::InputData)
        -> (Self::OutputData, Self::StatusReport);

    /// Return the module to its freshly constructed state.
    fn reset(&mut self);
}
