//! Progress reporting hooks for the pipelines.

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called before each unit of work inside a stage.
    fn step(&self, label: &str, current: usize, total: usize);
    /// Called when the pipeline finishes, successfully or not.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn step(&self, _label: &str, _current: usize, _total: usize) {}
    fn finish(&self) {}
}
