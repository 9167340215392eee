/// Monotonic pass/fail tally.
///
/// The only mutators are [`record_pass`](Self::record_pass) and
/// [`record_fail`](Self::record_fail); there is no reset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrialCounter {
    passed: u64,
    failed: u64,
}

impl TrialCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self) {
        self.passed = self.passed.saturating_add(1);
    }

    pub fn record_fail(&mut self) {
        self.failed = self.failed.saturating_add(1);
    }

    pub fn pass_count(&self) -> u64 {
        self.passed
    }

    pub fn fail_count(&self) -> u64 {
        self.failed
    }

    pub fn total(&self) -> u64 {
        self.passed.saturating_add(self.failed)
    }
}
