//! Acceptance bookkeeping for the Metropolis–Hastings concentration updates.

use std::collections::VecDeque;
use std::fmt;

/// Default number of recent decisions kept for the running acceptance rate.
pub const ACCEPTANCE_WINDOW: usize = 100;

/// The two concentration blocks updated by Metropolis–Hastings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcentrationBlock {
    Exposure,
    Signature,
}

#[derive(Debug, Clone, PartialEq)]
struct BlockTracker {
    proposals: u64,
    accepted: u64,
    recent: VecDeque<bool>,
}

impl BlockTracker {
    fn new() -> Self {
        Self {
            proposals: 0,
            accepted: 0,
            recent: VecDeque::new(),
        }
    }

    fn record(&mut self, accepted: bool, window: usize) {
        self.proposals += 1;
        self.accepted += accepted as u64;
        self.recent.push_back(accepted);
        if self.recent.len() > window {
            self.recent.pop_front();
        }
    }

    fn stats(&self) -> BlockStats {
        BlockStats {
            proposals: self.proposals,
            accepted: self.accepted,
        }
    }

    fn recent_rate(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        let hits = self.recent.iter().filter(|&&a| a).count();
        Some(hits as f64 / self.recent.len() as f64)
    }
}

/// Counts proposals and acceptances per concentration block, overall and
/// over a window of recent decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceTracker {
    window: usize,
    n_steps: u64,
    exposure: BlockTracker,
    signature: BlockTracker,
}

impl AcceptanceTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            n_steps: 0,
            exposure: BlockTracker::new(),
            signature: BlockTracker::new(),
        }
    }

    /// Records one Metropolis–Hastings decision.
    pub fn record(&mut self, block: ConcentrationBlock, accepted: bool) {
        let window = self.window;
        self.block_mut(block).record(accepted, window);
    }

    /// Marks the end of one full transition.
    pub fn finish_step(&mut self) {
        self.n_steps += 1;
    }

    /// Acceptance rate over the whole run, `None` before the first proposal.
    pub fn rate(&self, block: ConcentrationBlock) -> Option<f64> {
        self.block(block).stats().rate()
    }

    /// Acceptance rate over the most recent decisions.
    pub fn recent_rate(&self, block: ConcentrationBlock) -> Option<f64> {
        self.block(block).recent_rate()
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            n_steps: self.n_steps,
            exposure: self.exposure.stats(),
            signature: self.signature.stats(),
        }
    }

    fn block(&self, block: ConcentrationBlock) -> &BlockTracker {
        match block {
            ConcentrationBlock::Exposure => &self.exposure,
            ConcentrationBlock::Signature => &self.signature,
        }
    }

    fn block_mut(&mut self, block: ConcentrationBlock) -> &mut BlockTracker {
        match block {
            ConcentrationBlock::Exposure => &mut self.exposure,
            ConcentrationBlock::Signature => &mut self.signature,
        }
    }
}

impl Default for AcceptanceTracker {
    fn default() -> Self {
        Self::new(ACCEPTANCE_WINDOW)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockStats {
    pub proposals: u64,
    pub accepted: u64,
}

impl BlockStats {
    pub fn rate(&self) -> Option<f64> {
        (self.proposals > 0).then(|| self.accepted as f64 / self.proposals as f64)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Number of transitions applied.
    pub n_steps: u64,
    pub exposure: BlockStats,
    pub signature: BlockStats,
}

impl RunStats {
    /// Acceptance rate pooled over both concentration blocks.
    pub fn overall_rate(&self) -> Option<f64> {
        BlockStats {
            proposals: self.exposure.proposals + self.signature.proposals,
            accepted: self.exposure.accepted + self.signature.accepted,
        }
        .rate()
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |rate: Option<f64>| match rate {
            Some(r) => format!("{r:.3}"),
            None => "n/a".to_string(),
        };
        write!(
            f,
            "{} steps, p(accept) exposure={} signature={}",
            self.n_steps,
            show(self.exposure.rate()),
            show(self.signature.rate())
        )
    }
}
