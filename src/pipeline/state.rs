//! Pipeline state machine (spec §4.9), generalized from the teacher's
//! `ResearchSession`'s `completed: Arc<RwLock<bool>>` progress-observation
//! pattern into a `watch::channel` over an enum.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Planned,
    Dispatching,
    Normalizing,
    Crawling,
    Summarizing,
    Assembling,
    Done,
}

/// Sender half held by the orchestrator; a `watch::Receiver` clone is handed
/// to callers that want to observe stage transitions (spec §4.9: "no state
/// except Done is observable externally" — intermediate states are purely
/// a progress signal, not part of the pipeline's output contract).
pub struct StateTracker {
    tx: watch::Sender<PipelineState>,
}

impl StateTracker {
    pub fn new() -> (Self, watch::Receiver<PipelineState>) {
        let (tx, rx) = watch::channel(PipelineState::Planned);
        (Self { tx }, rx)
    }

    pub fn transition(&self, state: PipelineState) {
        self.tx.send_replace(state);
    }
}
