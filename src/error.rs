use std::fmt;

/// Graph-compiler contract violations (spec §6 "Node invariants expected
/// from the graph compiler", §9 open questions). These are raised at
/// construction time, never mid-drain — a running drain isolates failures
/// to the offending node instead (spec §7).
#[derive(thiserror::Error, Debug)]
pub enum KernelError {
    #[error("step has order.barrierID set but priority is not Barrier/Sampler")]
    BarrierPriorityMismatch,

    #[error("the `closure` before-command is not supported (spec §9)")]
    UnsupportedBeforeCommand,

    #[error("field derivation target is not an object (list/map)")]
    NonObjectFieldTarget,
}

/// A user-function panic inside an unsafe `compute` step, captured by
/// `tryRun` and handed to the [`DiagnosticSink`] (spec §7 item 1).
pub struct ComputeFailure {
    pub node: crate::node::NodeId,
    pub message: String,
}

impl fmt::Debug for ComputeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeFailure").field("node", &self.node).field("message", &self.message).finish()
    }
}

/// Best-effort error reporting for isolated user-function failures. The
/// default implementation logs via `log::error!`, mirroring
/// `any_props.rs`'s `tracing::error!("Error while rendering component...")`.
pub trait DiagnosticSink {
    fn report(&self, failure: ComputeFailure);
}

pub struct LogDiagnosticSink;

impl DiagnosticSink for LogDiagnosticSink {
    fn report(&self, failure: ComputeFailure) {
        log::error!("compute step on node {:?} failed: {}", failure.node, failure.message);
    }
}
