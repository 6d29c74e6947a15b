use thiserror::Error;

/// Errors raised while building, freezing or driving a [`crate::graph::Graph`].
///
/// Numerical divergence inside a step is never represented here: it
/// propagates as `f64::NAN` in the affected attribute fields (see
/// `kernels`) and is never an `Err`.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unknown node kind: {0}")]
    UnknownKind(String),

    #[error("node {node} references unknown parent/child {other}")]
    UnknownNode { node: usize, other: usize },

    #[error("coupling vector length mismatch at node {node}: expected {expected} (edge list length), found {found}")]
    CouplingLengthMismatch {
        node: usize,
        expected: usize,
        found: usize,
    },

    #[error("sufficient-statistic length mismatch at node {node}: declared dimension {expected}, found {found}")]
    SufficientStatLengthMismatch {
        node: usize,
        expected: usize,
        found: usize,
    },

    #[error("graph is not a DAG: cycle detected through node {0}")]
    CycleDetected(usize),

    #[error("missing required field `{field}` for node {node} of kind {kind:?}")]
    MissingField {
        node: usize,
        kind: crate::types::NodeKind,
        field: &'static str,
    },

    #[error("input_data shape mismatch: expected {expected} input nodes, found {found} columns")]
    InputShapeMismatch { expected: usize, found: usize },

    #[error("input_data length mismatch: values has {values_len} steps, observed mask has {observed_len} steps")]
    ObservedLengthMismatch {
        values_len: usize,
        observed_len: usize,
    },

    #[error("duplicate node index {0}")]
    DuplicateNode(usize),

    #[error("update sequence has not been compiled; call set_update_sequence() or input_data() first")]
    SequenceNotCompiled,

    #[error("invariant violated at node {node}: {message}")]
    InvariantViolation { node: usize, message: String },

    #[error("unknown input mode: {0}")]
    UnknownInputMode(String),
}

pub type FilterResult<T> = Result<T, FilterError>;
