//! A hierarchical predictive filter: a real-time belief-propagation engine
//! over a DAG of latent Gaussian, binary and exponential-family nodes,
//! following the generalised Hierarchical Gaussian Filter formalism.
//!
//! The engine is deterministic and single-threaded per step: a step is a
//! pure function `(attributes, inputs) -> (attributes', snapshot)` over a
//! flat [`store::AttributeStore`], driven by a pre-compiled
//! [`compiler::CompiledSequence`] so no topology work happens on the hot
//! path. Numerical pathologies propagate as `NaN` in the affected fields
//! rather than as an `Err` — only structural problems (unknown nodes, cycles,
//! shape mismatches, missing required observations) are represented by
//! [`errors::FilterError`].
//!
//! ```text
//! Graph (builder) --freeze()--> FrozenGraph --driver::step()--> FrozenGraph'
//! ```

pub mod compiler;
pub mod driver;
pub mod errors;
pub mod graph;
pub mod kernels;
pub mod learner;
pub mod math;
pub mod recorder;
pub mod rng;
pub mod store;
pub mod types;

pub use driver::{step, StepInputs};
#[cfg(feature = "rayon")]
pub use driver::step_batch;
pub use errors::{FilterError, FilterResult};
pub use graph::{Graph, InitialAttrs, FrozenGraph, ValueLink, VolatilityLink};
pub use learner::{update_value_coupling, LearningRate};
pub use recorder::{Recorder, Trajectories};
pub use store::AttributeStore;
pub use types::{CouplingFn, InputMode, NodeId, NodeKind, UpdateVariant};
