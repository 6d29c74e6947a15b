use serde::{Deserialize, Serialize};

/// Stable identity of a node in the graph. Assigned in insertion order by
/// [`crate::graph::Graph::add_nodes`] and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        NodeId(value)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a node, fixing which fields live in its [`crate::store::NodeAttributes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    ContinuousState,
    VolatileState,
    BinaryState,
    EfState { dimension: usize },
    CategoricalInput { n_categories: usize },
    ContinuousInput,
    BinaryInput,
}

impl NodeKind {
    pub fn is_input(self) -> bool {
        matches!(
            self,
            NodeKind::ContinuousInput | NodeKind::BinaryInput | NodeKind::CategoricalInput { .. }
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::ContinuousState => "continuous-state",
            NodeKind::VolatileState => "volatile-state",
            NodeKind::BinaryState => "binary-state",
            NodeKind::EfState { .. } => "ef-state",
            NodeKind::CategoricalInput { .. } => "categorical",
            NodeKind::ContinuousInput => "continuous-input",
            NodeKind::BinaryInput => "binary-input",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = crate::errors::FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continuous-state" => Ok(NodeKind::ContinuousState),
            "volatile-state" => Ok(NodeKind::VolatileState),
            "binary-state" => Ok(NodeKind::BinaryState),
            "continuous-input" => Ok(NodeKind::ContinuousInput),
            "binary-input" => Ok(NodeKind::BinaryInput),
            other => Err(crate::errors::FilterError::UnknownKind(other.to_string())),
        }
    }
}

/// Posterior-update variant for volatile/volatility-coupled nodes.
/// Baked into the compiled update sequence at freeze time (spec.md §4.4, §9)
/// rather than dispatched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UpdateVariant {
    #[default]
    Standard,
    EHgf,
    Unbounded,
}

/// How a step receives observations for its input nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InputMode {
    #[default]
    External,
    Generative,
    Deprived,
}

impl std::str::FromStr for InputMode {
    type Err = crate::errors::FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(InputMode::External),
            "generative" => Ok(InputMode::Generative),
            "deprived" => Ok(InputMode::Deprived),
            other => Err(crate::errors::FilterError::UnknownInputMode(other.to_string())),
        }
    }
}

/// Fixed inventory of value-coupling link functions `g`. `None`/`Identity`
/// means linear coupling (spec.md §3, §9: "do not accept arbitrary callables
/// at the engine boundary").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum CouplingFn {
    #[default]
    Identity,
    Exp,
    Tanh,
    Softplus,
}

impl CouplingFn {
    /// g(x)
    pub fn apply(self, x: f64) -> f64 {
        match self {
            CouplingFn::Identity => x,
            CouplingFn::Exp => x.exp(),
            CouplingFn::Tanh => x.tanh(),
            CouplingFn::Softplus => (1.0 + x.exp()).ln(),
        }
    }
}
