//! Error types for the `citylab-world` crate.

/// Errors raised while building the city graph or updating city state.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A node id appears more than once in the city data.
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge or transit stop references a node that does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// An edge weight is negative, NaN, or infinite.
    #[error("invalid weight {weight} on edge {source_node} -> {target_node}")]
    InvalidWeight {
        /// Origin node.
        source_node: String,
        /// Destination node.
        target_node: String,
        /// The rejected weight.
        weight: f64,
    },

    /// A transit route id appears more than once.
    #[error("duplicate transit route id: {0}")]
    DuplicateRoute(String),

    /// A transit route lists a stop that is not a graph node.
    #[error("transit route {route} serves unknown stop {stop}")]
    UnknownStop {
        /// The route.
        route: String,
        /// The missing stop.
        stop: String,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in city state update")]
    ArithmeticOverflow,
}
