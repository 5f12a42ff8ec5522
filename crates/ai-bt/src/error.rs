use ai_core::{AiError, BlackboardError, ListError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BtError {
    #[error("composite `{node}` has no children")]
    EmptyComposite { node: String },
    #[error("decorator `{node}` has no child")]
    DecoratorWithoutChild { node: String },
    #[error("tree has {count} nodes, more than the supported {max}")]
    TooManyNodes { count: usize, max: usize },
    #[error("tree definition has no root node `{root}`")]
    MissingRoot { root: String },
    #[error("node `{node}` referenced by `{parent}` is not defined")]
    UnknownNode { node: String, parent: String },
    #[error("node `{node}` uses unregistered logic `{logic}`")]
    UnknownLogic { node: String, logic: String },
    #[error("node `{node}` has two parents: `{first}` and `{second}`")]
    SharedNode {
        node: String,
        first: String,
        second: String,
    },
    #[error("node `{node}` is part of a cycle")]
    Cycle { node: String },
    #[error("node `{node}` is not reachable from the root")]
    Unreachable { node: String },
    #[error("node `{node}` has invalid parameters: {source}")]
    InvalidParams {
        node: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("node status list holds {actual} entries, tree has {expected} nodes")]
    StatusSizeMismatch { expected: usize, actual: usize },
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
    #[error(transparent)]
    Ai(#[from] AiError),
}

impl From<BtError> for AiError {
    fn from(err: BtError) -> Self {
        match err {
            BtError::List(err) => AiError::List(err),
            BtError::Blackboard(err) => AiError::Blackboard(err),
            BtError::Io(err) => AiError::Io(err),
            BtError::Yaml(err) => AiError::Yaml(err),
            BtError::Ai(err) => err,
            other => AiError::invalid_asset("behavior tree", other.to_string()),
        }
    }
}
