use thiserror::Error;

pub type NexusTreeResult<T> = Result<T, NexusTreeError>;

#[derive(Debug, Error)]
pub enum NexusTreeError {
    #[error("Node '{name}' already exists")]
    DuplicateNode { name: String },
    #[error("No node at path {path}")]
    MissingNode { path: String },
    #[error("Node at path {path} is not a group")]
    NotAGroup { path: String },
    #[error("Node at path {path} is not a lazy field")]
    NotALazyField { path: String },
    #[error("Value of type {found} cannot be written to field {path} of type {expected}")]
    TypeMismatch {
        path: String,
        expected: super::NexusDataType,
        found: super::NexusDataType,
    },
}
