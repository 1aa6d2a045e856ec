//! Chain-specific capabilities
//!
//! `ChainAdapter` is the external chain library, `ChainFamily` the behaviour
//! shared by a group of chains, and `ChainRegistry` selects both for a request.

mod adapter;
mod family;
mod registry;

pub use adapter::{
    ChainAdapter, MappedOperation, MemoInput, MemoRequest, OperationPlan, OperationType,
    TransferOrder,
};
pub use family::ChainFamily;
pub use registry::{ChainHandle, ChainRegistry};
