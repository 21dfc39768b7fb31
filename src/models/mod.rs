pub mod context;
pub mod contract;

pub use context::RequestContext;
pub use contract::{
    Category, ContractId, ContractPatch, ContractRecord, DecoratedContract, NewContract,
    PrincipalId, Urgency,
};
