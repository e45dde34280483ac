pub mod abi;
pub mod addresses;
pub mod backend;
pub mod context;
pub mod errors;
pub mod precompiles;
pub mod registry;

pub use abi::{BuildBlockArgs, SolBid};
pub use backend::{BuiltBlock, ExecutionBackend, HttpRelaySubmitter, RelaySubmitter};
pub use context::ConfidentialContext;
pub use errors::KettleVmError;
pub use registry::{Precompile, PrecompileOutcome, PrecompileRegistry};
