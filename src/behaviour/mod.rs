//! Behaviour module - scripted replies and message recording for test hosts.
//!
//! Provides:
//! - [`BehaviourRegistry`] - ordered (query pattern -> canned reply) rules
//! - [`MessageStore`] - optional log of every received element
//!
//! # Example
//!
//! ```
//! use netconf_emu::behaviour::{Behaviour, BehaviourRegistry};
//! use netconf_emu::rpc::{ErrorSeverity, ErrorTag, ErrorType, Operation, Query, Reply, RpcError};
//!
//! let registry = BehaviourRegistry::new();
//!
//! // Every get-route-information fails
//! let error = RpcError::new(ErrorType::Application, ErrorTag::OperationFailed, ErrorSeverity::Error);
//! registry.register(Behaviour::new(
//!     Query::new("0", Operation::GetRouteInfo),
//!     Reply::new("0").with_error(error),
//! ));
//! ```

mod registry;
mod store;

pub use registry::{Behaviour, BehaviourRegistry};
pub use store::MessageStore;
