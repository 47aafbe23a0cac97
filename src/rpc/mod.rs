//! RPC element model - messages, vocabularies and XML serialization.
//!
//! - [`RpcElement`] - tagged union over [`Hello`], [`Query`] and [`Reply`]
//! - [`RpcError`] - one `<rpc-error>` block of a reply
//! - [`Capability`], [`Operation`], [`ErrorType`], [`ErrorTag`],
//!   [`ErrorSeverity`] - closed vocabularies with wire-string lookup
//!
//! # Example
//!
//! ```
//! use netconf_emu::rpc::{Operation, Query, Reply};
//!
//! let query = Query::new("7", Operation::Get);
//! let reply = Reply::ok_for(&query);
//! assert!(reply.to_xml().contains(r#"message-id="7""#));
//! ```

mod element;
mod vocabulary;
mod xml;

pub use element::{
    Hello, Payload, Query, Reply, RpcElement, RpcError, CONFIGURATION_BLOCK, MESSAGE_ID_ATTR,
    RESERVED_REPLY_CHILDREN,
};
pub use vocabulary::{Capability, ErrorSeverity, ErrorTag, ErrorType, Operation};
pub use xml::NETCONF_NS;
