//! Behaviour registry for scripting replies to specific queries.
//!
//! The registry is an ordered list of [`Behaviour`]s. Lookup scans it in
//! insertion order and the first behaviour whose template operation equals
//! the incoming query's operation wins. Consuming behaviours are removed in
//! the same critical section as the match, so two sessions racing on the
//! same query can never both use a once-only behaviour.
//!
//! # Example
//!
//! ```
//! use netconf_emu::behaviour::{Behaviour, BehaviourRegistry};
//! use netconf_emu::rpc::{Operation, Query, Reply};
//!
//! let registry = BehaviourRegistry::new();
//! let template = Query::new("0", Operation::Commit);
//! registry.register(Behaviour::consuming(template.clone(), Reply::ok_for(&template)));
//!
//! let reply = registry.match_query(&Query::new("42", Operation::Commit)).unwrap();
//! assert_eq!(reply.message_id, "42");
//! assert!(registry.match_query(&Query::new("43", Operation::Commit)).is_none());
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::rpc::{Operation, Query, Reply};

/// A scripted (query pattern -> canned reply) rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behaviour {
    /// Match template; only `operation` is compared.
    query: Query,
    /// Reply template; `message_id` is replaced at match time.
    reply: Reply,
    /// Remove the behaviour after its first match.
    consume: bool,
}

impl Behaviour {
    /// Create a behaviour that stays registered after matching.
    pub fn new(query: Query, reply: Reply) -> Self {
        Self {
            query,
            reply,
            consume: false,
        }
    }

    /// Create a behaviour that is removed after its first match.
    pub fn consuming(query: Query, reply: Reply) -> Self {
        Self {
            query,
            reply,
            consume: true,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    pub fn operation(&self) -> &Operation {
        &self.query.operation
    }

    pub fn is_consuming(&self) -> bool {
        self.consume
    }

    fn matches(&self, query: &Query) -> bool {
        self.query.operation == query.operation
    }

    /// Copy of the reply template correlated to `query`.
    fn reply_for(&self, query: &Query) -> Reply {
        Reply {
            message_id: query.message_id.clone(),
            ..self.reply.clone()
        }
    }
}

/// Ordered, internally synchronized behaviour table.
#[derive(Debug, Default)]
pub struct BehaviourRegistry {
    behaviours: Mutex<Vec<Behaviour>>,
}

impl BehaviourRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a behaviour. Earlier registrations take precedence.
    pub fn register(&self, behaviour: Behaviour) {
        tracing::debug!(
            "Registering behaviour for <{}> (consume: {})",
            behaviour.operation(),
            behaviour.consume
        );
        self.lock().push(behaviour);
    }

    /// Snapshot of the registered behaviours in insertion order.
    pub fn list(&self) -> Vec<Behaviour> {
        self.lock().clone()
    }

    /// Find the reply for `query`.
    ///
    /// Returns the first matching behaviour's reply with `message_id` set to
    /// the query's. A consuming behaviour is removed before this returns.
    pub fn match_query(&self, query: &Query) -> Option<Reply> {
        let mut behaviours = self.lock();
        let index = behaviours.iter().position(|b| b.matches(query))?;

        let reply = behaviours[index].reply_for(query);
        if behaviours[index].consume {
            behaviours.remove(index);
            tracing::debug!("Behaviour for <{}> consumed", query.operation);
        }
        Some(reply)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every behaviour.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Behaviour>> {
        self.behaviours.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{ErrorSeverity, ErrorTag, ErrorType, RpcError};

    fn template(operation: Operation) -> Query {
        Query::new("0", operation)
    }

    fn failed() -> Reply {
        Reply::new("0").with_error(RpcError::new(
            ErrorType::Application,
            ErrorTag::OperationFailed,
            ErrorSeverity::Error,
        ))
    }

    #[test]
    fn test_match_overwrites_message_id() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::new(template(Operation::GetRouteInfo), failed()));

        let reply = registry
            .match_query(&Query::new("77", Operation::GetRouteInfo))
            .unwrap();

        assert_eq!(reply.message_id, "77");
        assert_eq!(reply.errors, failed().errors);
        // The stored template is untouched.
        assert_eq!(registry.list()[0].reply().message_id, "0");
    }

    #[test]
    fn test_first_registered_wins() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::new(template(Operation::Get), failed()));
        registry.register(Behaviour::new(
            template(Operation::Get),
            Reply::ok_for(&template(Operation::Get)),
        ));

        for id in 0..5 {
            let reply = registry.match_query(&Query::new(id.to_string(), Operation::Get)).unwrap();
            assert_eq!(reply.errors.len(), 1);
            assert!(!reply.ok);
        }
    }

    #[test]
    fn test_consuming_behaviour_matches_once() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::consuming(template(Operation::DiscardChanges), failed()));

        assert!(registry.match_query(&Query::new("1", Operation::DiscardChanges)).is_some());
        assert!(registry.match_query(&Query::new("2", Operation::DiscardChanges)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_consumed_behaviour_uncovers_next_one() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::consuming(template(Operation::GetRouteInfo), failed()));
        registry.register(Behaviour::consuming(
            template(Operation::DiscardChanges),
            Reply::ok_for(&template(Operation::DiscardChanges)),
        ));
        registry.register(Behaviour::consuming(
            template(Operation::GetRouteInfo),
            Reply::ok_for(&template(Operation::GetRouteInfo)),
        ));

        let first = registry.match_query(&Query::new("1", Operation::GetRouteInfo)).unwrap();
        assert_eq!(first.errors.len(), 1);

        let second = registry.match_query(&Query::new("2", Operation::DiscardChanges)).unwrap();
        assert!(second.ok);

        let third = registry.match_query(&Query::new("3", Operation::GetRouteInfo)).unwrap();
        assert!(third.ok);
        assert!(third.errors.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_no_match_for_other_operations() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::new(template(Operation::Lock), failed()));

        assert!(registry.match_query(&Query::new("1", Operation::Unlock)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_params_are_irrelevant_to_matching() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::new(
            template(Operation::GetConfig).with_params("<source><running/></source>"),
            failed(),
        ));

        let query = Query::new("5", Operation::GetConfig).with_params("<source><candidate/></source>");
        assert!(registry.match_query(&query).is_some());
    }

    #[test]
    fn test_clear() {
        let registry = BehaviourRegistry::new();
        registry.register(Behaviour::new(template(Operation::Get), failed()));
        registry.clear();
        assert!(registry.list().is_empty());
    }
}
