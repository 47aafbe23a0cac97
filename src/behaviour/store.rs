//! Optional record of every received message.

use std::sync::{Mutex, PoisonError};

use crate::error::{NetconfError, Result};
use crate::rpc::RpcElement;

/// Append-only log of received elements, enabled per host.
///
/// When disabled, [`store`](Self::store) is a no-op and reading the log is
/// a usage error.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Option<Mutex<Vec<RpcElement>>>,
}

impl MessageStore {
    pub fn enabled() -> Self {
        Self {
            messages: Some(Mutex::new(Vec::new())),
        }
    }

    pub fn disabled() -> Self {
        Self { messages: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.messages.is_some()
    }

    pub fn store(&self, element: &RpcElement) {
        if let Some(messages) = &self.messages {
            tracing::trace!("Storing <{}>", element.root_name());
            messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(element.clone());
        }
    }

    /// Snapshot of stored messages in arrival order.
    ///
    /// # Errors
    ///
    /// [`NetconfError::StoreDisabled`] when the store was created disabled.
    pub fn messages(&self) -> Result<Vec<RpcElement>> {
        let messages = self.messages.as_ref().ok_or(NetconfError::StoreDisabled)?;
        Ok(messages.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Stored messages as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{Capability, Hello, Operation, Query};

    #[test]
    fn test_enabled_store_keeps_order() {
        let store = MessageStore::enabled();
        store.store(&Hello::client(vec![Capability::Base]).into());
        store.store(&Query::new("1", Operation::GetConfig).into());

        let messages = store.messages().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], RpcElement::Hello(_)));
        assert_eq!(messages[1].message_id(), Some("1"));
    }

    #[test]
    fn test_disabled_store_reports_usage_error() {
        let store = MessageStore::disabled();
        store.store(&Query::new("1", Operation::Get).into());

        assert!(!store.is_enabled());
        assert!(matches!(store.messages(), Err(NetconfError::StoreDisabled)));
        assert!(matches!(store.to_json(), Err(NetconfError::StoreDisabled)));
    }

    #[test]
    fn test_json_export() {
        let store = MessageStore::enabled();
        store.store(&Query::new("9", Operation::Lock).into());

        let json: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["kind"], "query");
        assert_eq!(json[0]["operation"], "lock");
    }
}
