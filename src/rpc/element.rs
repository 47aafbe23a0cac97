//! RPC element types: `<hello>`, `<rpc>` and `<rpc-reply>`.
//!
//! Elements are plain data. Serialization lives in [`super::xml`]; parsing
//! lives in [`crate::protocol::ContentParser`].

use serde::{Deserialize, Serialize};

use super::vocabulary::{Capability, ErrorSeverity, ErrorTag, ErrorType, Operation};

/// Message-id attribute name shared by `<rpc>` and `<rpc-reply>`.
pub const MESSAGE_ID_ATTR: &str = "message-id";

/// Payload block name used for `get-config` replies.
pub const CONFIGURATION_BLOCK: &str = "configuration";

/// `<rpc-reply>` children with protocol meaning; never usable as payload names.
pub const RESERVED_REPLY_CHILDREN: [&str; 2] = ["ok", "rpc-error"];

/// One unit exchanged between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RpcElement {
    /// Capability handshake.
    Hello(Hello),
    /// Request.
    Query(Query),
    /// Response.
    Reply(Reply),
}

impl RpcElement {
    /// Root element name on the wire.
    pub fn root_name(&self) -> &'static str {
        match self {
            RpcElement::Hello(_) => "hello",
            RpcElement::Query(_) => "rpc",
            RpcElement::Reply(_) => "rpc-reply",
        }
    }

    /// Message id, if this kind carries one.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            RpcElement::Hello(_) => None,
            RpcElement::Query(q) => Some(&q.message_id),
            RpcElement::Reply(r) => Some(&r.message_id),
        }
    }
}

impl From<Hello> for RpcElement {
    fn from(hello: Hello) -> Self {
        RpcElement::Hello(hello)
    }
}

impl From<Query> for RpcElement {
    fn from(query: Query) -> Self {
        RpcElement::Query(query)
    }
}

impl From<Reply> for RpcElement {
    fn from(reply: Reply) -> Self {
        RpcElement::Reply(reply)
    }
}

/// `<hello>` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Server-assigned session id. Clients send none.
    pub session_id: Option<String>,
    /// Advertised capabilities in wire order.
    pub capabilities: Vec<Capability>,
}

impl Hello {
    /// Server hello advertising only the base capability.
    pub fn server(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            capabilities: vec![Capability::Base],
        }
    }

    /// Client hello (no session id) with the given capabilities.
    pub fn client(capabilities: Vec<Capability>) -> Self {
        Self {
            session_id: None,
            capabilities,
        }
    }
}

/// `<rpc>` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub message_id: String,
    pub operation: Operation,
    /// Inner XML of the operation element, kept verbatim.
    pub params: Option<String>,
}

impl Query {
    pub fn new(message_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            message_id: message_id.into(),
            operation,
            params: None,
        }
    }

    /// Attach raw operation parameters, e.g. `<source><running/></source>`.
    ///
    /// Blank parameters are stored as `None`, matching `<op/>` on the wire.
    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        let params = params.into();
        self.params = if params.trim().is_empty() {
            None
        } else {
            Some(params)
        };
        self
    }

    pub fn close_session(message_id: impl Into<String>) -> Self {
        Self::new(message_id, Operation::CloseSession)
    }
}

/// Pass-through payload block of a reply, e.g. `<data>...</data>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Local name of the wrapping element.
    pub name: String,
    /// Inner XML, verbatim.
    pub content: String,
}

/// `<rpc-reply>` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub message_id: String,
    /// Set only by an explicit `<ok/>`.
    pub ok: bool,
    pub errors: Vec<RpcError>,
    pub payload: Option<Payload>,
}

impl Reply {
    /// Empty reply (neither ok nor errors).
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Self::default()
        }
    }

    /// Positive acknowledgement correlated to `query`.
    pub fn ok_for(query: &Query) -> Self {
        Self {
            ok: true,
            ..Self::new(query.message_id.clone())
        }
    }

    /// `get-config` answer carrying `configuration` as a payload block.
    pub fn config_for(query: &Query, configuration: impl Into<String>) -> Self {
        Self::new(query.message_id.clone()).with_payload(CONFIGURATION_BLOCK, configuration)
    }

    /// Error answer correlated to `query`.
    pub fn error_for(query: &Query, error: RpcError) -> Self {
        Self::new(query.message_id.clone()).with_error(error)
    }

    pub fn with_error(mut self, error: RpcError) -> Self {
        self.errors.push(error);
        self
    }

    /// Attach a payload block `<name>content</name>`.
    ///
    /// Names in [`RESERVED_REPLY_CHILDREN`] are rejected with a warning and
    /// the reply keeps its previous payload.
    pub fn with_payload(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        if RESERVED_REPLY_CHILDREN.contains(&name.as_str()) {
            tracing::warn!("<{}> is reserved in rpc-reply, payload not set", name);
            return self;
        }
        self.payload = Some(Payload {
            name,
            content: content.into(),
        });
        self
    }

    /// Name of the payload block, if any.
    pub fn contain_name(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.name.as_str())
    }

    /// Raw payload content, if any.
    pub fn contain(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.content.as_str())
    }

    /// True when the reply reports success: `<ok/>` or no errors.
    pub fn is_success(&self) -> bool {
        self.ok || self.errors.is_empty()
    }
}

/// One `<rpc-error>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    pub severity: ErrorSeverity,
    pub app_tag: Option<String>,
    pub path: Option<String>,
    pub message: Option<String>,
    /// `<error-info>` content as raw inner XML.
    pub info: Option<String>,
}

impl RpcError {
    pub fn new(error_type: ErrorType, tag: ErrorTag, severity: ErrorSeverity) -> Self {
        Self {
            error_type,
            tag,
            severity,
            app_tag: None,
            path: None,
            message: None,
            info: None,
        }
    }

    pub fn with_app_tag(mut self, app_tag: impl Into<String>) -> Self {
        self.app_tag = Some(app_tag.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_reply_correlates_message_id() {
        let query = Query::new("42", Operation::Lock);
        let reply = Reply::ok_for(&query);

        assert_eq!(reply.message_id, "42");
        assert!(reply.ok);
        assert!(reply.errors.is_empty());
        assert!(reply.payload.is_none());
    }

    #[test]
    fn test_config_reply_uses_configuration_block() {
        let query = Query::new("3", Operation::GetConfig);
        let reply = Reply::config_for(&query, "<system/>");

        assert_eq!(reply.contain_name(), Some("configuration"));
        assert_eq!(reply.contain(), Some("<system/>"));
        assert!(!reply.ok);
    }

    #[test]
    fn test_error_reply_is_not_success() {
        let query = Query::new("9", Operation::Commit);
        let error = RpcError::new(
            ErrorType::Application,
            ErrorTag::OperationFailed,
            ErrorSeverity::Error,
        )
        .with_message("commit failed");
        let reply = Reply::error_for(&query, error);

        assert!(!reply.is_success());
        assert_eq!(reply.errors[0].message.as_deref(), Some("commit failed"));
    }

    #[test]
    fn test_blank_params_are_none() {
        assert_eq!(Query::new("1", Operation::Get).with_params("").params, None);
        assert_eq!(Query::new("1", Operation::Get).with_params(" \n ").params, None);

        let query = Query::new("1", Operation::Get).with_params("<filter/>");
        assert_eq!(query.params.as_deref(), Some("<filter/>"));
    }

    #[test]
    fn test_reserved_payload_names_are_rejected() {
        let reply = Reply::new("4").with_payload("ok", "");
        assert!(reply.payload.is_none());
        assert!(!reply.ok);

        let reply = Reply::new("4")
            .with_payload("data", "<x/>")
            .with_payload("rpc-error", "<error-tag/>");
        assert_eq!(reply.contain_name(), Some("data"));
        assert_eq!(reply.contain(), Some("<x/>"));
    }

    #[test]
    fn test_element_accessors() {
        let hello: RpcElement = Hello::server("17").into();
        assert_eq!(hello.root_name(), "hello");
        assert_eq!(hello.message_id(), None);

        let query: RpcElement = Query::close_session("101").into();
        assert_eq!(query.root_name(), "rpc");
        assert_eq!(query.message_id(), Some("101"));
    }

    #[test]
    fn test_element_json_is_tagged_by_kind() {
        let element: RpcElement = Query::new("1", Operation::Get).into();
        let json = serde_json::to_value(&element).unwrap();

        assert_eq!(json["kind"], "query");
        assert_eq!(json["operation"], "get");
        assert_eq!(json["message_id"], "1");
    }
}
