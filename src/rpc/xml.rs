//! Canonical XML serialization of RPC elements.
//!
//! Output is a single-line document: XML declaration, root element in the
//! NETCONF base namespace, then children in a fixed order. Text values and
//! the message-id attribute are escaped. Raw blocks (operation parameters,
//! payload content, `error-info`) are written verbatim since they already
//! hold XML.

use std::fmt::Write as _;

use quick_xml::escape::escape;

use super::element::{Hello, Query, Reply, RpcElement, RpcError, MESSAGE_ID_ATTR};

/// NETCONF base namespace.
pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

impl RpcElement {
    /// Serialize to a complete XML document (without frame delimiter).
    pub fn to_xml(&self) -> String {
        match self {
            RpcElement::Hello(hello) => hello.to_xml(),
            RpcElement::Query(query) => query.to_xml(),
            RpcElement::Reply(reply) => reply.to_xml(),
        }
    }
}

impl Hello {
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(XML_DECL);
        let _ = write!(out, r#"<hello xmlns="{NETCONF_NS}">"#);
        out.push_str("<capabilities>");
        for capability in &self.capabilities {
            text_element(&mut out, "capability", capability.as_str());
        }
        out.push_str("</capabilities>");
        if let Some(session_id) = &self.session_id {
            text_element(&mut out, "session-id", session_id);
        }
        out.push_str("</hello>");
        out
    }
}

impl Query {
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(128);
        out.push_str(XML_DECL);
        open_with_message_id(&mut out, "rpc", &self.message_id);

        let op = self.operation.as_str();
        match &self.params {
            Some(params) if !params.is_empty() => {
                let _ = write!(out, "<{op}>{params}</{op}>");
            }
            _ => {
                let _ = write!(out, "<{op}/>");
            }
        }

        out.push_str("</rpc>");
        out
    }
}

impl Reply {
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(XML_DECL);
        open_with_message_id(&mut out, "rpc-reply", &self.message_id);

        if let Some(payload) = &self.payload {
            raw_element(&mut out, &payload.name, &payload.content);
        }
        if self.ok {
            out.push_str("<ok/>");
        }
        for error in &self.errors {
            write_error(&mut out, error);
        }

        out.push_str("</rpc-reply>");
        out
    }
}

fn write_error(out: &mut String, error: &RpcError) {
    out.push_str("<rpc-error>");
    text_element(out, "error-type", error.error_type.as_str());
    text_element(out, "error-tag", error.tag.as_str());
    text_element(out, "error-severity", error.severity.as_str());
    if let Some(app_tag) = &error.app_tag {
        text_element(out, "error-app-tag", app_tag);
    }
    if let Some(path) = &error.path {
        text_element(out, "error-path", path);
    }
    if let Some(message) = &error.message {
        text_element(out, "error-message", message);
    }
    if let Some(info) = &error.info {
        raw_element(out, "error-info", info);
    }
    out.push_str("</rpc-error>");
}

fn open_with_message_id(out: &mut String, name: &str, message_id: &str) {
    let _ = write!(
        out,
        r#"<{name} {MESSAGE_ID_ATTR}="{}" xmlns="{NETCONF_NS}">"#,
        escape(message_id)
    );
}

fn text_element(out: &mut String, name: &str, text: &str) {
    let _ = write!(out, "<{name}>{}</{name}>", escape(text));
}

fn raw_element(out: &mut String, name: &str, raw: &str) {
    let _ = write!(out, "<{name}>{raw}</{name}>");
}
