//! Streaming content parser: one frame of XML text in, one RPC element out.
//!
//! `quick-xml` produces the event stream; [`ContentParser`] handles it push
//! style, keyed by local element name. Instead of a flag per known tag it
//! keeps a stack with one [`Node`] per open element:
//!
//! - root nodes (`hello`, `rpc`, `rpc-reply`) own the element under
//!   construction;
//! - text nodes buffer character data until their end tag commits it into
//!   the nearest owner;
//! - capture nodes record their inner XML verbatim (operation parameters,
//!   reply payload blocks, `error-info`), re-emitting nested tags as text.
//!
//! # Trailing content
//!
//! NETCONF 1.0 framing puts a non-XML delimiter between documents, so text
//! after the root element is a normal occurrence. Once the root element is
//! closed, anything else in the frame (markup, text, or a tokenizer error it
//! provokes) marks the end of the frame: it is logged and dropped.
//! Whitespace, comments and processing instructions are simply skipped.

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::{NetconfError, Result};
use crate::queue::MessageQueue;
use crate::rpc::{
    Capability, ErrorSeverity, ErrorTag, ErrorType, Hello, Operation, Payload, Query, Reply,
    RpcElement, RpcError, MESSAGE_ID_ATTR,
};

/// Push parser turning framed XML text into [`RpcElement`]s.
///
/// One instance is reused for every frame of a session; state is reset at
/// the start of each [`parse`](Self::parse).
#[derive(Debug, Default)]
pub struct ContentParser {
    stack: Vec<Node>,
}

/// One open element.
#[derive(Debug)]
enum Node {
    Hello(Hello),
    Rpc {
        message_id: String,
        operation: Option<(Operation, Option<String>)>,
    },
    Reply(Reply),
    Capabilities,
    Text(TextField, String),
    RpcError(ErrorDraft),
    Capture(Capture),
    /// Element outside the modeled structure.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum TextField {
    Capability,
    SessionId,
    ErrorType,
    ErrorTag,
    ErrorSeverity,
    ErrorAppTag,
    ErrorPath,
    ErrorMessage,
}

#[derive(Debug, Clone, Copy)]
enum CaptureTarget {
    Operation,
    Payload,
    ErrorInfo,
}

/// Verbatim recorder for an element's inner XML.
#[derive(Debug)]
struct Capture {
    name: String,
    target: CaptureTarget,
    content: String,
    /// Open nested elements inside the captured one.
    depth: usize,
}

impl Capture {
    fn new(name: String, target: CaptureTarget) -> Self {
        Self {
            name,
            target,
            content: String::new(),
            depth: 0,
        }
    }

    fn open_nested(&mut self, e: &BytesStart<'_>) {
        self.content.push('<');
        self.content.push_str(&String::from_utf8_lossy(e));
        self.content.push('>');
        self.depth += 1;
    }

    fn empty_nested(&mut self, e: &BytesStart<'_>) {
        self.content.push('<');
        self.content.push_str(&String::from_utf8_lossy(e));
        self.content.push_str("/>");
    }

    fn close_nested(&mut self, e: &BytesEnd<'_>) {
        self.content.push_str("</");
        self.content.push_str(&String::from_utf8_lossy(e.name().as_ref()));
        self.content.push('>');
        self.depth -= 1;
    }
}

#[derive(Debug, Default)]
struct ErrorDraft {
    error_type: Option<ErrorType>,
    tag: Option<ErrorTag>,
    severity: Option<ErrorSeverity>,
    app_tag: Option<String>,
    path: Option<String>,
    message: Option<String>,
    info: Option<String>,
}

impl ErrorDraft {
    fn build(self) -> Result<RpcError> {
        let missing = |field: &str| NetconfError::framing(format!("<rpc-error> without <{field}>"));
        Ok(RpcError {
            error_type: self.error_type.ok_or_else(|| missing("error-type"))?,
            tag: self.tag.ok_or_else(|| missing("error-tag"))?,
            severity: self.severity.ok_or_else(|| missing("error-severity"))?,
            app_tag: self.app_tag,
            path: self.path,
            message: self.message,
            info: self.info,
        })
    }
}

impl ContentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one frame and enqueue the resulting element.
    ///
    /// A whitespace-only frame enqueues nothing.
    pub fn feed(&mut self, text: &str, queue: &MessageQueue) -> Result<()> {
        if let Some(element) = self.parse(text)? {
            queue.enqueue(element);
        }
        Ok(())
    }

    /// Parse one frame.
    ///
    /// Returns `Ok(None)` for a frame holding only whitespace.
    ///
    /// # Errors
    ///
    /// - [`NetconfError::Framing`] for an unknown root element, a missing
    ///   `message-id`, an `<rpc>` without operation, an incomplete
    ///   `<rpc-error>` or a frame that ends inside the root element;
    /// - [`NetconfError::Xml`] when the tokenizer fails before the root
    ///   element is closed.
    pub fn parse(&mut self, text: &str) -> Result<Option<RpcElement>> {
        self.stack.clear();
        let mut reader = Reader::from_str(text);

        loop {
            let event = reader.read_event()?;
            let completed = match event {
                Event::Start(e) => {
                    self.open(&e)?;
                    None
                }
                Event::Empty(e) => self.empty(&e)?,
                Event::End(e) => self.close(&e)?,
                Event::Text(t) => {
                    self.text(&t)?;
                    None
                }
                Event::CData(c) => {
                    self.raw_markup("<![CDATA[", &c, "]]>", &c);
                    None
                }
                Event::Comment(c) => {
                    self.raw_markup("<!--", &c, "-->", b"");
                    None
                }
                Event::Eof => {
                    if self.stack.is_empty() {
                        return Ok(None);
                    }
                    return Err(NetconfError::framing(
                        "Message ended before its root element was closed",
                    ));
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => None,
            };

            if let Some(element) = completed {
                Self::skip_trailing(&mut reader);
                self.stack.clear();
                return Ok(Some(element));
            }
        }
    }

    /// Consume whatever follows the closed root element.
    fn skip_trailing(reader: &mut Reader<&[u8]>) {
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => return,
                Ok(Event::Text(t)) if is_blank(&t) => continue,
                Ok(Event::Comment(_) | Event::PI(_)) => continue,
                Ok(other) => {
                    tracing::debug!("Discarding trailing content after root element: {:?}", other);
                    return;
                }
                Err(e) => {
                    tracing::debug!("Discarding malformed trailing content: {}", e);
                    return;
                }
            }
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let key = local.to_ascii_lowercase();

        let node = match self.stack.last_mut() {
            Some(Node::Capture(capture)) => {
                capture.open_nested(e);
                return Ok(());
            }
            None => root_node(&key, e)?,
            Some(Node::Hello(_)) => match key.as_str() {
                "capabilities" => Node::Capabilities,
                "session-id" => Node::Text(TextField::SessionId, String::new()),
                _ => Node::Ignored,
            },
            Some(Node::Capabilities) if key == "capability" => {
                Node::Text(TextField::Capability, String::new())
            }
            Some(Node::Rpc { operation, message_id }) => {
                if operation.is_some() {
                    tracing::warn!("Ignoring extra operation <{}> in rpc {}", local, message_id);
                    Node::Ignored
                } else {
                    Node::Capture(Capture::new(local, CaptureTarget::Operation))
                }
            }
            Some(Node::Reply(reply)) => match key.as_str() {
                "ok" => {
                    reply.ok = true;
                    Node::Ignored
                }
                "rpc-error" => Node::RpcError(ErrorDraft::default()),
                _ => Node::Capture(Capture::new(local, CaptureTarget::Payload)),
            },
            Some(Node::RpcError(_)) => match key.as_str() {
                "error-type" => Node::Text(TextField::ErrorType, String::new()),
                "error-tag" => Node::Text(TextField::ErrorTag, String::new()),
                "error-severity" => Node::Text(TextField::ErrorSeverity, String::new()),
                "error-app-tag" => Node::Text(TextField::ErrorAppTag, String::new()),
                "error-path" => Node::Text(TextField::ErrorPath, String::new()),
                "error-message" => Node::Text(TextField::ErrorMessage, String::new()),
                "error-info" => Node::Capture(Capture::new(local, CaptureTarget::ErrorInfo)),
                _ => Node::Ignored,
            },
            Some(_) => Node::Ignored,
        };

        self.stack.push(node);
        Ok(())
    }

    fn empty(&mut self, e: &BytesStart<'_>) -> Result<Option<RpcElement>> {
        if let Some(Node::Capture(capture)) = self.stack.last_mut() {
            capture.empty_nested(e);
            return Ok(None);
        }
        self.open(e)?;
        self.close_current()
    }

    fn close(&mut self, e: &BytesEnd<'_>) -> Result<Option<RpcElement>> {
        if let Some(Node::Capture(capture)) = self.stack.last_mut() {
            if capture.depth > 0 {
                capture.close_nested(e);
                return Ok(None);
            }
        }
        self.close_current()
    }

    fn text(&mut self, t: &BytesText<'_>) -> Result<()> {
        match self.stack.last_mut() {
            Some(Node::Capture(capture)) => capture.content.push_str(&String::from_utf8_lossy(t)),
            Some(Node::Text(_, buf)) => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                buf.push_str(&text);
            }
            None if !is_blank(t) => {
                return Err(NetconfError::framing("Text content before the root element"));
            }
            _ => {}
        }
        Ok(())
    }

    /// CDATA and comments: kept verbatim inside captures; CDATA content also
    /// feeds text nodes.
    fn raw_markup(&mut self, open: &str, raw: &[u8], close: &str, as_text: &[u8]) {
        match self.stack.last_mut() {
            Some(Node::Capture(capture)) => {
                capture.content.push_str(open);
                capture.content.push_str(&String::from_utf8_lossy(raw));
                capture.content.push_str(close);
            }
            Some(Node::Text(_, buf)) => buf.push_str(&String::from_utf8_lossy(as_text)),
            _ => {}
        }
    }

    fn close_current(&mut self) -> Result<Option<RpcElement>> {
        let node = self
            .stack
            .pop()
            .ok_or_else(|| NetconfError::framing("Unbalanced end tag"))?;

        match node {
            Node::Hello(hello) => return Ok(Some(RpcElement::Hello(hello))),
            Node::Rpc {
                message_id,
                operation,
            } => {
                let (operation, params) = operation.ok_or_else(|| {
                    NetconfError::framing(format!("<rpc> {message_id} carries no operation"))
                })?;
                return Ok(Some(RpcElement::Query(Query {
                    message_id,
                    operation,
                    params,
                })));
            }
            Node::Reply(reply) => return Ok(Some(RpcElement::Reply(reply))),
            Node::Text(field, text) => self.commit_text(field, text),
            Node::RpcError(draft) => {
                let error = draft.build()?;
                if let Some(Node::Reply(reply)) = self.stack.last_mut() {
                    reply.errors.push(error);
                }
            }
            Node::Capture(capture) => self.commit_capture(capture),
            Node::Capabilities | Node::Ignored => {}
        }
        Ok(None)
    }

    fn commit_text(&mut self, field: TextField, text: String) {
        match field {
            TextField::Capability => {
                if let Some(hello) = self.hello_mut() {
                    hello.capabilities.push(Capability::lookup(&text));
                }
            }
            TextField::SessionId => {
                if let Some(hello) = self.hello_mut() {
                    hello.session_id = Some(text.trim().to_string());
                }
            }
            _ => {
                let Some(Node::RpcError(draft)) = self.stack.last_mut() else {
                    return;
                };
                match field {
                    TextField::ErrorType => draft.error_type = Some(ErrorType::lookup(&text)),
                    TextField::ErrorTag => draft.tag = Some(ErrorTag::lookup(&text)),
                    TextField::ErrorSeverity => draft.severity = Some(ErrorSeverity::lookup(&text)),
                    TextField::ErrorAppTag => draft.app_tag = Some(text),
                    TextField::ErrorPath => draft.path = Some(text),
                    TextField::ErrorMessage => draft.message = Some(text),
                    TextField::Capability | TextField::SessionId => {}
                }
            }
        }
    }

    fn commit_capture(&mut self, capture: Capture) {
        let Capture {
            name,
            target,
            content,
            ..
        } = capture;

        match (target, self.stack.last_mut()) {
            (CaptureTarget::Operation, Some(Node::Rpc { operation, .. })) => {
                let params = if content.trim().is_empty() {
                    None
                } else {
                    Some(content)
                };
                *operation = Some((Operation::lookup(&name.to_ascii_lowercase()), params));
            }
            (CaptureTarget::Payload, Some(Node::Reply(reply))) => {
                if let Some(existing) = &reply.payload {
                    tracing::warn!(
                        "Reply {} already holds <{}>, dropping extra block <{}>",
                        reply.message_id,
                        existing.name,
                        name
                    );
                } else {
                    reply.payload = Some(Payload { name, content });
                }
            }
            (CaptureTarget::ErrorInfo, Some(Node::RpcError(draft))) => {
                draft.info = Some(content);
            }
            _ => {}
        }
    }

    fn hello_mut(&mut self) -> Option<&mut Hello> {
        self.stack.iter_mut().rev().find_map(|node| match node {
            Node::Hello(hello) => Some(hello),
            _ => None,
        })
    }
}

fn root_node(key: &str, e: &BytesStart<'_>) -> Result<Node> {
    match key {
        "hello" => Ok(Node::Hello(Hello::default())),
        "rpc" => Ok(Node::Rpc {
            message_id: required_message_id(e, "rpc")?,
            operation: None,
        }),
        "rpc-reply" => Ok(Node::Reply(Reply::new(required_message_id(e, "rpc-reply")?))),
        other => Err(NetconfError::framing(format!(
            "Unexpected root element <{other}>"
        ))),
    }
}

fn required_message_id(e: &BytesStart<'_>, root: &str) -> Result<String> {
    let attr = e
        .try_get_attribute(MESSAGE_ID_ATTR)
        .map_err(quick_xml::Error::from)?;
    match attr {
        Some(attr) => {
            let value: Cow<'_, str> = attr.unescape_value().map_err(quick_xml::Error::from)?;
            Ok(value.into_owned())
        }
        None => Err(NetconfError::framing(format!(
            "Received <{root}> message without a message-id"
        ))),
    }
}

fn is_blank(t: &BytesText<'_>) -> bool {
    t.iter().all(u8::is_ascii_whitespace)
}
