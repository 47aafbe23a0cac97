//! Protocol module - NETCONF 1.0 framing and message parsing.
//!
//! This module turns transport bytes into RPC elements:
//! - [`FrameReader`] cuts the byte stream on the `]]>]]>` delimiter
//! - [`ContentParser`] builds one [`RpcElement`](crate::rpc::RpcElement) per frame
//! - [`encode_message`] is the outbound counterpart

mod frame_reader;
mod parser;

pub use frame_reader::{FrameReader, DEFAULT_MAX_FRAME_SIZE, DELIMITER};
pub use parser::ContentParser;

use bytes::{BufMut, Bytes, BytesMut};

use crate::rpc::RpcElement;

/// Serialize an element and append the frame delimiter and line break.
pub fn encode_message(element: &RpcElement) -> Bytes {
    let xml = element.to_xml();
    let mut buf = BytesMut::with_capacity(xml.len() + DELIMITER.len() + 1);
    buf.put_slice(xml.as_bytes());
    buf.put_slice(DELIMITER);
    buf.put_u8(b'\n');
    buf.freeze()
}
