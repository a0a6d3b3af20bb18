//! The line-oriented wire codec shared by the shim and the harness (§4.2).
//!
//! A record is a sequence of fields, each terminated by `\r\n`, with the
//! whole record closed by an extra blank field (`\r\n\r\n`). The first field
//! is always the message type tag; the rest are the type's payload. Every
//! read respects two fixed buffer limits matching the shim's fixed-size
//! stack buffers: 250 bytes per message, 100 bytes per field.

use std::io::{Read, Write};

pub const MAX_MESSAGE_BYTES: usize = 250;
pub const MAX_FIELD_BYTES: usize = 100;

const FIELD_SEP: &[u8] = b"\r\n";
const RECORD_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("peer closed the connection")]
    Closed,
    #[error("message exceeded {MAX_MESSAGE_BYTES}-byte limit")]
    MessageTooLong,
    #[error("field exceeded {MAX_FIELD_BYTES}-byte limit")]
    FieldTooLong,
    #[error("unknown message type {0:?}")]
    UnknownType(String),
    #[error("malformed {0} message")]
    Malformed(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How a function-name list in an `OPTION` payload is expressed (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    All,
    None,
    Include,
}

impl ListKind {
    pub fn name(self) -> &'static str {
        match self {
            ListKind::All => "ALL",
            ListKind::None => "NONE",
            ListKind::Include => "INCLUDE",
        }
    }

    fn from_name(name: &str) -> Option<ListKind> {
        match name {
            "ALL" => Some(ListKind::All),
            "NONE" => Some(ListKind::None),
            "INCLUDE" => Some(ListKind::Include),
            _ => None,
        }
    }
}

/// One of the two named lists (`NOTIFICATION` or `CONTROL`) inside an
/// `OPTION` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionList {
    pub kind: ListKind,
    pub names: Vec<String>,
}

impl FunctionList {
    pub fn all() -> FunctionList {
        FunctionList { kind: ListKind::All, names: Vec::new() }
    }

    pub fn none() -> FunctionList {
        FunctionList { kind: ListKind::None, names: Vec::new() }
    }

    pub fn include(names: Vec<String>) -> FunctionList {
        FunctionList { kind: ListKind::Include, names }
    }

    /// The list that selects everything either `self` or `other` selects.
    /// Used to build the baseline pass's all-notify option out of a
    /// session's configured notify and control lists (§2 "baseline
    /// (notify-only) run").
    pub fn union(&self, other: &FunctionList) -> FunctionList {
        match (self.kind, other.kind) {
            (ListKind::All, _) | (_, ListKind::All) => FunctionList::all(),
            (ListKind::None, ListKind::None) => FunctionList::none(),
            (ListKind::None, ListKind::Include) => other.clone(),
            (ListKind::Include, ListKind::None) => self.clone(),
            (ListKind::Include, ListKind::Include) => {
                let mut names = self.names.clone();
                for name in &other.names {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
                FunctionList::include(names)
            }
        }
    }

    fn write_fields(&self, fields: &mut Vec<String>) {
        fields.push(self.kind.name().to_string());
        if self.kind == ListKind::Include {
            fields.extend(self.names.iter().cloned());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Init,
    Option { notify: FunctionList, control: FunctionList },
    Notify { function: String, params: Vec<String> },
    Control { function: String, params: Vec<String> },
    Exec { function: String, variant: i32 },
    Ack,
    Return { retval: i64 },
}

impl Message {
    fn type_tag(&self) -> &'static str {
        match self {
            Message::Init => "INIT",
            Message::Option { .. } => "OPTION",
            Message::Notify { .. } => "NOTIFY",
            Message::Control { .. } => "CONTROL",
            Message::Exec { .. } => "EXEC",
            Message::Ack => "ACK",
            Message::Return { .. } => "RETURN",
        }
    }

    /// Writes one complete record, including the closing `\r\n\r\n`.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        let mut fields = vec![self.type_tag().to_string()];
        match self {
            Message::Init | Message::Ack => {}
            Message::Option { notify, control } => {
                fields.push("NOTIFICATION".to_string());
                notify.write_fields(&mut fields);
                fields.push("CONTROL".to_string());
                control.write_fields(&mut fields);
            }
            Message::Notify { function, params } | Message::Control { function, params } => {
                fields.push(function.clone());
                fields.extend(params.iter().cloned());
            }
            Message::Exec { function, variant } => {
                fields.push(function.clone());
                fields.push(variant.to_string());
            }
            Message::Return { retval } => {
                fields.push(retval.to_string());
            }
        }

        let mut body = Vec::new();
        for field in &fields {
            if field.len() > MAX_FIELD_BYTES {
                return Err(ProtocolError::FieldTooLong);
            }
            body.extend_from_slice(field.as_bytes());
            body.extend_from_slice(FIELD_SEP);
        }
        body.extend_from_slice(FIELD_SEP);
        if body.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::MessageTooLong);
        }
        writer.write_all(&body)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads one complete record from `reader`, blocking until the closing
    /// `\r\n\r\n` arrives, the peer closes, or the message grows past
    /// [`MAX_MESSAGE_BYTES`].
    pub fn decode<R: Read>(reader: &mut R) -> Result<Message, ProtocolError> {
        let raw = read_record(reader)?;
        let content = &raw[..raw.len() - FIELD_SEP.len()]; // drop the closing blank field
        let fields = split_fields(content)?;
        parse(fields)
    }
}

fn read_record<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            if buf.is_empty() {
                return Err(ProtocolError::Closed);
            }
            return Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-message",
            )));
        }
        buf.push(byte[0]);
        if buf.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::MessageTooLong);
        }
        if buf.ends_with(RECORD_END) {
            return Ok(buf);
        }
    }
}

fn split_fields(content: &[u8]) -> Result<Vec<String>, ProtocolError> {
    if content.is_empty() {
        return Ok(Vec::new());
    }
    // `\r\n` is two bytes; a naive byte-split would break on an interior `\r`
    // or `\n`, so scan for the exact two-byte separator instead. Every field
    // written by `encode` is itself terminated by `\r\n`, so `content` always
    // ends with a separator — there is never a trailing unterminated field.
    let mut fields = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i + 1 < content.len() {
        if &content[i..i + 2] == FIELD_SEP {
            let field = &content[start..i];
            push_field(&mut fields, field)?;
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < content.len() {
        push_field(&mut fields, &content[start..])?;
    }
    Ok(fields)
}

fn push_field(fields: &mut Vec<String>, raw: &[u8]) -> Result<(), ProtocolError> {
    if raw.len() > MAX_FIELD_BYTES {
        return Err(ProtocolError::FieldTooLong);
    }
    let text = String::from_utf8_lossy(raw).into_owned();
    fields.push(text);
    Ok(())
}

fn parse(mut fields: Vec<String>) -> Result<Message, ProtocolError> {
    if fields.is_empty() {
        return Err(ProtocolError::Malformed("empty"));
    }
    let tag = fields.remove(0);
    match tag.as_str() {
        "INIT" => Ok(Message::Init),
        "ACK" => Ok(Message::Ack),
        "RETURN" => {
            let retval = fields
                .first()
                .ok_or(ProtocolError::Malformed("RETURN"))?
                .parse::<i64>()
                .map_err(|_| ProtocolError::Malformed("RETURN"))?;
            Ok(Message::Return { retval })
        }
        "EXEC" => {
            if fields.len() != 2 {
                return Err(ProtocolError::Malformed("EXEC"));
            }
            let variant = fields[1].parse::<i32>().map_err(|_| ProtocolError::Malformed("EXEC"))?;
            Ok(Message::Exec { function: fields[0].clone(), variant })
        }
        "NOTIFY" | "CONTROL" => {
            if fields.is_empty() {
                return Err(ProtocolError::Malformed("NOTIFY/CONTROL"));
            }
            let function = fields.remove(0);
            let params = fields;
            if tag == "NOTIFY" {
                Ok(Message::Notify { function, params })
            } else {
                Ok(Message::Control { function, params })
            }
        }
        "OPTION" => parse_option(fields),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

fn parse_option(fields: Vec<String>) -> Result<Message, ProtocolError> {
    let mut iter = fields.into_iter();
    let header = iter.next().ok_or(ProtocolError::Malformed("OPTION"))?;
    if header != "NOTIFICATION" {
        return Err(ProtocolError::Malformed("OPTION"));
    }
    let notify = parse_list(&mut iter)?;
    let header = iter.next().ok_or(ProtocolError::Malformed("OPTION"))?;
    if header != "CONTROL" {
        return Err(ProtocolError::Malformed("OPTION"));
    }
    let control = parse_list(&mut iter)?;
    Ok(Message::Option { notify, control })
}

fn parse_list(iter: &mut std::vec::IntoIter<String>) -> Result<FunctionList, ProtocolError> {
    let kind_name = iter.as_slice().first().cloned().ok_or(ProtocolError::Malformed("OPTION list"))?;
    let kind = ListKind::from_name(&kind_name).ok_or(ProtocolError::Malformed("OPTION list"))?;
    iter.next();
    let mut names = Vec::new();
    if kind == ListKind::Include {
        // consume names until the next list-kind header or end of fields
        while let Some(next) = iter.as_slice().first() {
            if next == "CONTROL" {
                break;
            }
            names.push(iter.next().unwrap());
        }
    }
    Ok(FunctionList { kind, names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn notify_round_trips_through_the_wire() {
        let msg = Message::Notify { function: "open".into(), params: vec!["\"x\"".into(), "0".into()] };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        let decoded = Message::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn option_include_lists_round_trip() {
        let msg = Message::Option {
            notify: FunctionList::include(vec!["mmap".into(), "dup".into()]),
            control: FunctionList::all(),
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        let decoded = Message::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn option_none_control_has_no_names() {
        let msg = Message::Option { notify: FunctionList::none(), control: FunctionList::include(vec!["open".into()]) };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        match Message::decode(&mut Cursor::new(buf)).unwrap() {
            Message::Option { notify, control } => {
                assert_eq!(notify.kind, ListKind::None);
                assert!(notify.names.is_empty());
                assert_eq!(control.names, vec!["open".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn init_and_ack_carry_no_payload() {
        for msg in [Message::Init, Message::Ack] {
            let mut buf = Vec::new();
            msg.encode(&mut buf).unwrap();
            assert_eq!(buf, b"".iter().chain(msg.type_tag().as_bytes()).cloned().chain(*b"\r\n\r\n").collect::<Vec<u8>>());
        }
    }

    #[test]
    fn oversized_field_is_rejected() {
        let msg = Message::Notify { function: "x".repeat(MAX_FIELD_BYTES + 1), params: vec![] };
        let mut buf = Vec::new();
        assert!(matches!(msg.encode(&mut buf), Err(ProtocolError::FieldTooLong)));
    }

    #[test]
    fn peer_closing_before_any_bytes_is_reported_as_closed() {
        let mut empty: &[u8] = &[];
        assert!(matches!(Message::decode(&mut empty), Err(ProtocolError::Closed)));
    }

    #[test]
    fn exec_parses_variant_as_signed_int() {
        let msg = Message::Exec { function: "open".into(), variant: 62 };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        assert_eq!(Message::decode(&mut Cursor::new(buf)).unwrap(), msg);
    }
}
