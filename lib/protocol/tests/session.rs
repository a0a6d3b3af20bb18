//! Exercises the codec the way a real shim/harness exchange uses it: a
//! sequence of distinct message types read off one continuous byte stream,
//! rather than one message encoded and decoded in isolation.

use protocol::{FunctionList, Message};
use std::io::Cursor;

#[test]
fn a_handshake_and_one_notified_call_decode_in_order() {
    let mut wire = Vec::new();
    Message::Init.encode(&mut wire).unwrap();
    Message::Option {
        notify: FunctionList::all(),
        control: FunctionList::include(vec!["open".into()]),
    }
    .encode(&mut wire)
    .unwrap();
    Message::Notify { function: "mmap".into(), params: vec!["0x0".into(), "4096".into()] }
        .encode(&mut wire)
        .unwrap();
    Message::Ack.encode(&mut wire).unwrap();
    Message::Return { retval: 0 }.encode(&mut wire).unwrap();
    Message::Ack.encode(&mut wire).unwrap();

    let mut cursor = Cursor::new(wire);
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Init);
    match Message::decode(&mut cursor).unwrap() {
        Message::Option { notify, control } => {
            assert_eq!(notify, FunctionList::all());
            assert_eq!(control.names, vec!["open".to_string()]);
        }
        other => panic!("expected OPTION, got {other:?}"),
    }
    assert_eq!(
        Message::decode(&mut cursor).unwrap(),
        Message::Notify { function: "mmap".into(), params: vec!["0x0".into(), "4096".into()] }
    );
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Ack);
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Return { retval: 0 });
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Ack);
}

#[test]
fn a_control_call_answered_by_exec_then_return_decodes() {
    let mut wire = Vec::new();
    Message::Control { function: "open".into(), params: vec!["\"/tmp/x\"".into(), "577".into()] }
        .encode(&mut wire)
        .unwrap();
    Message::Exec { function: "open".into(), variant: 62 }.encode(&mut wire).unwrap();
    Message::Return { retval: -1 }.encode(&mut wire).unwrap();
    Message::Ack.encode(&mut wire).unwrap();

    let mut cursor = Cursor::new(wire);
    assert_eq!(
        Message::decode(&mut cursor).unwrap(),
        Message::Control { function: "open".into(), params: vec!["\"/tmp/x\"".into(), "577".into()] }
    );
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Exec { function: "open".into(), variant: 62 });
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Return { retval: -1 });
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Ack);
}

#[test]
fn decoding_past_the_last_message_reports_closed() {
    let mut wire = Vec::new();
    Message::Ack.encode(&mut wire).unwrap();
    let mut cursor = Cursor::new(wire);
    assert_eq!(Message::decode(&mut cursor).unwrap(), Message::Ack);
    assert!(matches!(Message::decode(&mut cursor), Err(protocol::ProtocolError::Closed)));
}
