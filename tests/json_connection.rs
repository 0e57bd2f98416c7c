mod common;

use common::*;
use rpcwire::{
    call::Handler,
    connection::{json::JsonConnection, ConnectionConfig, TransportEvent},
    native::{native_fn, Exception},
    Error,
};
use serde_json::{json, Value as JsonValue};
use std::{cell::RefCell, rc::Rc};
use tracing_test::traced_test;

fn client() -> (JsonConnection<MessageRecorder>, MessageRecorder) {
    let out = MessageRecorder::default();
    let connection =
        JsonConnection::with_config(out.clone(), svc_mapping(), ConnectionConfig::default());
    (connection, out)
}

fn server() -> (JsonConnection<MessageRecorder>, MessageRecorder) {
    let (connection, out) = client();
    connection
        .register_func_implementation(
            "svc.add",
            "add",
            native_fn(|(a, b): (i32, i32)| Ok::<_, Exception>(a + b)),
        )
        .unwrap();
    connection
        .register_func_implementation(
            "svc.notify",
            "notify",
            native_fn(|(_,): (String,)| Ok::<_, Exception>(())),
        )
        .unwrap();
    connection
        .register_func_implementation(
            "svc.fail",
            "fail",
            native_fn(|()| Err::<(), _>(Exception::new("nope"))),
        )
        .unwrap();
    connection
        .register_func_implementation(
            "opensim.connect.handshake",
            "notify",
            native_fn(|(_,): (String,)| Ok::<_, Exception>(())),
        )
        .unwrap();
    (connection, out)
}

fn parse(message: &str) -> JsonValue {
    serde_json::from_str(message).unwrap()
}

#[test]
fn call_and_reply() {
    let (client, client_out) = client();
    let (server, server_out) = server();
    let add = client
        .generate_function_wrapper("svc.add", "add", vec![])
        .unwrap();

    let sum = Rc::new(RefCell::new(None));
    let slot = sum.clone();
    add.call((2i32, 3i32))
        .unwrap()
        .unwrap()
        .on("result", Handler::result(move |n: i32| *slot.borrow_mut() = Some(n)))
        .unwrap();

    let requests = client_out.take();
    assert_eq!(parse(&requests[0]), json!(["call", 0, "svc.add", 2, 3]));
    server.handle_message(&requests[0]).unwrap();

    let replies = server_out.take();
    assert_eq!(parse(&replies[0]), json!(["call-reply", 0, true, 5]));
    client.handle_message(&replies[0]).unwrap();
    assert_eq!(*sum.borrow(), Some(5));
    assert!(client.active_calls().is_empty());
}

#[test]
fn call_ids_increase_from_zero() {
    let (client, client_out) = client();
    let notify = client
        .generate_function_wrapper("svc.notify", "notify", vec![])
        .unwrap();
    let ids: Vec<u32> = (0..4)
        .map(|i| notify.call((format!("n{i}"),)).unwrap().unwrap().id())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(client.active_calls(), ids);
    assert_eq!(client_out.len(), 4);
}

#[test]
fn void_result_is_omitted() {
    let (server, server_out) = server();
    server
        .handle_message(r#"["call", 4, "svc.notify", "hello"]"#)
        .unwrap();
    assert_eq!(
        parse(&server_out.take()[0]),
        json!(["call-reply", 4, true])
    );

    let (client, _) = client();
    let notify = client
        .generate_function_wrapper("svc.notify", "notify", vec![])
        .unwrap();
    let done = Rc::new(RefCell::new(false));
    let flag = done.clone();
    notify
        .call(("hello".to_owned(),))
        .unwrap()
        .unwrap()
        .on("result", Handler::result(move |()| *flag.borrow_mut() = true))
        .unwrap();
    client.handle_message(r#"["call-reply", 0, true]"#).unwrap();
    assert!(*done.borrow());
}

#[test]
fn exception_reply() {
    let (server, server_out) = server();
    server.handle_message(r#"["call", 9, "svc.fail"]"#).unwrap();
    let reply = server_out.take();
    assert_eq!(
        parse(&reply[0]),
        json!(["call-reply", 9, false, {"message": "nope"}])
    );

    let (client, _) = client();
    let fail = client
        .generate_function_wrapper("svc.fail", "fail", vec![])
        .unwrap();
    let caught = Rc::new(RefCell::new(None));
    let slot = caught.clone();
    let call = fail.call(()).unwrap().unwrap();
    call.on(
        "exc_result",
        Handler::exc_result(move |e: Option<Exception>, r: Option<()>| {
            assert!(r.is_none());
            *slot.borrow_mut() = e;
        }),
    )
    .unwrap();
    client
        .handle_message(r#"["call-reply", 0, false, {"message": "nope"}]"#)
        .unwrap();
    assert_eq!(caught.borrow().as_ref().map(|e| e.message.as_str()), Some("nope"));
    assert!(call.is_resolved());
}

#[test]
#[traced_test]
fn unhandled_exception() {
    let (client, _) = client();
    let fail = client
        .generate_function_wrapper("svc.fail", "fail", vec![])
        .unwrap();
    let call = fail.call(()).unwrap().unwrap();
    call.on("result", Handler::result(|()| panic!("not a result")))
        .unwrap();

    let err = client
        .handle_message(r#"["call-reply", 0, false, {"message": "boom"}]"#)
        .unwrap_err();
    assert!(matches!(err, Error::UnhandledException { call_id: 0, .. }));
    assert!(logs_contain("unhandled exception"));
    assert!(client.active_calls().is_empty());
}

#[test]
fn close_fails_every_pending_call_once() {
    let (client, _) = client();
    let add = client
        .generate_function_wrapper("svc.add", "add", vec![])
        .unwrap();
    let reasons = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let sink = reasons.clone();
        add.call((i, i))
            .unwrap()
            .unwrap()
            .on(
                "error",
                Handler::error(move |reason| sink.borrow_mut().push(reason.to_owned())),
            )
            .unwrap();
    }
    assert_eq!(client.active_calls().len(), 3);

    client.handle_event(TransportEvent::Close).unwrap();
    client
        .handle_event(TransportEvent::Error("late".to_owned()))
        .unwrap();
    assert_eq!(*reasons.borrow(), vec!["Connection closed."; 3]);
    assert!(client.active_calls().is_empty());
}

#[test]
fn unknown_reply_keeps_connection_usable() {
    let (client, _) = client();
    let add = client
        .generate_function_wrapper("svc.add", "add", vec![])
        .unwrap();
    let sum = Rc::new(RefCell::new(None));
    let slot = sum.clone();
    add.call((1i32, 1i32))
        .unwrap()
        .unwrap()
        .on("result", Handler::result(move |n: i32| *slot.borrow_mut() = Some(n)))
        .unwrap();

    assert!(matches!(
        client.handle_message(r#"["call-reply", 42, true, 0]"#),
        Err(Error::Connection(_))
    ));
    assert!(matches!(
        client.handle_message(r#"["ping"]"#),
        Err(Error::Connection(_))
    ));
    assert!(matches!(client.handle_message("not json"), Err(Error::Json(_))));

    client.handle_message(r#"["call-reply", 0, true, 2]"#).unwrap();
    assert_eq!(*sum.borrow(), Some(2));
}

#[test]
fn handler_shapes_are_checked_before_sending() {
    let (client, client_out) = client();
    assert!(matches!(
        client.generate_function_wrapper(
            "svc.add",
            "add",
            vec![Handler::exception(|_: Exception| {})]
        ),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.generate_function_wrapper("svc.add", "no-such-mapping", vec![]),
        Err(Error::TypeMappingParser(_))
    ));
    assert_eq!(client_out.len(), 0);

    let add = client
        .generate_function_wrapper("svc.add", "add", vec![])
        .unwrap();
    let call = add.call((1i32, 2i32)).unwrap().unwrap();
    assert!(matches!(
        call.on("result", Handler::error(|_| {})),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        call.on("finished", Handler::error(|_| {})),
        Err(Error::InvalidArgument(_))
    ));

    client.handle_message(r#"["call-reply", 0, true, 3]"#).unwrap();
    assert!(matches!(
        call.on("result", Handler::result(|_: i32| {})),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn one_way_functions() {
    let (client, client_out) = client();
    let handshake = client
        .generate_function_wrapper("opensim.connect.handshake", "notify", vec![])
        .unwrap();
    assert!(handshake.call(("token".to_owned(),)).unwrap().is_none());
    assert!(client.active_calls().is_empty());
    let sent = client_out.take();
    assert_eq!(
        parse(&sent[0]),
        json!(["call", 0, "opensim.connect.handshake", "token"])
    );

    let (server, server_out) = server();
    server.handle_message(&sent[0]).unwrap();
    assert_eq!(server_out.len(), 0);
}

#[test]
fn rejected_calls_get_no_reply() {
    let (server, server_out) = server();
    assert!(matches!(
        server.handle_message(r#"["call", 1, "svc.add", 1]"#),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        server.handle_message(r#"["call", 2, "svc.echo", {"value": "x"}]"#),
        Err(Error::Connection(_))
    ));
    assert!(server
        .handle_message(r#"["call", 3, "svc.add", "one", 1]"#)
        .is_err());
    assert_eq!(server_out.len(), 0);
}

#[test]
fn reply_that_does_not_fit_fails_the_call() {
    let (client, _) = client();
    let add = client
        .generate_function_wrapper("svc.add", "add", vec![])
        .unwrap();
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let sink = reasons.clone();
    let call = add.call((1i32, 2i32)).unwrap().unwrap();
    call.on("result", Handler::result(|_: i32| panic!("not an i32")))
        .unwrap()
        .on(
            "error",
            Handler::error(move |reason| sink.borrow_mut().push(reason.to_owned())),
        )
        .unwrap();

    assert!(matches!(
        client.handle_message(r#"["call-reply", 0, true, "abc"]"#),
        Err(Error::IncompatibleNativeType(_))
    ));
    assert_eq!(reasons.borrow().len(), 1);
    assert!(call.is_resolved());
    assert!(client.active_calls().is_empty());
}
