#![allow(dead_code)]

use rpcwire::{
    connection::{CallbackTransport, JsonTransport},
    encoding::BaseEncoding,
    idl::{Idl, IdlFunction, StaticIdlLoader},
    mapping::FunctionMapping,
    path,
    protocol::{MappingEntry, ProtocolGenerator, TypeMapping},
};
use std::{cell::RefCell, rc::Rc};

pub const SVC_IDL_URI: &str = "http://localhost/svc.idl";

rpcwire::native_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Echo {
        pub value: String,
    }
}

rpcwire::native_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct FullName {
        pub first: String,
        pub last: String,
    }
}

rpcwire::native_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    #[allow(non_snake_case)]
    pub struct LoginRequest {
        pub name: FullName,
        pub pwdHash: String,
        pub start: String,
        pub channel: String,
        pub version: String,
        pub platform: String,
        pub mac: String,
        pub options: Vec<String>,
        pub id0: String,
        pub agree_to_tos: String,
        pub read_critical: String,
        pub viewer_digest: String,
    }
}

rpcwire::native_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct LoginResponse {
        pub name: FullName,
        pub login: String,
        pub sim_ip: String,
        pub start_location: String,
        pub seconds_since_epoch: u64,
        pub message: String,
        pub circuit_code: u32,
        pub sim_port: u16,
        pub secure_session_id: String,
        pub look_at: String,
        pub agent_id: String,
        pub inventory_host: String,
        pub region_y: i32,
        pub region_x: i32,
        pub seed_capability: String,
        pub agent_access: String,
        pub session_id: String,
    }
}

/// Records every binary frame sent through it.
#[derive(Clone, Default)]
pub struct FrameRecorder(Rc<RefCell<Vec<Vec<u8>>>>);

impl FrameRecorder {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.0.borrow_mut())
    }
}

impl CallbackTransport for FrameRecorder {
    fn send(&self, data: &[u8]) -> bool {
        self.0.borrow_mut().push(data.to_vec());
        true
    }

    fn is_reliable(&self) -> bool {
        false
    }
}

/// Records every text message sent through it.
#[derive(Clone, Default)]
pub struct MessageRecorder(Rc<RefCell<Vec<String>>>);

impl MessageRecorder {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

impl JsonTransport for MessageRecorder {
    fn send(&self, message: &str) -> bool {
        self.0.borrow_mut().push(message.to_owned());
        true
    }
}

/// UTF-16 code units of `s` plus the terminator, little-endian.
pub fn zc(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain([0])
        .flat_map(u16::to_le_bytes)
        .collect()
}

pub fn svc_idl() -> Idl {
    Idl::new()
        .with_struct("svc.Echo", &[("value", "string")])
        .with_service(
            "svc",
            "JSON",
            "ws://localhost/svc",
            [
                ("echo", IdlFunction::new("svc.Echo", &[("msg", "svc.Echo")])),
                ("add", IdlFunction::new("i32", &[("a", "i32"), ("b", "i32")])),
                ("notify", IdlFunction::new("void", &[("text", "string")])),
                ("fail", IdlFunction::new("void", &[])),
            ],
        )
        .with_service(
            "opensim.connect",
            "JSON",
            "ws://localhost/connect",
            [("handshake", IdlFunction::new("void", &[("token", "string")]))],
        )
}

pub fn svc_type_mappings() -> Vec<(&'static str, TypeMapping)> {
    use BaseEncoding::*;
    vec![
        (
            "echo",
            TypeMapping {
                args: vec![MappingEntry::base(ZCString, path![0, "value"])],
                result: vec![MappingEntry::base(ZCString, path!["value"])],
            },
        ),
        (
            "add",
            TypeMapping {
                args: vec![
                    MappingEntry::base(I32, path![0]),
                    MappingEntry::base(I32, path![1]),
                ],
                result: vec![MappingEntry::base(I32, path![])],
            },
        ),
        (
            "notify",
            TypeMapping {
                args: vec![MappingEntry::base(ZCString, path![0])],
                result: vec![],
            },
        ),
        ("fail", TypeMapping::default()),
    ]
}

/// A mapping that knows the `svc` IDL and its type mappings, nothing registered.
pub fn svc_mapping() -> FunctionMapping {
    let loader = StaticIdlLoader::builtin().with_document(SVC_IDL_URI, svc_idl());
    let mut mapping = FunctionMapping::with_loader(loader);
    mapping.load_idl(SVC_IDL_URI).unwrap();
    for (id, type_mapping) in svc_type_mappings() {
        mapping.define_type_mapping(id, type_mapping);
    }
    mapping
}

pub fn svc_generator() -> ProtocolGenerator {
    let mut generator = ProtocolGenerator::new();
    for (id, type_mapping) in svc_type_mappings() {
        generator.define(id, type_mapping);
    }
    generator
}
