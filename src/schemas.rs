//! Hard-coded schemas: the login IDL document and its type mapping.

use crate::{
    encoding::BaseEncoding::{self, *},
    idl::{Idl, IdlFunction},
    path,
    path::ValuePath,
    protocol::{MappingEntry, TypeMapping},
};

pub const LOGIN_IDL_URI: &str = "http://localhost/home/kiara/login.idl";

pub const LOGIN_TYPE_MAPPING: &str = "hard-coded-1";

pub const LOGIN_FUNCTION: &str = "opensim.login.login_to_simulator";

pub fn login_idl() -> Idl {
    Idl::new()
        .with_struct("opensim.FullName", &[("first", "string"), ("last", "string")])
        .with_struct(
            "opensim.LoginRequest",
            &[
                ("name", "opensim.FullName"),
                ("pwdHash", "string"),
                ("start", "string"),
                ("channel", "string"),
                ("version", "string"),
                ("platform", "string"),
                ("mac", "string"),
                ("options", "string[]"),
                ("id0", "string"),
                ("agree_to_tos", "string"),
                ("read_critical", "string"),
                ("viewer_digest", "string"),
            ],
        )
        .with_enum("opensim.AccessType", &[("Mature", 0), ("Teen", 1)])
        .with_struct(
            "opensim.LoginResponse",
            &[
                ("name", "opensim.FullName"),
                ("login", "string"),
                ("sim_ip", "string"),
                ("start_location", "string"),
                ("seconds_since_epoch", "u64"),
                ("message", "string"),
                ("circuit_code", "u32"),
                ("sim_port", "u16"),
                ("secure_session_id", "string"),
                ("look_at", "string"),
                ("agent_id", "string"),
                ("inventory_host", "string"),
                ("region_y", "i32"),
                ("region_x", "i32"),
                ("seed_capability", "string"),
                ("agent_access", "opensim.AccessType"),
                ("session_id", "string"),
            ],
        )
        .with_service(
            "opensim.login",
            "WebSocket",
            "ws://localhost:9000/kiara/login",
            [(
                "login_to_simulator",
                IdlFunction::new("opensim.LoginResponse", &[("request", "opensim.LoginRequest")]),
            )],
        )
}

fn arg(kind: BaseEncoding, field: &str) -> MappingEntry {
    MappingEntry::base(kind, path![0, field])
}

fn field(kind: BaseEncoding, path: ValuePath) -> MappingEntry {
    MappingEntry::base(kind, path)
}

pub fn login_type_mapping() -> TypeMapping {
    TypeMapping {
        args: vec![
            MappingEntry::base(ZCString, path![0, "name", "first"]),
            MappingEntry::base(ZCString, path![0, "name", "last"]),
            arg(ZCString, "pwdHash"),
            arg(ZCString, "start"),
            arg(ZCString, "channel"),
            arg(ZCString, "version"),
            arg(ZCString, "platform"),
            arg(ZCString, "mac"),
            MappingEntry::array(vec![field(ZCString, path![])], path![0, "options"]),
            arg(ZCString, "id0"),
            arg(ZCString, "agree_to_tos"),
            arg(ZCString, "read_critical"),
            arg(ZCString, "viewer_digest"),
        ],
        result: vec![
            field(ZCString, path!["name", "first"]),
            field(ZCString, path!["name", "last"]),
            field(ZCString, path!["login"]),
            field(ZCString, path!["sim_ip"]),
            field(ZCString, path!["start_location"]),
            field(U32, path!["seconds_since_epoch"]),
            field(ZCString, path!["message"]),
            field(U32, path!["circuit_code"]),
            field(U16, path!["sim_port"]),
            field(ZCString, path!["secure_session_id"]),
            field(ZCString, path!["look_at"]),
            field(ZCString, path!["agent_id"]),
            field(ZCString, path!["inventory_host"]),
            field(I32, path!["region_y"]),
            field(I32, path!["region_x"]),
            field(ZCString, path!["seed_capability"]),
            MappingEntry::enumeration("Mature", 0, &[("Mature", 0), ("Teen", 1)], path!["agent_access"]),
            field(ZCString, path!["session_id"]),
        ],
    }
}
