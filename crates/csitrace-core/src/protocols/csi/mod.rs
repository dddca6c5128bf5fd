//! CSI v1 schema and the RPC dispatch table.
//!
//! `parser` splits a `:path` into service and method, `dispatch` maps that
//! pair onto the request and response message types in `messages`.

pub mod dispatch;
pub mod error;
pub mod layout;
pub mod messages;
pub mod parser;

pub use dispatch::{CsiMessage, CsiMethod, MessageSide};
pub use error::CsiError;
pub use parser::{RpcPath, parse_rpc_path};
