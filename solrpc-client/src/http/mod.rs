//! JSON-RPC over request/response transports

pub mod dispatcher;
pub mod request;
pub mod transport;

pub use dispatcher::RpcDispatcher;
pub use request::{RpcRequest, RpcResponse};
pub use transport::{HttpTransport, RpcTransport};
