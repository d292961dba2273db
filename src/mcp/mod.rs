//! Model Context Protocol server exposing the coordinate transformation tools.
//!
//! The server speaks JSON-RPC 2.0 over stdio, one message per line, and targets MCP
//! protocol version 2024-11-05.
//!
//! ```text
//!   stdin ──▶ StdioTransport ──▶ McpServer ──▶ Tool ──▶ Transformer / transform_document
//!   stdout ◀──────────────────────────┘
//! ```
//!
//! Requests are answered in order, one at a time.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{
    CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
};
pub use server::{McpServer, ServerConfig};
pub use tools::{Tool, ToolError};
pub use transport::StdioTransport;
