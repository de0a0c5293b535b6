// JSON-RPC protocol types, the MCP tool dispatcher and its stdio transport
pub mod handler;
pub mod protocol;
pub mod stdio;
