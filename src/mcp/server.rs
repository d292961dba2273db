use std::io::{self, BufRead, Write};

use serde_json::{json, Value as JsonValue};

use crate::mcp::protocol::{
    CallToolParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use crate::mcp::tools::{self, Tool};
use crate::mcp::transport::StdioTransport;
use crate::transform::TransformConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Reported as `serverInfo.name`.
    pub name: String,
    pub version: String,
    /// Applied to every transformer the tools build.
    pub transform: TransformConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            transform: TransformConfig::default(),
        }
    }
}

/// Answers MCP requests one at a time.
///
/// Each tool call builds its own PROJ context and transformer; nothing is shared
/// between calls.
pub struct McpServer {
    config: ServerConfig,
    initialized: bool,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        McpServer {
            config,
            initialized: false,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve until the transport reaches end of input.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        transport: &mut StdioTransport<R, W>,
    ) -> io::Result<()> {
        log::debug!("{} {} listening", self.config.name, self.config.version);
        while let Some(message) = transport.read_message()? {
            log::trace!("<- {}", message);
            if let Some(response) = self.handle_message(&message) {
                log::trace!("-> {:?}", response);
                transport.write_message(&response)?;
            }
        }
        log::debug!("input closed, shutting down");
        Ok(())
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let value: JsonValue = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("unparseable message: {}", err);
                return Some(JsonRpcResponse::failure(
                    JsonValue::Null,
                    JsonRpcError::parse_error(err),
                ));
            }
        };
        let id = value.get("id").cloned().unwrap_or(JsonValue::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request),
            Err(err) => Some(JsonRpcResponse::failure(id, JsonRpcError::invalid_request(err))),
        }
    }

    pub fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(request.params),
            method => Err(JsonRpcError::method_not_found(method)),
        };
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                log::debug!("{} failed: {}", request.method, error);
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => self.initialized = true,
            method => log::debug!("ignoring notification {}", method),
        }
    }

    fn initialize_result(&self) -> JsonValue {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.config.name,
                "version": self.config.version,
            },
        })
    }

    fn call_tool(&self, params: Option<JsonValue>) -> Result<JsonValue, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(JsonValue::Null))
            .map_err(|err| {
                JsonRpcError::invalid_params(format!("invalid tools/call params: {}", err))
            })?;
        let tool = Tool::from_name(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown tool: {}", params.name)))?;
        log::debug!("calling {}", tool.name());
        let result = tool.call(&self.config.transform, params.arguments.as_ref());
        serde_json::to_value(result).map_err(JsonRpcError::internal_error)
    }
}
