//! # MCP Handler Module
//!
//! Implements the Model Context Protocol for the Circle wallet gateway.
//! It handles incoming MCP requests and dispatches them to the tool gateway.
//!
//! ## Supported Tools
//!
//! - `get_public_key` - Fetch the entity public key for the configured API key
//! - `get_balance` - Fetch token balances of a developer-controlled wallet
//! - `get_wallet_ids` - List the wallet ids this server is configured with
//! - `prepare_transfer` - Stage a transfer and return an approval link
//!
//! There is deliberately no tool that executes a transfer. The approval link
//! returned by `prepare_transfer` must be opened by a person.

use crate::{
    gateway::{ToolError, ToolGateway},
    mcp::protocol::{
        error_codes, text_result, Request, Response, JSONRPC_VERSION, PROTOCOL_VERSION,
    },
    utils::{get_required_arg, AmountArg},
    AppState,
};
use serde_json::{json, Value};
use tracing::info;

pub const SERVER_NAME: &str = "circle-developer-controlled-wallet";

const TOOL_NAMES: [&str; 4] = ["get_public_key", "get_balance", "get_wallet_ids", "prepare_transfer"];

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    if req.jsonrpc != JSONRPC_VERSION {
        return Some(Response::error(
            req.id,
            error_codes::INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {}", req.jsonrpc),
        ));
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        // Direct method calls are rewritten into tools/call
        name if TOOL_NAMES.contains(&name) => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the gateway.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);
    let req_id = &req.id;
    let gateway = &state.gateway;

    let res: Result<Response, Response> = match tool_name {
        "get_public_key" => {
            let outcome = gateway.get_public_key().await;
            Ok(tool_response(req_id, outcome))
        }
        "get_balance" => call_get_balance(gateway, args, req_id).await,
        "get_wallet_ids" => {
            let wallet_ids = gateway.get_wallet_ids();
            let mut result = text_result(json!(wallet_ids).to_string(), false);
            result["wallet_ids"] = json!(wallet_ids);
            Ok(Response::success(req_id.clone(), result))
        }
        "prepare_transfer" => call_prepare_transfer(gateway, args, req_id).await,
        other => Err(Response::error(
            req_id.clone(),
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {}", other),
        )),
    };
    res.unwrap_or_else(|err_resp| err_resp)
}

async fn call_get_balance(
    gateway: &ToolGateway,
    args: &Value,
    req_id: &Value,
) -> Result<Response, Response> {
    let wallet_id: String = get_required_arg(args, "wallet_id", req_id)?;
    let outcome = gateway.get_balance(&wallet_id).await;
    Ok(tool_response(req_id, outcome))
}

async fn call_prepare_transfer(
    gateway: &ToolGateway,
    args: &Value,
    req_id: &Value,
) -> Result<Response, Response> {
    let amount: AmountArg = get_required_arg(args, "amount", req_id)?;
    let destination_address: String = get_required_arg(args, "destination_address", req_id)?;
    let token_id: String = get_required_arg(args, "token_id", req_id)?;
    let wallet_id: String = get_required_arg(args, "wallet_id", req_id)?;
    let outcome = gateway
        .prepare_transfer(&amount.to_string(), &destination_address, &token_id, &wallet_id)
        .await;
    Ok(tool_response(req_id, outcome))
}

/// Tool failures are reported in-band through `isError`, never as JSON-RPC errors.
fn tool_response(req_id: &Value, outcome: Result<String, ToolError>) -> Response {
    let result = match outcome {
        Ok(body) => text_result(body, false),
        Err(e) => text_result(e.to_string(), true),
    };
    Response::success(req_id.clone(), result)
}

fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions = "Circle developer-controlled wallet tools. Transfers are only proposed: \
        prepare_transfer returns a link a person must open to execute the transfer.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request by returning a JSON definition of all available tools.
fn handle_tools_list(req: &Request) -> Response {
    let tools = json!([
        {
            "name": "get_public_key",
            "description": "Get the public key for the Circle API key.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "get_balance",
            "description": "Get the token balances of a Circle developer-controlled wallet.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "wallet_id": {"type": "string", "description": "Circle wallet id."}
                },
                "required": ["wallet_id"]
            }
        },
        {
            "name": "get_wallet_ids",
            "description": "List the wallet ids configured on this server.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "prepare_transfer",
            "description": "Prepare a token transfer. Returns a link the user must open to approve it; nothing is sent until then.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "amount": {"type": ["string", "number"], "description": "Amount to transfer."},
                    "destination_address": {"type": "string", "description": "Destination blockchain address."},
                    "token_id": {"type": "string", "description": "Circle token id."},
                    "wallet_id": {"type": "string", "description": "Source wallet id."}
                },
                "required": ["amount", "destination_address", "token_id", "wallet_id"]
            }
        }
    ]);
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
