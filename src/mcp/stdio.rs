// src/mcp/stdio.rs

//! Newline-delimited JSON-RPC transport. Each input line is one message and
//! each reply is written as one line; notifications produce no output.

use crate::{
    mcp::{handler::handle_mcp_request, protocol::parse_request},
    AppState,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// Serves requests read from `reader` until EOF, replying on `writer`.
pub async fn serve<R, W>(reader: R, mut writer: W, state: AppState) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("Received: {}", line);

        let reply = match parse_request(line.as_bytes()) {
            Ok(request) => handle_mcp_request(request, state.clone()).await,
            Err(parse_error) => {
                error!("Received a line that is not JSON-RPC");
                Some(parse_error)
            }
        };
        let Some(reply) = reply else { continue };

        let mut payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode response: {}", e);
                continue;
            }
        };
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }

    info!("EOF received, shutting down MCP server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::Value;

    async fn run(input: &str) -> Vec<Value> {
        let state = AppState::from_config(Config::default()).unwrap();
        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output, state).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn answers_each_request_on_its_own_line() {
        let replies = run(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
        ))
        .await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn bad_line_gets_parse_error_and_loop_continues() {
        let replies = run("not json\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"get_wallet_ids\"}").await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[1]["id"], 9);
    }
}
