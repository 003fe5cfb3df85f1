use serde_json::Value;
use serde_json::json;
use uia_bridge_common::Payload;
use uia_bridge_common::SessionId;
use uia_bridge_core::CommandError;
use uia_bridge_core::ResponseEnvelope;
use uia_bridge_core::TranslationError;
use uia_bridge_ipc::RpcRequest;
use uia_bridge_ipc::RpcResponse;

use crate::registry::RenderedCommand;

/// Convert a CommandError to an RpcResponse.
pub fn command_error_response(id: u64, err: &CommandError) -> RpcResponse {
    RpcResponse::domain_error(
        id,
        err.code(),
        &err.to_string(),
        err.stage().as_str(),
        Some(err.context()),
        Some(err.suggestion()),
    )
}

/// Inputs shared by every command request.
#[derive(Debug, Clone)]
pub struct CommandInput {
    pub session: SessionId,
    pub payload: Payload,
}

/// Parse the session and payload of a command named `command`.
///
/// A `payload` that is not an object is reported like any other payload
/// error of that command.
#[allow(clippy::result_large_err)]
pub fn parse_command_input(request: &RpcRequest, command: &str) -> Result<CommandInput, RpcResponse> {
    let session = request.session()?;
    let payload = request.payload().map_err(|e| {
        command_error_response(
            request.id,
            &CommandError::from(TranslationError::new(command, e)),
        )
    })?;
    Ok(CommandInput { session, payload })
}

/// A successful command result in the runtime's own envelope shape.
pub fn envelope_response(id: u64, session: &SessionId, value: Value) -> RpcResponse {
    RpcResponse::success(id, ResponseEnvelope::success(session.as_str(), value).to_json())
}

pub fn rendered_response(id: u64, rendered: &RenderedCommand) -> RpcResponse {
    RpcResponse::success(
        id,
        json!({
            "session": rendered.session.as_str(),
            "command": rendered.command,
            "script": rendered.script.as_str()
        }),
    )
}
