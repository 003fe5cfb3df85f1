use serde_json::json;
use tracing::debug;
use uia_bridge_core::CommandError;
use uia_bridge_ipc::RpcRequest;
use uia_bridge_ipc::RpcResponse;
use uia_bridge_ipc::error_codes;

use crate::adapters::command_error_response;
use crate::adapters::envelope_response;
use crate::adapters::parse_command_input;
use crate::adapters::rendered_response;
use crate::executor::ScriptExecutor;
use crate::pipeline::CommandPipeline;

pub struct Router<'a, E: ScriptExecutor> {
    pipeline: &'a CommandPipeline<E>,
}

impl<'a, E: ScriptExecutor> Router<'a, E> {
    pub fn new(pipeline: &'a CommandPipeline<E>) -> Self {
        Self { pipeline }
    }

    pub fn route(&self, request: RpcRequest) -> RpcResponse {
        self.pipeline.metrics().record_request();
        debug!(id = request.id, method = %request.method, "Routing request");

        match request.method.as_str() {
            "ping" => RpcResponse::success(request.id, json!({ "pong": true })),
            "health" => self.handle_health(&request),
            "commands" => RpcResponse::success(
                request.id,
                json!({ "commands": self.pipeline.registry().names() }),
            ),
            "render" => self.handle_render(&request),
            method if self.pipeline.registry().contains(method) => {
                self.handle_command(&request, method)
            }
            method => command_error_response(
                request.id,
                &CommandError::UnknownCommand {
                    command: method.to_string(),
                },
            ),
        }
    }

    fn handle_health(&self, request: &RpcRequest) -> RpcResponse {
        RpcResponse::success(
            request.id,
            json!({
                "status": "healthy",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "active_sessions": self.pipeline.active_sessions(),
                "metrics": self.pipeline.metrics().to_json()
            }),
        )
    }

    /// Translate only: `{session, command, payload}` to the rendered script.
    fn handle_render(&self, request: &RpcRequest) -> RpcResponse {
        let command = match request.require_str("command") {
            Ok(command) => command,
            Err(response) => return response,
        };
        let input = match parse_command_input(request, command) {
            Ok(input) => input,
            Err(response) => return response,
        };
        match self
            .pipeline
            .translate(&input.session, command, &input.payload)
        {
            Ok(rendered) => rendered_response(request.id, &rendered),
            Err(e) => command_error_response(request.id, &e),
        }
    }

    fn handle_command(&self, request: &RpcRequest, command: &str) -> RpcResponse {
        let input = match parse_command_input(request, command) {
            Ok(input) => input,
            Err(response) => return response,
        };
        match self
            .pipeline
            .execute(&input.session, command, &input.payload)
        {
            Ok(value) => envelope_response(request.id, &input.session, value),
            Err(e) => command_error_response(request.id, &e),
        }
    }
}

/// Response for a line that is not a valid request.
pub fn parse_error_response(message: &str) -> RpcResponse {
    RpcResponse::error(
        0,
        error_codes::PARSE_ERROR,
        &format!("Parse error: {}", message),
    )
}
