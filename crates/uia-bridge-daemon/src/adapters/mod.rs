mod rpc;

pub use rpc::command_error_response;
pub use rpc::envelope_response;
pub use rpc::parse_command_input;
pub use rpc::rendered_response;
