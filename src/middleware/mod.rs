pub mod cookie;
pub mod response;
pub mod session_gate;

pub use cookie::{clear_session_cookie, read_cookie, session_cookie};
pub use response::{redirect_found, ApiResponse, ApiResult};
pub use session_gate::{extract_credential, session_gate_middleware};
