//! HTTP/JSON adapter for Worldforge.
//! Maps requests onto `worldforge_core` services and their failures onto
//! status codes; no domain rule lives here.

pub mod api;
pub mod http;
pub mod identity;

pub use api::{status_for, ApiReply, ApiResult};
pub use http::{router, AppState};
pub use identity::{Authenticated, USER_HEADER};
