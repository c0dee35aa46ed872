//! Session naming, output layout and the response record.

mod layout;
mod response;

pub use layout::{session_name, SessionLayout};
pub use response::{append_clarification, ResponseRecord};
