//! State Management
//!
//! Global application state, browser storage and the chat connection.

pub mod global;
pub mod storage;
pub mod websocket;

pub use global::{provide_global_state, use_global_state, GlobalState};
pub use websocket::{init_websocket, ChatSocket};
