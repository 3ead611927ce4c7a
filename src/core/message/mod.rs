/*!
Message handling for the e2ee-chat channel.

This module provides the length-prefixed frame format shared by the handshake
and the chat messages.
*/

pub mod frame;

// Re-export commonly used items
pub use frame::{FrameHeader, encode_frame};
