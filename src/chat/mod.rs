//! Messaging
//!
//! Conversation inbox and the chat panel for one conversation.
//!
//! ## Architecture
//!
//! - **ChatPanel**: ordered entries with delivery status; reconciles copies
//!   of a message by its client key
//! - **Events**: JSON frames on the live socket
//! - **RoomSlot**: which mounted view owns the one live room of a browser tab
//! - **LiveChannel**: socket connection with per-room subscriptions (native)
//! - **ChatSession**: open conversation wiring REST and live together (native)
//!
//! ## Rooms
//!
//! A room is named by the conversation id. Clients send `join_room` and
//! `leave_room`; the server relays `send_message` to room members as
//! `receive_message`.

mod error;
mod events;
mod panel;
mod rooms;

#[cfg(feature = "native")]
mod live;
#[cfg(feature = "native")]
mod session;

pub use error::{ChatError, ChatResult};
pub use events::{ClientEvent, ServerEvent};
pub use panel::{arrange_inbox, ChatEntry, ChatPanel, DeliveryStatus, InboundOutcome, SeenEntries};
pub use rooms::{Claim, MountId, RoomSlot};

#[cfg(feature = "native")]
pub use live::{LiveChannel, Subscription};
#[cfg(feature = "native")]
pub use session::{inbox, ChatSession, ConversationApi};
