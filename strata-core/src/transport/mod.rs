//! Transport
//!
//! WebSocket layer in front of the [`SessionManager`](crate::runtime::SessionManager).
//!
//! # How It Works
//!
//! ```text
//! TcpListener ──accept──► handle_connection (one task each)
//!                              │  connect() ─► SessionId
//!                              │  render()  ─► initial full_replace
//!                              ▼
//!          frame ─► codec::decode ─► SessionManager::handle_payload
//!                                              │
//!          frame ◄─ codec::encode ◄─ Outbound::Patch
//! ```

mod codec;
mod protocol;
mod server;

pub use codec::{decode, encode, Encoding};
pub use protocol::{Inbound, Outbound};
pub use server::{run, serve};
