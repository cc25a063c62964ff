//! Fluent composition of batched RPC messages for a networked game session.
//!
//! An [RpcSender] owns one [parlor_framing::MessageWriter] for its whole life and walks a small
//! state machine: `start_rpc` opens the addressing envelope and the RPC block, the `write_*`
//! surface fills the payload, `end_rpc` closes both frames, and a final `send` hands the batch to
//! the [Transport] and releases the writer.  In checked mode an out-of-order call can't corrupt
//! the buffer: it is logged, counted, and absorbed.  An unchecked sender skips validation for
//! callers hand-composing exotic packets.
//!
//! ```
//! use parlor_framing::Delivery;
//! use parlor_rpc::{RpcSender, Session, Target};
//! # struct Null;
//! # impl parlor_rpc::Transport for Null {
//! #     fn send_or_disconnect(&mut self, _writer: &parlor_framing::MessageWriter) {}
//! # }
//! # let mut transport = Null;
//! let mut sender = RpcSender::create(Session { game_id: 32 }, Delivery::Reliable, false);
//! sender
//!     .start_rpc(42, 9, Target::Everyone)
//!     .write_u16(7)
//!     .write_bool(true);
//! sender.end_rpc();
//! sender.send(&mut transport);
//! ```
mod addressing;
mod calls;
mod sender;
mod transport;

pub use addressing::*;
pub use calls::*;
pub use sender::*;
pub use transport::*;

pub use parlor_framing::Delivery;
