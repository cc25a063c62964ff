//! An example binding from a named game action to the generic sender.
//!
//! Payload order and types are fixed by each call's wire contract, so bindings like this are
//! written one per call and carry no state of their own.  The real catalog lives with the game;
//! only what the example needs is here.
use crate::addressing::{NetworkedObject, Target};
use crate::sender::RpcSender;

/// Call identifiers this crate ships bindings for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RpcCall {
    SetName = 6,
    SetColor = 8,
    SetRole = 44,
}

impl From<RpcCall> for u8 {
    fn from(call: RpcCall) -> u8 {
        call as u8
    }
}

/// Roles a participant can be switched to, as encoded on the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum Role {
    Crewmate = 0,
    Scientist = 1,
    Engineer = 2,
    Impostor = 4,
    Shapeshifter = 5,
}

/// A participant as the composer sees one: a routable object plus the routing id of its client.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub net_id: u32,
    pub client_id: i32,
}

impl NetworkedObject for Player {
    fn net_id(&self) -> u32 {
        self.net_id
    }
}

pub trait PlayerRpcExt {
    /// Change this player's role in `seer`'s simulation only, leaving everyone else's view alone.
    /// `seer` defaults to the player themselves.
    fn rpc_set_role_desync(&self, sender: &mut RpcSender, role: Role, seer: Option<&Player>);
}

impl PlayerRpcExt for Player {
    fn rpc_set_role_desync(&self, sender: &mut RpcSender, role: Role, seer: Option<&Player>) {
        let seer = seer.unwrap_or(self);

        sender
            .start_rpc(self.net_id, RpcCall::SetRole.into(), Target::Client(seer.client_id))
            .write_u16(role as u16);
        sender.end_rpc();
    }
}
