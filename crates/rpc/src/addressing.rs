use parlor_framing::MessageWriter;

/// Envelope tag for messages delivered to every session participant.
pub const BROADCAST_TAG: u8 = 5;

/// Envelope tag for messages delivered to a single participant.
pub const TARGETED_TAG: u8 = 6;

/// Tag of the RPC block nested inside either envelope.
pub const RPC_TAG: u8 = 2;

/// Identity of the game session a composed message belongs to.
///
/// Injected when a sender is created so composition never reaches for an ambient client handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Session {
    pub game_id: i32,
}

/// Who an RPC is addressed to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// Every participant in the session.
    Everyone,

    /// One participant's private simulation, by client routing id.  This is how
    /// participant-specific state desync is delivered.
    Client(i32),
}

impl From<Option<i32>> for Target {
    /// A missing or negative client id means broadcast, matching the wire protocol's sentinel.
    fn from(client: Option<i32>) -> Target {
        match client {
            Some(id) if id >= 0 => Target::Client(id),
            _ => Target::Everyone,
        }
    }
}

/// Anything addressable on the wire by a numeric routing id.
pub trait NetworkedObject {
    fn net_id(&self) -> u32;
}

/// Open the envelope frame for `target`.
///
/// This is the single place that decides between the broadcast and targeted shapes; the matching
/// `end_message` is the caller's to write.
pub(crate) fn open_envelope(writer: &mut MessageWriter, session: Session, target: Target) {
    match target {
        Target::Everyone => {
            writer.start_message(BROADCAST_TAG);
            writer.write_i32(session.game_id);
        }
        Target::Client(id) => {
            writer.start_message(TARGETED_TAG);
            writer.write_i32(session.game_id);
            writer.write_packed_i32(id);
        }
    }
}
