use log::error;

use parlor_framing::{Delivery, MessageWriter};

use crate::addressing::{self, NetworkedObject, Session, Target, RPC_TAG};
use crate::transport::Transport;

/// Lifecycle of an [RpcSender].  Linear; `Ready` and `Writing` alternate through repeated
/// `start_rpc`/`end_rpc` pairs until the one terminal `send`.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum SenderState {
    /// Not yet initialized.  Nothing is legal here; [RpcSender::create] leaves this state behind
    /// before a sender is ever visible.
    BeforeInit,

    /// Between RPCs.  `start_rpc` and `send` are legal.
    Ready,

    /// Inside a `start_rpc`/`end_rpc` pair.  The write surface and `end_rpc` are legal.
    Writing,

    /// Sent.  The writer has been released and the sender must not be reused.
    Finished,
}

/// A fluent builder for batched, length-framed session RPCs.
///
/// One sender exclusively owns one [MessageWriter] from creation until `send`, which hands the
/// buffer to the transport and recycles the writer.  In checked mode every operation is validated
/// against the current [SenderState]; an out-of-order call is logged, counted, and absorbed
/// without touching the buffer, so a fluent chain never crashes and never emits a half-written
/// frame.  A malformed network write is worse than a dropped RPC.
///
/// An unchecked sender (`unchecked = true` at creation) skips the validation entirely.  That is
/// an escape hatch for callers who have proven their call order by construction and accept
/// undefined framing if they're wrong.
pub struct RpcSender {
    /// Some from creation until `send` releases it.
    writer: Option<MessageWriter>,
    session: Session,
    delivery: Delivery,
    unchecked: bool,
    state: SenderState,
    violations: u32,
}

impl RpcSender {
    /// Create a sender in the `Ready` state, acquiring a pooled writer for `delivery`.
    pub fn create(session: Session, delivery: Delivery, unchecked: bool) -> RpcSender {
        RpcSender {
            writer: Some(MessageWriter::get(delivery)),
            session,
            delivery,
            unchecked,
            state: SenderState::Ready,
            violations: 0,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Number of operations rejected so far for arriving in the wrong state.  Always zero for an
    /// unchecked sender.
    pub fn state_violations(&self) -> u32 {
        self.violations
    }

    /// The bytes composed so far.  Empty once the writer has been released by `send`.
    pub fn as_bytes(&self) -> &[u8] {
        self.writer.as_ref().map(|w| w.as_bytes()).unwrap_or(&[])
    }

    fn violation(&mut self, op: &str, required: SenderState) {
        self.violations += 1;
        error!(
            "{} called in state {:?} but requires {:?}; call ignored",
            op, self.state, required
        );
    }

    /// Open an RPC addressed to `target`: the envelope frame, then the RPC block with the packed
    /// target-object id and the call id.  Legal from `Ready`.
    pub fn start_rpc(&mut self, target_net_id: u32, call_id: u8, target: Target) -> &mut RpcSender {
        if self.state != SenderState::Ready && !self.unchecked {
            self.violation("start_rpc", SenderState::Ready);
            return self;
        }
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => {
                error!("start_rpc called after the writer was released; call ignored");
                return self;
            }
        };

        addressing::open_envelope(writer, self.session, target);
        writer.start_message(RPC_TAG);
        writer.write_packed_u32(target_net_id);
        writer.write_u8(call_id);

        self.state = SenderState::Writing;
        self
    }

    /// Close the open RPC block and its envelope, inverse order of the opens in `start_rpc`.
    /// Legal from `Writing`; lands back in `Ready` so another RPC can join the batch.
    pub fn end_rpc(&mut self) {
        if self.state != SenderState::Writing && !self.unchecked {
            self.violation("end_rpc", SenderState::Writing);
            return;
        }
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => {
                error!("end_rpc called after the writer was released; call ignored");
                return;
            }
        };

        writer.end_message();
        writer.end_message();
        self.state = SenderState::Ready;
    }

    /// Hand the batch to the transport, release the writer back to the pool, and finish.  Legal
    /// once, from `Ready`; a second call is rejected because the state is `Finished`.
    pub fn send(&mut self, transport: &mut dyn Transport) {
        if self.state != SenderState::Ready && !self.unchecked {
            self.violation("send", SenderState::Ready);
            return;
        }
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                error!("send called after the writer was released; call ignored");
                return;
            }
        };

        transport.send_or_disconnect(&writer);
        self.state = SenderState::Finished;
        writer.recycle();
    }

    /// The single state check behind the whole write surface.
    fn write_with(&mut self, op: impl FnOnce(&mut MessageWriter)) -> &mut RpcSender {
        if self.state != SenderState::Writing && !self.unchecked {
            self.violation("write", SenderState::Writing);
            return self;
        }
        match self.writer.as_mut() {
            Some(writer) => op(writer),
            None => error!("write called after the writer was released; call ignored"),
        }
        self
    }

    pub fn write_u8(&mut self, val: u8) -> &mut RpcSender {
        self.write_with(|w| w.write_u8(val))
    }

    pub fn write_i8(&mut self, val: i8) -> &mut RpcSender {
        self.write_with(|w| w.write_i8(val))
    }

    pub fn write_u16(&mut self, val: u16) -> &mut RpcSender {
        self.write_with(|w| w.write_u16(val))
    }

    pub fn write_i16(&mut self, val: i16) -> &mut RpcSender {
        self.write_with(|w| w.write_i16(val))
    }

    pub fn write_u32(&mut self, val: u32) -> &mut RpcSender {
        self.write_with(|w| w.write_u32(val))
    }

    pub fn write_i32(&mut self, val: i32) -> &mut RpcSender {
        self.write_with(|w| w.write_i32(val))
    }

    pub fn write_u64(&mut self, val: u64) -> &mut RpcSender {
        self.write_with(|w| w.write_u64(val))
    }

    pub fn write_i64(&mut self, val: i64) -> &mut RpcSender {
        self.write_with(|w| w.write_i64(val))
    }

    pub fn write_f32(&mut self, val: f32) -> &mut RpcSender {
        self.write_with(|w| w.write_f32(val))
    }

    pub fn write_bool(&mut self, val: bool) -> &mut RpcSender {
        self.write_with(|w| w.write_bool(val))
    }

    pub fn write_str(&mut self, val: &str) -> &mut RpcSender {
        self.write_with(|w| w.write_str(val))
    }

    pub fn write_bytes(&mut self, val: &[u8]) -> &mut RpcSender {
        self.write_with(|w| w.write_bytes(val))
    }

    pub fn write_bytes_and_size(&mut self, val: &[u8]) -> &mut RpcSender {
        self.write_with(|w| w.write_bytes_and_size(val))
    }

    pub fn write_packed_u32(&mut self, val: u32) -> &mut RpcSender {
        self.write_with(|w| w.write_packed_u32(val))
    }

    pub fn write_packed_i32(&mut self, val: i32) -> &mut RpcSender {
        self.write_with(|w| w.write_packed_i32(val))
    }

    /// Embed a pre-built message's bytes into the open RPC block.
    pub fn write_message(&mut self, msg: &MessageWriter, include_header: bool) -> &mut RpcSender {
        self.write_with(|w| w.write_message(msg, include_header))
    }

    /// Write a networked object as its packed routing id.
    pub fn write_net_object(&mut self, obj: &impl NetworkedObject) -> &mut RpcSender {
        let net_id = obj.net_id();
        self.write_with(|w| w.write_packed_u32(net_id))
    }
}

impl Drop for RpcSender {
    fn drop(&mut self) {
        // A sender that was never sent still holds its writer; recycle instead of leaking the
        // pooled buffer.  The writer's own drop hook handles the warning.
        if let Some(writer) = self.writer.take() {
            writer.recycle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use parlor_framing::MessageReader;
    use crate::addressing::{BROADCAST_TAG, TARGETED_TAG};

    const SESSION: Session = Session { game_id: 74 };

    #[derive(Default)]
    struct CaptureTransport {
        sent: Vec<(Delivery, Vec<u8>)>,
    }

    impl Transport for CaptureTransport {
        fn send_or_disconnect(&mut self, writer: &MessageWriter) {
            self.sent
                .push((writer.delivery(), writer.as_bytes().to_vec()));
        }
    }

    fn checked_sender() -> RpcSender {
        RpcSender::create(SESSION, Delivery::Reliable, false)
    }

    #[test]
    fn test_write_before_start_is_a_noop() {
        let mut sender = checked_sender();
        sender.write_u16(7);
        assert_eq!(sender.as_bytes(), &[] as &[u8]);
        assert_eq!(sender.state_violations(), 1);
        assert_eq!(sender.state(), SenderState::Ready);
    }

    #[test]
    fn test_write_after_end_is_a_noop() {
        let mut sender = checked_sender();
        sender.start_rpc(1, 2, Target::Everyone).write_u8(3);
        sender.end_rpc();

        let before = sender.as_bytes().to_vec();
        sender.write_u8(4).write_str("late");
        assert_eq!(sender.as_bytes(), &before[..]);
        assert_eq!(sender.state_violations(), 2);
    }

    #[test]
    fn test_end_without_start_is_a_noop() {
        let mut sender = checked_sender();
        sender.end_rpc();
        assert_eq!(sender.state(), SenderState::Ready);
        assert_eq!(sender.state_violations(), 1);
    }

    #[test]
    fn test_start_while_writing_is_a_noop() {
        let mut sender = checked_sender();
        sender.start_rpc(1, 2, Target::Everyone);
        let before = sender.as_bytes().to_vec();
        sender.start_rpc(3, 4, Target::Everyone);
        assert_eq!(sender.as_bytes(), &before[..]);
        assert_eq!(sender.state_violations(), 1);
        assert_eq!(sender.state(), SenderState::Writing);
    }

    #[test]
    fn test_send_while_writing_is_rejected() {
        let mut transport = CaptureTransport::default();
        let mut sender = checked_sender();
        sender.start_rpc(1, 2, Target::Everyone);
        sender.send(&mut transport);
        assert_eq!(transport.sent.len(), 0);
        assert_eq!(sender.state(), SenderState::Writing);
        assert_eq!(sender.state_violations(), 1);
    }

    #[test]
    fn test_double_send_is_rejected() {
        let mut transport = CaptureTransport::default();
        let mut sender = checked_sender();
        sender.start_rpc(1, 2, Target::Everyone);
        sender.end_rpc();
        sender.send(&mut transport);
        assert_eq!(sender.state(), SenderState::Finished);

        sender.send(&mut transport);
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(sender.state(), SenderState::Finished);
        assert_eq!(sender.state_violations(), 1);
    }

    #[test]
    fn test_empty_rpc_is_well_formed() {
        let mut sender = checked_sender();
        sender.start_rpc(10, 20, Target::Everyone);
        sender.end_rpc();

        let bytes = sender.as_bytes().to_vec();
        let (tag, mut envelope) = MessageReader::new(&bytes)
            .read_message()
            .expect("Should read");
        assert_eq!(tag, BROADCAST_TAG);
        envelope.read_i32().expect("Should read");
        let (rpc_tag, mut rpc) = envelope.read_message().expect("Should read");
        assert_eq!(rpc_tag, RPC_TAG);
        assert_eq!(rpc.read_packed_u32().expect("Should read"), 10);
        assert_eq!(rpc.read_u8().expect("Should read"), 20);
        assert_eq!(rpc.remaining(), 0);
    }

    #[test]
    fn test_batched_rpcs_share_one_buffer() {
        let mut transport = CaptureTransport::default();
        let mut sender = checked_sender();

        sender
            .start_rpc(1, 11, Target::Everyone)
            .write_bool(true);
        sender.end_rpc();
        sender
            .start_rpc(2, 22, Target::Client(5))
            .write_str("hi");
        sender.end_rpc();
        sender.send(&mut transport);

        assert_eq!(transport.sent.len(), 1);
        let (_, bytes) = &transport.sent[0];
        let mut reader = MessageReader::new(bytes);

        let (tag, mut envelope) = reader.read_message().expect("Should read");
        assert_eq!(tag, BROADCAST_TAG);
        envelope.read_i32().expect("Should read");
        let (_, mut rpc) = envelope.read_message().expect("Should read");
        assert_eq!(rpc.read_packed_u32().expect("Should read"), 1);
        assert_eq!(rpc.read_u8().expect("Should read"), 11);
        assert!(rpc.read_bool().expect("Should read"));

        let (tag, mut envelope) = reader.read_message().expect("Should read");
        assert_eq!(tag, TARGETED_TAG);
        envelope.read_i32().expect("Should read");
        assert_eq!(envelope.read_packed_i32().expect("Should read"), 5);
        let (_, mut rpc) = envelope.read_message().expect("Should read");
        assert_eq!(rpc.read_packed_u32().expect("Should read"), 2);
        assert_eq!(rpc.read_u8().expect("Should read"), 22);
        assert_eq!(rpc.read_str().expect("Should read"), "hi");

        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_payload_scalars_roundtrip() {
        let mut sender = checked_sender();
        sender
            .start_rpc(99, 1, Target::Everyone)
            .write_u8(0xab)
            .write_i32(-40)
            .write_u64(1 << 40)
            .write_f32(2.5)
            .write_packed_u32(300)
            .write_packed_i32(-1)
            .write_bytes_and_size(&[9, 8, 7]);
        sender.end_rpc();

        let bytes = sender.as_bytes().to_vec();
        let (_, mut envelope) = MessageReader::new(&bytes)
            .read_message()
            .expect("Should read");
        envelope.read_i32().expect("Should read");
        let (_, mut rpc) = envelope.read_message().expect("Should read");
        rpc.read_packed_u32().expect("Should read");
        rpc.read_u8().expect("Should read");

        assert_eq!(rpc.read_u8().expect("Should read"), 0xab);
        assert_eq!(rpc.read_i32().expect("Should read"), -40);
        assert_eq!(rpc.read_u64().expect("Should read"), 1 << 40);
        assert_eq!(rpc.read_f32().expect("Should read"), 2.5);
        assert_eq!(rpc.read_packed_u32().expect("Should read"), 300);
        assert_eq!(rpc.read_packed_i32().expect("Should read"), -1);
        assert_eq!(rpc.read_bytes_and_size().expect("Should read"), &[9, 8, 7]);
        assert_eq!(rpc.remaining(), 0);
    }

    #[test]
    fn test_net_object_writes_packed_id() {
        struct Prop(u32);
        impl NetworkedObject for Prop {
            fn net_id(&self) -> u32 {
                self.0
            }
        }

        let mut sender = checked_sender();
        sender
            .start_rpc(1, 1, Target::Everyone)
            .write_net_object(&Prop(200));
        sender.end_rpc();

        let bytes = sender.as_bytes().to_vec();
        let (_, mut envelope) = MessageReader::new(&bytes)
            .read_message()
            .expect("Should read");
        envelope.read_i32().expect("Should read");
        let (_, mut rpc) = envelope.read_message().expect("Should read");
        rpc.read_packed_u32().expect("Should read");
        rpc.read_u8().expect("Should read");
        assert_eq!(rpc.read_packed_u32().expect("Should read"), 200);
    }

    #[test]
    fn test_unchecked_sender_skips_validation() {
        let mut sender = RpcSender::create(SESSION, Delivery::Unreliable, true);
        // No start_rpc; a checked sender would absorb this.
        sender.write_u8(0xff);
        assert_eq!(sender.as_bytes(), &[0xff]);
        assert_eq!(sender.state_violations(), 0);
    }

    #[test]
    fn test_unchecked_double_send_delivers_once() {
        // Even unchecked, a released writer can't be sent again; the call just logs.
        let mut transport = CaptureTransport::default();
        let mut sender = RpcSender::create(SESSION, Delivery::Reliable, true);
        sender.send(&mut transport);
        sender.send(&mut transport);
        assert_eq!(transport.sent.len(), 1);
    }

    #[test]
    fn test_delivery_reaches_the_transport() {
        let mut transport = CaptureTransport::default();
        let mut sender = RpcSender::create(SESSION, Delivery::Unreliable, false);
        sender.send(&mut transport);
        assert_eq!(transport.sent[0].0, Delivery::Unreliable);
    }
}
