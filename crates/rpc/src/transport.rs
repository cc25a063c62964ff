use parlor_framing::MessageWriter;

/// The delivery seam between composition and the connection.
///
/// One shot: deliver the finished buffer now, or tear the connection down if that's impossible.
/// The composer never retries; retransmission of reliable buffers is the connection's business.
pub trait Transport {
    fn send_or_disconnect(&mut self, writer: &MessageWriter);
}
