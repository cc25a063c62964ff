/// How the transport should put a finished buffer on the wire.
///
/// Fixed when the writer is acquired and carried alongside the buffer; never encoded into the
/// bytes themselves.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Delivery {
    /// Resent until acknowledged.
    Reliable,

    /// Fire and forget.
    Unreliable,
}
