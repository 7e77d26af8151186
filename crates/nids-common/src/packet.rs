//! Normalized packet view
//!
//! The decoder owns the capture buffers; detection only ever borrows
//! them for the duration of one evaluation.

/// Transport header fields detection options care about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpHeader {
    /// Source port
    pub src_port: u16,
    /// Destination port
    pub dst_port: u16,
}

/// A decoded packet as seen by detection options.
///
/// Layers the decoder could not find are `None`; options treat a missing
/// layer as "nothing to inspect", never as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Packet<'a> {
    /// TCP header, if the packet carried one
    pub tcp: Option<TcpHeader>,
    /// Normalized application payload
    pub payload: Option<&'a [u8]>,
}

impl<'a> Packet<'a> {
    /// Create a TCP packet carrying `payload`
    pub fn tcp(src_port: u16, dst_port: u16, payload: &'a [u8]) -> Self {
        Self {
            tcp: Some(TcpHeader { src_port, dst_port }),
            payload: Some(payload),
        }
    }

    /// Payload bytes, or `None` when absent or empty
    #[inline]
    pub fn data(&self) -> Option<&'a [u8]> {
        self.payload.filter(|p| !p.is_empty())
    }

    /// Payload size in bytes (`0` when absent)
    #[inline]
    pub fn dsize(&self) -> usize {
        self.payload.map_or(0, <[u8]>::len)
    }
}
