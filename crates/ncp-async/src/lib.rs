//! Transport-agnostic packet framing, built around an internal [`bytes::BytesMut`]
//! accumulation buffer and a two-phase read of the fixed NCP packet header
//! followed by the variable-length body (see `ncp_pdu::peek_packet_size`).

use std::io;

use bytes::BytesMut;
use ncp_pdu::{decode_packet, encode_packet, peek_packet_size, Packet, PACKET_HEADER_LEN};
use tracing::trace;

pub type FramedResult<T> = io::Result<T>;

/// Reads from an underlying stream into a shared accumulation buffer.
pub trait FramedRead {
    type ReadFut<'read>: core::future::Future<Output = io::Result<usize>> + 'read
    where
        Self: 'read;

    /// Reads from the stream and fills `buf`, returning the number of bytes
    /// read (`0` signals EOF).
    ///
    /// # Cancel safety
    ///
    /// Cancel safe: if dropped before completion, no data was read.
    fn read<'a>(&'a mut self, buf: &'a mut BytesMut) -> Self::ReadFut<'a>;
}

/// Writes a full buffer to an underlying stream.
pub trait FramedWrite {
    type WriteAllFut<'write>: core::future::Future<Output = io::Result<()>> + 'write
    where
        Self: 'write;

    /// Writes `buf` to the stream in its entirety.
    ///
    /// # Cancel safety
    ///
    /// Not cancel safe: if dropped mid-write, the buffer may have been
    /// partially written, and a later call starts over from the beginning.
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> Self::WriteAllFut<'a>;
}

/// Adapts a concrete transport type (e.g. a Tokio socket) to `Framed`'s needs.
pub trait StreamWrapper: Sized {
    type InnerStream;

    fn from_inner(stream: Self::InnerStream) -> Self;
    fn into_inner(self) -> Self::InnerStream;
    fn get_inner(&self) -> &Self::InnerStream;
    fn get_inner_mut(&mut self) -> &mut Self::InnerStream;
}

/// A byte stream wrapped with packet framing: accumulates inbound bytes and
/// hands out one complete [`Packet`] at a time.
pub struct Framed<S> {
    stream: S,
    buf: BytesMut,
}

impl<S> Framed<S> {
    /// The bytes accumulated so far but not yet consumed into a packet.
    pub fn peek(&self) -> &[u8] {
        &self.buf
    }
}

impl<S> Framed<S>
where
    S: StreamWrapper,
{
    pub fn new(stream: S::InnerStream) -> Self {
        Self::new_with_leftover(stream, BytesMut::new())
    }

    pub fn new_with_leftover(stream: S::InnerStream, leftover: BytesMut) -> Self {
        Self {
            stream: S::from_inner(stream),
            buf: leftover,
        }
    }

    pub fn into_inner(self) -> (S::InnerStream, BytesMut) {
        (self.stream.into_inner(), self.buf)
    }

    pub fn get_inner(&self) -> (&S::InnerStream, &BytesMut) {
        (self.stream.get_inner(), &self.buf)
    }

    pub fn get_inner_mut(&mut self) -> (&mut S::InnerStream, &mut BytesMut) {
        (self.stream.get_inner_mut(), &mut self.buf)
    }

    pub fn into_inner_no_leftover(self) -> S::InnerStream {
        let (stream, leftover) = self.into_inner();
        debug_assert_eq!(leftover.len(), 0, "unexpected leftover");
        stream
    }
}

impl<S> Framed<S>
where
    S: FramedRead,
{
    /// Accumulates at least `length` bytes and returns exactly `length`
    /// bytes, keeping any leftover in the internal buffer.
    ///
    /// # Cancel safety
    ///
    /// Cancel safe — any data read is retained in the internal buffer.
    pub async fn read_exact(&mut self, length: usize) -> io::Result<BytesMut> {
        loop {
            if self.buf.len() >= length {
                return Ok(self.buf.split_to(length));
            }
            self.buf.reserve(length - self.buf.len());

            let read = self.stream.read(&mut self.buf).await?;
            if read == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough bytes"));
            }
        }
    }

    /// Reads one complete NCP packet using the two-phase header/body
    /// pattern: accumulate the fixed 32-byte header, peek its declared
    /// size, then accumulate the remainder.
    ///
    /// # Cancel safety
    ///
    /// Cancel safe — partial reads are retained in the internal buffer.
    pub async fn read_packet(&mut self, raw: bool) -> FramedResult<Packet> {
        let header = self.read_exact(PACKET_HEADER_LEN).await?;
        let total_size = peek_packet_size(&header)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?
            as usize;
        if total_size < PACKET_HEADER_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "packet size smaller than header"));
        }
        let body = self.read_exact(total_size - PACKET_HEADER_LEN).await?;

        let mut buf = BytesMut::with_capacity(total_size);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&body);

        trace!(total_size, "packet received");
        decode_packet(&buf, raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

impl<S> FramedWrite for Framed<S>
where
    S: FramedWrite,
{
    type WriteAllFut<'write>
        = S::WriteAllFut<'write>
    where
        Self: 'write;

    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> Self::WriteAllFut<'a> {
        self.stream.write_all(buf)
    }
}

impl<S> Framed<S>
where
    S: FramedWrite,
{
    /// Encodes `packet` and writes it to the stream as a single frame.
    pub async fn write_packet(&mut self, packet: &Packet) -> FramedResult<()> {
        let bytes = encode_packet(packet).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        trace!(len = bytes.len(), "packet sent");
        self.write_all(&bytes).await
    }
}

