//! Protobuf wire-format primitives
//!
//! The clock firmware speaks standard protocol-buffer binary encoding for
//! command payloads and the settings response. Only the two wire types the
//! schema uses are implemented: varint (bools, integers, zigzag sint32) and
//! length-delimited (bytes, nested messages).

/// Varint wire type.
pub const WIRE_VARINT: u8 = 0;
/// Length-delimited wire type.
pub const WIRE_LEN: u8 = 2;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("varint overruns payload")]
    TruncatedVarint,
    #[error("payload ends mid-field")]
    Truncated,
    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),
    #[error("empty payload")]
    Empty,
}

pub fn put_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

pub fn put_tag(buf: &mut Vec<u8>, field: u32, wire: u8) {
    put_varint(buf, ((field as u64) << 3) | wire as u64);
}

/// Unsigned integer field. Zero values are omitted (proto3 semantics).
pub fn put_uint(buf: &mut Vec<u8>, field: u32, v: u64) {
    if v != 0 {
        put_tag(buf, field, WIRE_VARINT);
        put_varint(buf, v);
    }
}

pub fn put_bool(buf: &mut Vec<u8>, field: u32, v: bool) {
    put_uint(buf, field, v as u64);
}

/// Signed integer field, zigzag-encoded. Zero values are omitted.
pub fn put_sint(buf: &mut Vec<u8>, field: u32, v: i32) {
    put_uint(buf, field, zigzag(v));
}

/// Bytes field. Empty values are omitted.
pub fn put_bytes(buf: &mut Vec<u8>, field: u32, v: &[u8]) {
    if !v.is_empty() {
        put_tag(buf, field, WIRE_LEN);
        put_varint(buf, v.len() as u64);
        buf.extend_from_slice(v);
    }
}

/// Nested message field. Always emitted, even when the body is empty, so a
/// present-but-default submessage survives the round trip.
pub fn put_message(buf: &mut Vec<u8>, field: u32, body: &[u8]) {
    put_tag(buf, field, WIRE_LEN);
    put_varint(buf, body.len() as u64);
    buf.extend_from_slice(body);
}

pub fn zigzag(v: i32) -> u64 {
    ((v << 1) ^ (v >> 31)) as u32 as u64
}

pub fn unzigzag(v: u64) -> i32 {
    let v = v as u32;
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Cursor over an encoded message body.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read the next field tag, returning `(field_number, wire_type)`.
    pub fn next_field(&mut self) -> Result<(u32, u8), DecodeError> {
        let key = self.varint()?;
        Ok(((key >> 3) as u32, (key & 0x07) as u8))
    }

    pub fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut v: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self.buf.get(self.pos).ok_or(DecodeError::TruncatedVarint)?;
            self.pos += 1;
            v |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
            if shift >= 64 {
                return Err(DecodeError::TruncatedVarint);
            }
        }
    }

    pub fn sint(&mut self) -> Result<i32, DecodeError> {
        Ok(unzigzag(self.varint()?))
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()? as usize;
        let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated)?;
        if end > self.buf.len() {
            return Err(DecodeError::Truncated);
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Skip a field of the given wire type. Unknown fields are tolerated so a
    /// newer firmware schema still decodes.
    pub fn skip(&mut self, wire: u8) -> Result<(), DecodeError> {
        match wire {
            WIRE_VARINT => {
                self.varint()?;
                Ok(())
            }
            WIRE_LEN => {
                self.bytes()?;
                Ok(())
            }
            other => Err(DecodeError::UnsupportedWireType(other)),
        }
    }
}
