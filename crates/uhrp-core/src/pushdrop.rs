//! PushDrop token codec
//!
//! A PushDrop token embeds arbitrary data fields in a spendable locking
//! script. The key-first layout handled here is:
//!
//! ```text
//! <locking key> OP_CHECKSIG <field 0> <field 1> ... <field n> OP_2DROP ... [OP_DROP]
//! ```
//!
//! The codec only extracts and produces the ordered field list; what the
//! fields mean is up to the caller (see [`crate::commitment`]).

use crate::error::DecodeError;

/// Script opcodes used by the codec
pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_2DROP: u8 = 0x6d;
    pub const OP_DROP: u8 = 0x75;
    pub const OP_CHECKSIG: u8 = 0xac;

    /// Largest length a single direct-push opcode can carry
    pub const MAX_DIRECT_PUSH: usize = 0x4b;
}

/// Length of a compressed public key
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Length of an uncompressed public key
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Whether `key` has the length of a compressed or uncompressed public key
pub fn is_locking_key_len(key: &[u8]) -> bool {
    matches!(key.len(), COMPRESSED_KEY_LEN | UNCOMPRESSED_KEY_LEN)
}

use opcodes::*;

/// A single parsed script element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Data(&'a [u8]),
    Op(u8),
}

/// Cursor over script bytes yielding chunks
struct ChunkReader<'a> {
    script: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(script: &'a [u8]) -> Self {
        Self { script, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.script.len()
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.script.len() - self.pos;
        if len > available {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let data = &self.script[self.pos..self.pos + len];
        self.pos += len;
        Ok(data)
    }

    fn take_len_le<const N: usize>(&mut self) -> Result<usize, DecodeError> {
        let bytes = self.take(N)?;
        let mut buf = [0u8; 8];
        buf[..N].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf) as usize)
    }

    fn next_chunk(&mut self) -> Result<Chunk<'a>, DecodeError> {
        let opcode = self.take(1)?[0];
        let chunk = match opcode {
            0x01..=0x4b => Chunk::Data(self.take(opcode as usize)?),
            OP_PUSHDATA1 => {
                let len = self.take_len_le::<1>()?;
                Chunk::Data(self.take(len)?)
            }
            OP_PUSHDATA2 => {
                let len = self.take_len_le::<2>()?;
                Chunk::Data(self.take(len)?)
            }
            OP_PUSHDATA4 => {
                let len = self.take_len_le::<4>()?;
                Chunk::Data(self.take(len)?)
            }
            op => Chunk::Op(op),
        };
        Ok(chunk)
    }

    fn peek_chunk(&self) -> Result<Option<Chunk<'a>>, DecodeError> {
        if self.is_done() {
            return Ok(None);
        }
        let mut lookahead = ChunkReader {
            script: self.script,
            pos: self.pos,
        };
        lookahead.next_chunk().map(Some)
    }
}

/// Value a small-number opcode pushes, if `op` is one
fn small_number_field(op: u8) -> Option<Vec<u8>> {
    match op {
        OP_0 => Some(vec![0]),
        OP_1NEGATE => Some(vec![0x81]),
        OP_1..=OP_16 => Some(vec![op - (OP_1 - 1)]),
        _ => None,
    }
}

fn is_drop(chunk: Option<Chunk<'_>>) -> bool {
    matches!(chunk, Some(Chunk::Op(OP_DROP)) | Some(Chunk::Op(OP_2DROP)))
}

/// Append a minimally encoded push of `data` to `script`
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    match data {
        [] | [0] => script.push(OP_0),
        [n @ 1..=16] => script.push(OP_1 - 1 + n),
        [0x81] => script.push(OP_1NEGATE),
        _ => {
            let len = data.len();
            if len <= MAX_DIRECT_PUSH {
                script.push(len as u8);
            } else if len <= u8::MAX as usize {
                script.push(OP_PUSHDATA1);
                script.push(len as u8);
            } else if len <= u16::MAX as usize {
                script.push(OP_PUSHDATA2);
                script.extend_from_slice(&(len as u16).to_le_bytes());
            } else {
                script.push(OP_PUSHDATA4);
                script.extend_from_slice(&(len as u32).to_le_bytes());
            }
            script.extend_from_slice(data);
        }
    }
}

/// A decoded PushDrop token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushDropToken {
    /// Public key the token is locked to
    pub locking_key: Vec<u8>,
    /// Ordered data fields
    pub fields: Vec<Vec<u8>>,
}

impl PushDropToken {
    pub fn new(locking_key: impl Into<Vec<u8>>, fields: Vec<Vec<u8>>) -> Self {
        Self {
            locking_key: locking_key.into(),
            fields,
        }
    }

    /// Decode a locking script into its key and ordered fields
    pub fn decode(script: &[u8]) -> Result<Self, DecodeError> {
        if script.is_empty() {
            return Err(DecodeError::Empty);
        }
        let mut reader = ChunkReader::new(script);

        let locking_key = match reader.next_chunk()? {
            Chunk::Data(key) if is_locking_key_len(key) => key.to_vec(),
            Chunk::Data(key) if !key.is_empty() => {
                return Err(DecodeError::InvalidLockingKey { len: key.len() });
            }
            _ => return Err(DecodeError::MissingLockingKey),
        };
        if reader.next_chunk()? != Chunk::Op(OP_CHECKSIG) {
            return Err(DecodeError::MissingChecksig);
        }

        let mut fields = Vec::new();
        loop {
            if reader.is_done() {
                return Err(if fields.is_empty() {
                    DecodeError::NoFields
                } else {
                    DecodeError::MissingDrop
                });
            }
            let offset = reader.offset();
            let field = match reader.next_chunk()? {
                Chunk::Data(data) => data.to_vec(),
                Chunk::Op(OP_DROP | OP_2DROP) if fields.is_empty() => {
                    return Err(DecodeError::NoFields);
                }
                Chunk::Op(opcode) => small_number_field(opcode)
                    .ok_or(DecodeError::UnexpectedOpcode { opcode, offset })?,
            };
            fields.push(field);

            if is_drop(reader.peek_chunk()?) {
                break;
            }
        }

        Ok(Self {
            locking_key,
            fields,
        })
    }

    /// Encode into a locking script
    ///
    /// Each pair of fields is dropped with `OP_2DROP`, a leftover single
    /// field with `OP_DROP`.
    pub fn encode(&self) -> Vec<u8> {
        let payload: usize = self.fields.iter().map(|f| f.len() + 5).sum();
        let mut script = Vec::with_capacity(self.locking_key.len() + payload + 8);

        push_data(&mut script, &self.locking_key);
        script.push(OP_CHECKSIG);
        for field in &self.fields {
            push_data(&mut script, field);
        }

        let mut remaining = self.fields.len();
        while remaining > 1 {
            script.push(OP_2DROP);
            remaining -= 2;
        }
        if remaining == 1 {
            script.push(OP_DROP);
        }
        script
    }
}
