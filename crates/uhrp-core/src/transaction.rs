//! Ledger transactions as seen by the topic manager
//!
//! The overlay hands the topic manager raw transaction bytes. Decoding is
//! behind the [`TransactionDecoder`] trait; [`RawTransactionDecoder`]
//! handles the standard serialization:
//!
//! ```text
//! version:u32le | varint n_in | inputs | varint n_out | outputs | lock_time:u32le
//! input  = prev txid (32, wire order) | prev index:u32le | varint len | script | sequence:u32le
//! output = satoshis:u64le | varint len | locking script
//! ```

use sha2::{Digest, Sha256};

use crate::error::TransactionError;
use crate::outpoint::{Txid, UtxoReference};

/// A transaction input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Output being spent
    pub source: UtxoReference,
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: Vec<u8>,
}

impl TxOutput {
    pub fn new(satoshis: u64, locking_script: Vec<u8>) -> Self {
        Self {
            satoshis,
            locking_script,
        }
    }
}

/// A decoded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }
}

impl Transaction {
    /// Create a version 1 transaction with the given outputs and no inputs
    pub fn with_outputs(outputs: Vec<TxOutput>) -> Self {
        Self {
            outputs,
            ..Default::default()
        }
    }

    /// Parse the standard raw serialization
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);

        let version = reader.read_u32_le()?;

        let input_count = reader.read_var_int()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let txid = Txid::from_wire_bytes(reader.read_array::<32>()?);
            let output_index = reader.read_u32_le()?;
            let unlocking_script = reader.read_var_bytes()?;
            let sequence = reader.read_u32_le()?;
            inputs.push(TxInput {
                source: UtxoReference::new(txid, output_index),
                unlocking_script,
                sequence,
            });
        }

        let output_count = reader.read_var_int()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let satoshis = reader.read_u64_le()?;
            let locking_script = reader.read_var_bytes()?;
            outputs.push(TxOutput {
                satoshis,
                locking_script,
            });
        }

        let lock_time = reader.read_u32_le()?;

        if reader.remaining() > 0 {
            return Err(TransactionError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Parse from a hex string
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TransactionError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to the standard raw format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());

        write_var_int(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.source.txid.to_wire_bytes());
            out.extend_from_slice(&input.source.output_index.to_le_bytes());
            write_var_int(&mut out, input.unlocking_script.len() as u64);
            out.extend_from_slice(&input.unlocking_script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_var_int(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.satoshis.to_le_bytes());
            write_var_int(&mut out, output.locking_script.len() as u64);
            out.extend_from_slice(&output.locking_script);
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Double SHA-256 of the raw serialization, in display order
    pub fn txid(&self) -> Txid {
        let first = Sha256::digest(self.to_bytes());
        Txid::from_wire_bytes(Sha256::digest(first).into())
    }
}

/// Turns raw transaction bytes delivered by the overlay into a [`Transaction`]
pub trait TransactionDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Transaction, TransactionError>;
}

/// Decoder for the standard raw serialization
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTransactionDecoder;

impl TransactionDecoder for RawTransactionDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Transaction, TransactionError> {
        Transaction::from_bytes(bytes)
    }
}

fn write_var_int(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], TransactionError> {
        if len > self.remaining() {
            return Err(TransactionError::UnexpectedEof {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_slice(N)?);
        Ok(buf)
    }

    fn read_u32_le(&mut self) -> Result<u32, TransactionError> {
        self.read_array::<4>().map(u32::from_le_bytes)
    }

    fn read_u64_le(&mut self) -> Result<u64, TransactionError> {
        self.read_array::<8>().map(u64::from_le_bytes)
    }

    fn read_var_int(&mut self) -> Result<u64, TransactionError> {
        let prefix = self.read_array::<1>()?[0];
        Ok(match prefix {
            0xfd => self.read_array::<2>().map(u16::from_le_bytes)? as u64,
            0xfe => self.read_u32_le()? as u64,
            0xff => self.read_u64_le()?,
            n => n as u64,
        })
    }

    fn read_var_bytes(&mut self) -> Result<Vec<u8>, TransactionError> {
        let len = self.read_var_int()?;
        let len = usize::try_from(len).map_err(|_| TransactionError::LengthOverflow(len))?;
        self.read_slice(len).map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                source: UtxoReference::new(Txid::new([9; 32]), 3),
                unlocking_script: vec![0x51; 10],
                sequence: u32::MAX,
            }],
            outputs: vec![
                TxOutput::new(1, vec![0xac; 3]),
                TxOutput::new(546, vec![0x6a; 300]),
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn test_round_trip() {
        let tx = sample();
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
        assert_eq!(Transaction::from_hex(&tx.to_hex()).unwrap(), tx);
    }

    #[test]
    fn test_large_script_uses_three_byte_varint() {
        let bytes = sample().to_bytes();
        // 300 = 0x012c, encoded as fd 2c 01
        let needle = [0xfd, 0x2c, 0x01];
        assert!(bytes.windows(3).any(|w| w == needle));
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_bytes();
        let err = Transaction::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, TransactionError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert_eq!(
            Transaction::from_bytes(&bytes),
            Err(TransactionError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_bad_hex() {
        assert!(matches!(
            Transaction::from_hex("xyz"),
            Err(TransactionError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_txid_of_known_transaction() {
        let genesis_coinbase = concat!(
            "01000000010000000000000000000000000000000000000000000000000000000000000000",
            "ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368",
            "616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f75742066",
            "6f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a671",
            "30b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c38",
            "4df7ba0b8d578a4c702b6bf11d5fac00000000",
        );
        let tx = Transaction::from_hex(genesis_coinbase).unwrap();
        assert_eq!(
            tx.txid().to_hex(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
    }

    #[test]
    fn test_txid_changes_with_contents() {
        let mut tx = sample();
        let before = tx.txid();
        assert_eq!(before, sample().txid());
        tx.lock_time = 1;
        assert_ne!(tx.txid(), before);
    }

    #[test]
    fn test_decoder_trait() {
        let decoder = RawTransactionDecoder;
        let tx = Transaction::with_outputs(vec![TxOutput::new(1, vec![0x00])]);
        assert_eq!(decoder.decode(&tx.to_bytes()).unwrap(), tx);
    }
}
