//! Content availability commitments
//!
//! [`CommitmentToken`] is the typed view of a PushDrop token's fields and
//! the one place where field validation happens. [`CommitmentRecord`] is
//! the row the lookup index keeps for each live token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::outpoint::{Txid, UtxoReference};
use crate::pushdrop::PushDropToken;

/// Length of the content hash in bytes
pub const CONTENT_HASH_LEN: usize = 32;

/// A validated UHRP commitment
///
/// Field positions in the token: protocol address, content hash, URL,
/// expiry (decimal seconds), size (decimal bytes). Any further fields,
/// such as a trailing signature, are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentToken {
    pub protocol_address: String,
    pub content_hash: [u8; CONTENT_HASH_LEN],
    pub url: String,
    pub expiry_unix_secs: i64,
    pub size_bytes: u64,
}

fn utf8_field(bytes: &[u8], name: &'static str) -> Result<String, TokenError> {
    let text = std::str::from_utf8(bytes).map_err(|_| TokenError::InvalidUtf8(name))?;
    if text.is_empty() {
        return Err(TokenError::EmptyField(name));
    }
    Ok(text.to_string())
}

fn integer_field<T: std::str::FromStr>(bytes: &[u8], name: &'static str) -> Result<T, TokenError> {
    let text = std::str::from_utf8(bytes).map_err(|_| TokenError::InvalidUtf8(name))?;
    text.parse().map_err(|_| TokenError::InvalidInteger {
        field: name,
        value: text.to_string(),
    })
}

impl CommitmentToken {
    /// Minimum number of fields a commitment token carries
    pub const FIELD_COUNT: usize = 5;

    /// Interpret decoded PushDrop fields as a commitment
    pub fn from_fields(fields: &[Vec<u8>]) -> Result<Self, TokenError> {
        if fields.len() < Self::FIELD_COUNT {
            return Err(TokenError::TooFewFields {
                expected: Self::FIELD_COUNT,
                actual: fields.len(),
            });
        }

        let protocol_address = utf8_field(&fields[0], "protocol_address")?;
        let content_hash: [u8; CONTENT_HASH_LEN] =
            fields[1]
                .as_slice()
                .try_into()
                .map_err(|_| TokenError::InvalidHashLength {
                    expected: CONTENT_HASH_LEN,
                    actual: fields[1].len(),
                })?;
        let url = utf8_field(&fields[2], "url")?;
        let expiry_unix_secs: i64 = integer_field(&fields[3], "expiry")?;
        if expiry_unix_secs <= 0 {
            return Err(TokenError::NonPositiveExpiry(expiry_unix_secs));
        }
        let size_bytes = integer_field(&fields[4], "size")?;

        Ok(Self {
            protocol_address,
            content_hash,
            url,
            expiry_unix_secs,
            size_bytes,
        })
    }

    /// Decode and validate a locking script in one step
    pub fn from_locking_script(script: &[u8]) -> Result<Self, TokenError> {
        let token = PushDropToken::decode(script)?;
        Self::from_fields(&token.fields)
    }

    /// Positional field encoding
    pub fn to_fields(&self) -> Vec<Vec<u8>> {
        vec![
            self.protocol_address.as_bytes().to_vec(),
            self.content_hash.to_vec(),
            self.url.as_bytes().to_vec(),
            self.expiry_unix_secs.to_string().into_bytes(),
            self.size_bytes.to_string().into_bytes(),
        ]
    }

    /// Build a PushDrop locking script carrying this commitment
    pub fn to_locking_script(&self, locking_key: &[u8]) -> Vec<u8> {
        PushDropToken::new(locking_key, self.to_fields()).encode()
    }

    /// Lower-case hex of the content hash
    pub fn content_hash_hex(&self) -> String {
        hex::encode(self.content_hash)
    }
}

/// One admitted, unspent commitment as kept by the lookup index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub txid: Txid,
    pub output_index: u32,
    pub protocol_address: String,
    content_hash: [u8; CONTENT_HASH_LEN],
    content_hash_hex: String,
    pub url: String,
    pub expiry_unix_secs: i64,
    pub size_bytes: u64,
    /// When the index stored this record (informational)
    pub created_at: DateTime<Utc>,
}

impl CommitmentRecord {
    /// Create a record for `token` found at `outpoint`
    pub fn new(outpoint: UtxoReference, token: CommitmentToken, created_at: DateTime<Utc>) -> Self {
        let content_hash_hex = token.content_hash_hex();
        Self {
            txid: outpoint.txid,
            output_index: outpoint.output_index,
            protocol_address: token.protocol_address,
            content_hash: token.content_hash,
            content_hash_hex,
            url: token.url,
            expiry_unix_secs: token.expiry_unix_secs,
            size_bytes: token.size_bytes,
            created_at,
        }
    }

    /// The record's key
    pub fn outpoint(&self) -> UtxoReference {
        UtxoReference::new(self.txid, self.output_index)
    }

    pub fn content_hash(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.content_hash
    }

    /// Lower-case hex of [`content_hash`](Self::content_hash)
    pub fn content_hash_hex(&self) -> &str {
        &self.content_hash_hex
    }

    /// Whether the commitment is still advertised at `now_unix_secs`
    pub fn is_active_at(&self, now_unix_secs: i64) -> bool {
        self.expiry_unix_secs > now_unix_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> CommitmentToken {
        CommitmentToken {
            protocol_address: "1UHRPYnMHPuQ5Tgb3AF8JXqwKkmZVy5hG".to_string(),
            content_hash: [0xab; 32],
            url: "https://cdn.example.com/files/abc".to_string(),
            expiry_unix_secs: 1_900_000_000,
            size_bytes: 4096,
        }
    }

    #[test]
    fn test_script_round_trip() {
        let token = sample_token();
        let script = token.to_locking_script(&[0x02; 33]);
        assert_eq!(CommitmentToken::from_locking_script(&script).unwrap(), token);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let token = sample_token();
        let mut fields = token.to_fields();
        fields.push(vec![0x30; 71]);
        assert_eq!(CommitmentToken::from_fields(&fields).unwrap(), token);
    }

    #[test]
    fn test_too_few_fields() {
        let fields = sample_token().to_fields()[..4].to_vec();
        assert_eq!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::TooFewFields {
                expected: 5,
                actual: 4
            })
        );
    }

    #[test]
    fn test_hash_length_checked() {
        let mut fields = sample_token().to_fields();
        fields[1] = vec![0xab; 20];
        assert_eq!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::InvalidHashLength {
                expected: 32,
                actual: 20
            })
        );
    }

    #[test]
    fn test_url_must_be_text() {
        let mut fields = sample_token().to_fields();
        fields[2] = vec![0xff, 0xfe];
        assert_eq!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::InvalidUtf8("url"))
        );

        fields[2] = Vec::new();
        assert_eq!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::EmptyField("url"))
        );
    }

    #[test]
    fn test_expiry_and_size_parsing() {
        let mut fields = sample_token().to_fields();
        fields[3] = b"tomorrow".to_vec();
        assert!(matches!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::InvalidInteger {
                field: "expiry",
                ..
            })
        ));

        fields[3] = b"0".to_vec();
        assert_eq!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::NonPositiveExpiry(0))
        );

        fields[3] = b"1900000000".to_vec();
        fields[4] = b"-1".to_vec();
        assert!(matches!(
            CommitmentToken::from_fields(&fields),
            Err(TokenError::InvalidInteger { field: "size", .. })
        ));
    }

    #[test]
    fn test_record_hex_matches_hash() {
        let token = CommitmentToken {
            content_hash: {
                let mut hash = [0u8; 32];
                hash[0] = 0xAB;
                hash[1] = 0x12;
                hash
            },
            ..sample_token()
        };
        let outpoint = UtxoReference::new(Txid::new([7; 32]), 1);
        let record = CommitmentRecord::new(outpoint, token, Utc::now());

        assert!(record.content_hash_hex().starts_with("ab12"));
        assert_eq!(record.content_hash_hex(), hex::encode(record.content_hash()));
        assert_eq!(record.outpoint(), outpoint);
    }

    #[test]
    fn test_is_active_is_strict() {
        let outpoint = UtxoReference::new(Txid::new([1; 32]), 0);
        let record = CommitmentRecord::new(outpoint, sample_token(), Utc::now());
        assert!(record.is_active_at(1_899_999_999));
        assert!(!record.is_active_at(1_900_000_000));
    }
}
