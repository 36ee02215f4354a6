//! Byte text on the command line.

use anyhow::{Context, Result};
use clap::ValueEnum;
use idlcodec_events::{decode_payload, PayloadEncoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataEncoding {
    Hex,
    Base64,
    Base58,
}

pub fn decode_bytes(text: &str, encoding: DataEncoding) -> Result<Vec<u8>> {
    let text = text.trim();
    match encoding {
        DataEncoding::Hex => {
            hex::decode(text.strip_prefix("0x").unwrap_or(text)).context("invalid hex")
        }
        DataEncoding::Base64 => Ok(decode_payload(text, PayloadEncoding::Base64)?),
        DataEncoding::Base58 => Ok(decode_payload(text, PayloadEncoding::Base58)?),
    }
}

pub fn encode_bytes(bytes: &[u8], encoding: DataEncoding) -> String {
    match encoding {
        DataEncoding::Hex => format!("0x{}", hex::encode(bytes)),
        DataEncoding::Base64 => {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
        DataEncoding::Base58 => bs58::encode(bytes).into_string(),
    }
}

/// Read `arg` as a file path, or stdin when it is `-`.
pub fn read_source(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut text = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut text).context("read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("read '{arg}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_encodings_agree() {
        let bytes = vec![0, 1, 2, 0xFE];
        for enc in [DataEncoding::Hex, DataEncoding::Base64, DataEncoding::Base58] {
            let text = encode_bytes(&bytes, enc);
            assert_eq!(decode_bytes(&text, enc).unwrap(), bytes, "{enc:?}");
        }
        assert_eq!(decode_bytes("aabb", DataEncoding::Hex).unwrap(), vec![0xAA, 0xBB]);
        assert!(decode_bytes("zz", DataEncoding::Hex).is_err());
    }
}
