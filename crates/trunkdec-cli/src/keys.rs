//! `KEYID:KEYHEX` parsing.

use anyhow::{bail, Context};

/// Split a key specification into its ID and key material.
///
/// The ID is hex; the key is an even-length hex string whose byte length
/// selects the cipher family downstream.
pub fn parse_key_spec(spec: &str) -> anyhow::Result<(u16, Vec<u8>)> {
    let Some((id_text, key_text)) = spec.split_once(':') else {
        bail!("key must be KEYID:KEYHEX, got \"{spec}\"");
    };

    let key_id = u16::from_str_radix(id_text, 16)
        .with_context(|| format!("invalid key id \"{id_text}\""))?;

    let key = hex::decode(key_text).with_context(|| format!("invalid key hex \"{key_text}\""))?;
    if key.is_empty() {
        bail!("key material is empty in \"{spec}\"");
    }

    Ok((key_id, key))
}
