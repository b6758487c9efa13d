use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};
use token_ledger::Identity;

pub fn identity_of(key: &SigningKey) -> Identity {
    Identity::from(key.verifying_key().to_bytes())
}

/// A random identity for a new record, the public half of a throwaway key.
pub fn fresh_identity() -> Identity {
    identity_of(&SigningKey::generate(&mut OsRng))
}

/// Write `sk.hex` and `pk.hex` into `out_dir`; returns the public identity.
pub fn keygen(out_dir: &Path) -> Result<Identity> {
    fs::create_dir_all(out_dir).with_context(|| format!("mkdir {}", out_dir.display()))?;

    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    let identity = identity_of(&sk);

    fs::write(out_dir.join("sk.hex"), hex::encode(sk_bytes)).context("write sk.hex")?;
    fs::write(out_dir.join("pk.hex"), identity.to_string()).context("write pk.hex")?;
    Ok(identity)
}

pub fn parse_sk_hex(sk_hex: &str) -> Result<SigningKey> {
    let sk_bytes = hex::decode(sk_hex.trim()).context("invalid sk-hex")?;
    if sk_bytes.len() != 32 {
        bail!("sk-hex must be 32 bytes (64 hex chars), got {}", sk_bytes.len());
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&sk_bytes);
    Ok(SigningKey::from_bytes(&arr))
}

/// Load the signer from a key file written by [`keygen`].
pub fn load_signer(path: &Path) -> Result<SigningKey> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read keypair {} (run `tledger keygen`?)", path.display()))?;
    parse_sk_hex(&text).with_context(|| format!("keypair {}", path.display()))
}
