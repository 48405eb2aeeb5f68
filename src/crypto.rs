//! Thin wrapper around the external asymmetric-encryption engine and the
//! compressor. On write: compress, then encrypt. On read: decrypt, then
//! decompress. Either half failing collapses to a single I/O-shaped error
//! so callers never need to distinguish the two.
//!
//! The encryption half is behind the [`EncryptionEngine`] trait rather than
//! hardcoded to `gpg`, mirroring how the teacher's `SDBTreeFs` is generic
//! over its own `Crypter`: the production engine shells out to the real
//! `gpg` binary, while tests swap in an in-process stub so the rest of the
//! filesystem can be exercised without a configured GPG keyring.

use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::{fs, thread};

/// A recipient-key-based encryption backend. `gpg` is the concrete engine
/// this filesystem ships; any other engine offering the same two calls can
/// stand in behind this trait.
pub trait EncryptionEngine {
    fn encrypt(&self, keyid: &str, data: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Shells out to the system `gpg` binary, the same approach the
/// distillation source's `python-gnupg` binding takes one layer down.
pub struct GpgEngine;

impl EncryptionEngine for GpgEngine {
    fn encrypt(&self, keyid: &str, data: &[u8]) -> Result<Vec<u8>> {
        run_gpg(
            &[
                "--batch",
                "--yes",
                "--trust-model",
                "always",
                "--encrypt",
                "--recipient",
                keyid,
                "--output",
                "-",
            ],
            data,
        )
        .map_err(|e| Error::Encryption(e.to_string()))
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        run_gpg(&["--batch", "--yes", "--decrypt"], data).map_err(|e| Error::Decryption(e.to_string()))
    }
}

pub struct Crypto<E = GpgEngine> {
    keyid: String,
    engine: E,
}

impl Crypto<GpgEngine> {
    pub fn new(keyid: impl Into<String>) -> Self {
        Self {
            keyid: keyid.into(),
            engine: GpgEngine,
        }
    }
}

impl<E: EncryptionEngine> Crypto<E> {
    pub fn with_engine(keyid: impl Into<String>, engine: E) -> Self {
        Self {
            keyid: keyid.into(),
            engine,
        }
    }

    /// Compresses and encrypts `plaintext`, overwriting `blob_path`.
    pub fn persist(&self, plaintext: &[u8], blob_path: &str) -> Result<()> {
        let compressed = compress(plaintext);
        let ciphertext = self.engine.encrypt(&self.keyid, &compressed)?;
        fs::write(blob_path, ciphertext)?;
        Ok(())
    }

    /// Reads `blob_path` and decrypts/decompresses it. An empty blob
    /// (as freshly created by `create`) decodes to empty plaintext.
    pub fn load(&self, blob_path: &str) -> Result<Vec<u8>> {
        let ciphertext = fs::read(blob_path)?;
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        let compressed = self.engine.decrypt(&ciphertext)?;
        decompress(&compressed)
    }
}

/// Spawns `gpg`, feeds `input` on stdin from a writer thread (so a large
/// payload can't deadlock against gpg's own output), and returns stdout.
fn run_gpg(args: &[&str], input: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut child = Command::new("gpg")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("stdin was piped");
    let input = input.to_vec();
    let writer = thread::spawn(move || stdin.write_all(&input));

    let output = child.wait_with_output()?;
    writer
        .join()
        .unwrap_or_else(|_| Ok(()))
        .map_err(|e| anyhow::anyhow!("writing gpg stdin: {e}"))?;

    if !output.status.success() {
        anyhow::bail!(
            "gpg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(output.stdout)
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .expect("compressing into a Vec never fails");
    encoder.finish().expect("compressing into a Vec never fails")
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decryption(format!("decompression failed: {e}")))?;
    Ok(out)
}

/// A no-op stand-in for [`GpgEngine`] used only by tests that need a real
/// `Crypto` without a configured GPG keyring. Still exercises the
/// compress/decompress half of `persist`/`load`.
#[cfg(test)]
pub(crate) struct StubEngine;

#[cfg(test)]
impl EncryptionEngine for StubEngine {
    fn encrypt(&self, _keyid: &str, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress(&data);
        let restored = decompress(&compressed).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn compress_of_empty_input_round_trips() {
        let compressed = compress(&[]);
        assert_eq!(decompress(&compressed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn stub_engine_persist_load_round_trips() {
        let crypto = Crypto::with_engine("test-key", StubEngine);
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob");
        crypto.persist(b"hello stub", blob.to_str().unwrap()).unwrap();
        assert_eq!(crypto.load(blob.to_str().unwrap()).unwrap(), b"hello stub");
    }
}
