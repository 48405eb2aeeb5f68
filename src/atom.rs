//! Length-prefixed byte-string framing, the primitive every field of the
//! index is built from: a little-endian `u32` length followed by that many
//! raw bytes.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};

pub fn write_atom<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    w.write_all(&(payload.len() as u32).to_le_bytes())?;
    w.write_all(payload)
}

pub fn read_atom<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)
        .map_err(|_| Error::IndexParse("truncated atom length".into()))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)
        .map_err(|_| Error::IndexParse("truncated atom payload".into()))?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_empty_atom() {
        let mut buf = Vec::new();
        write_atom(&mut buf, b"").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_atom(&mut cur).unwrap(), b"");
    }

    #[test]
    fn round_trips_arbitrary_bytes() {
        let mut buf = Vec::new();
        write_atom(&mut buf, b"hello world").unwrap();
        write_atom(&mut buf, &[0u8, 1, 2, 255]).unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_atom(&mut cur).unwrap(), b"hello world");
        assert_eq!(read_atom(&mut cur).unwrap(), vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn fails_on_truncated_length() {
        let buf = vec![1u8, 0]; // only 2 of the 4 length bytes
        let mut cur = Cursor::new(buf);
        assert!(read_atom(&mut cur).is_err());
    }

    #[test]
    fn fails_on_truncated_payload() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_le_bytes());
        buf.extend_from_slice(b"short");
        let mut cur = Cursor::new(buf);
        assert!(read_atom(&mut cur).is_err());
    }
}
