//! Single-slot write-through cache for the file most recently written to
//! (§4.5). Buffer management only; the actual flush-to-disk sequence needs
//! the tree and the crypto wrapper, so it lives on the filesystem struct.

#[derive(Default)]
pub struct WriteCache {
    path: Option<String>,
    buffer: Vec<Vec<u8>>,
    length: usize,
    dirty: bool,
}

impl WriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.length
    }

    /// Unconditionally resets to empty, without flushing. Callers must have
    /// already confirmed no flush is needed.
    pub fn clear(&mut self) {
        self.path = None;
        self.buffer.clear();
        self.length = 0;
        self.dirty = false;
    }

    /// Loads `plaintext` as the clean starting point for `path`.
    pub fn load(&mut self, path: &str, plaintext: Vec<u8>) {
        self.length = plaintext.len();
        self.buffer = vec![plaintext];
        self.path = Some(path.to_string());
        self.dirty = false;
    }

    /// Appends `data` as a new chunk (the common case: sequential write at EOF).
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.push(data.to_vec());
        self.length += data.len();
        self.dirty = true;
    }

    /// Overwrites `[offset, offset + data.len())`, extending with zero
    /// bytes if the write reaches past the current length, and collapses
    /// the buffer back into a single chunk.
    pub fn overwrite(&mut self, offset: usize, data: &[u8]) {
        let mut flat = self.concat();
        let end = offset + data.len();
        if flat.len() < end {
            flat.resize(end, 0);
        }
        flat[offset..end].copy_from_slice(data);
        self.length = flat.len();
        self.buffer = vec![flat];
        self.dirty = true;
    }

    pub fn concat(&self) -> Vec<u8> {
        self.buffer.concat()
    }

    /// Replaces the buffer with a single chunk holding `plaintext` and
    /// clears the dirty flag, as happens right after a successful flush.
    pub fn mark_clean(&mut self, plaintext: Vec<u8>) {
        self.length = plaintext.len();
        self.buffer = vec![plaintext];
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_is_empty() {
        let cache = WriteCache::new();
        assert_eq!(cache.path(), None);
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn append_at_eof_grows_length() {
        let mut cache = WriteCache::new();
        cache.load("/a", b"hello".to_vec());
        cache.append(b" world");
        assert_eq!(cache.concat(), b"hello world");
        assert!(cache.is_dirty());
    }

    #[test]
    fn overwrite_in_the_middle_preserves_surrounding_bytes() {
        let mut cache = WriteCache::new();
        cache.load("/a", b"aaaa".to_vec());
        cache.overwrite(1, b"BB");
        assert_eq!(cache.concat(), b"aBBa");
    }

    #[test]
    fn overwrite_past_end_zero_extends() {
        let mut cache = WriteCache::new();
        cache.load("/a", b"ab".to_vec());
        cache.overwrite(4, b"cd");
        assert_eq!(cache.concat(), b"ab\0\0cd");
    }

    #[test]
    fn clear_resets_without_requiring_flush() {
        let mut cache = WriteCache::new();
        cache.load("/a", b"x".to_vec());
        cache.append(b"y");
        cache.clear();
        assert_eq!(cache.path(), None);
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_dirty());
    }
}
