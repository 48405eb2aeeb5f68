//! Serializes and parses the directory tree on top of the atom codec
//! (§4.2 of the design: a fixed magic, a reserved header atom, then a
//! recursive, per-level "all my fields, then descend" framing of the root
//! directory).

use crate::atom::{read_atom, write_atom};
use crate::error::{Error, Result};
use crate::tree::{Directory, Entry, FileNode, Tree, TYPE_DIR, TYPE_FILE};
use indexmap::IndexMap;
use std::io::{Cursor, Read};

pub const MAGIC: &[u8; 7] = b"GPGFS1\n";

pub fn serialize(tree: &Tree) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    write_atom(&mut buf, b"").expect("writing to a Vec never fails");
    write_entry(&mut buf, &tree.root);
    buf
}

pub fn parse(data: &[u8]) -> Result<Tree> {
    let mut cur = Cursor::new(data);

    let mut magic = [0u8; 7];
    cur.read_exact(&mut magic)
        .map_err(|_| Error::IndexParse("truncated magic".into()))?;
    if &magic != MAGIC {
        return Err(Error::IndexParse("bad magic".into()));
    }
    let _header = read_atom(&mut cur)?;

    let root = read_entry(&mut cur)?;
    if !root.is_directory() {
        return Err(Error::IndexParse("root is not a directory".into()));
    }
    Ok(Tree { root })
}

fn write_field_int(header: &mut Vec<u8>, key: &str, value: u32) {
    write_atom(header, key.as_bytes()).unwrap();
    header.push(b'I');
    header.extend_from_slice(&value.to_le_bytes());
}

/// Raw byte-string field, tag `S`. The source's `encpath` is a Python 2
/// `str` (bytes), not `unicode`, so `write_dict` tags it `S` rather than
/// `U`; a file's backing `path` is encoded the same way here.
fn write_field_bytes(header: &mut Vec<u8>, key: &str, value: &[u8]) {
    write_atom(header, key.as_bytes()).unwrap();
    header.push(b'S');
    write_atom(header, value).unwrap();
}

fn write_field_nested(header: &mut Vec<u8>, key: &str, tag: u8) {
    write_atom(header, key.as_bytes()).unwrap();
    header.push(tag);
}

/// Writes one directory/file record: its own header atom (all inline
/// fields plus `D`/`E` markers for nested material), followed immediately
/// by that nested material in encounter order.
fn write_entry(buf: &mut Vec<u8>, entry: &Entry) {
    let mut header = Vec::new();
    match entry {
        Entry::Directory(dir) => {
            write_field_int(&mut header, "type", TYPE_DIR);
            write_field_int(&mut header, "st_mode", dir.st_mode);
            write_field_int(&mut header, "st_mtime", dir.st_mtime);
            write_field_int(&mut header, "st_ctime", dir.st_ctime);
            write_field_nested(&mut header, "children", b'D');
        }
        Entry::File(file) => {
            write_field_int(&mut header, "type", TYPE_FILE);
            write_field_bytes(&mut header, "path", file.path.as_bytes());
            write_field_int(&mut header, "st_size", file.st_size);
        }
    }
    write_atom(buf, &header).expect("writing to a Vec never fails");

    if let Entry::Directory(dir) = entry {
        write_children(buf, &dir.children);
    }
}

fn write_children(buf: &mut Vec<u8>, children: &IndexMap<String, Entry>) {
    let mut header = Vec::new();
    for key in children.keys() {
        write_atom(&mut header, key.as_bytes()).unwrap();
        header.push(b'E');
    }
    write_atom(buf, &header).expect("writing to a Vec never fails");

    for entry in children.values() {
        write_entry(buf, entry);
    }
}

enum Inline {
    Int(u32),
    Bytes(Vec<u8>),
}

struct Field {
    key: String,
    tag: u8,
    inline: Option<Inline>,
}

fn read_header_fields<R: Read>(r: &mut R) -> Result<Vec<Field>> {
    let header = read_atom(r)?;
    let mut cur = Cursor::new(header);
    let len = cur.get_ref().len() as u64;
    let mut fields = Vec::new();

    while cur.position() < len {
        let key = String::from_utf8(read_atom(&mut cur)?)
            .map_err(|_| Error::IndexParse("non-utf8 key".into()))?;
        let mut tag_buf = [0u8; 1];
        cur.read_exact(&mut tag_buf)
            .map_err(|_| Error::IndexParse("truncated tag".into()))?;
        let tag = tag_buf[0];
        let inline = match tag {
            b'I' => {
                let mut int_buf = [0u8; 4];
                cur.read_exact(&mut int_buf)
                    .map_err(|_| Error::IndexParse("truncated integer".into()))?;
                Some(Inline::Int(u32::from_le_bytes(int_buf)))
            }
            b'U' => {
                // No field in this schema is currently tagged `U`, but the
                // format's decoder still must validate UTF-8 on one per
                // §4.2, so any future `U` field fails the same way a bad
                // one would on the original's side.
                let bytes = read_atom(&mut cur)?;
                String::from_utf8(bytes)
                    .map_err(|_| Error::IndexParse("non-utf8 text field".into()))?;
                None
            }
            b'S' => {
                let bytes = read_atom(&mut cur)?;
                Some(Inline::Bytes(bytes))
            }
            b'D' | b'E' => None,
            other => return Err(Error::IndexParse(format!("unknown tag byte {other:#x}"))),
        };
        fields.push(Field { key, tag, inline });
    }

    Ok(fields)
}

fn read_entry<R: Read>(r: &mut R) -> Result<Entry> {
    let fields = read_header_fields(r)?;

    let mut entry_type = None;
    let mut st_mode = None;
    let mut st_mtime = None;
    let mut st_ctime = None;
    let mut path_bytes = None;
    let mut st_size = None;
    let mut children = None;

    for field in fields {
        match (field.key.as_str(), field.tag) {
            ("type", b'I') => entry_type = int_of(field.inline),
            ("st_mode", b'I') => st_mode = int_of(field.inline),
            ("st_mtime", b'I') => st_mtime = int_of(field.inline),
            ("st_ctime", b'I') => st_ctime = int_of(field.inline),
            ("st_size", b'I') => st_size = int_of(field.inline),
            ("path", b'S') => path_bytes = bytes_of(field.inline),
            ("children", b'D') => children = Some(read_children(r)?),
            _ => return Err(Error::IndexParse(format!("unexpected field {}", field.key))),
        }
    }

    let path = match path_bytes {
        Some(bytes) => Some(
            String::from_utf8(bytes)
                .map_err(|_| Error::IndexParse("non-utf8 path field".into()))?,
        ),
        None => None,
    };

    match entry_type {
        Some(TYPE_DIR) => Ok(Entry::Directory(Directory {
            st_mode: st_mode.ok_or_else(|| Error::IndexParse("directory missing st_mode".into()))?,
            st_mtime: st_mtime
                .ok_or_else(|| Error::IndexParse("directory missing st_mtime".into()))?,
            st_ctime: st_ctime
                .ok_or_else(|| Error::IndexParse("directory missing st_ctime".into()))?,
            children: children
                .ok_or_else(|| Error::IndexParse("directory missing children".into()))?,
        })),
        Some(TYPE_FILE) => Ok(Entry::File(FileNode {
            path: path.ok_or_else(|| Error::IndexParse("file missing path".into()))?,
            st_size: st_size.ok_or_else(|| Error::IndexParse("file missing st_size".into()))?,
        })),
        _ => Err(Error::IndexParse("missing or unknown type field".into())),
    }
}

fn read_children<R: Read>(r: &mut R) -> Result<IndexMap<String, Entry>> {
    let fields = read_header_fields(r)?;
    let mut map = IndexMap::with_capacity(fields.len());
    for field in fields {
        if field.tag != b'E' {
            return Err(Error::IndexParse("children list entry is not tagged E".into()));
        }
        map.insert(field.key, read_entry(r)?);
    }
    Ok(map)
}

fn int_of(inline: Option<Inline>) -> Option<u32> {
    match inline {
        Some(Inline::Int(v)) => Some(v),
        _ => None,
    }
}

fn bytes_of(inline: Option<Inline>) -> Option<Vec<u8>> {
    match inline {
        Some(Inline::Bytes(v)) => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Entry;

    #[test]
    fn round_trips_empty_root() {
        let tree = Tree::new(1_700_000_000);
        let bytes = serialize(&tree);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(tree.root, parsed.root);
    }

    #[test]
    fn round_trips_nested_tree() {
        let mut tree = Tree::new(42);
        {
            let (dir, name) = tree.find_parent_mut("/docs").unwrap();
            dir.children.insert(name, Entry::new_directory(0o700, 7));
        }
        {
            let (dir, name) = tree.find_parent_mut("/docs/readme").unwrap();
            dir.children
                .insert(name, Entry::new_file("ab/cdefgh".to_string()));
        }
        {
            let (dir, name) = tree.find_parent_mut("/top-level").unwrap();
            dir.children
                .insert(name, Entry::new_file("11/223344".to_string()));
        }

        let bytes = serialize(&tree);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(tree.root, parsed.root);

        // order within a directory round-trips too.
        let root = parsed.root.as_directory("/").unwrap();
        assert_eq!(
            root.children.keys().cloned().collect::<Vec<_>>(),
            vec!["docs", "top-level"]
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = b"NOTMAGIC".to_vec();
        assert!(matches!(parse(&bytes), Err(Error::IndexParse(_))));
    }

    #[test]
    fn rejects_truncated_stream() {
        let tree = Tree::new(1);
        let mut bytes = serialize(&tree);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(parse(&bytes), Err(Error::IndexParse(_))));
    }
}
