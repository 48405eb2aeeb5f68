//! The in-memory directory tree: tagged [`Entry`] nodes plus path resolution.

use crate::error::{Error, Result};
use indexmap::IndexMap;

pub const TYPE_DIR: u32 = 1;
pub const TYPE_FILE: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub st_mode: u32,
    pub st_mtime: u32,
    pub st_ctime: u32,
    pub children: IndexMap<String, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Backing-store-relative path of this file's encrypted blob, e.g. `"3a/f1…"`.
    pub path: String,
    pub st_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory(Directory),
    File(FileNode),
}

impl Entry {
    pub fn new_directory(mode: u32, now: u32) -> Self {
        Entry::Directory(Directory {
            st_mode: mode & 0o777,
            st_mtime: now,
            st_ctime: now,
            children: IndexMap::new(),
        })
    }

    pub fn new_file(path: String) -> Self {
        Entry::File(FileNode { path, st_size: 0 })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn as_directory(&self, path: &str) -> Result<&Directory> {
        match self {
            Entry::Directory(dir) => Ok(dir),
            Entry::File(_) => Err(Error::NotADirectory(path.to_string())),
        }
    }

    pub fn as_directory_mut(&mut self, path: &str) -> Result<&mut Directory> {
        match self {
            Entry::Directory(dir) => Ok(dir),
            Entry::File(_) => Err(Error::NotADirectory(path.to_string())),
        }
    }

    pub fn as_file(&self, path: &str) -> Result<&FileNode> {
        match self {
            Entry::File(file) => Ok(file),
            Entry::Directory(_) => Err(Error::NotFound(path.to_string())),
        }
    }

    pub fn as_file_mut(&mut self, path: &str) -> Result<&mut FileNode> {
        match self {
            Entry::File(file) => Ok(file),
            Entry::Directory(_) => Err(Error::NotFound(path.to_string())),
        }
    }
}

/// The directory tree rooted at `/`. The root is always a [`Directory`].
pub struct Tree {
    pub root: Entry,
}

/// Splits `path` into its `/`-separated components. `path` must start with
/// `/`; components are passed through verbatim (no normalization of empty
/// segments), matching the source's naive `path[1:].split('/')`.
fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::NotFound(path.to_string()));
    }
    Ok(path[1..].split('/').collect())
}

impl Tree {
    pub fn new(now: u32) -> Self {
        Tree {
            root: Entry::new_directory(0o755, now),
        }
    }

    pub fn find(&self, path: &str) -> Result<&Entry> {
        if path == "/" {
            return Ok(&self.root);
        }
        let mut node = &self.root;
        for name in components(path)? {
            let dir = node.as_directory(path)?;
            node = dir
                .children
                .get(name)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
        }
        Ok(node)
    }

    pub fn find_mut(&mut self, path: &str) -> Result<&mut Entry> {
        if path == "/" {
            return Ok(&mut self.root);
        }
        let mut node = &mut self.root;
        for name in components(path)? {
            let dir = node.as_directory_mut(path)?;
            node = dir
                .children
                .get_mut(name)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
        }
        Ok(node)
    }

    /// Resolves the parent directory and basename of `path`. `path` must
    /// contain at least one `/` past the leading one (i.e. must not be `/`
    /// itself). Fails `NotFound` only if an *intermediate* component is
    /// missing; a missing basename is returned successfully so callers can
    /// decide (`create` wants it absent, `unlink` wants it present).
    pub fn find_parent(&self, path: &str) -> Result<(&Directory, &str)> {
        let comps = components(path)?;
        let (basename, dirs) = comps
            .split_last()
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let mut node = &self.root;
        for name in dirs {
            let dir = node.as_directory(path)?;
            node = dir
                .children
                .get(*name)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
        }
        Ok((node.as_directory(path)?, basename))
    }

    pub fn find_parent_mut(&mut self, path: &str) -> Result<(&mut Directory, String)> {
        let comps = components(path)?;
        let (basename, dirs) = comps
            .split_last()
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let basename = basename.to_string();
        let mut node = &mut self.root;
        for name in dirs {
            let dir = node.as_directory_mut(path)?;
            node = dir
                .children
                .get_mut(*name)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
        }
        Ok((node.as_directory_mut(path)?, basename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_resolves_to_root() {
        let tree = Tree::new(0);
        assert!(tree.find("/").unwrap().is_directory());
    }

    #[test]
    fn find_missing_component_fails_not_found() {
        let tree = Tree::new(0);
        assert!(matches!(tree.find("/nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn find_parent_allows_missing_basename() {
        let tree = Tree::new(0);
        let (dir, basename) = tree.find_parent("/new-file").unwrap();
        assert_eq!(basename, "new-file");
        assert!(dir.children.is_empty());
    }

    #[test]
    fn find_parent_rejects_missing_intermediate() {
        let tree = Tree::new(0);
        assert!(matches!(
            tree.find_parent("/missing-dir/file"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn nested_lookup_and_mutation() {
        let mut tree = Tree::new(0);
        {
            let (dir, name) = tree.find_parent_mut("/d").unwrap();
            dir.children.insert(name, Entry::new_directory(0o755, 1));
        }
        {
            let (dir, name) = tree.find_parent_mut("/d/f").unwrap();
            dir.children
                .insert(name, Entry::new_file("ab/cdef".to_string()));
        }
        let file = tree.find("/d/f").unwrap().as_file("/d/f").unwrap();
        assert_eq!(file.path, "ab/cdef");
    }

    #[test]
    fn preserves_insertion_order() {
        let mut tree = Tree::new(0);
        for name in ["c", "a", "b"] {
            let path = format!("/{name}");
            let (dir, basename) = tree.find_parent_mut(&path).unwrap();
            dir.children
                .insert(basename, Entry::new_file(format!("xx/{name}")));
        }
        let root = tree.root.as_directory("/").unwrap();
        let names: Vec<_> = root.children.keys().cloned().collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
