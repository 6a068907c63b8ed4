//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names/values, text
//! content and namespace URIs. All strings live in one growable buffer and
//! are addressed by a u32 id; id 0 is the empty string.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
#[derive(Debug, Clone)]
pub struct StringPool {
    /// (offset, len) into `data`, indexed by string id
    entries: Vec<(u32, u32)>,
    data: String,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for the empty string
        pool.entries.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an existing equal entry if any
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get_str(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Resolve a string id
    #[inline]
    pub fn get_str(&self, id: u32) -> Option<&str> {
        let &(offset, len) = self.entries.get(id as usize)?;
        let start = offset as usize;
        self.data.get(start..start + len as usize)
    }

    /// Look up the id of a string without interning it
    pub fn find(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get_str(id) == Some(s))
    }

    /// Number of interned strings (including the reserved empty entry)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}
