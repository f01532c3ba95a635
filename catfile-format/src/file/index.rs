use std::collections::HashMap;

use crate::record::{EntryRecord, EntryType};

/// A name to id map and its inverse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameMap<'a> {
    by_name: HashMap<&'a str, u64>,
    by_id: HashMap<u64, &'a str>,
}

impl<'a> NameMap<'a> {
    fn insert(&mut self, name: &'a str, id: u64) {
        self.by_name.insert(name, id);
        self.by_id.insert(id, name);
    }

    #[inline(always)]
    pub fn id(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    #[inline(always)]
    pub fn name(&self, id: u64) -> Option<&'a str> {
        self.by_id.get(&id).copied()
    }

    /// Number of distinct names.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_id.keys().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.by_name.keys().copied()
    }
}

/// Lookup maps over a decoded entry list. Borrows names from the list it
/// was built from.
///
/// A name that occurs more than once maps to its last id; the id to name
/// direction keeps every id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveIndex<'a> {
    pub all: NameMap<'a>,
    pub directories: NameMap<'a>,
    pub files: NameMap<'a>,
    pub symlinks: NameMap<'a>,
    pub hardlinks: NameMap<'a>,
    /// Files, symlinks and hardlinks together.
    pub non_directories: NameMap<'a>,
}

impl<'a> ArchiveIndex<'a> {
    pub fn build(entries: &'a [EntryRecord]) -> ArchiveIndex<'a> {
        let mut index = ArchiveIndex::default();

        for entry in entries {
            let name = entry.name();
            index.all.insert(name, entry.id);

            let partition = match entry.entry_type() {
                EntryType::Directory => &mut index.directories,
                EntryType::File => &mut index.files,
                EntryType::Symlink => &mut index.symlinks,
                EntryType::Hardlink => &mut index.hardlinks,
            };
            partition.insert(name, entry.id);

            if entry.entry_type() != EntryType::Directory {
                index.non_directories.insert(name, entry.id);
            }
        }

        tracing::debug!(
            entries = entries.len(),
            names = index.all.len(),
            "built archive index"
        );

        index
    }

    #[inline(always)]
    pub fn by_type(&self, entry_type: EntryType) -> &NameMap<'a> {
        match entry_type {
            EntryType::Directory => &self.directories,
            EntryType::File => &self.files,
            EntryType::Symlink => &self.symlinks,
            EntryType::Hardlink => &self.hardlinks,
        }
    }

    #[inline(always)]
    pub fn id_of(&self, name: &str) -> Option<u64> {
        self.all.id(name)
    }

    #[inline(always)]
    pub fn name_of(&self, id: u64) -> Option<&'a str> {
        self.all.name(id)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
