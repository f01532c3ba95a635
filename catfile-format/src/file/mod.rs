pub mod index;
pub mod reader;
pub mod writer;

pub use self::index::{ArchiveIndex, NameMap};
pub use self::reader::{read_archive, ArchiveReader, Entries, ReadError, ReadOptions};
pub use self::writer::{pack, ArchiveWriter, PackError, WriterOptions};

#[cfg(test)]
mod tests {
    use crate::*;
    use std::path::Path;

    fn header(entry_type: EntryType, name: &str, size: u64) -> EntryHeader {
        EntryHeader {
            entry_type,
            name: name.into(),
            size,
            link_target: String::new(),
            access_time: 100,
            modify_time: 200,
            mode: 0o100644,
            uid: 1,
            gid: 2,
        }
    }

    fn create_test_archive<F: AsRef<Path>>(filename: F) {
        let mut writer = ArchiveWriter::create(filename, &WriterOptions::default()).unwrap();
        writer
            .append(&header(EntryType::Directory, "d", 0), b"")
            .unwrap();
        writer
            .append(&header(EntryType::File, "d/hello.txt", 5), b"hello")
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn create_and_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let filename = dir.path().join("create.cat");
        create_test_archive(&filename);

        let mut reader = ArchiveReader::open(&filename).unwrap();
        assert_eq!(reader.version(), 1);
        assert_eq!(reader.data_start(), 9);

        let entries = reader.read_all(&ReadOptions::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name(), "d/hello.txt");
        assert_eq!(entries[1].content(), b"hello");
        assert_eq!(entries[1].content_end + 1, reader.len());
    }

    #[test]
    fn create_replaces_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let filename = dir.path().join("replace.cat");
        std::fs::write(&filename, b"not an archive at all").unwrap();
        create_test_archive(&filename);

        let entries = read_archive(&filename, 0, 0, true).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn entries_are_lazy() {
        let dir = tempfile::TempDir::new().unwrap();
        let filename = dir.path().join("lazy.cat");
        create_test_archive(&filename);

        let mut reader = ArchiveReader::open(&filename).unwrap();
        let mut entries = reader.entries(&ReadOptions::list_only()).unwrap();
        let first = entries.next().unwrap().unwrap();
        assert_eq!(first.name(), "d");
        assert_eq!(entries.position(), first.content_end + 1);
        assert!(entries.next().unwrap().is_ok());
        assert!(entries.next().is_none());
    }

    #[test]
    fn range_before_data_start_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let filename = dir.path().join("range.cat");
        create_test_archive(&filename);

        let err = read_archive(&filename, 3, 0, false).unwrap_err();
        assert!(matches!(err, ReadError::InvalidRange { start: 3, .. }));
    }

    #[test]
    fn open_rejects_foreign_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let filename = dir.path().join("foreign.cat");
        std::fs::write(&filename, b"PK\x03\x04\0").unwrap();

        let err = ArchiveReader::open(&filename).unwrap_err();
        assert!(matches!(
            err,
            ReadError::Header {
                source: CodecError::Format(FormatError::InvalidMagic),
                ..
            }
        ));
    }
}
