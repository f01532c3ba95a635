//! Packs real directory trees, extracts them again and compares the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use catfile_format::{
    extract, pack, read_archive, ArchiveIndex, EntryType, ExtractOptions, WriterOptions,
};
use tempfile::TempDir;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn set_mtime(path: &Path, secs: u64) {
    let times = fs::FileTimes::new()
        .set_accessed(at(secs))
        .set_modified(at(secs));
    fs::File::open(path).unwrap().set_times(times).unwrap();
}

/// Stores names relative to `base`, so `src` is archived as `src/...`.
fn options(base: &Path) -> WriterOptions {
    WriterOptions {
        base_dir: Some(base.to_path_buf()),
        ..Default::default()
    }
}

/// Builds:
///
/// ```text
/// src/
///   a.txt        "hello world"
///   empty        ""
///   one          "x"
///   nested/
///     deep.bin   0..=255
///   link -> a.txt
/// ```
fn create_tree(base: &Path) -> PathBuf {
    let root = base.join("src");
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("a.txt"), b"hello world").unwrap();
    fs::write(root.join("empty"), b"").unwrap();
    fs::write(root.join("one"), b"x").unwrap();
    fs::write(root.join("nested/deep.bin"), (0..=255u8).collect::<Vec<_>>()).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink("a.txt", root.join("link")).unwrap();

    set_mtime(&root.join("a.txt"), 1_500_000_000);
    set_mtime(&root.join("nested/deep.bin"), 1_500_000_100);
    set_mtime(&root.join("nested"), 1_500_000_200);
    set_mtime(&root, 1_500_000_300);
    root
}

fn mtime(path: &Path) -> SystemTime {
    fs::symlink_metadata(path).unwrap().modified().unwrap()
}

/// Pack a tree, extract it into an empty directory, compare everything the format stores.
#[test]
fn test_pack_then_extract() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_tree(temp_dir.path());
    let archive = temp_dir.path().join("tree.cat");

    let mut packed = Vec::new();
    let count = pack("src", &archive, &options(temp_dir.path()), |h| {
        packed.push(h.name.clone())
    })
    .unwrap();
    assert_eq!(count as usize, packed.len());
    assert_eq!(count, if cfg!(unix) { 7 } else { 6 });

    let out = temp_dir.path().join("out");
    let mut seen = 0u64;
    let stats = extract(
        &archive,
        &ExtractOptions {
            destination: out.clone(),
            ..Default::default()
        },
        |_| seen += 1,
    )
    .unwrap();
    assert_eq!(seen, count);
    assert_eq!(stats.dirs_created, 2);
    assert_eq!(stats.files_extracted, 4);
    assert_eq!(stats.bytes_written, 11 + 0 + 1 + 256);

    let copy = out.join("src");
    assert_eq!(fs::read(copy.join("a.txt")).unwrap(), b"hello world");
    assert_eq!(fs::read(copy.join("empty")).unwrap(), b"");
    assert_eq!(fs::read(copy.join("one")).unwrap(), b"x");
    assert_eq!(
        fs::read(copy.join("nested/deep.bin")).unwrap(),
        (0..=255u8).collect::<Vec<_>>()
    );

    assert_eq!(mtime(&copy.join("a.txt")), at(1_500_000_000));
    assert_eq!(mtime(&copy.join("nested/deep.bin")), at(1_500_000_100));
    assert_eq!(mtime(&copy.join("nested")), at(1_500_000_200));
    assert_eq!(mtime(&copy), at(1_500_000_300));

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        assert_eq!(fs::read_link(copy.join("link")).unwrap(), Path::new("a.txt"));

        for name in ["a.txt", "empty", "one", "nested", "nested/deep.bin"] {
            let before = fs::symlink_metadata(root.join(name)).unwrap();
            let after = fs::symlink_metadata(copy.join(name)).unwrap();
            assert_eq!(before.mode(), after.mode(), "{}", name);
            assert_eq!(before.uid(), after.uid(), "{}", name);
            assert_eq!(before.gid(), after.gid(), "{}", name);
        }
    }
}

/// Directories come before their contents, in sorted order, root first.
#[test]
fn test_stream_order() {
    let temp_dir = TempDir::new().unwrap();
    create_tree(temp_dir.path());
    let archive = temp_dir.path().join("order.cat");
    pack("src", &archive, &options(temp_dir.path()), |_| {}).unwrap();

    let entries = read_archive(&archive, 0, 0, true).unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name()).collect();

    let mut expected = vec!["src", "src/a.txt", "src/empty"];
    #[cfg(unix)]
    expected.push("src/link");
    expected.extend(["src/nested", "src/nested/deep.bin", "src/one"]);
    assert_eq!(names, expected);

    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.id, i as u64);
    }
    assert_eq!(entries[0].entry_type(), EntryType::Directory);
}

/// The archive is skipped when it is written inside the tree being packed.
#[test]
fn test_archive_inside_root_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_tree(temp_dir.path());
    let archive = root.join("self.cat");

    pack(&root, &archive, &WriterOptions::default(), |_| {}).unwrap();
    assert!(archive.is_file());

    let entries = read_archive(&archive, 0, 0, true).unwrap();
    assert!(entries.iter().all(|e| !e.name().ends_with("self.cat")));
}

/// The version is written after the magic and read back.
#[test]
fn test_format_version() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_tree(temp_dir.path());
    let archive = temp_dir.path().join("v3.cat");

    let options = WriterOptions {
        version: 3,
        ..options(temp_dir.path())
    };
    pack(&root, &archive, &options, |_| {}).unwrap();

    let bytes = fs::read(&archive).unwrap();
    assert!(bytes.starts_with(b"CatFile3\0"));
    let reader = catfile_format::ArchiveReader::open(&archive).unwrap();
    assert_eq!(reader.version(), 3);
}

/// Partitions of the index cover every id exactly once.
#[test]
fn test_index_partitions() {
    let temp_dir = TempDir::new().unwrap();
    create_tree(temp_dir.path());
    let archive = temp_dir.path().join("index.cat");
    pack("src", &archive, &options(temp_dir.path()), |_| {}).unwrap();

    let entries = read_archive(&archive, 0, 0, true).unwrap();
    let index = ArchiveIndex::build(&entries);

    let mut ids: Vec<u64> = index
        .directories
        .ids()
        .chain(index.files.ids())
        .chain(index.symlinks.ids())
        .chain(index.hardlinks.ids())
        .collect();
    ids.sort();
    assert_eq!(ids, (0..entries.len() as u64).collect::<Vec<_>>());
    assert!(index.len() <= entries.len());
    assert_eq!(
        index.non_directories.len(),
        index.files.len() + index.symlinks.len() + index.hardlinks.len()
    );

    for entry in &entries {
        assert_eq!(index.id_of(entry.name()), Some(entry.id));
        assert_eq!(
            index.by_type(entry.entry_type()).name(entry.id),
            Some(entry.name())
        );
    }
}

/// Extraction fails when the destination already holds a file where a directory goes.
#[test]
fn test_extract_stops_at_first_failure() {
    let temp_dir = TempDir::new().unwrap();
    create_tree(temp_dir.path());
    let archive = temp_dir.path().join("fail.cat");
    pack("src", &archive, &options(temp_dir.path()), |_| {}).unwrap();

    let out = temp_dir.path().join("out");
    let copy = out.join("src");
    fs::create_dir_all(&copy).unwrap();
    fs::write(copy.join("nested"), b"in the way").unwrap();

    let err = extract(
        &archive,
        &ExtractOptions {
            destination: out,
            ..Default::default()
        },
        |_| {},
    )
    .unwrap_err();
    assert!(
        matches!(err, catfile_format::ExtractError::CreateDir(_, ref p) if p.ends_with("nested")),
        "{:?}",
        err
    );
}
