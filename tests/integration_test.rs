//! Integration tests for tagfs
//!
//! These tests open real instances in temporary directories and drive them
//! through the public operation layer, including reopening an instance to
//! check what survives a restart.

use std::fs;
use tagfs::config::{CONFIG_FILE, FsConfig};
use tagfs::fs::{ErrorKind, FsError, TagFs};
use tempfile::TempDir;

/// Helper function to open a fresh instance
fn setup_fs() -> (TagFs, TempDir) {
    let dir = TempDir::new().unwrap();
    let fs = TagFs::open(dir.path()).unwrap();
    (fs, dir)
}

/// Helper function to create a file with content
fn put(fs: &mut TagFs, path: &str, content: &[u8]) {
    fs.create_file(path, 0o644).unwrap();
    fs.write(path, 0, content).unwrap();
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

fn error_kind<T>(result: Result<T, FsError>) -> ErrorKind {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => e.kind(),
    }
}

#[test]
fn test_tag_set_algebra_through_paths() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/awesome_tag/one", b"1");
    put(&mut fs, "/query/awesome_tag+cool_tag/two", b"2");
    put(&mut fs, "/query/cool_tag/three", b"3");

    assert_eq!(
        sorted(fs.list_directory("/query/awesome_tag+cool_tag").unwrap()),
        vec!["one", "three", "two"]
    );
    assert_eq!(fs.list_directory("/query/awesome_tag&cool_tag").unwrap(), vec!["two"]);
    assert_eq!(fs.list_directory("/query/awesome_tag-cool_tag").unwrap(), vec!["one"]);
    assert_eq!(
        sorted(fs.list_directory("/query/awesome_tag^cool_tag").unwrap()),
        vec!["one", "three"]
    );
}

#[test]
fn test_operators_are_left_associative() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/a+b+c/abc", b"");
    put(&mut fs, "/query/a/only_a", b"");
    put(&mut fs, "/query/a+c/ac", b"");

    // (a-b)-c keeps only_a; a-(b-c) would also keep abc and ac
    assert_eq!(fs.list_directory("/query/a-b-c").unwrap(), vec!["only_a"]);
    assert_eq!(
        sorted(fs.list_directory("/query/a-(b-c)").unwrap()),
        vec!["abc", "ac", "only_a"]
    );
}

#[test]
fn test_remove_file_clears_every_listing() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/t1+t2/f", b"content");

    fs.remove_file("/query/t1&t2/f").unwrap();

    assert!(fs.list_directory("/query/t1").unwrap().is_empty());
    assert!(fs.list_directory("/query/t2").unwrap().is_empty());
    assert_eq!(sorted(fs.list_directory("/tags").unwrap()), vec!["t1", "t2"]);
}

#[test]
fn test_rename_preserves_content() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/inbox/report.pdf", b"%PDF-1.7");

    fs.rename("/query/inbox/report.pdf", "/query/archive+work/report.pdf").unwrap();

    assert!(fs.list_directory("/query/inbox").unwrap().is_empty());
    assert_eq!(fs.list_directory("/query/archive").unwrap(), vec!["report.pdf"]);
    assert_eq!(fs.read("/query/work/report.pdf", 0, 64).unwrap(), b"%PDF-1.7");
}

#[test]
fn test_tag_lifecycle_errors() {
    let (mut fs, _dir) = setup_fs();

    assert_eq!(error_kind(fs.remove_directory("/tags/ghost")), ErrorKind::NotFound);
    fs.make_directory("/tags/empty").unwrap();
    assert_eq!(error_kind(fs.make_directory("/tags/empty")), ErrorKind::AlreadyExists);
    assert_eq!(error_kind(fs.list_directory("/query/ghost")), ErrorKind::UnknownTag);
    assert!(fs.list_directory("/query/empty").unwrap().is_empty());
}

#[test]
fn test_removing_tag_keeps_files() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/a+b/f", b"kept");

    fs.remove_directory("/tags/a").unwrap();

    assert_eq!(error_kind(fs.list_directory("/query/a")), ErrorKind::UnknownTag);
    assert_eq!(fs.read("/query/b/f", 0, 16).unwrap(), b"kept");
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let mut fs = TagFs::open(dir.path()).unwrap();
        fs.make_directory("/tags/empty").unwrap();
        put(&mut fs, "/query/music/song.mp3", b"ID3");
        put(&mut fs, "/query/music/other.mp3", b"ID3");
        fs.remove_file("/query/music/other.mp3").unwrap();
        fs.unmount().unwrap();
    }

    let mut fs = TagFs::open(dir.path()).unwrap();
    assert_eq!(sorted(fs.list_directory("/tags").unwrap()), vec!["empty", "music"]);
    assert_eq!(fs.read("/query/music/song.mp3", 0, 3).unwrap(), b"ID3");
    assert_eq!(fs.config().next_id, 2);

    let attr = fs.create_file("/query/music/new.mp3", 0o644).unwrap();
    assert_eq!(attr.file_id, Some(2));
}

#[test]
fn test_lost_config_does_not_reuse_ids() {
    let dir = TempDir::new().unwrap();

    {
        let mut fs = TagFs::open(dir.path()).unwrap();
        put(&mut fs, "/query/a/first", b"1");
        put(&mut fs, "/query/a/second", b"2");
        fs.unmount().unwrap();
    }
    fs::remove_file(dir.path().join(CONFIG_FILE)).unwrap();

    let mut fs = TagFs::open(dir.path()).unwrap();
    assert_eq!(fs.config(), &FsConfig { next_id: 0, ..FsConfig::default() });

    let attr = fs.create_file("/query/a/third", 0o644).unwrap();
    assert_eq!(attr.file_id, Some(2));
    assert_eq!(fs.read("/query/a/first", 0, 1).unwrap(), b"1");
}

#[test]
fn test_custom_namespace_names() {
    let dir = TempDir::new().unwrap();
    let config = FsConfig {
        tags_namespace: "labels".to_string(),
        files_namespace: "raw".to_string(),
        action_namespace: "q".to_string(),
        next_id: 0,
    };
    config.save(dir.path()).unwrap();

    let mut fs = TagFs::open(dir.path()).unwrap();
    assert_eq!(fs.list_directory("/").unwrap(), vec!["labels", "raw", "q"]);

    put(&mut fs, "/q/x/f", b"data");
    assert_eq!(fs.list_directory("/labels").unwrap(), vec!["x"]);
    assert_eq!(fs.list_directory("/raw").unwrap(), vec!["0"]);
    assert_eq!(error_kind(fs.list_directory("/query")), ErrorKind::NotFound);
}

#[test]
fn test_partial_io() {
    let (mut fs, _dir) = setup_fs();
    put(&mut fs, "/query/log/app.log", b"line one\n");

    fs.write("/query/log/app.log", 9, b"line two\n").unwrap();
    assert_eq!(fs.read("/query/log/app.log", 5, 8).unwrap(), b"one\nline");
    assert_eq!(fs.read("/query/log/app.log", 14, 100).unwrap(), b"two\n");
    assert!(fs.read("/query/log/app.log", 1000, 10).unwrap().is_empty());
    assert_eq!(fs.get_attributes("/query/log/app.log").unwrap().size, 18);
}

#[test]
fn test_errno_surface() {
    let (mut fs, _dir) = setup_fs();
    assert_eq!(fs.list_directory("/query/a&").unwrap_err().errno(), libc::EINVAL);
    assert_eq!(fs.list_directory("/query/missing").unwrap_err().errno(), libc::ENOENT);
    assert_eq!(fs.chmod("/", 0o777).unwrap_err().errno(), libc::ENOSYS);
    fs.make_directory("/tags/a").unwrap();
    assert_eq!(fs.make_directory("/tags/a").unwrap_err().errno(), libc::EEXIST);
}
