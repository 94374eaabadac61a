//! Unit tests for the operation layer

use super::*;
use crate::testing::TestFs;

fn kind(result: Result<impl Sized, FsError>) -> ErrorKind {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => e.kind(),
    }
}

#[test]
fn test_root_listing_and_attributes() {
    let t = TestFs::new();
    assert_eq!(t.fs().list_directory("/").unwrap(), vec!["tags", "files", "query"]);
    assert!(t.fs().get_attributes("/").unwrap().is_dir());
    assert_eq!(kind(t.fs().get_attributes("/nowhere")), ErrorKind::NotFound);
}

#[test]
fn test_make_and_remove_tag() {
    let mut t = TestFs::new();
    t.fs_mut().make_directory("/tags/music").unwrap();

    assert_eq!(t.ls("/tags"), vec!["music"]);
    assert!(t.fs().get_attributes("/tags/music").unwrap().is_dir());
    assert_eq!(kind(t.fs_mut().make_directory("/tags/music")), ErrorKind::AlreadyExists);

    t.fs_mut().remove_directory("/tags/music").unwrap();
    assert!(t.ls("/tags").is_empty());
    assert_eq!(kind(t.fs_mut().remove_directory("/tags/music")), ErrorKind::NotFound);
    assert_eq!(kind(t.fs().get_attributes("/tags/music")), ErrorKind::NotFound);
}

#[test]
fn test_tag_namespace_rejects_bad_shapes() {
    let mut t = TestFs::new();
    assert_eq!(kind(t.fs_mut().make_directory("/tags")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().remove_directory("/tags")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().make_directory("/tags/a+b")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs().get_attributes("/tags/a&b")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().make_directory("/")), ErrorKind::InvalidArgument);
}

#[test]
fn test_create_lists_under_every_tag() {
    let mut t = TestFs::new();
    t.fs_mut().make_directory("/tags/t3").unwrap();
    t.put("/query/t1+t2/f", b"");

    assert_eq!(t.ls("/query/t1"), vec!["f"]);
    assert_eq!(t.ls("/query/t2"), vec!["f"]);
    assert_eq!(t.ls("/query/t1&t2"), vec!["f"]);
    assert_eq!(t.ls("/query/t1+t2"), vec!["f"]);
    assert!(t.ls("/query/t3").is_empty());
    assert_eq!(t.ls("/tags"), vec!["t1", "t2", "t3"]);
}

#[test]
fn test_create_returns_file_attributes() {
    let mut t = TestFs::new();
    let attr = t.fs_mut().create_file("/query/docs/readme", 0o600).unwrap();

    assert_eq!(attr.kind, FileKind::RegularFile);
    assert_eq!(attr.size, 0);
    assert_eq!(attr.perm, 0o600);
    assert_eq!(attr.file_id, Some(0));
}

#[test]
fn test_create_rejects_bad_tag_sets() {
    let mut t = TestFs::new();
    assert_eq!(kind(t.fs_mut().create_file("/query/a&b/f", 0o644)), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().create_file("/query/a++b/f", 0o644)), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().create_file("/query/a", 0o644)), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().create_file("/query/a/f/g", 0o644)), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().create_file("/files/f", 0o644)), ErrorKind::Unsupported);
    assert!(t.ls("/tags").is_empty());
}

#[test]
fn test_create_duplicate_visible_name() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"one");

    assert_eq!(kind(t.fs_mut().create_file("/query/a+b/f", 0o644)), ErrorKind::AlreadyExists);
    t.fs_mut().create_file("/query/b/f", 0o644).unwrap();
    assert_eq!(t.ls("/query/a+b"), vec!["f"]);
}

#[test]
fn test_duplicate_names_resolve_to_lowest_id() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"first");
    t.put("/query/b/f", b"second");

    assert_eq!(t.fs().list_directory("/query/a+b").unwrap(), vec!["f"]);
    assert_eq!(t.cat("/query/a+b/f"), b"first");
    assert_eq!(t.cat("/query/b/f"), b"second");
}

#[test]
fn test_remove_file_keeps_tags() {
    let mut t = TestFs::new();
    t.put("/query/a+b/f", b"data");
    t.put("/query/a/g", b"");

    t.fs_mut().remove_file("/query/b/f").unwrap();

    assert_eq!(t.ls("/query/a"), vec!["g"]);
    assert!(t.ls("/query/b").is_empty());
    assert_eq!(t.ls("/tags"), vec!["a", "b"]);
    assert_eq!(kind(t.fs_mut().remove_file("/query/a/f")), ErrorKind::NotFound);
    assert!(!t.fs().store().contains(0));
}

#[test]
fn test_rename_moves_between_tags() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"payload");
    let id = t.fs().get_attributes("/query/a/f").unwrap().file_id;

    t.fs_mut().rename("/query/a/f", "/query/b/f").unwrap();

    assert!(t.ls("/query/a").is_empty());
    assert_eq!(t.ls("/query/b"), vec!["f"]);
    assert_eq!(t.cat("/query/b/f"), b"payload");
    assert_eq!(t.fs().get_attributes("/query/b/f").unwrap().file_id, id);
}

#[test]
fn test_rename_changes_filename() {
    let mut t = TestFs::new();
    t.put("/query/a/old", b"x");

    t.fs_mut().rename("/query/a/old", "/query/a+c/new").unwrap();

    assert_eq!(t.ls("/query/a"), vec!["new"]);
    assert_eq!(t.ls("/query/c"), vec!["new"]);
    assert_eq!(kind(t.fs().get_attributes("/query/a/old")), ErrorKind::NotFound);
}

#[test]
fn test_rename_rejections() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"");
    t.put("/query/b/g", b"");

    assert_eq!(kind(t.fs_mut().rename("/query/a/f", "/query/b/g")), ErrorKind::AlreadyExists);
    assert_eq!(kind(t.fs_mut().rename("/query/a/f", "/query/a-b/f")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().rename("/query/a/missing", "/query/b/x")), ErrorKind::NotFound);
    assert_eq!(kind(t.fs_mut().rename("/tags/a", "/tags/z")), ErrorKind::Unsupported);
    assert_eq!(kind(t.fs_mut().rename("/query/a/f", "/files/f")), ErrorKind::Unsupported);
    assert_eq!(t.ls("/query/a"), vec!["f"]);
}

#[test]
fn test_read_write_round_trip() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"");

    assert_eq!(t.fs_mut().write("/query/a/f", 0, b"hello").unwrap(), 5);
    assert_eq!(t.fs().read("/query/a/f", 0, 5).unwrap(), b"hello");
    assert_eq!(t.fs().read("/query/a/f", 3, 100).unwrap(), b"lo");
    assert!(t.fs().read("/query/a/f", 10, 4).unwrap().is_empty());
    assert_eq!(t.fs().get_attributes("/query/a/f").unwrap().size, 5);
}

#[test]
fn test_read_directory_is_invalid() {
    let t = TestFs::new();
    assert_eq!(kind(t.fs().read("/tags", 0, 1)), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs().read("/nowhere/f", 0, 1)), ErrorKind::NotFound);
}

#[test]
fn test_query_errors() {
    let mut t = TestFs::new();
    t.fs_mut().make_directory("/tags/empty").unwrap();

    assert_eq!(kind(t.fs().list_directory("/query/a&")), ErrorKind::SyntaxError);
    assert_eq!(kind(t.fs().list_directory("/query/ghost")), ErrorKind::UnknownTag);
    assert!(t.ls("/query/empty").is_empty());
    assert!(t.fs().get_attributes("/query/empty").unwrap().is_dir());
}

#[test]
fn test_query_root_lists_tags() {
    let mut t = TestFs::new();
    t.put("/query/b+a/f", b"");
    assert_eq!(t.ls("/query"), vec!["a", "b"]);
}

#[test]
fn test_truncate_requires_handle() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"abcdef");

    assert_eq!(kind(t.fs_mut().truncate("/query/a/f", 2, None)), ErrorKind::Unsupported);
    t.fs_mut().truncate("/query/a/f", 2, Some(1)).unwrap();
    assert_eq!(t.cat("/query/a/f"), b"ab");
}

#[test]
fn test_query_directory_attributes_do_not_evaluate() {
    let mut t = TestFs::new();

    assert!(t.fs().get_attributes("/query/newtag").unwrap().is_dir());
    assert!(t.fs().get_attributes("/query/a+b").unwrap().is_dir());
    assert_eq!(kind(t.fs().get_attributes("/query/newtag/f")), ErrorKind::UnknownTag);

    // the parent lookup succeeds, so creating under an unseen tag set works
    t.put("/query/newtag+other/f", b"x");
    assert_eq!(t.ls("/query/newtag&other"), vec!["f"]);
}

#[test]
fn test_failed_delete_keeps_tags() {
    let mut t = TestFs::new();
    t.put("/query/a+b/f", b"still here");

    // a directory in place of the content file makes the delete fail
    let data = t.fs().store().path_of(0).join("data");
    std::fs::remove_file(&data).unwrap();
    std::fs::create_dir_all(data.join("blocker")).unwrap();

    assert_eq!(kind(t.fs_mut().remove_file("/query/a/f")), ErrorKind::IoFailure);
    assert_eq!(t.ls("/query/a&b"), vec!["f"]);
}

#[test]
fn test_unsupported_operations() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"");

    let fs = t.fs_mut();
    assert_eq!(kind(fs.chmod("/query/a/f", 0o600)), ErrorKind::Unsupported);
    assert_eq!(kind(fs.chown("/query/a/f", Some(0), None)), ErrorKind::Unsupported);
    assert_eq!(kind(fs.symlink("/query/a/f", "/query/a/l")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.link("/query/a/f", "/query/a/l")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.read_link("/query/a/f")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.get_xattr("/query/a/f", "user.x")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.set_xattr("/query/a/f", "user.x", b"1")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.list_xattr("/query/a/f")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.remove_xattr("/query/a/f", "user.x")), ErrorKind::Unsupported);
    assert_eq!(kind(fs.make_directory("/query/a+b")), ErrorKind::Unsupported);
}

#[test]
fn test_files_namespace_passthrough() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"raw bytes");

    assert_eq!(t.ls("/files"), vec!["0"]);
    assert_eq!(t.ls("/files/0"), vec!["data", "meta"]);
    assert!(t.fs().get_attributes("/files/0").unwrap().is_dir());
    assert_eq!(t.fs().get_attributes("/files/0/data").unwrap().size, 9);
    assert_eq!(t.fs().read("/files/0/data", 4, 5).unwrap(), b"bytes");
}

#[test]
fn test_files_namespace_is_read_only() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"");

    assert_eq!(kind(t.fs().get_attributes("/files/..")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs().list_directory("/files/./0")), ErrorKind::InvalidArgument);
    assert_eq!(kind(t.fs_mut().write("/files/0/data", 0, b"x")), ErrorKind::Unsupported);
    assert_eq!(kind(t.fs_mut().remove_file("/files/0/data")), ErrorKind::Unsupported);
    assert_eq!(kind(t.fs_mut().remove_directory("/files/0")), ErrorKind::Unsupported);
    assert_eq!(kind(t.fs().get_attributes("/files/9")), ErrorKind::NotFound);
}

#[test]
fn test_ids_not_reused_after_remove() {
    let mut t = TestFs::new();
    t.put("/query/a/f", b"");
    t.fs_mut().remove_file("/query/a/f").unwrap();
    t.put("/query/a/g", b"");

    assert_eq!(t.fs().get_attributes("/query/a/g").unwrap().file_id, Some(1));
}

#[test]
fn test_evaluate_scenario() {
    let mut t = TestFs::new();
    t.put("/query/awesome_tag/one", b"");
    t.put("/query/awesome_tag+cool_tag/two", b"");
    t.put("/query/cool_tag/three", b"");

    let ids = |expr: &str| t.fs().evaluate(expr).unwrap().into_iter().collect::<Vec<_>>();
    assert_eq!(ids("awesome_tag+cool_tag"), vec![0, 1, 2]);
    assert_eq!(ids("awesome_tag&cool_tag"), vec![1]);
    assert_eq!(ids("awesome_tag-cool_tag"), vec![0]);
    assert_eq!(ids("awesome_tag^cool_tag"), vec![0, 2]);
}
