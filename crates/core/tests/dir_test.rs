use driftql_core::migrate::{Dir, LocalDir, MemDir, MigrationFile, archive_dir, unarchive_dir, write_sum};

#[test]
fn file_name_parts() {
    let file = MigrationFile::new("20240115_add_users.sql", Vec::new());
    assert_eq!(file.version(), "20240115");
    assert_eq!(file.desc(), "add_users");

    let versioned_only = MigrationFile::new("20240115.sql", Vec::new());
    assert_eq!(versioned_only.version(), "20240115");
    assert_eq!(versioned_only.desc(), "");
}

#[test]
fn local_dir_orders_files_by_name() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = LocalDir::create(tmp.path()).expect("create dir");
    dir.write_file("2_b.sql", b"b").expect("write");
    dir.write_file("1_a.sql", b"a").expect("write");
    dir.write_file("notes.txt", b"skip me").expect("write");

    let names: Vec<String> = dir
        .files()
        .expect("list")
        .iter()
        .map(|file| file.name().to_string())
        .collect();
    assert_eq!(names, vec!["1_a.sql", "2_b.sql"]);
}

#[test]
fn readonly_dir_refuses_writes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let writable = LocalDir::create(tmp.path()).expect("create dir");
    writable.write_file("1_a.sql", b"a").expect("write");

    let readonly = LocalDir::open_readonly(tmp.path()).expect("open");
    assert_eq!(readonly.files().expect("list").len(), 1);
    assert!(readonly.write_file("2_b.sql", b"b").is_err());
}

#[test]
fn mem_dirs_share_a_namespace_until_last_close() {
    let first = MemDir::open("shared-namespace");
    first.write_file("1_a.sql", b"a").expect("write");

    let second = MemDir::open("shared-namespace");
    assert_eq!(second.files().expect("list").len(), 1);

    first.close();
    // Still alive: the second handle holds a reference.
    assert_eq!(second.files().expect("list").len(), 1);
    second.close();

    // Last close dropped the entry; a reopen starts empty.
    let fresh = MemDir::open("shared-namespace");
    assert!(fresh.files().expect("list").is_empty());
    fresh.close();
}

#[test]
fn archive_round_trips_losslessly() {
    let source = MemDir::open("archive-source");
    source
        .write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    source
        .write_file("2_posts.sql", b"CREATE TABLE posts (id int);\n")
        .expect("write");
    write_sum(&source).expect("hash");

    let bytes = archive_dir(&source).expect("archive");

    let target = MemDir::open("archive-target");
    unarchive_dir(&bytes, &target).expect("unarchive");

    assert_eq!(
        source.files().expect("list"),
        target.files().expect("list")
    );
    assert_eq!(
        source.read_file("atlas.sum").expect("sum"),
        target.read_file("atlas.sum").expect("sum")
    );
    driftql_core::migrate::validate(&target).expect("restored directory validates");

    source.close();
    target.close();
}
