use driftql_core::{
    Error,
    migrate::{Dir, HashFile, LocalDir, MemDir, MigrationFile, SUM_FILENAME, validate, write_sum},
};

fn file(name: &str, content: &str) -> MigrationFile {
    MigrationFile::new(name, content.as_bytes().to_vec())
}

#[test]
fn sum_format_round_trips() {
    let files = vec![
        file("1_init.sql", "CREATE TABLE users (id int);\n"),
        file("2_posts.sql", "CREATE TABLE posts (id int);\n"),
    ];
    let computed = HashFile::compute(&files);
    let parsed = HashFile::parse(&computed.format()).expect("well-formed sum file");
    assert_eq!(parsed, computed);
    assert_eq!(parsed.entries.len(), 2);
}

#[test]
fn rolling_hashes_are_cumulative() {
    let first = file("1_init.sql", "CREATE TABLE users (id int);\n");
    let second = file("2_posts.sql", "CREATE TABLE posts (id int);\n");

    let both = HashFile::compute(&[first.clone(), second.clone()]);
    let only_first = HashFile::compute(&[first]);
    let only_second = HashFile::compute(&[second]);

    // The first entry is position independent, the second is not: its hash
    // accumulates everything before it.
    assert_eq!(both.entries[0].hash, only_first.entries[0].hash);
    assert_ne!(both.entries[1].hash, only_second.entries[0].hash);
}

#[test]
fn editing_an_early_file_invalidates_later_entries() {
    let tail = file("2_posts.sql", "CREATE TABLE posts (id int);\n");
    let before = HashFile::compute(&[
        file("1_init.sql", "CREATE TABLE users (id int);\n"),
        tail.clone(),
    ]);
    let after = HashFile::compute(&[
        file("1_init.sql", "CREATE TABLE users (id bigint);\n"),
        tail,
    ]);

    assert_ne!(before.entries[1].hash, after.entries[1].hash);
    assert_ne!(before.sum, after.sum);
}

#[test]
fn sum_ignore_directive_omits_the_file() {
    let listed = file("1_init.sql", "CREATE TABLE users (id int);\n");
    let ignored = file("2_seed.sql", "-- atlas:sum ignore\n\nINSERT INTO users VALUES (1);\n");

    let computed = HashFile::compute(&[listed.clone(), ignored]);
    assert_eq!(computed.entries.len(), 1);
    assert_eq!(computed.sum, HashFile::compute(&[listed]).sum);
}

#[test]
fn malformed_sum_file_is_a_format_error() {
    assert!(matches!(
        HashFile::parse("not a sum header\n"),
        Err(Error::ChecksumFormat(_))
    ));
    assert!(matches!(
        HashFile::parse("h1:abc\n1_init.sql missing-hash-marker\n"),
        Err(Error::ChecksumFormat(_))
    ));
}

#[test]
fn validate_detects_tampering() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = LocalDir::create(tmp.path()).expect("create dir");
    dir.write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    write_sum(&dir).expect("hash");
    validate(&dir).expect("freshly hashed directory is valid");

    dir.write_file("1_init.sql", b"CREATE TABLE users (id bigint);\n")
        .expect("tamper");
    assert!(matches!(validate(&dir), Err(Error::ChecksumMismatch)));
}

#[test]
fn sql_without_sum_file_is_not_found() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = LocalDir::create(tmp.path()).expect("create dir");
    dir.write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    assert!(matches!(validate(&dir), Err(Error::ChecksumNotFound)));
}

#[test]
fn empty_directory_without_sum_file_is_valid() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = LocalDir::create(tmp.path()).expect("create dir");
    validate(&dir).expect("empty directory is valid");
}

#[test]
fn adding_a_file_requires_rehashing() {
    let dir = MemDir::open("sum-monotonicity");
    dir.write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    write_sum(&dir).expect("hash");
    validate(&dir).expect("valid after hash");

    dir.write_file("2_posts.sql", b"CREATE TABLE posts (id int);\n")
        .expect("write");
    assert!(matches!(validate(&dir), Err(Error::ChecksumMismatch)));

    write_sum(&dir).expect("rehash");
    validate(&dir).expect("valid after rehash");
    assert!(dir.read_file(SUM_FILENAME).is_ok());
    dir.close();
}
