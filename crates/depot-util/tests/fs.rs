use depot_util::fs::{atomic_write, dir_size, ensure_dir, file_len};
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_ensure_dir_idempotent() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("already");
    std::fs::create_dir(&dir).unwrap();
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn test_atomic_write_creates_parents_and_replaces() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("org/example/lib/1.0/lib-1.0.pom");

    atomic_write(&target, b"first").unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"first");

    atomic_write(&target, b"second version").unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"second version");
}

#[test]
fn test_atomic_write_leaves_no_temp_files() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("file.jar");
    atomic_write(&target, b"data").unwrap();

    let names: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["file.jar".to_string()]);
}

#[test]
fn test_file_len_and_dir_size() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(file_len(&tmp.path().join("missing")), None);
    assert_eq!(file_len(tmp.path()), None);

    std::fs::write(tmp.path().join("a"), b"12345").unwrap();
    std::fs::create_dir(tmp.path().join("sub")).unwrap();
    std::fs::write(tmp.path().join("sub").join("b"), b"123").unwrap();
    assert_eq!(file_len(&tmp.path().join("a")), Some(5));
    assert_eq!(dir_size(tmp.path()), 8);
}
