use super::*;

#[test]
fn test_store_creates_directories() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("a").join("b");
    let path = store(&dir, ".java", "class T {}", "T", Encoding::Utf8).unwrap();
    assert_eq!(path, dir.join("T.java"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "class T {}");
}

#[test]
fn test_extension_without_dot() {
    let root = tempfile::tempdir().unwrap();
    let path = store(root.path(), "json", "{}", "report", Encoding::Utf8).unwrap();
    assert_eq!(path, root.path().join("report.json"));
}

#[test]
fn test_overwrites_existing_file() {
    let root = tempfile::tempdir().unwrap();
    store(root.path(), ".java", "old", "T", Encoding::Utf8).unwrap();
    let path = store(root.path(), ".java", "new", "T", Encoding::Utf8).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "new");
}

#[test]
fn test_latin1_encoding() {
    let root = tempfile::tempdir().unwrap();
    let path = store(root.path(), ".java", "\"año\"", "T", Encoding::Latin1).unwrap();
    assert_eq!(fs::read(path).unwrap(), vec![b'"', b'a', 0xF1, b'o', b'"']);
}

#[test]
fn test_latin1_rejects_wide_characters() {
    let root = tempfile::tempdir().unwrap();
    let err = store(root.path(), ".java", "\u{20ac}", "T", Encoding::Latin1).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(!root.path().join("T.java").exists());
}

#[test]
fn test_package_dir() {
    let root = Path::new("/tmp/run");
    assert_eq!(
        package_dir(root, Some("demo.instrumented")),
        root.join("demo").join("instrumented")
    );
    assert_eq!(package_dir(root, None), root.to_path_buf());
}
