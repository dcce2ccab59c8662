use super::*;

#[test]
fn normalize_locator_collapses_separators() {
    assert_eq!(normalize_locator("a/./b//c.gif").unwrap(), "a/b/c.gif");
    assert_eq!(normalize_locator("a\\b.gif").unwrap(), "a/b.gif");
}

#[test]
fn normalize_locator_rejects_escapes() {
    for bad in ["/etc/passwd", "../x.gif", "a/../../b", "", "./"] {
        assert!(
            matches!(
                normalize_locator(bad),
                Err(FetchError::InvalidLocator { .. })
            ),
            "{bad:?}"
        );
    }
}

#[test]
fn memory_source_returns_registered_bytes() {
    let src = MemorySource::new().with("a.gif", vec![1u8, 2, 3]);
    assert_eq!(src.len(), 1);
    assert_eq!(src.fetch("a.gif").unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        src.fetch("b.gif"),
        Err(FetchError::NotFound { locator }) if locator == "b.gif"
    ));
}

#[test]
fn file_source_reads_relative_to_root() {
    let root = PathBuf::from("target").join("file_source_unit");
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("sub").join("x.bin"), b"GIF").unwrap();

    let src = FileSource::new(&root);
    assert_eq!(src.fetch("sub/x.bin").unwrap(), b"GIF".to_vec());
    assert!(matches!(
        src.fetch("sub/missing.bin"),
        Err(FetchError::NotFound { .. })
    ));
    assert!(matches!(
        src.fetch("../x.bin"),
        Err(FetchError::InvalidLocator { .. })
    ));
}

#[test]
fn sources_are_shareable_through_arc() {
    let src: Arc<dyn ByteSource> = Arc::new(MemorySource::new().with("k", vec![9u8]));
    assert_eq!(src.fetch("k").unwrap(), vec![9]);
}
