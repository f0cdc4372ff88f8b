//! Tests for directory creation, filtered listing and output naming

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use volreg::VolregError;
    use volreg::io::paths::{ensure_dir, is_listed, list_dir_filtered, same_file, volume_stem};

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").expect("Failed to create file");
        path
    }

    // Tests hidden files, editor backups and thumbnails are rejected
    // Verified by removing the hidden-prefix check
    #[test]
    fn test_is_listed_filters() {
        assert!(is_listed("brain01.tif", None));
        assert!(!is_listed(".DS_Store", None));
        assert!(!is_listed("brain01.tif~", None));
        assert!(!is_listed("~lock.brain01.tif", None));
        assert!(!is_listed("Thumbs.db", None));
    }

    // Tests the keyword is a plain substring match
    // Verified by matching the keyword as a prefix only
    #[test]
    fn test_is_listed_keyword() {
        assert!(is_listed("mouse_brain01.tif", Some("brain")));
        assert!(!is_listed("mouse_heart01.tif", Some("brain")));
        assert!(!is_listed(".brain.tif", Some("brain")));
    }

    // Tests listing is sorted independent of creation order and filtered
    // Verified by returning entries in read_dir order
    #[test]
    fn test_list_dir_filtered_sorted() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in ["c.tif", "a.tif", ".hidden.tif", "b.tif~", "Thumbs.db", "b.tif"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("d_dir")).expect("Failed to create dir");

        let listed = list_dir_filtered(dir.path(), None).expect("Failed to list directory");

        assert_eq!(
            listed,
            vec![
                dir.path().join("a.tif"),
                dir.path().join("b.tif"),
                dir.path().join("c.tif"),
                dir.path().join("d_dir"),
            ]
        );
    }

    // Tests listing twice gives the same result
    // Verified by shuffling the listing
    #[test]
    fn test_list_dir_filtered_deterministic() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for i in (0..20).rev() {
            touch(dir.path(), &format!("vol{i:02}.tif"));
        }

        let first = list_dir_filtered(dir.path(), Some("vol")).expect("Failed to list");
        let second = list_dir_filtered(dir.path(), Some("vol")).expect("Failed to list");

        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
        assert_eq!(first.first(), Some(&dir.path().join("vol00.tif")));
    }

    // Tests a missing directory is reported with its path
    // Verified by returning an empty listing
    #[test]
    fn test_list_dir_filtered_missing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = dir.path().join("missing");

        match list_dir_filtered(&missing, None) {
            Err(VolregError::FileSystem { path, .. }) => assert_eq!(path, missing),
            other => unreachable!("Expected FileSystem error, got {other:?}"),
        }
    }

    // Tests nested creation and that existing directories are accepted
    // Verified by using create_dir instead of create_dir_all
    #[test]
    fn test_ensure_dir_nested_and_existing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let nested = dir.path().join("a").join("b").join("c");

        ensure_dir(&nested).expect("Failed to create nested dir");
        ensure_dir(&nested).expect("Existing dir should be accepted");

        assert!(nested.is_dir());
    }

    // Tests a file in the way is reported
    // Verified by ignoring create_dir_all errors
    #[test]
    fn test_ensure_dir_over_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = touch(dir.path(), "occupied");

        assert!(ensure_dir(&file).is_err());
    }

    // Tests two spellings of the same file compare equal
    // Verified by comparing literal paths only
    #[test]
    fn test_same_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let seed = touch(dir.path(), "seed.tif");
        let other = touch(dir.path(), "other.tif");
        let dotted = dir.path().join(".").join("seed.tif");

        assert!(same_file(&seed, &dotted));
        assert!(!same_file(&seed, &other));
        assert!(same_file(Path::new("missing.tif"), Path::new("missing.tif")));
        assert!(!same_file(&seed, Path::new("missing.tif")));
    }

    // Tests the per-volume directory name drops only the last extension
    // Verified by splitting on the first dot
    #[test]
    fn test_volume_stem() {
        assert_eq!(volume_stem(Path::new("/data/brain01.tif")), "brain01");
        assert_eq!(volume_stem(Path::new("brain01.tiff")), "brain01");
        assert_eq!(volume_stem(Path::new("brain.01.tif")), "brain.01");
        assert_eq!(volume_stem(Path::new("brain01")), "brain01");
    }
}
