use std::path::{Path, PathBuf};

/// Express `target` relative to the directory that holds `reference`.
///
/// Cue sheets name their backing files relative to the cue file itself, so a
/// file sitting next to the cue is reduced to its file name. Targets outside
/// the reference directory are returned unchanged.
pub fn relative_path(target: &Path, reference: &Path) -> PathBuf {
    let target_dir = target.parent().unwrap_or(Path::new(""));
    let reference_dir = reference.parent().unwrap_or(Path::new(""));

    if target_dir == reference_dir {
        return target
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| target.to_path_buf());
    }

    match target.strip_prefix(reference_dir) {
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) => target.to_path_buf(),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn same_directory_reduces_to_file_name() {
        assert_eq!(
            relative_path(Path::new("track01.wav"), Path::new("disc.cue")),
            PathBuf::from("track01.wav")
        );
        assert_eq!(
            relative_path(Path::new("rip/track01.wav"), Path::new("rip/disc.cue")),
            PathBuf::from("track01.wav")
        );
    }

    #[test]
    fn nested_target_is_stripped_of_the_reference_directory() {
        assert_eq!(
            relative_path(Path::new("rip/data/track01.wav"), Path::new("rip/disc.cue")),
            PathBuf::from("data/track01.wav")
        );
    }

    #[test]
    fn unrelated_target_is_returned_unchanged() {
        assert_eq!(
            relative_path(Path::new("/mnt/audio/track01.wav"), Path::new("rip/disc.cue")),
            PathBuf::from("/mnt/audio/track01.wav")
        );
    }
}
