use crate::error::AnnotateError;
use crate::models::Record;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// All records of one source file, in file order
pub type Dataset = Vec<Record>;

/// Loads dataset files and keeps every successful load for the rest of the process
#[derive(Debug, Default)]
pub struct DatasetLoader {
    cache: HashMap<PathBuf, Rc<Dataset>>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the dataset at `path`, reading the file only the first time.
    ///
    /// Failed loads are not cached, so a file fixed on disk can be retried.
    pub fn load(&mut self, path: &Path) -> Result<Rc<Dataset>, AnnotateError> {
        if let Some(dataset) = self.cache.get(path) {
            debug!(path = %path.display(), "dataset cache hit");
            return Ok(Rc::clone(dataset));
        }

        let dataset = Rc::new(read_dataset(path)?);
        info!(path = %path.display(), records = dataset.len(), "loaded dataset");
        self.cache.insert(path.to_path_buf(), Rc::clone(&dataset));
        Ok(dataset)
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.cache.contains_key(path)
    }
}

fn read_dataset(path: &Path) -> Result<Dataset, AnnotateError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => AnnotateError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => AnnotateError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_str(&content).map_err(|source| AnnotateError::MalformedSource {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TWO_RECORDS: &str = r#"[
        {"data_id": "a", "User A": "Where is the station?", "background": "A lost tourist", "User B": "Two blocks north."},
        {"data_id": "b", "User A": "안녕하세요", "background": "Morning greeting", "User B": "좋은 아침이에요"}
    ]"#;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_parses_records() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.json", TWO_RECORDS);

        let mut loader = DatasetLoader::new();
        let dataset = loader.load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset[1].speaker_a_utterance.as_deref(), Some("안녕하세요"));
        assert!(loader.is_cached(&path));
    }

    #[test]
    fn test_repeated_load_returns_cached_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.json", TWO_RECORDS);

        let mut loader = DatasetLoader::new();
        let first = loader.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let mut loader = DatasetLoader::new();
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, AnnotateError::SourceNotFound { .. }));
        assert!(err.to_string().contains("absent.json"));
        assert!(!loader.is_cached(&path));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let broken = write_file(&dir, "broken.json", "[{\"data_id\": ");
        let not_a_list = write_file(&dir, "object.json", r#"{"data_id": "a"}"#);
        let mixed = write_file(&dir, "mixed.json", r#"[{"data_id": "a"}, 42]"#);

        let mut loader = DatasetLoader::new();
        for path in [&broken, &not_a_list, &mixed] {
            let err = loader.load(path).unwrap_err();
            assert!(matches!(err, AnnotateError::MalformedSource { .. }));
            assert!(!loader.is_cached(path));
        }
    }

    #[test]
    fn test_failure_leaves_other_cache_entries_alone() {
        let dir = TempDir::new().unwrap();
        let good = write_file(&dir, "good.json", TWO_RECORDS);
        let missing = dir.path().join("missing.json");

        let mut loader = DatasetLoader::new();
        let before = loader.load(&good).unwrap();
        assert!(loader.load(&missing).is_err());
        let after = loader.load(&good).unwrap();
        assert!(Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_failed_load_can_be_retried() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.json", "not json");

        let mut loader = DatasetLoader::new();
        assert!(loader.load(&path).is_err());
        std::fs::write(&path, TWO_RECORDS).unwrap();
        assert_eq!(loader.load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_list_is_a_valid_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.json", "[]");

        let mut loader = DatasetLoader::new();
        assert!(loader.load(&path).unwrap().is_empty());
    }
}
