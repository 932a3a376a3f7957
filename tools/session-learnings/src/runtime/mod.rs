use crate::errors::LearningsError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, LearningsError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), LearningsError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), LearningsError>;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    /// Immediate children of `path`, sorted by path.
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, LearningsError>;
}

pub trait Terminal: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), LearningsError>;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, LearningsError> {
        std::fs::read_to_string(path).map_err(|e| LearningsError::Io(e.to_string()))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), LearningsError> {
        std::fs::write(path, contents).map_err(|e| LearningsError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), LearningsError> {
        std::fs::create_dir_all(path).map_err(|e| LearningsError::Io(e.to_string()))
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, LearningsError> {
        let mut entries = std::fs::read_dir(path)
            .map_err(|e| LearningsError::Io(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        entries.sort();
        Ok(entries)
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_line(&self, line: &str) -> Result<(), LearningsError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| LearningsError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: SystemTime,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self { now }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        self.now
    }
}

/// In-memory tree. Writing a file registers every ancestor as a directory.
#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
    dirs: Arc<Mutex<BTreeSet<PathBuf>>>,
    unreadable_dirs: Arc<Mutex<BTreeSet<PathBuf>>>,
    reads: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.insert_file(path, contents);
        fs
    }

    pub fn insert_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.register_dirs(parent);
        }
        self.files
            .lock()
            .expect("files lock")
            .insert(path, contents.into());
    }

    /// `list_dir` on `path` fails as if permission were denied.
    pub fn deny_listing(&self, path: impl Into<PathBuf>) {
        self.unreadable_dirs
            .lock()
            .expect("unreadable lock")
            .insert(path.into());
    }

    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.lock().expect("files lock").get(path).cloned()
    }

    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().expect("reads lock").clone()
    }

    fn register_dirs(&self, path: &Path) {
        let mut dirs = self.dirs.lock().expect("dirs lock");
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, LearningsError> {
        self.reads
            .lock()
            .expect("reads lock")
            .push(path.to_path_buf());
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| LearningsError::Io(format!("missing file {}", path.display())))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), LearningsError> {
        self.insert_file(path, contents);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), LearningsError> {
        self.register_dirs(path);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().expect("dirs lock").contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, LearningsError> {
        if self
            .unreadable_dirs
            .lock()
            .expect("unreadable lock")
            .contains(path)
        {
            return Err(LearningsError::Io(format!(
                "permission denied {}",
                path.display()
            )));
        }
        if !self.is_dir(path) {
            return Err(LearningsError::Io(format!(
                "not a directory {}",
                path.display()
            )));
        }
        let mut children = BTreeSet::new();
        for file in self.files.lock().expect("files lock").keys() {
            if file.parent() == Some(path) {
                children.insert(file.clone());
            }
        }
        for dir in self.dirs.lock().expect("dirs lock").iter() {
            if dir.parent() == Some(path) {
                children.insert(dir.clone());
            }
        }
        Ok(children.into_iter().collect())
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_line(&self, line: &str) -> Result<(), LearningsError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }
}
