use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use ahash::AHashMap;
use chrono::{Datelike, Duration, Utc};

use crate::{
    ast::Markup,
    diag::Error,
    scopes::Scope,
    span::FileId,
    types::Bytes,
};

/// Result type for file operations routed through the world.
pub type FileResult<T> = Result<T, FileError>;

/// An error that occurred while loading a file through the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// The file was not found.
    NotFound(PathBuf),
    /// The file could not be accessed.
    AccessDenied(PathBuf),
    /// The package the file belongs to could not be resolved.
    Package(String),
    /// Another error, described by the contained message.
    Other(String),
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found ({})", path.display()),
            Self::AccessDenied(path) => write!(f, "failed to access file ({})", path.display()),
            Self::Package(message) => write!(f, "failed to load package ({message})"),
            Self::Other(message) => f.write_str(message),
        }
    }
}

impl From<FileError> for String {
    fn from(err: FileError) -> Self {
        err.to_string()
    }
}

/// A parsed source file.
///
/// The evaluator never reads raw source text; a source carries the markup the
/// external parser produced, together with any parse errors. A module whose
/// source has parse errors is rejected at import time.
#[derive(Debug, Clone)]
pub struct Source {
    /// The file this source stems from.
    pub id: FileId,
    /// The parsed markup.
    pub markup: Arc<Markup>,
    /// The errors the parser produced, if any.
    pub errors: Arc<Vec<Error>>,
}

impl Source {
    /// Creates a cleanly parsed source.
    pub fn new(id: FileId, markup: Markup) -> Self {
        Self { id, markup: Arc::new(markup), errors: Arc::new(vec![]) }
    }

    /// Creates a source that failed to parse.
    pub fn with_errors(id: FileId, markup: Markup, errors: Vec<Error>) -> Self {
        Self { id, markup: Arc::new(markup), errors: Arc::new(errors) }
    }
}

/// The evaluator's only I/O boundary.
///
/// A world may be shared across concurrent document compilations and must be
/// internally synchronized.
pub trait World: Send + Sync {
    /// The standard library bindings.
    fn library(&self) -> &Scope;

    /// The document's entrypoint file.
    fn main_file(&self) -> FileId;

    /// The parsed source for a file.
    fn source(&self, id: FileId) -> FileResult<Source>;

    /// The raw bytes of a file, used by the data readers and for package
    /// manifests.
    fn file(&self, id: FileId) -> FileResult<Bytes>;

    /// Today's date as `(year, month, day)`, shifted by the given UTC offset
    /// in hours. Returns `None` when the shifted date is unrepresentable.
    fn today(&self, offset_hours: Option<i64>) -> Option<(i32, u32, u32)>;
}

/// An in-memory world backed by maps, used by the test suite and by
/// embedders that assemble documents programmatically.
///
/// The file and source maps sit behind a lock so a single instance can serve
/// concurrent compilations.
pub struct TestWorld {
    library: Scope,
    main: FileId,
    sources: Mutex<AHashMap<FileId, Source>>,
    files: Mutex<AHashMap<FileId, Bytes>>,
    today: Option<(i32, u32, u32)>,
}

impl TestWorld {
    /// Creates a world whose main file holds the given markup, with the
    /// default standard library.
    pub fn new(main: Markup) -> Self {
        let main_id = FileId::new(None, "main.typ");
        let world = Self {
            library: crate::library::library(),
            main: main_id,
            sources: Mutex::new(AHashMap::new()),
            files: Mutex::new(AHashMap::new()),
            today: None,
        };
        world.add_source("main.typ", main);
        world
    }

    /// Registers a source file and returns its id.
    pub fn add_source(&self, path: &str, markup: Markup) -> FileId {
        let id = FileId::new(None, path);
        self.insert_source(Source::new(id, markup));
        id
    }

    /// Registers a source file inside a package.
    pub fn add_package_source(
        &self,
        spec: crate::package::PackageSpec,
        path: &str,
        markup: Markup,
    ) -> FileId {
        let id = FileId::new(Some(spec), path);
        self.insert_source(Source::new(id, markup));
        id
    }

    /// Registers a pre-built source, including one with parse errors.
    pub fn insert_source(&self, source: Source) {
        self.sources
            .lock()
            .expect("source map poisoned")
            .insert(source.id, source);
    }

    /// Registers a raw file and returns its id.
    pub fn add_file(&self, id: FileId, bytes: impl Into<Bytes>) -> FileId {
        self.files
            .lock()
            .expect("file map poisoned")
            .insert(id, bytes.into());
        id
    }

    /// Pins `today` to a fixed date for deterministic tests.
    pub fn with_today(mut self, year: i32, month: u32, day: u32) -> Self {
        self.today = Some((year, month, day));
        self
    }
}

impl World for TestWorld {
    fn library(&self) -> &Scope {
        &self.library
    }

    fn main_file(&self) -> FileId {
        self.main
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        self.sources
            .lock()
            .expect("source map poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.path()))
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.files
            .lock()
            .expect("file map poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.path()))
    }

    fn today(&self, offset_hours: Option<i64>) -> Option<(i32, u32, u32)> {
        if let Some(pinned) = self.today {
            return Some(pinned);
        }
        let now = Utc::now() + Duration::hours(offset_hours.unwrap_or(0));
        let date = now.date_naive();
        Some((date.year(), date.month(), date.day()))
    }
}
