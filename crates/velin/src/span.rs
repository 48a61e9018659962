use std::{
    fmt,
    path::{Component, Path, PathBuf},
    sync::RwLock,
};

use ahash::AHashMap;

use crate::package::PackageSpec;

/// Identifies a file the evaluator knows about: either a file in the current
/// project or a file inside a resolved package.
///
/// File ids are interned, so equality and hashing are cheap. Two ids are equal
/// exactly when they name the same (package, path) pair, which is what the
/// evaluation route relies on for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

/// The slot an interned file id points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileSlot {
    package: Option<PackageSpec>,
    path: PathBuf,
}

/// Global file id interner shared by all evaluations.
///
/// The world may be shared across concurrent document compilations, so the
/// interner is guarded by a lock.
static INTERNER: RwLock<Option<Interner>> = RwLock::new(None);

#[derive(Debug, Default)]
struct Interner {
    to_id: AHashMap<FileSlot, FileId>,
    from_id: Vec<FileSlot>,
}

impl FileId {
    /// Interns a (package, path) pair, creating a new id if necessary.
    ///
    /// The path is normalized before interning so that `a/./b` and `a/b`
    /// receive the same id.
    pub fn new(package: Option<PackageSpec>, path: impl AsRef<Path>) -> Self {
        let slot = FileSlot {
            package,
            path: normalize(path.as_ref()),
        };

        let mut guard = INTERNER.write().expect("file id interner poisoned");
        let interner = guard.get_or_insert_with(Interner::default);
        if let Some(&id) = interner.to_id.get(&slot) {
            return id;
        }

        let id = Self(u32::try_from(interner.from_id.len()).expect("too many file ids"));
        interner.to_id.insert(slot.clone(), id);
        interner.from_id.push(slot);
        id
    }

    /// The package this file belongs to, if any.
    pub fn package(self) -> Option<PackageSpec> {
        self.slot(|slot| slot.package.clone())
    }

    /// The normalized path of this file.
    pub fn path(self) -> PathBuf {
        self.slot(|slot| slot.path.clone())
    }

    /// The file stem, used to derive module names.
    pub fn stem(self) -> String {
        self.slot(|slot| {
            slot.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Resolves `path` relative to the directory of this file.
    ///
    /// Absolute paths are anchored at the project (or package) root instead.
    /// The result stays within the same package as `self`.
    pub fn join(self, path: &str) -> Self {
        let target = Path::new(path);
        let base = if target.is_absolute() {
            PathBuf::from("/")
        } else {
            self.path().parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
        };
        Self::new(self.package(), base.join(target))
    }

    fn slot<T>(self, f: impl FnOnce(&FileSlot) -> T) -> T {
        let guard = INTERNER.read().expect("file id interner poisoned");
        let interner = guard.as_ref().expect("file id not interned");
        f(&interner.from_id[self.0 as usize])
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot(|slot| {
            if let Some(package) = &slot.package {
                write!(f, "{package}{}", slot.path.display())
            } else {
                write!(f, "{}", slot.path.display())
            }
        })
    }
}

/// Lexically normalizes a path: resolves `.` and `..` components and anchors
/// the result at `/`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// A source span: the file a syntax node came from plus its byte range.
///
/// Nodes constructed programmatically (by a host embedding the evaluator or by
/// tests) may use [`Span::detached`], which compares equal only to itself and
/// points nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    file: Option<FileId>,
    start: u32,
    end: u32,
}

impl Span {
    /// Creates a span covering `start..end` in `file`.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file: Some(file), start, end }
    }

    /// Creates a span that points nowhere.
    pub const fn detached() -> Self {
        Self { file: None, start: 0, end: 0 }
    }

    /// Whether this span points nowhere.
    pub fn is_detached(self) -> bool {
        self.file.is_none()
    }

    /// The file this span belongs to, if attached.
    pub fn file(self) -> Option<FileId> {
        self.file
    }

    /// The byte range within the file.
    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Returns `other` if this span is detached and `self` otherwise.
    pub fn or(self, other: Self) -> Self {
        if self.is_detached() { other } else { self }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::detached()
    }
}

/// A value with a span locating it in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Spanned<T> {
    /// The spanned value.
    pub v: T,
    /// The value's location in source code.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Creates a new instance from a value and its span.
    pub fn new(v: T, span: Span) -> Self {
        Self { v, span }
    }

    /// Maps the value while keeping the span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned { v: f(self.v), span: self.span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_are_interned() {
        let a = FileId::new(None, "dir/./doc.typ");
        let b = FileId::new(None, "dir/doc.typ");
        let c = FileId::new(None, "dir/other.typ");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn join_resolves_relative_to_parent() {
        let main = FileId::new(None, "chapters/intro.typ");
        assert_eq!(main.join("lib.typ"), FileId::new(None, "chapters/lib.typ"));
        assert_eq!(main.join("../lib.typ"), FileId::new(None, "lib.typ"));
        assert_eq!(main.join("/lib.typ"), FileId::new(None, "lib.typ"));
    }
}
