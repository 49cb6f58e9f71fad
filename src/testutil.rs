//! Throw-away repository trees for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub(crate) struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// An empty repository named `name`.
    pub(crate) fn new(name: &str) -> Self {
        let repo = TestRepo {
            dir: tempfile::tempdir().unwrap(),
        };
        repo.file("profiles/repo_name", &format!("{name}\n"))
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn profiles(&self) -> PathBuf {
        self.path().join("profiles")
    }

    pub(crate) fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    pub(crate) fn dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.path().join(rel)).unwrap();
        self
    }

    /// Add a package version: an md5-cache entry plus its package directory.
    pub(crate) fn package(self, cpv: &str, cache: &str) -> Self {
        let (category, pv) = cpv.split_once('/').unwrap();
        let name = crate::package::split_version(pv).unwrap().0.to_string();
        self.dir(&format!("{category}/{name}"))
            .file(&format!("metadata/md5-cache/{cpv}"), cache)
    }
}
