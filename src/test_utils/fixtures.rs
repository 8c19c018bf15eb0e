//! On-disk repository fixtures.
//!
//! Every builder method writes immediately, so a fixture can be extended after
//! it has already been scanned.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::constants::{
    APPLICATIONS_DIR, CLUSTER_FILE, CLUSTERS_DIR, CONSTELLATION_FILE, CONSTELLATIONS_DIR,
    ENVIRONMENTS_DIR, STANDALONE_CLUSTERS_DIR, TEMPLATES_DIR,
};

/// A repository tree inside a temporary directory.
pub struct RepoFixture {
    temp_dir: TempDir,
}

impl RepoFixture {
    /// Empty repository.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Constellation `c1` (`env: production`) with shared application
    /// `db-operator`, and member `cluster1` (`clusterName: cluster1`) with local
    /// application `db-instance-1` (`size: small`).
    pub fn sample() -> Self {
        Self::new()
            .template("database-operator-helm")
            .template("database-cr")
            .constellation("c1", "variables:\n  env: production\n")
            .constellation_application(
                "c1",
                "db-operator",
                "name: db-operator\ntemplate: database-operator-helm\n",
            )
            .cluster("c1", "cluster1", "constellation: c1\nvariables:\n  clusterName: cluster1\n")
            .cluster_application(
                "c1",
                "cluster1",
                "db-instance-1",
                "name: db-instance-1\ntemplate: database-cr\nparameters:\n  size: small\n",
            )
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `relative` under the root, creating parent directories.
    pub fn file(self, relative: impl AsRef<Path>, content: &str) -> Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
        self
    }

    /// Create a directory under the root.
    pub fn dir(self, relative: impl AsRef<Path>) -> Self {
        std::fs::create_dir_all(self.root().join(relative))
            .expect("failed to create fixture directory");
        self
    }

    /// Template directory with a placeholder file; `name` may contain `/`.
    pub fn template(self, name: &str) -> Self {
        self.file(Path::new(TEMPLATES_DIR).join(name).join("README.md"), "")
    }

    pub fn constellation(self, name: &str, document: &str) -> Self {
        let path = constellations_dir().join(name).join(CONSTELLATION_FILE);
        self.file(path, document)
    }

    pub fn constellation_application(
        self,
        constellation: &str,
        file_stem: &str,
        document: &str,
    ) -> Self {
        let path = constellations_dir()
            .join(constellation)
            .join(APPLICATIONS_DIR)
            .join(format!("{file_stem}.yaml"));
        self.file(path, document)
    }

    pub fn cluster(self, constellation: &str, name: &str, document: &str) -> Self {
        let path = member_dir(constellation, name).join(CLUSTER_FILE);
        self.file(path, document)
    }

    pub fn cluster_application(
        self,
        constellation: &str,
        cluster: &str,
        file_stem: &str,
        document: &str,
    ) -> Self {
        let path = member_dir(constellation, cluster)
            .join(APPLICATIONS_DIR)
            .join(format!("{file_stem}.yaml"));
        self.file(path, document)
    }

    pub fn standalone_cluster(self, name: &str, document: &str) -> Self {
        self.standalone_cluster_raw(name, Some(document))
    }

    /// Standalone cluster directory; `None` leaves out `cluster.yaml`.
    pub fn standalone_cluster_raw(self, name: &str, document: Option<&str>) -> Self {
        let dir = standalone_dir().join(name);
        match document {
            Some(document) => self.file(dir.join(CLUSTER_FILE), document),
            None => self.dir(dir),
        }
    }

    pub fn standalone_application(self, cluster: &str, file_stem: &str, document: &str) -> Self {
        let path = standalone_dir()
            .join(cluster)
            .join(APPLICATIONS_DIR)
            .join(format!("{file_stem}.yaml"));
        self.file(path, document)
    }
}

impl Default for RepoFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn constellations_dir() -> PathBuf {
    Path::new(ENVIRONMENTS_DIR).join(CONSTELLATIONS_DIR)
}

fn standalone_dir() -> PathBuf {
    constellations_dir().join(STANDALONE_CLUSTERS_DIR)
}

fn member_dir(constellation: &str, cluster: &str) -> PathBuf {
    constellations_dir().join(constellation).join(CLUSTERS_DIR).join(cluster)
}
