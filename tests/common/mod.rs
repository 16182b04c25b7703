#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use gitreadme::config::Config;
use gitreadme::testing::{FixtureSource, ScriptedModel, StaticEmbedder};
use gitreadme::{Embedder, ReadmeGenerator, ReferenceCorpus};

pub mod test_helpers {
    use super::*;

    pub const REPO_URL: &str = "https://github.com/octo/demo";

    pub fn setup_test_logger() {
        let _ = gitreadme::logging::init("debug");
    }

    pub fn create_test_config(workspace: &Path) -> Config {
        let mut config = Config::default();
        config.paths.workspace = workspace.to_path_buf();
        config.paths.examples_dir = workspace.join("no-examples");
        config
    }

    /// Collaborators kept by the test so calls can be inspected after a run
    pub struct Harness {
        pub generator: ReadmeGenerator,
        pub model: Arc<ScriptedModel>,
        pub source: Arc<FixtureSource>,
    }

    pub fn harness(
        workspace: &Path,
        model: ScriptedModel,
        source: FixtureSource,
        references: ReferenceCorpus,
    ) -> Harness {
        harness_with_embedder(
            workspace,
            model,
            source,
            references,
            Arc::new(StaticEmbedder::new(&["http", "cli", "library"])),
        )
    }

    pub fn harness_with_embedder(
        workspace: &Path,
        model: ScriptedModel,
        source: FixtureSource,
        references: ReferenceCorpus,
        embedder: Arc<dyn Embedder>,
    ) -> Harness {
        let model = Arc::new(model);
        let source = Arc::new(source);
        let generator = ReadmeGenerator::new(
            Arc::new(create_test_config(workspace)),
            model.clone(),
            embedder,
            source.clone(),
            references,
        );
        Harness {
            generator,
            model,
            source,
        }
    }

    /// Entries left in the workspace after a run
    pub fn workspace_entries(workspace: &Path) -> usize {
        std::fs::read_dir(workspace).map(|dir| dir.count()).unwrap_or(0)
    }
}
