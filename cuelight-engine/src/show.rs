//! Show data access
//!
//! The engine never owns persistence. It reads fixtures, scenes and cue lists
//! through [`ShowData`], which the hosting application implements over its own
//! storage. [`ShowLibrary`] is the in-memory implementation used by the binary
//! (loaded from a JSON show file) and by tests.

use std::collections::HashMap;
use std::path::Path;

use cuelight_common::{CueList, FixtureInstance, Scene};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Read access to show records
///
/// Lookups return owned snapshots; the engine never holds references into the
/// store across an await point or a timer.
pub trait ShowData: Send + Sync {
    fn cue_list(&self, id: Uuid) -> Option<CueList>;
    fn scene(&self, id: Uuid) -> Option<Scene>;
    fn fixture(&self, id: Uuid) -> Option<FixtureInstance>;
}

/// Serialized show: everything needed to run a show headless
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowFile {
    #[serde(default)]
    pub fixtures: Vec<FixtureInstance>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub cue_lists: Vec<CueList>,
}

/// In-memory show store
#[derive(Default)]
pub struct ShowLibrary {
    fixtures: RwLock<HashMap<Uuid, FixtureInstance>>,
    scenes: RwLock<HashMap<Uuid, Scene>>,
    cue_lists: RwLock<HashMap<Uuid, CueList>>,
}

impl ShowLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fixture(&self, fixture: FixtureInstance) {
        self.fixtures.write().insert(fixture.id, fixture);
    }

    pub fn insert_scene(&self, scene: Scene) {
        self.scenes.write().insert(scene.id, scene);
    }

    /// Store a cue list, restoring cue-number order
    pub fn insert_cue_list(&self, mut cue_list: CueList) {
        cue_list.sort_cues();
        self.cue_lists.write().insert(cue_list.id, cue_list);
    }

    pub fn cue_list_ids(&self) -> Vec<Uuid> {
        self.cue_lists.read().keys().copied().collect()
    }

    pub fn from_show_file(show: ShowFile) -> Self {
        let library = Self::new();
        for fixture in show.fixtures {
            library.insert_fixture(fixture);
        }
        for scene in show.scenes {
            library.insert_scene(scene);
        }
        for cue_list in show.cue_lists {
            library.insert_cue_list(cue_list);
        }
        library.warn_dangling_references();
        library
    }

    /// Load a JSON show file
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let show: ShowFile = serde_json::from_str(&text).map_err(cuelight_common::Error::from)?;
        info!(
            "Loaded show {}: {} fixtures, {} scenes, {} cue lists",
            path.display(),
            show.fixtures.len(),
            show.scenes.len(),
            show.cue_lists.len()
        );
        Ok(Self::from_show_file(show))
    }

    /// Log references that will fail at playback time
    fn warn_dangling_references(&self) {
        let fixtures = self.fixtures.read();
        let scenes = self.scenes.read();

        for scene in scenes.values() {
            for values in &scene.fixture_values {
                if !fixtures.contains_key(&values.fixture_id) {
                    warn!(
                        "Scene '{}' references unknown fixture {}",
                        scene.name, values.fixture_id
                    );
                }
            }
        }

        for list in self.cue_lists.read().values() {
            for cue in &list.cues {
                if !scenes.contains_key(&cue.scene_id) {
                    warn!(
                        "Cue {} in '{}' references unknown scene {}",
                        cue.cue_number, list.name, cue.scene_id
                    );
                }
            }
        }
    }
}

impl ShowData for ShowLibrary {
    fn cue_list(&self, id: Uuid) -> Option<CueList> {
        self.cue_lists.read().get(&id).cloned()
    }

    fn scene(&self, id: Uuid) -> Option<Scene> {
        self.scenes.read().get(&id).cloned()
    }

    fn fixture(&self, id: Uuid) -> Option<FixtureInstance> {
        self.fixtures.read().get(&id).cloned()
    }
}
