//! Address resolution
//!
//! Maps a fixture's ordered raw values onto absolute (universe, channel)
//! targets. No bounds checking happens here; targets past channel 512 are
//! dropped by the universe store.

use cuelight_common::{FixtureInstance, Scene};

use crate::dmx::ChannelTarget;
use crate::error::{Error, Result};
use crate::show::ShowData;

/// `values[i]` lands on `start_channel + i` in `universe`
pub fn resolve_fixture_values(universe: u16, start_channel: u16, values: &[u8]) -> Vec<ChannelTarget> {
    values
        .iter()
        .enumerate()
        .map(|(offset, &value)| {
            let channel = start_channel.saturating_add(offset.min(u16::MAX as usize) as u16);
            ChannelTarget::new(universe, channel, value)
        })
        .collect()
}

pub fn resolve_fixture(fixture: &FixtureInstance, values: &[u8]) -> Vec<ChannelTarget> {
    resolve_fixture_values(fixture.universe, fixture.start_channel, values)
}

/// Expand a scene into absolute channel targets
///
/// Fails with `NotFound` if the scene references a fixture the show does not
/// contain; nothing is resolved in that case.
pub fn resolve_scene(scene: &Scene, show: &dyn ShowData) -> Result<Vec<ChannelTarget>> {
    let mut targets = Vec::new();
    for entry in &scene.fixture_values {
        let fixture = show.fixture(entry.fixture_id).ok_or_else(|| {
            Error::NotFound(format!(
                "fixture {} referenced by scene '{}'",
                entry.fixture_id, scene.name
            ))
        })?;
        targets.extend(resolve_fixture(&fixture, &entry.values));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::show::ShowLibrary;
    use uuid::Uuid;

    #[test]
    fn test_resolve_fixture_values() {
        let targets = resolve_fixture_values(2, 10, &[255, 128, 64]);
        assert_eq!(
            targets,
            vec![
                ChannelTarget::new(2, 10, 255),
                ChannelTarget::new(2, 11, 128),
                ChannelTarget::new(2, 12, 64),
            ]
        );
    }

    #[test]
    fn test_no_bounds_check() {
        let targets = resolve_fixture_values(1, 511, &[1, 2, 3]);
        assert_eq!(targets[2], ChannelTarget::new(1, 513, 3));
        assert!(resolve_fixture_values(1, 1, &[]).is_empty());
    }

    #[test]
    fn test_resolve_scene() {
        let show = ShowLibrary::new();
        let par = FixtureInstance::new("PAR", 1, 1);
        let spot = FixtureInstance::new("Spot", 2, 100);
        let scene = Scene::new("look")
            .with_fixture(par.id, vec![10, 20])
            .with_fixture(spot.id, vec![30]);
        show.insert_fixture(par);
        show.insert_fixture(spot);

        let targets = resolve_scene(&scene, &show).unwrap();
        assert_eq!(
            targets,
            vec![
                ChannelTarget::new(1, 1, 10),
                ChannelTarget::new(1, 2, 20),
                ChannelTarget::new(2, 100, 30),
            ]
        );
    }

    #[test]
    fn test_resolve_scene_missing_fixture() {
        let show = ShowLibrary::new();
        let scene = Scene::new("broken").with_fixture(Uuid::new_v4(), vec![255]);
        let err = resolve_scene(&scene, &show).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
