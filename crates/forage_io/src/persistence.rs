//! Rkyv archives for trajectories.

use crate::error::{IoError, Result};
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn to_rkyv_bytes<T>(data: &T) -> Result<Vec<u8>>
where
    T: Serialize<AllocSerializer<4096>>,
    T: Archive,
{
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(data)
        .map_err(|e| IoError::archive("serialization", e))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}

pub fn from_rkyv_bytes<T>(bytes: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>
        + for<'a> rkyv::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>,
{
    let archived = rkyv::check_archived_root::<T>(bytes)
        .map_err(|e| IoError::archive("validation", e))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::archive("deserialization", e))
}

pub fn save_rkyv<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize<AllocSerializer<4096>>,
    T: Archive,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = to_rkyv_bytes(data)?;
    let mut file = File::create(path).map_err(|e| IoError::file("creating", path, e))?;
    file.write_all(&bytes).map_err(|e| IoError::file("writing", path, e))
}

pub fn load_rkyv<T, P>(path: P) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>
        + for<'a> rkyv::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IoError::file("reading", path, e))?;
    from_rkyv_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forage_data::{AgentMode, AgentRecord, PatchRecord, Trajectory, TrajectoryFrame};
    use tempfile::tempdir;

    fn sample_trajectory() -> Trajectory {
        let mut t = Trajectory::new(3, 500.0, 400.0);
        t.patches.push(PatchRecord {
            id: 0,
            x: 250.0,
            y: 200.0,
            radius: 50.0,
            created_at: 0,
        });
        for tick in 0..4 {
            t.frames.push(TrajectoryFrame {
                tick,
                agents: vec![AgentRecord {
                    id: 0,
                    x: 10.0 + tick as f64,
                    y: 20.0,
                    mode: AgentMode::Explore,
                    collected: 0.0,
                }],
            });
        }
        t
    }

    #[test]
    fn test_trajectory_rkyv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trajectory.rkyv");
        let traj = sample_trajectory();
        save_rkyv(&traj, &path).unwrap();
        let loaded: Trajectory = load_rkyv(&path).unwrap();
        assert_eq!(loaded, traj);
        assert_eq!(loaded.agent_path(0)[3], (13.0, 20.0));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result: Result<Trajectory> = from_rkyv_bytes(&[1, 2, 3]);
        assert!(matches!(
            result,
            Err(IoError::Archive {
                stage: "validation",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file_has_context() {
        let dir = tempdir().unwrap();
        let result: Result<Trajectory> = load_rkyv(dir.path().join("absent.rkyv"));
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("reading"));
        assert!(err.to_string().contains("absent.rkyv"));
    }
}
