//! The server's room registry: every room, keyed by identifier.

use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use uuid::Uuid;

use crate::index::{load_index, save_index, INDEX_FILE_NAME};
use crate::{Room, RoomData, RoomError};

/// Owns every room the server knows about.
///
/// The registry itself is plain data. The server wraps it in a mutex so
/// that every read-modify-write from a connection task is exclusive.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<Uuid, Room>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a room, returning any room it replaced.
    pub fn insert(&mut self, room: Room) -> Option<Room> {
        self.rooms.insert(room.id, room)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Mutable access to an existing room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no such room exists. No placeholder is
    /// ever created.
    pub fn get_mut(&mut self, id: &Uuid) -> Result<&mut Room, RoomError> {
        self.rooms.get_mut(id).ok_or(RoomError::NotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Iterates rooms in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Generates `count` walled rooms with random dimensions.
    pub fn generate(
        data: &RoomData,
        rng: &mut impl Rng,
    ) -> Result<Self, RoomError> {
        let bounds = data.config.clone().validated()?;
        let mut registry = Self::new();
        for _ in 0..data.min_rooms {
            let (width, height) = bounds.random_dimensions(rng);
            let room = Room::generate(width, height);
            tracing::info!(room_id = %room.id, width, height, "generated room");
            registry.insert(room);
        }
        Ok(registry)
    }

    /// Builds the startup registry from the index in `data_dir`.
    ///
    /// With no index on disk, `min_rooms` rooms are generated and a new
    /// index is written. With an index, each entry is restored with its
    /// persisted description and active flag on a freshly generated grid
    /// at the minimum configured size, because the index carries no tiles.
    pub async fn bootstrap(
        data_dir: &Path,
        data: &RoomData,
    ) -> Result<Self, RoomError> {
        let path = data_dir.join(INDEX_FILE_NAME);

        let Some(entries) = load_index(&path).await? else {
            tracing::info!(path = %path.display(), "no room index, generating rooms");
            let registry = Self::generate(data, &mut rand::rng())?;
            save_index(&path, registry.iter()).await?;
            return Ok(registry);
        };

        let bounds = data.config.clone().validated()?;
        tracing::warn!(
            rooms = entries.len(),
            width = bounds.min_width,
            height = bounds.min_height,
            "room index has no tile data, regenerating grids"
        );
        let mut registry = Self::new();
        for entry in entries {
            let mut room =
                Room::generate_with_id(entry.id, bounds.min_width, bounds.min_height);
            room.description = entry.description;
            room.active = entry.active;
            registry.insert(room);
        }
        Ok(registry)
    }
}
