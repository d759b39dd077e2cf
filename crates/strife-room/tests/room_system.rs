//! Integration tests for room bootstrap and the on-disk index.

use std::path::PathBuf;

use strife_protocol::ByteBuffer;
use strife_room::{
    decode_room, encode_room, load_index, RoomBounds, RoomData, RoomRegistry,
    TileType, INDEX_FILE_NAME,
};
use uuid::Uuid;

/// A fresh, empty directory under the system temp dir.
async fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("strife-room-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    dir
}

fn small_rooms(count: usize) -> RoomData {
    RoomData {
        config: RoomBounds {
            min_width: 5,
            max_width: 9,
            min_height: 6,
            max_height: 9,
        },
        min_rooms: count,
    }
}

#[tokio::test]
async fn test_bootstrap_without_index_generates_and_persists() {
    let dir = scratch_dir().await;
    let data = small_rooms(4);

    let registry = RoomRegistry::bootstrap(&dir, &data).await.unwrap();
    assert_eq!(registry.len(), 4);

    let entries = load_index(&dir.join(INDEX_FILE_NAME))
        .await
        .unwrap()
        .expect("index should have been written");
    assert_eq!(entries.len(), 4);
    for entry in &entries {
        let room = registry.get(&entry.id).expect("indexed room exists");
        assert_eq!(entry.description, room.description);
        assert!(entry.active);
    }

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_bootstrap_with_index_restores_identity_and_flags() {
    let dir = scratch_dir().await;
    let data = small_rooms(3);

    let first = RoomRegistry::bootstrap(&dir, &data).await.unwrap();
    let target = first.iter().next().unwrap().id;

    // Flip one room inactive and rewrite the index.
    let mut rooms: Vec<_> = first.iter().cloned().collect();
    for room in &mut rooms {
        if room.id == target {
            room.active = false;
            room.description = "Collapsed".into();
        }
    }
    strife_room::save_index(&dir.join(INDEX_FILE_NAME), rooms.iter())
        .await
        .unwrap();

    let second = RoomRegistry::bootstrap(&dir, &data).await.unwrap();
    assert_eq!(second.len(), 3);
    let restored = second.get(&target).unwrap();
    assert!(!restored.active);
    assert_eq!(restored.description, "Collapsed");
    // Grid comes back at the minimum configured size, walls on the border.
    assert_eq!((restored.width(), restored.height()), (5, 6));
    assert_eq!(restored.tile(0, 0).unwrap().kind, TileType::WALL);
    assert_eq!(restored.tile(2, 2).unwrap().kind, TileType::DIRT);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_load_index_missing_file_is_none() {
    let dir = scratch_dir().await;
    assert!(load_index(&dir.join("nope.blob")).await.unwrap().is_none());
    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[test]
fn test_every_generated_room_survives_the_wire() {
    let registry =
        RoomRegistry::generate(&small_rooms(5), &mut rand::rng()).unwrap();
    for room in registry.iter() {
        let mut buf = ByteBuffer::new();
        encode_room(room, &mut buf).unwrap();
        let decoded = decode_room(&mut buf).unwrap();
        assert_eq!(decoded.id, room.id);
        assert!(decoded.tiles().eq(room.tiles()));
    }
}
