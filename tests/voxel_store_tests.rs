//! Voxel store behaviour shared by the flat map and the paged chunk world,
//! plus persistence round trips through real files
use glam::{IVec3, UVec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use voxel_raycaster::error::ChunkError;
use voxel_raycaster::voxel::{BlockId, BlockRegistry, Chunk, ChunkId, Generator, GeneratorKind};
use voxel_raycaster::world::{FlatWorld, VoxelStore, World, WorldConfig};

fn registry() -> Arc<BlockRegistry> {
    Arc::new(BlockRegistry::builtin())
}

fn chunked(save_dir: Option<&std::path::Path>, max_resident_chunks: usize) -> World {
    World::new(
        WorldConfig {
            view_distance: 1,
            max_resident_chunks,
            save_dir: save_dir.map(|p| p.to_path_buf()),
            regenerate_corrupt: true,
        },
        Generator::empty(),
        registry(),
    )
}

#[test]
fn set_then_get_round_trips_in_both_stores() {
    let mut flat = FlatWorld::new(UVec3::new(8, 4, 8), registry());
    let mut world = chunked(None, 64);

    for (pos, block) in [
        (IVec3::new(0, 0, 0), BlockId::GRASS),
        (IVec3::new(7, 3, 7), BlockId::QUARTZ),
        (IVec3::new(3, 1, 5), BlockId::BARRIER),
    ] {
        flat.set_block(pos, block);
        world.set_block(pos, block);
        assert_eq!(flat.get_block(pos), block);
        assert_eq!(world.get_block(pos), block);
    }

    // Negative coordinates only exist in the chunked world
    let negative = IVec3::new(-1, -17, -33);
    world.set_block(negative, BlockId::DIRT);
    assert_eq!(world.get_block(negative), BlockId::DIRT);
    flat.set_block(negative, BlockId::DIRT);
    assert_eq!(flat.get_block(negative), BlockId::AIR);
}

#[test]
fn outside_reads_are_air_and_writes_are_ignored() {
    let mut flat = FlatWorld::new(UVec3::splat(4), registry());
    let before = flat.to_bytes();
    for pos in [IVec3::new(4, 0, 0), IVec3::new(0, 4, 0), IVec3::new(0, 0, -1)] {
        assert!(!flat.contains(pos));
        flat.set_block(pos, BlockId::DIRT);
        assert_eq!(flat.get_block(pos), BlockId::AIR);
    }
    assert_eq!(flat.to_bytes(), before);

    let mut world = chunked(None, 64);
    let far = IVec3::new(16 * 200, 0, 0);
    assert!(!world.contains(far));
    world.set_block(far, BlockId::DIRT);
    assert_eq!(world.get_block(far), BlockId::AIR);
    assert_eq!(world.chunk_count(), 0);
}

#[test]
fn chunk_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let position = IVec3::new(-2, 0, 5);

    let mut chunk = Chunk::new(position);
    chunk.set_block(0, 0, 0, BlockId::GRASS);
    chunk.set_block(15, 15, 15, BlockId::QUARTZ);
    chunk.save(dir.path()).unwrap();

    let name = ChunkId::from_coords(position).unwrap().file_name();
    assert_eq!(name, "00fe0005.map");
    assert_eq!(fs::read(dir.path().join(&name)).unwrap().len(), 4096);

    let mut loaded = Chunk::new(position);
    loaded.load(dir.path()).unwrap();
    assert_eq!(loaded.to_bytes(), chunk.to_bytes());
    assert_eq!(loaded.get_block(15, 15, 15), BlockId::QUARTZ);
}

#[test]
fn flat_map_persists_and_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let size = UVec3::new(6, 3, 5);
    let generator = Generator::flat(BlockId::GRASS);

    let mut world =
        FlatWorld::open(size, 7, Some(dir.path().to_path_buf()), &generator, registry(), true)
            .unwrap();
    assert_eq!(world.get_block(IVec3::new(2, 0, 2)), BlockId::GRASS);
    world.set_block(IVec3::new(5, 2, 4), BlockId::OAK_PLANKS);
    assert_eq!(world.save().unwrap(), 1);
    assert!(dir.path().join("00000007.map").exists());

    let reopened = FlatWorld::open(
        size,
        7,
        Some(dir.path().to_path_buf()),
        &Generator::empty(),
        registry(),
        true,
    )
    .unwrap();
    assert_eq!(reopened.to_bytes(), world.to_bytes());
}

#[test]
fn corrupt_map_is_quarantined_or_reported() {
    let dir = tempfile::tempdir().unwrap();
    let size = UVec3::splat(4);
    let path = dir.path().join("00000001.map");
    fs::write(&path, [1u8; 10]).unwrap();

    let strict = FlatWorld::open(
        size,
        1,
        Some(dir.path().to_path_buf()),
        &Generator::empty(),
        registry(),
        false,
    );
    assert!(matches!(strict, Err(ChunkError::Corrupt { actual: 10, expected: 64, .. })));

    let world = FlatWorld::open(
        size,
        1,
        Some(dir.path().to_path_buf()),
        &Generator::flat(BlockId::DIRT),
        registry(),
        true,
    )
    .unwrap();
    assert_eq!(world.get_block(IVec3::new(1, 0, 1)), BlockId::DIRT);
    assert!(dir.path().join("00000001.map.corrupt").exists());
    assert!(!path.exists());
}

#[test]
fn unknown_ids_in_chunk_file_regenerate() {
    let dir = tempfile::tempdir().unwrap();
    let name = ChunkId::from_coords(IVec3::ZERO).unwrap().file_name();
    fs::write(dir.path().join(&name), vec![200u8; 4096]).unwrap();

    let mut world = chunked(Some(dir.path()), 64);
    world.update(Vec3::splat(8.0)).unwrap();
    assert!(world.is_resident(IVec3::ZERO));
    assert_eq!(world.get_block(IVec3::new(3, 3, 3)), BlockId::AIR);
    assert!(dir.path().join(format!("{name}.corrupt")).exists());
}

#[test]
fn eviction_then_reload_keeps_edits() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = chunked(Some(dir.path()), 27);

    let edit = IVec3::new(4, 4, 4);
    world.update(Vec3::splat(8.0)).unwrap();
    world.set_block(edit, BlockId::QUARTZ);

    // Walk far enough that the original neighbourhood is pushed out
    world.update(Vec3::new(8.0 + 16.0 * 10.0, 8.0, 8.0)).unwrap();
    assert!(!world.is_resident(IVec3::ZERO));
    assert!(world.chunk_count() <= 27);

    // Rays and collision read the saved edit without paging the chunk in
    assert_eq!(world.get_block(edit), BlockId::QUARTZ);
    assert!(!world.is_resident(IVec3::ZERO));

    world.update(Vec3::splat(8.0)).unwrap();
    assert!(world.is_resident(IVec3::ZERO));
    assert_eq!(world.get_block(edit), BlockId::QUARTZ);
}

#[test]
fn terrain_is_deterministic_across_worlds() {
    let kind = GeneratorKind::Terrain {
        seed: 1234,
        base_height: 8,
    };
    let a = Generator::new(kind);
    let b = Generator::new(kind);
    for x in -20..20 {
        for z in -20..20 {
            for y in 0..20 {
                let pos = IVec3::new(x * 3, y, z * 3);
                assert_eq!(a.block_at(pos), b.block_at(pos));
            }
        }
    }
}

#[test]
fn random_edits_match_a_reference_map() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let blocks = [
        BlockId::AIR,
        BlockId::GRASS,
        BlockId::DIRT,
        BlockId::OAK_PLANKS,
        BlockId::QUARTZ,
        BlockId::BARRIER,
    ];

    let mut world = chunked(None, 512);
    let mut flat = FlatWorld::new(UVec3::splat(40), registry());
    let mut reference: HashMap<IVec3, BlockId> = HashMap::new();

    for _ in 0..2000 {
        let pos = IVec3::new(
            rng.gen_range(-8..48),
            rng.gen_range(-8..48),
            rng.gen_range(-8..48),
        );
        let block = blocks[rng.gen_range(0..blocks.len())];
        world.set_block(pos, block);
        flat.set_block(pos, block);
        reference.insert(pos, block);
    }

    for (&pos, &block) in &reference {
        assert_eq!(world.get_block(pos), block, "chunked world at {pos}");
        let expected = if flat.contains(pos) { block } else { BlockId::AIR };
        assert_eq!(flat.get_block(pos), expected, "flat world at {pos}");
    }
}

#[test]
fn edits_outlive_eviction_when_the_save_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = World::new(
        WorldConfig {
            view_distance: 0,
            max_resident_chunks: 1,
            save_dir: Some(dir.path().to_path_buf()),
            regenerate_corrupt: false,
        },
        Generator::empty(),
        registry(),
    );
    fs::create_dir(dir.path().join("00000000.map.tmp")).unwrap();

    world.set_block(IVec3::new(1, 1, 1), BlockId::DIRT);
    world.set_block(IVec3::new(17, 1, 1), BlockId::DIRT);
    assert!(world.is_resident(IVec3::ZERO));

    world.update(Vec3::splat(8.0)).unwrap();
    assert_eq!(world.get_block(IVec3::new(1, 1, 1)), BlockId::DIRT);
    assert_eq!(world.get_block(IVec3::new(17, 1, 1)), BlockId::DIRT);
}
