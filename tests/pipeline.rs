use std::path::{Path, PathBuf};

use tamr::bricking::BrickingConfig;
use tamr::import::{import_block_file, import_cells, FieldSelector};
use tamr::index_space::range3d;
use tamr::levels::ScalarTransform;
use tamr::num_vec::Int3;
use tamr::source::{BlockDataset, BlockRecord, CellInputs, DatasetField};
use tamr::{Error, Model};




fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tamr-pipeline-{}-{}", std::process::id(), name))
}

fn write_cells(path: &Path, cells: &[([i32; 3], i32)]) {
    let bytes: Vec<u8> = cells
        .iter()
        .flat_map(|(c, l)| [c[0], c[1], c[2], *l])
        .flat_map(|v| v.to_le_bytes())
        .collect();
    std::fs::write(path, bytes).unwrap();
}

fn write_scalars(path: &Path, values: &[f32]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}

/// Two coarse 4^3 cubes at native level 1, and one fine 4^3 cube at native
/// level 0 placed next to them, listed in an arbitrary order.
fn native_cells() -> Vec<([i32; 3], i32)> {
    let mut cells = Vec::new();

    for origin in [[0, 0, 0], [4, 0, 0]] {
        for c in range3d(origin, [4, 4, 4]).iter() {
            cells.push(((c * 2).as_array(), 1));
        }
    }
    for c in range3d([16, 0, 0], [4, 4, 4]).iter() {
        cells.push((c.as_array(), 0));
    }
    cells.reverse();
    cells
}




// ============================================================================
#[test]
fn cell_files_convert_save_and_load() {
    let cells = native_cells();
    let cells_path = scratch_path("a.cells");
    let index_path = scratch_path("index.scalars");
    let level_path = scratch_path("level.scalars");
    let model_path = scratch_path("a.tamr");

    write_cells(&cells_path, &cells);
    write_scalars(&index_path, &(0..cells.len()).map(|n| n as f32).collect::<Vec<_>>());
    write_scalars(&level_path, &cells.iter().map(|(_, l)| *l as f32).collect::<Vec<_>>());

    let inputs = CellInputs::classify([&cells_path, &index_path, &level_path]).unwrap();
    let model = import_cells(&inputs, &BrickingConfig::default()).unwrap();
    model.save(&model_path).unwrap();
    let loaded = Model::load(&model_path).unwrap();

    for path in [&cells_path, &index_path, &level_path, &model_path] {
        std::fs::remove_file(path).unwrap();
    }

    assert_eq!(loaded, model);
    assert_eq!(model.grids().len(), 3);
    assert_eq!(model.refinement_of_level(), &[1, 2]);
    assert_eq!(model.num_cells_across_all_grids(), 192);
    assert_eq!(model.scalars().len(), 384);
    assert_eq!(model.field_metas()[1].offset, 192);
    assert_eq!(model.field_metas()[0].name, index_path.display().to_string());

    let levels: Vec<_> = model.grids().iter().map(|g| (g.origin.as_array(), g.level)).collect();
    assert_eq!(levels, vec![([0, 0, 0], 0), ([4, 0, 0], 0), ([16, 0, 0], 1)]);

    // The fine grid holds the cells whose native level was 0.
    let fine = &model.grids()[2];
    let level_field = model.field_scalars(1).unwrap();
    let start = fine.offset as usize;
    assert!(level_field[start..start + 64].iter().all(|&l| l == 0.0));

    // The index field maps each grid cell back to the input cell it came from.
    for (n, coord) in fine.index_space().unwrap().iter().enumerate() {
        let original = model.scalars()[start + n] as usize;
        assert_eq!(cells[original], (coord.as_array(), 0));
    }
}

#[test]
fn mismatched_scalar_file_fails_the_conversion() {
    let cells = native_cells();
    let cells_path = scratch_path("b.cells");
    let short_path = scratch_path("short.scalars");

    write_cells(&cells_path, &cells);
    write_scalars(&short_path, &vec![1.0; cells.len() - 1]);

    let inputs = CellInputs::classify([&cells_path, &short_path]).unwrap();
    let result = import_cells(&inputs, &BrickingConfig::default());

    std::fs::remove_file(&cells_path).unwrap();
    std::fs::remove_file(&short_path).unwrap();

    assert!(matches!(result, Err(Error::SizeMismatch { .. })));
}

#[test]
fn missing_cell_file_fails_to_open() {
    let inputs = CellInputs::classify([scratch_path("missing.cells"), scratch_path("x.scalars")]).unwrap();
    let result = import_cells(&inputs, &BrickingConfig::default());
    assert!(matches!(result, Err(Error::SourceOpenFailure { .. })));
}

#[test]
fn block_dataset_converts_save_and_load() {
    let dataset = BlockDataset {
        block_dims: [4, 4, 4],
        blocks: vec![
            BlockRecord { lower: [0.0, 0.0, 0.0], upper: [1.0, 1.0, 1.0], refine_level: 3 },
            BlockRecord { lower: [1.0, 0.0, 0.0], upper: [1.5, 0.5, 0.5], refine_level: 4 },
            BlockRecord { lower: [1.5, 0.0, 0.0], upper: [1.75, 0.25, 0.25], refine_level: 5 },
        ],
        fields: vec![DatasetField { name: "dens".into(), data: (0..192).map(|n| (n % 3) as f64).collect() }],
    };
    let dataset_path = scratch_path("blocks.cbor");
    let model_path = scratch_path("blocks.tamr");
    dataset.save(&dataset_path).unwrap();

    let model = import_block_file(&dataset_path, &FieldSelector::default(), ScalarTransform::Log).unwrap();
    model.save(&model_path).unwrap();
    let loaded = Model::load(&model_path).unwrap();

    std::fs::remove_file(&dataset_path).unwrap();
    std::fs::remove_file(&model_path).unwrap();

    assert_eq!(loaded, model);
    assert_eq!(model.refinement_of_level(), &[1, 2, 4]);
    assert_eq!(model.user_meta(), dataset_path.display().to_string());

    let levels: Vec<_> = model.grids().iter().map(|g| g.level).collect();
    assert_eq!(levels, vec![0, 1, 2]);
    assert_eq!(model.grids()[1].origin, Int3::xyz(8, 0, 0));
    assert_eq!(model.grids()[2].origin, Int3::xyz(24, 0, 0));

    assert_eq!(model.scalars()[0], 0.0);
    assert_eq!(model.scalars()[1], 0.0);
    assert!((model.scalars()[2] - 2f32.ln()).abs() < 1e-6);
    assert!(model.scalars().iter().all(|s| s.is_finite()));
}

#[test]
fn model_with_wrong_magic_is_rejected() {
    let path = scratch_path("garbage.tamr");
    std::fs::write(&path, [0u8; 64]).unwrap();
    let result = Model::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::MalformedInput(_))));
}
