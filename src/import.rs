use std::path::Path;
use std::str::FromStr;

use log::info;

use crate::bricking::{brick, normalize_native_cells, BrickingConfig, CellRecord};
use crate::error::{Error, Result};
use crate::levels::{normalize_blocks, BlockSource, ScalarTransform};
use crate::model::{FieldMeta, Model};
use crate::source::{read_cells_file, read_scalars_file, BlockDataset, CellInputs};




/**
 * Build a model from cells in the native convention (level 0 finest,
 * coordinates in finest cell units) and named fields given in cell order.
 */
pub fn cells_to_model(
    native_cells: Vec<CellRecord>,
    fields: &[(String, Vec<f32>)],
    config: &BrickingConfig) -> Result<Model>
{
    let normalized = normalize_native_cells(native_cells)?;
    let bricking = brick(&normalized.cells, config)?;
    bricking.into_model(fields)
}




/**
 * Read a cell file and its scalar files and convert them into a model. Each
 * field is named after the file it was read from.
 */
pub fn import_cells(inputs: &CellInputs, config: &BrickingConfig) -> Result<Model> {
    let cells = read_cells_file(&inputs.cells)?;

    let fields = inputs.scalars
        .iter()
        .map(|path| -> Result<(String, Vec<f32>)> {
            Ok((path.display().to_string(), read_scalars_file(path)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let model = cells_to_model(cells, &fields, config)?;
    info!("built {} grids on {} levels with {} fields", model.grids().len(), model.num_levels(), fields.len());
    Ok(model)
}




/**
 * Selects a field of a block dataset, by position or by name.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum FieldSelector {
    Index(usize),
    Name(String),
}

impl FieldSelector {
    fn resolve(&self, names: &[String]) -> Result<String> {
        match self {
            Self::Index(i) => names.get(*i).cloned().ok_or_else(|| Error::MalformedInput(format!(
                "field index {} out of range, dataset has {} fields", i, names.len()))),
            Self::Name(name) if names.contains(name) => Ok(name.clone()),
            Self::Name(name) => Err(Error::MalformedInput(format!("dataset has no field '{}'", name))),
        }
    }
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl FromStr for FieldSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(s.parse().map(Self::Index).unwrap_or_else(|_| Self::Name(s.to_string())))
    }
}




/**
 * Convert one field of a block-structured dataset into a model. Levels are
 * derived from the blocks' physical sizes, and each value is passed through
 * the given transform.
 */
pub fn import_blocks<S: BlockSource>(
    source: &S,
    field: &FieldSelector,
    transform: ScalarTransform,
    user_meta: &str) -> Result<Model>
{
    let name = field.resolve(&source.field_names())?;
    let levels = normalize_blocks(&source.blocks(), source.block_dims())?;

    let num_cells = levels.grids
        .iter()
        .map(|g| g.offset + g.num_cells().unwrap_or(0))
        .max()
        .unwrap_or(0);

    info!("reading field '{}'", name);
    let raw = source.read_field(&name)?;

    if raw.len() as u64 != num_cells {
        return Err(Error::SizeMismatch { field: name, expected: num_cells, found: raw.len() as u64 })
    }

    let model = Model {
        refinement_of_level: levels.refinement_of_level,
        scalars: transform.apply_all(&raw),
        field_metas: vec![FieldMeta::scalar(name, 0)],
        grids: levels.grids,
        num_cells_across_all_grids: num_cells,
        user_meta: user_meta.to_string(),
    };
    model.validate()?;
    Ok(model)
}




/**
 * Open a block dataset file and convert one of its fields into a model. The
 * input path is recorded as the model's user meta.
 */
pub fn import_block_file<P: AsRef<Path>>(path: P, field: &FieldSelector, transform: ScalarTransform) -> Result<Model> {
    let path = path.as_ref();
    let dataset = BlockDataset::open(path)?;
    import_blocks(&dataset, field, transform, &path.display().to_string())
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{cells_to_model, import_blocks, FieldSelector};
    use crate::bricking::{BrickingConfig, CellRecord};
    use crate::error::Error;
    use crate::index_space::range3d;
    use crate::levels::ScalarTransform;
    use crate::num_vec::Int3;
    use crate::source::{BlockDataset, BlockRecord, DatasetField};

    fn dataset() -> BlockDataset {
        BlockDataset {
            block_dims: [2, 2, 2],
            blocks: vec![
                BlockRecord { lower: [0.0, 0.0, 0.0], upper: [2.0, 2.0, 2.0], refine_level: 1 },
                BlockRecord { lower: [2.0, 0.0, 0.0], upper: [3.0, 1.0, 1.0], refine_level: 2 },
            ],
            fields: vec![
                DatasetField { name: "dens".into(), data: (0..16).map(|n| n as f64).collect() },
                DatasetField { name: "temp".into(), data: vec![1.0; 16] },
            ],
        }
    }

    #[test]
    fn native_cells_convert_to_two_level_model() {
        // One coarse native level-1 cube of 2^3 cells at the origin, and a
        // fine 2^3 cube filling the coarse cell at (2, 0, 0).
        let mut cells: Vec<_> = range3d([0, 0, 0], [2, 2, 2])
            .iter()
            .map(|c| CellRecord { coord: c * 2, level: 1 })
            .collect();
        cells.extend(range3d([4, 0, 0], [2, 2, 2]).iter().map(|coord| CellRecord { coord, level: 0 }));

        let values: Vec<f32> = (0..16).map(|n| n as f32).collect();
        let model = cells_to_model(cells, &[("v".to_string(), values)], &BrickingConfig::default()).unwrap();

        assert_eq!(model.refinement_of_level(), &[1, 2]);
        assert_eq!(model.grids().len(), 2);
        assert_eq!(model.grids()[0].level, 0);
        assert_eq!(model.grids()[1].level, 1);
        assert_eq!(model.grids()[1].origin, Int3::xyz(4, 0, 0));
        assert_eq!(model.sample(0, 1, Int3::xyz(5, 1, 1)), Some(15.0));
    }

    #[test]
    fn block_dataset_converts_with_log_transform() {
        let model = import_blocks(&dataset(), &FieldSelector::default(), ScalarTransform::Log, "in.cbor").unwrap();
        assert_eq!(model.refinement_of_level(), &[1, 2]);
        assert_eq!(model.num_cells_across_all_grids(), 16);
        assert_eq!(model.field_metas()[0].name, "dens");
        assert_eq!(model.user_meta(), "in.cbor");
        assert_eq!(model.scalars()[0], 0.0);
        assert!((model.scalars()[1] - 0.0).abs() < 1e-6);
        assert!((model.scalars()[15] - 15f32.ln()).abs() < 1e-6);
        assert_eq!(model.grids()[1].origin, Int3::xyz(4, 0, 0));
    }

    #[test]
    fn fields_can_be_selected_by_name() {
        let selector: FieldSelector = "temp".parse().unwrap();
        assert_eq!(selector, FieldSelector::Name("temp".into()));
        assert_eq!("1".parse::<FieldSelector>().unwrap(), FieldSelector::Index(1));

        let model = import_blocks(&dataset(), &selector, ScalarTransform::Identity, "").unwrap();
        assert!(model.scalars().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let missing = FieldSelector::Name("velx".into());
        assert!(matches!(import_blocks(&dataset(), &missing, ScalarTransform::Log, ""), Err(Error::MalformedInput(_))));
        let missing = FieldSelector::Index(2);
        assert!(matches!(import_blocks(&dataset(), &missing, ScalarTransform::Log, ""), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn short_variable_is_a_size_mismatch() {
        let mut dataset = dataset();
        dataset.fields[0].data.pop();
        let result = import_blocks(&dataset, &FieldSelector::default(), ScalarTransform::Log, "");
        assert!(matches!(result, Err(Error::SizeMismatch { expected: 16, found: 15, .. })));
    }
}
