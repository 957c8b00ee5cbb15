use std::collections::BTreeMap;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{CoverageFailure, Error, Result};
use crate::index_space::Aabb3i;
use crate::model::{FieldMeta, Grid, Model};
use crate::num_vec::Int3;




/**
 * A single cell: its integer coordinate, in units of cells of its own level,
 * and its level. Level 0 is the coarsest level; each level above it halves
 * the cell width.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRecord {
    pub coord: Int3,
    pub level: i32,
}

impl CellRecord {
    pub fn new(coord: [i32; 3], level: i32) -> Self {
        Self { coord: coord.into(), level }
    }

    fn group_key(&self, block_size: i32) -> (Int3, i32) {
        (self.coord.floor_div(block_size), self.level)
    }
}




/**
 * Block sizes to attempt, in order. The first size which tiles the cell set
 * exactly is used.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct BrickingConfig {
    pub candidate_sizes: Vec<i32>,
}

impl Default for BrickingConfig {
    fn default() -> Self {
        Self { candidate_sizes: vec![4, 2] }
    }
}




/**
 * Result of a successful bricking: the grids, in visitation order, and for
 * each input cell (in input order) its position in a single field's scalar
 * array.
 */
#[derive(Clone, Debug)]
pub struct Bricking {
    pub block_size: i32,
    pub grids: Vec<Grid>,
    pub cell_offsets: Vec<u64>,
    pub max_level: i32,
}




// ============================================================================
impl Bricking {

    pub fn num_cells(&self) -> u64 {
        self.cell_offsets.len() as u64
    }

    /**
     * Move a field's values from input cell order into grid order. Fails if
     * the field does not have one value per cell.
     */
    pub fn scatter(&self, name: &str, raw: &[f32]) -> Result<Vec<f32>> {
        if raw.len() != self.cell_offsets.len() {
            return Err(Error::SizeMismatch {
                field: name.to_string(),
                expected: self.num_cells(),
                found: raw.len() as u64,
            })
        }
        let mut reordered = vec![0.0; raw.len()];

        for (&offset, &value) in self.cell_offsets.iter().zip(raw) {
            reordered[offset as usize] = value;
        }
        Ok(reordered)
    }

    /**
     * Assemble a model from this bricking and the named fields, each given in
     * input cell order. Fields are scattered in parallel and concatenated in
     * the order given.
     */
    pub fn into_model(self, fields: &[(String, Vec<f32>)]) -> Result<Model> {
        let reordered = fields
            .par_iter()
            .map(|(name, raw)| self.scatter(name, raw))
            .collect::<Result<Vec<_>>>()?;

        let mut scalars = Vec::with_capacity(reordered.iter().map(Vec::len).sum());
        let mut field_metas = Vec::with_capacity(fields.len());

        for ((name, _), values) in fields.iter().zip(reordered) {
            field_metas.push(FieldMeta::scalar(name.clone(), scalars.len() as u64));
            scalars.extend(values);
        }

        let model = Model {
            refinement_of_level: (0..=self.max_level).map(|l| 1 << l).collect(),
            scalars,
            field_metas,
            num_cells_across_all_grids: self.num_cells(),
            grids: self.grids,
            user_meta: String::new(),
        };
        model.validate()?;
        Ok(model)
    }
}




/**
 * Attempt to tile the cells with cubes of the given edge length. Cells are
 * grouped by their enclosing cube and level; the attempt succeeds only if
 * every group is full. Grids are emitted in ascending order of (cube
 * coordinate, level) with consecutive scalar offsets.
 */
pub fn try_brick(cells: &[CellRecord], block_size: i32) -> std::result::Result<Bricking, CoverageFailure> {
    let expected = (block_size as usize).pow(3);
    let mut count_of_group: BTreeMap<(Int3, i32), usize> = BTreeMap::new();

    for cell in cells {
        *count_of_group.entry(cell.group_key(block_size)).or_default() += 1;
    }

    if let Some((&(group, level), &count)) = count_of_group.iter().find(|&(_, &n)| n != expected) {
        return Err(CoverageFailure { block_size, group, level, count, expected })
    }

    let dims = Int3::splat(block_size);
    let mut grids = Vec::with_capacity(count_of_group.len());
    let mut grid_of_group = BTreeMap::new();
    let mut offset = 0;

    for &(group, level) in count_of_group.keys() {
        grid_of_group.insert((group, level), grids.len());
        grids.push(Grid { origin: group * block_size, dims, level, user: 0, offset });
        offset += expected as u64;
    }

    let cell_offsets = cells
        .iter()
        .map(|cell| {
            let grid = &grids[grid_of_group[&cell.group_key(block_size)]];
            let local = (cell.coord - grid.origin).map(|x| x as u64);
            let bs = block_size as u64;
            grid.offset + local.x() + bs * (local.y() + bs * local.z())
        })
        .collect();

    let max_level = grids.iter().map(|g| g.level).max().unwrap_or(0);

    Ok(Bricking { block_size, grids, cell_offsets, max_level })
}




/**
 * Tile the cells with uniform cubic grids, trying each configured block size
 * in order. Fails with `Error::IncompleteGrid`, listing every attempt, if no
 * candidate tiles the cells exactly.
 */
pub fn brick(cells: &[CellRecord], config: &BrickingConfig) -> Result<Bricking> {
    if cells.is_empty() {
        return Err(Error::MalformedInput("no cells to brick".into()))
    }
    if config.candidate_sizes.is_empty() {
        return Err(Error::MalformedInput("no candidate block sizes".into()))
    }
    if let Some(bs) = config.candidate_sizes.iter().find(|&&bs| bs <= 0 || bs > 1024) {
        return Err(Error::MalformedInput(format!("invalid block size {}", bs)))
    }
    if let Some(cell) = cells.iter().find(|c| c.level < 0 || c.level > 30) {
        return Err(Error::MalformedInput(format!("cell level {} out of range", cell.level)))
    }

    let mut keys: Vec<_> = cells.iter().map(|c| (c.coord, c.level)).collect();
    keys.par_sort_unstable();

    if let Some(pair) = keys.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::MalformedInput(format!(
            "duplicate cell {:?} on level {}", pair[0].0.as_array(), pair[0].1)))
    }

    let mut attempts = Vec::new();

    for &block_size in &config.candidate_sizes {
        info!("trying to make grids of size {}^3", block_size);

        match try_brick(cells, block_size) {
            Ok(bricking) => {
                info!("found grid size {}^3: {} grids", block_size, bricking.grids.len());
                return Ok(bricking)
            }
            Err(failure) => {
                debug!("  -> not possible: {:?}", failure);
                attempts.push(failure)
            }
        }
    }
    Err(Error::IncompleteGrid(attempts))
}




/**
 * Cells converted to the model convention, together with the largest native
 * level and the extent of the native cells in finest cell units.
 */
#[derive(Clone, Debug)]
pub struct NormalizedCells {
    pub cells: Vec<CellRecord>,
    pub max_native_level: i32,
    pub native_bounds: Aabb3i,
}




/**
 * Convert cells from the native convention into the model convention. In the
 * native convention level 0 is the finest level, a cell on level `l` is `2^l`
 * finest cells wide, and coordinates are given in finest cell units. Each
 * coordinate is divided by its cell's width, and levels are flipped so that
 * the coarsest native level becomes level 0.
 */
pub fn normalize_native_cells(mut cells: Vec<CellRecord>) -> Result<NormalizedCells> {
    if let Some(cell) = cells.iter().find(|c| c.level < 0 || c.level > 30) {
        return Err(Error::MalformedInput(format!("native cell level {} out of range", cell.level)))
    }
    let first = cells.first().ok_or_else(|| Error::MalformedInput("no cells".into()))?;

    let mut native_bounds = Aabb3i::from_point(first.coord);
    let mut max_native_level = 0;

    for cell in &cells {
        let upper = cell.coord.checked_add(Int3::splat(1 << cell.level)).ok_or_else(|| {
            Error::MalformedInput(format!(
                "native cell {:?} on level {} reaches past the coordinate range", cell.coord.as_array(), cell.level))
        })?;
        max_native_level = max_native_level.max(cell.level);
        native_bounds.extend_point(cell.coord);
        native_bounds.extend_point(upper);
    }
    info!("native max level {}, bounds {:?} .. {:?}",
        max_native_level, native_bounds.lower.as_array(), native_bounds.upper.as_array());

    for cell in &mut cells {
        cell.coord = cell.coord.floor_div(1 << cell.level);
        cell.level = max_native_level - cell.level;
    }
    Ok(NormalizedCells { cells, max_native_level, native_bounds })
}
