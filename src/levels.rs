use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::index_space::Aabb3d;
use crate::model::Grid;
use crate::num_vec::{Float3, Int3};




/// Upper limit on the number of levels; refinement factors are `i32`.
const MAX_LEVEL: i32 = 30;




/// A block of a block-structured dataset, as stored by the simulation code.
/// The native refinement counter is kept for reporting only; canonical
/// levels are derived from the physical extent of the block.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeBlock {
    pub bounds: Aabb3d,
    pub refine_level: i32,
}




/// A trait for a block-structured dataset: a list of blocks sharing the same
/// cell dimensions, and named fields holding one dense array per block.
///
pub trait BlockSource {
    /// Cell dimensions shared by every block.
    fn block_dims(&self) -> Int3;

    /// The blocks, in storage order.
    fn blocks(&self) -> Vec<NativeBlock>;

    /// Names of the fields stored in the dataset, in storage order.
    fn field_names(&self) -> Vec<String>;

    /// Read a field: the blocks' arrays back to back in storage order, each
    /// in z-major cell order.
    fn read_field(&self, name: &str) -> Result<Vec<f64>>;
}




/// Canonical grids derived from a list of native blocks.
///
#[derive(Clone, Debug)]
pub struct LevelAssignment {
    pub grids: Vec<Grid>,
    pub refinement_of_level: Vec<i32>,
    pub world_bounds: Aabb3d,
    pub unit_cell_size: Float3,
    pub max_level: i32,
}




/// Assign each block a zero-based level from its physical cell width. The
/// widest block defines the unit cell; a block whose cells are `2^l` times
/// narrower is put on level `l`. The exponent is rounded to the nearest
/// integer, so small errors in the stored bounding boxes are tolerated.
/// Grid origins are measured from the lower corner of the union of all
/// blocks, in cells of the grid's own level. Grids keep the storage order of
/// the blocks, so grid `n` starts at scalar `n` times the block volume.
///
pub fn normalize_blocks(blocks: &[NativeBlock], block_dims: Int3) -> Result<LevelAssignment> {
    let first = blocks
        .first()
        .ok_or_else(|| Error::MalformedInput("dataset has no blocks".into()))?;

    if !block_dims.all(|d| d > 0) {
        return Err(Error::MalformedInput(format!("invalid block dimensions {:?}", block_dims.as_array())))
    }
    let block_volume = block_dims
        .volume()
        .ok_or_else(|| Error::MalformedInput("block volume overflows".into()))?;

    let world_bounds = blocks.iter().fold(first.bounds, |b, block| b.union(&block.bounds));
    let max_block_size = blocks.iter().fold(first.bounds.size(), |s, block| s.component_max(block.bounds.size()));
    let dims = block_dims.as_f64();
    let unit_cell_size = max_block_size.component_div(dims);

    info!("world bounds {:?} .. {:?}", world_bounds.lower.as_array(), world_bounds.upper.as_array());
    info!("unit cell size {:?}", unit_cell_size.as_array());

    let mut grids = Vec::with_capacity(blocks.len());
    let mut max_level = 0;

    for (n, block) in blocks.iter().enumerate() {
        let size = block.bounds.size();

        if !size.all(|s| s.is_finite() && s > 0.0) {
            return Err(Error::MalformedInput(format!("block {} has degenerate bounds", n)))
        }
        let cell_size = size.component_div(dims);
        let level = (unit_cell_size.x() / cell_size.x()).log2().round();

        if !(0.0..=MAX_LEVEL as f64).contains(&level) {
            return Err(Error::MalformedInput(format!("block {} has refinement exponent {}", n, level)))
        }
        let level = level as i32;
        max_level = max_level.max(level);

        let origin = (block.bounds.lower - world_bounds.lower)
            .component_div(cell_size)
            .round_to_int()
            .ok_or_else(|| Error::MalformedInput(format!("block {} origin is out of range", n)))?;

        debug!("block {} (native level {}) -> level {} at {:?}", n, block.refine_level, level, origin.as_array());

        grids.push(Grid {
            origin,
            dims: block_dims,
            level,
            user: 0,
            offset: n as u64 * block_volume,
        });
    }
    info!("{} blocks on {} levels", grids.len(), max_level + 1);

    Ok(LevelAssignment {
        grids,
        refinement_of_level: (0..=max_level).map(|l| 1 << l).collect(),
        world_bounds,
        unit_cell_size,
        max_level,
    })
}




/// Mapping applied to native scalar values on import.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarTransform {
    /// Natural logarithm, except that zero stays zero
    Log,
    Identity,
}

impl ScalarTransform {
    pub fn apply(&self, value: f64) -> f32 {
        match self {
            Self::Log => log_transform(value),
            Self::Identity => value as f32,
        }
    }

    /// Apply the transform to every value, preserving order.
    pub fn apply_all(&self, values: &[f64]) -> Vec<f32> {
        values.par_iter().map(|&v| self.apply(v)).collect()
    }
}

/// Natural logarithm which maps zero to zero rather than negative infinity.
pub fn log_transform(value: f64) -> f32 {
    if value == 0.0 {
        0.0
    } else {
        value.ln() as f32
    }
}
