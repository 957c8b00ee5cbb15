use serde::Serialize;
use crate::error::{Error, Result};
use crate::index_space::IndexSpace;
use crate::num_vec::Int3;




/**
 * A uniform block of cells at a single refinement level. The origin and
 * dimensions are measured in cells of the block's own level. The block's
 * scalars occupy `dims.x * dims.y * dims.z` consecutive entries of each field,
 * starting at `offset`, in z-major order (x fastest).
 */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Grid {
    pub origin: Int3,
    pub dims: Int3,

    /// Index into `Model::refinement_of_level`, not a refinement factor.
    pub level: i32,

    /// Opaque to this library; importers set it to zero.
    pub user: u32,

    /// Counted in scalars, not bytes.
    pub offset: u64,
}




// ============================================================================
impl Grid {

    /**
     * Return the cells covered by this grid, or `None` if the dimensions are
     * negative or the upper corner overflows.
     */
    pub fn index_space(&self) -> Option<IndexSpace> {
        IndexSpace::try_new(self.origin, self.dims)
    }

    /**
     * Return the number of cells in this grid, or `None` if the dimensions
     * are negative.
     */
    pub fn num_cells(&self) -> Option<u64> {
        self.dims.volume()
    }
}




/**
 * Describes one named field stored in `Model::scalars`.
 */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldMeta {
    pub name: String,

    /// Components per cell. Only single-component fields are produced by the
    /// importers; components of wider fields would follow one another, each
    /// spanning `num_cells_across_all_grids` scalars.
    pub num_dimensions: i32,

    /// Start of this field within `Model::scalars`, counted in scalars.
    pub offset: u64,

    pub info: String,
}

impl FieldMeta {
    pub fn scalar(name: impl Into<String>, offset: u64) -> Self {
        Self { name: name.into(), offset, ..Self::default() }
    }
}

impl Default for FieldMeta {
    fn default() -> Self {
        Self {
            name: "<undefined>".to_string(),
            num_dimensions: 1,
            offset: 0,
            info: "<undefined>".to_string(),
        }
    }
}




/**
 * The canonical multi-resolution block-grid representation. A model is
 * assembled once, by one of the importers or by loading a saved model, and
 * is read-only afterwards.
 */
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Model {
    pub(crate) refinement_of_level: Vec<i32>,
    pub(crate) scalars: Vec<f32>,
    pub(crate) field_metas: Vec<FieldMeta>,
    pub(crate) grids: Vec<Grid>,
    pub(crate) num_cells_across_all_grids: u64,
    pub(crate) user_meta: String,
}




// ============================================================================
impl Model {

    /// Refinement factor of each level relative to a unit cell; a cell on
    /// level `i` is `1 / refinement_of_level[i]` wide.
    pub fn refinement_of_level(&self) -> &[i32] {
        &self.refinement_of_level
    }

    /// All fields' scalars, back to back.
    pub fn scalars(&self) -> &[f32] {
        &self.scalars
    }

    pub fn field_metas(&self) -> &[FieldMeta] {
        &self.field_metas
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn num_cells_across_all_grids(&self) -> u64 {
        self.num_cells_across_all_grids
    }

    pub fn user_meta(&self) -> &str {
        &self.user_meta
    }

    pub fn num_levels(&self) -> usize {
        self.refinement_of_level.len()
    }

    /**
     * Return the width of a cell on the given level, in units of the
     * coarsest (unit) cell.
     */
    pub fn cell_width(&self, level: i32) -> Option<f64> {
        usize::try_from(level)
            .ok()
            .and_then(|l| self.refinement_of_level.get(l))
            .map(|&r| 1.0 / r as f64)
    }

    /**
     * Return the scalars of the field at the given index, laid out with the
     * same per-grid offsets as `Self::grids`.
     */
    pub fn field_scalars(&self, index: usize) -> Option<&[f32]> {
        let meta = self.field_metas.get(index)?;
        let start = usize::try_from(meta.offset).ok()?;
        let count = usize::try_from(meta.num_dimensions).ok()?
            .checked_mul(usize::try_from(self.num_cells_across_all_grids).ok()?)?;
        self.scalars.get(start..start.checked_add(count)?)
    }

    /**
     * Return the value of a field at a cell of a grid, or `None` if either
     * index is out of range or the cell lies outside the grid.
     */
    pub fn sample(&self, field: usize, grid: usize, index: Int3) -> Option<f32> {
        let grid = self.grids.get(grid)?;
        let local = grid.index_space()?.z_major_offset(index)?;
        let position = usize::try_from(grid.offset).ok()?.checked_add(local)?;
        self.field_scalars(field)?.get(position).copied()
    }

    /**
     * Check the structural invariants of the model. Every grid references a
     * valid level and a representable box. Grid scalar ranges partition
     * `0..num_cells_across_all_grids` exactly once, and field ranges
     * partition `scalars` the same way. Refinement factors are positive and
     * non-decreasing with level.
     */
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: String| Err(Error::InvalidModel(what));

        for (l, pair) in self.refinement_of_level.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return invalid(format!("refinement of level {} decreases", l + 1))
            }
        }
        if let Some(r) = self.refinement_of_level.iter().find(|&&r| r <= 0) {
            return invalid(format!("non-positive refinement factor {}", r))
        }

        let mut ranges = Vec::with_capacity(self.grids.len());

        for (n, grid) in self.grids.iter().enumerate() {
            if grid.level < 0 || grid.level as usize >= self.refinement_of_level.len() {
                return invalid(format!("grid {} has level {} of {}", n, grid.level, self.num_levels()))
            }
            let cells = match grid.num_cells() {
                Some(cells) if grid.dims.all(|d| d > 0) => cells,
                _ => return invalid(format!("grid {} has non-positive dimensions", n)),
            };
            if grid.index_space().is_none() {
                return invalid(format!("grid {} extends past the integer coordinate range", n))
            }
            ranges.push((grid.offset, cells, n));
        }
        ranges.sort_unstable();

        let mut next = 0u64;

        for (offset, cells, n) in ranges {
            if offset != next {
                return invalid(format!("grid {} starts at scalar {}, expected {}", n, offset, next))
            }
            next = offset.saturating_add(cells);
        }
        if next != self.num_cells_across_all_grids {
            return invalid(format!(
                "grids cover {} cells, model declares {}", next, self.num_cells_across_all_grids))
        }

        let mut spans = Vec::with_capacity(self.field_metas.len());

        for meta in &self.field_metas {
            if meta.num_dimensions < 1 {
                return invalid(format!("field '{}' has {} dimensions", meta.name, meta.num_dimensions))
            }
            let span = (meta.num_dimensions as u64).saturating_mul(self.num_cells_across_all_grids);
            spans.push((meta.offset, span, &meta.name));
        }
        spans.sort_unstable();

        let mut next = 0u64;

        for (offset, span, name) in spans {
            if offset != next {
                return invalid(format!("field '{}' starts at scalar {}, expected {}", name, offset, next))
            }
            next = offset.saturating_add(span);
        }
        if next != self.scalars.len() as u64 {
            return invalid(format!(
                "fields account for {} scalars, model holds {}", next, self.scalars.len()))
        }
        Ok(())
    }
}
