//! Tamr converts adaptive mesh refinement (AMR) simulation output into one
//! canonical block-grid model. Two kinds of input are supported: flat lists
//! of individual cells at varying refinement levels, which are bricked into
//! uniform cubic grids, and block-structured datasets, whose blocks are
//! assigned refinement levels from their physical cell widths. Either way the
//! result is a `Model`: a list of grids, each at one level of a power-of-two
//! level hierarchy, and the field values stored grid by grid. Models are
//! saved to and loaded from a compact binary format.

pub mod bricking;
pub mod codec;
pub mod error;
pub mod import;
pub mod index_space;
pub mod levels;
pub mod model;
pub mod num_vec;
pub mod report;
pub mod source;

pub use error::{Error, Result};
pub use model::{FieldMeta, Grid, Model};
