use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use log::info;
use serde::{Deserialize, Serialize};

use crate::bricking::CellRecord;
use crate::error::{Error, Result};
use crate::index_space::Aabb3d;
use crate::levels::{BlockSource, NativeBlock};
use crate::num_vec::{Float3, Int3};




/// Size in bytes of one record in a `.cells` file: three coordinates and a
/// level, each a little-endian 32-bit signed integer.
pub const CELL_RECORD_SIZE: usize = 16;

pub const CELLS_SUFFIX: &str = ".cells";
pub const SCALARS_SUFFIX: &str = ".scalars";




fn read_whole_file(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    File::open(path)
        .map_err(|e| Error::open_failure(path, e))?
        .read_to_end(&mut bytes)?;
    Ok(bytes)
}




/**
 * Decode a cell list from raw bytes. A trailing partial record means the
 * file was truncated.
 */
pub fn parse_cells(bytes: &[u8]) -> Result<Vec<CellRecord>> {
    if bytes.len() % CELL_RECORD_SIZE != 0 {
        return Err(Error::MalformedInput(format!(
            "truncated cell list: {} bytes is not a multiple of {}", bytes.len(), CELL_RECORD_SIZE)))
    }
    bytes
        .chunks_exact(CELL_RECORD_SIZE)
        .map(|mut record| -> Result<CellRecord> {
            let mut v = [0i32; 4];
            record.read_i32_into::<LittleEndian>(&mut v)?;
            Ok(CellRecord::new([v[0], v[1], v[2]], v[3]))
        })
        .collect()
}




/**
 * Decode a flat array of 32-bit floats from raw bytes.
 */
pub fn parse_scalars(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::MalformedInput(format!(
            "truncated scalar array: {} bytes is not a multiple of 4", bytes.len())))
    }
    let mut values = vec![0.0; bytes.len() / 4];
    let mut r = bytes;
    r.read_f32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

pub fn read_cells_file<P: AsRef<Path>>(path: P) -> Result<Vec<CellRecord>> {
    let path = path.as_ref();
    let cells = parse_cells(&read_whole_file(path)?)?;
    info!("read {} cells from {}", cells.len(), path.display());
    Ok(cells)
}

pub fn read_scalars_file<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let values = parse_scalars(&read_whole_file(path)?)?;
    info!("loading {} scalars from {}", values.len(), path.display());
    Ok(values)
}




/**
 * The inputs of a cell-list conversion: one cell file, and one or more scalar
 * files holding a field each, told apart by their suffixes.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct CellInputs {
    pub cells: PathBuf,
    pub scalars: Vec<PathBuf>,
}

impl CellInputs {
    pub fn classify<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut cells = None;
        let mut scalars = Vec::new();

        for path in paths {
            let path: PathBuf = path.into();
            let name = path.to_string_lossy();

            if name.ends_with(CELLS_SUFFIX) {
                if let Some(previous) = cells.replace(path.clone()) {
                    return Err(Error::MalformedInput(format!(
                        "more than one cell file: {} and {}", previous.display(), path.display())))
                }
            } else if name.ends_with(SCALARS_SUFFIX) {
                scalars.push(path.clone());
            } else {
                return Err(Error::MalformedInput(format!("unrecognized input file name {}", name)))
            }
        }
        let cells = cells.ok_or_else(|| Error::MalformedInput(format!("no {} file specified", CELLS_SUFFIX)))?;

        if scalars.is_empty() {
            return Err(Error::MalformedInput(format!("no {} file(s) specified", SCALARS_SUFFIX)))
        }
        Ok(Self { cells, scalars })
    }
}




/// One block of a [`BlockDataset`]: its physical bounding box and the
/// refinement counter written by the simulation code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
    pub refine_level: i32,
}

/// A named variable of a [`BlockDataset`], one dense array per block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetField {
    pub name: String,
    pub data: Vec<f64>,
}

/// A block-structured dataset: blocks of identical cell dimensions with one
/// array per block for each variable. Stored as a CBOR document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDataset {
    pub block_dims: [i32; 3],
    pub blocks: Vec<BlockRecord>,
    pub fields: Vec<DatasetField>,
}




// ============================================================================
impl BlockDataset {

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open_failure(path, e))?;
        let dataset: Self = ciborium::de::from_reader(BufReader::new(file))
            .map_err(|e| Error::open_failure(path, format!("not a block dataset: {:?}", e)))?;

        info!("opened {} with {} blocks of {:?} cells and {} fields",
            path.display(), dataset.blocks.len(), dataset.block_dims, dataset.fields.len());
        Ok(dataset)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        ciborium::ser::into_writer(self, &mut out)
            .map_err(|e| Error::MalformedInput(format!("cannot encode block dataset: {:?}", e)))?;
        out.flush()?;
        Ok(())
    }
}

impl BlockSource for BlockDataset {
    fn block_dims(&self) -> Int3 {
        self.block_dims.into()
    }

    fn blocks(&self) -> Vec<NativeBlock> {
        self.blocks
            .iter()
            .map(|b| NativeBlock {
                bounds: Aabb3d::new(Float3::from(b.lower), Float3::from(b.upper)),
                refine_level: b.refine_level,
            })
            .collect()
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    fn read_field(&self, name: &str) -> Result<Vec<f64>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.data.clone())
            .ok_or_else(|| Error::MalformedInput(format!("dataset has no field '{}'", name)))
    }
}
