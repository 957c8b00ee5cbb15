//! Binary persistence of a [`Model`]. The layout is a magic number followed
//! by the model's members in declaration order. Every integer is fixed width
//! and little-endian; arrays carry a 64-bit element count and strings a 32-bit
//! byte count. There is no version field. Strings are arbitrary bytes on
//! disk; bytes which are not UTF-8 are replaced by U+FFFD when loading.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::model::{FieldMeta, Grid, Model};
use crate::num_vec::Int3;

/// Leading sentinel of every saved model
pub const MAGIC: u64 = 0x6655_4465_ABAB;

/// Size of one serialized grid record in bytes
pub const GRID_RECORD_SIZE: usize = 40;

/// Arrays are read in chunks of this many elements, so that a corrupt count
/// fails on the missing bytes rather than on a huge allocation.
const READ_CHUNK: usize = 1 << 16;

type E = LittleEndian;

/// Write a model to the given stream.
pub fn write_model<W: Write>(model: &Model, out: &mut W) -> Result<()> {
    out.write_u64::<E>(MAGIC)?;

    out.write_u64::<E>(model.refinement_of_level.len() as u64)?;
    for &r in &model.refinement_of_level {
        out.write_i32::<E>(r)?;
    }

    out.write_u64::<E>(model.scalars.len() as u64)?;
    for &s in &model.scalars {
        out.write_f32::<E>(s)?;
    }

    out.write_u64::<E>(model.grids.len() as u64)?;
    for grid in &model.grids {
        write_grid(grid, out)?;
    }

    out.write_u64::<E>(model.num_cells_across_all_grids)?;

    let num_fields = i32::try_from(model.field_metas.len())
        .map_err(|_| Error::MalformedInput("too many fields to encode".into()))?;
    out.write_i32::<E>(num_fields)?;

    for meta in &model.field_metas {
        write_string(&meta.name, out)?;
        out.write_i32::<E>(meta.num_dimensions)?;
        out.write_u64::<E>(meta.offset)?;
        write_string(&meta.info, out)?;
    }
    write_string(&model.user_meta, out)?;
    Ok(())
}

/// Read a model from the given stream. The magic number is checked before
/// anything else is read; no partially decoded model is ever returned.
pub fn read_model<R: Read>(input: &mut R) -> Result<Model> {
    let magic = input.read_u64::<E>().map_err(Error::truncated("model header"))?;

    if magic != MAGIC {
        return Err(Error::MalformedInput(format!("wrong magic number {:#x}", magic)));
    }

    let refinement_of_level = read_array(input, "refinement levels", |r, buf: &mut [i32]| r.read_i32_into::<E>(buf))?;
    let scalars = read_array(input, "scalars", |r, buf: &mut [f32]| r.read_f32_into::<E>(buf))?;

    let num_grids = read_count(input, "grids")?;
    let mut grids = Vec::with_capacity(num_grids.min(READ_CHUNK));
    for _ in 0..num_grids {
        grids.push(read_grid(input)?);
    }

    let num_cells_across_all_grids = input.read_u64::<E>().map_err(Error::truncated("cell count"))?;

    let num_fields = input.read_i32::<E>().map_err(Error::truncated("field count"))?;
    let num_fields = usize::try_from(num_fields)
        .map_err(|_| Error::MalformedInput(format!("negative field count {}", num_fields)))?;

    let mut field_metas = Vec::with_capacity(num_fields.min(READ_CHUNK));
    for _ in 0..num_fields {
        let name = read_string(input)?;
        let num_dimensions = input.read_i32::<E>().map_err(Error::truncated("field dimensions"))?;
        let offset = input.read_u64::<E>().map_err(Error::truncated("field offset"))?;
        let info = read_string(input)?;
        field_metas.push(FieldMeta { name, num_dimensions, offset, info });
    }
    let user_meta = read_string(input)?;

    Ok(Model {
        refinement_of_level,
        scalars,
        field_metas,
        grids,
        num_cells_across_all_grids,
        user_meta,
    })
}

fn write_grid<W: Write>(grid: &Grid, out: &mut W) -> Result<()> {
    for &x in grid.origin.iter().chain(grid.dims.iter()) {
        out.write_i32::<E>(x)?;
    }
    out.write_i32::<E>(grid.level)?;
    out.write_u32::<E>(grid.user)?;
    out.write_u64::<E>(grid.offset)?;
    Ok(())
}

fn read_grid<R: Read>(input: &mut R) -> Result<Grid> {
    let mut bytes = [0u8; GRID_RECORD_SIZE];
    input.read_exact(&mut bytes).map_err(Error::truncated("grid record"))?;

    let mut r = &bytes[..];
    let mut v = [0i32; 6];
    r.read_i32_into::<E>(&mut v)?;

    Ok(Grid {
        origin: Int3::xyz(v[0], v[1], v[2]),
        dims: Int3::xyz(v[3], v[4], v[5]),
        level: r.read_i32::<E>()?,
        user: r.read_u32::<E>()?,
        offset: r.read_u64::<E>()?,
    })
}

fn write_string<W: Write>(s: &str, out: &mut W) -> Result<()> {
    let len = i32::try_from(s.len())
        .map_err(|_| Error::MalformedInput("string too long to encode".into()))?;
    out.write_i32::<E>(len)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(input: &mut R) -> Result<String> {
    let len = input.read_i32::<E>().map_err(Error::truncated("string length"))?;
    let len = u64::try_from(len)
        .map_err(|_| Error::MalformedInput(format!("negative string length {}", len)))?;

    let mut bytes = Vec::new();
    input.take(len).read_to_end(&mut bytes)?;

    if bytes.len() as u64 != len {
        return Err(Error::MalformedInput("truncated string".into()));
    }
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

fn read_count<R: Read>(input: &mut R, what: &'static str) -> Result<usize> {
    let count = input.read_u64::<E>().map_err(Error::truncated(what))?;
    usize::try_from(count).map_err(|_| Error::MalformedInput(format!("{} count {} exceeds address space", what, count)))
}

fn read_array<R, T, F>(input: &mut R, what: &'static str, read_into: F) -> Result<Vec<T>>
where
    R: Read,
    T: Copy + Default,
    F: Fn(&mut R, &mut [T]) -> std::io::Result<()>,
{
    let count = read_count(input, what)?;
    let mut data = Vec::with_capacity(count.min(READ_CHUNK));

    while data.len() < count {
        let start = data.len();
        let n = (count - start).min(READ_CHUNK);
        data.resize(start + n, T::default());
        read_into(input, &mut data[start..]).map_err(Error::truncated(what))?;
    }
    Ok(data)
}




// ============================================================================
impl Model {

    /**
     * Write this model to a file, replacing any existing one. The file is
     * written front to back in one pass; an interrupted save leaves a
     * truncated file, which `Model::load` rejects.
     */
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        write_model(self, &mut out)?;
        out.flush()?;
        info!("saved {} grids and {} scalars to {}", self.grids.len(), self.scalars.len(), path.display());
        Ok(())
    }

    /**
     * Read a model previously written by `Model::save`.
     */
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Model> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open_failure(path, e))?;
        let model = read_model(&mut BufReader::new(file))?;
        debug!("loaded {} grids from {}", model.grids.len(), path.display());
        Ok(model)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::io::Cursor;
    use super::{read_model, write_model, MAGIC, GRID_RECORD_SIZE};
    use crate::error::Error;
    use crate::model::test::two_level_model;
    use crate::model::Model;

    fn encode(model: &Model) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_model(model, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn round_trip_preserves_every_member() {
        let model = two_level_model();
        let decoded = read_model(&mut Cursor::new(encode(&model))).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn round_trip_of_empty_model() {
        let model = Model::default();
        let decoded = read_model(&mut Cursor::new(encode(&model))).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn encoded_size_matches_layout() {
        let model = two_level_model();
        let strings: usize = model.field_metas.iter().map(|m| 8 + m.name.len() + m.info.len()).sum();
        let expected = 8
            + 8 + 4 * model.refinement_of_level.len()
            + 8 + 4 * model.scalars.len()
            + 8 + GRID_RECORD_SIZE * model.grids.len()
            + 8
            + 4 + strings + 12 * model.field_metas.len()
            + 4 + model.user_meta.len();
        assert_eq!(encode(&model).len(), expected);
    }

    #[test]
    fn layout_starts_with_magic_and_refinement_levels() {
        let bytes = encode(&two_level_model());
        assert_eq!(&bytes[0..8], &MAGIC.to_le_bytes());
        assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &1i32.to_le_bytes());
        assert_eq!(&bytes[20..24], &2i32.to_le_bytes());
    }

    #[test]
    fn wrong_magic_is_rejected_before_reading_further() {
        let mut bytes = encode(&two_level_model());
        bytes[0] ^= 0xff;
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(read_model(&mut cursor), Err(Error::MalformedInput(_))));
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn truncated_stream_is_malformed() {
        let bytes = encode(&two_level_model());

        for len in [0, 4, 12, 40, bytes.len() - 1] {
            let result = read_model(&mut Cursor::new(&bytes[..len]));
            assert!(matches!(result, Err(Error::MalformedInput(_))), "length {}", len);
        }
    }

    #[test]
    fn names_which_are_not_utf8_still_load() {
        let mut model = two_level_model();
        model.field_metas[0].name = "densX.scalars".into();
        let mut bytes = encode(&model);

        let at = bytes.windows(5).position(|w| w == b"densX").unwrap() + 4;
        assert_eq!(bytes[at], b'X');
        bytes[at] = 0xe9;

        let decoded = read_model(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.field_metas[0].name, "dens\u{fffd}.scalars");
        assert_eq!(decoded.field_metas[1], model.field_metas[1]);
        assert_eq!(decoded.scalars, model.scalars);
    }

    #[test]
    fn huge_count_fails_without_allocating() {
        let mut bytes = MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(read_model(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn save_and_load_through_a_file() {
        let path = std::env::temp_dir().join(format!("tamr-codec-{}.tamr", std::process::id()));
        let model = two_level_model();
        model.save(&path).unwrap();
        let loaded = Model::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn loading_a_missing_file_fails_to_open() {
        let path = std::env::temp_dir().join("tamr-codec-does-not-exist.tamr");
        assert!(matches!(Model::load(path), Err(Error::SourceOpenFailure { .. })));
    }
}
