use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use crate::num_vec::Int3;




/**
 * Record of one failed bricking attempt: the candidate block size, and the
 * first group (in visitation order) whose cell count was not a full cube.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageFailure {
    pub block_size: i32,
    pub group: Int3,
    pub level: i32,
    pub count: usize,
    pub expected: usize,
}




#[derive(Debug)]

/**
 * Error to represent a failed conversion, or a failure to load or save a
 * model. Every error is fatal to the conversion that produced it.
 */
pub enum Error {
    MalformedInput(String),
    IncompleteGrid(Vec<CoverageFailure>),
    SizeMismatch {
        field: String,
        expected: u64,
        found: u64,
    },
    SourceOpenFailure {
        path: PathBuf,
        reason: String,
    },
    InvalidModel(String),
    Io(io::Error),
}




// ============================================================================
impl Error {

    /**
     * Adapter for `map_err` on reads of fixed-size records: running out of
     * bytes means the stream is truncated, which is a malformed input rather
     * than an I/O failure.
     */
    pub(crate) fn truncated(what: &'static str) -> impl Fn(io::Error) -> Error {
        move |e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::MalformedInput(format!("truncated {}", what))
            } else {
                Error::Io(e)
            }
        }
    }

    pub(crate) fn open_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Error {
        Error::SourceOpenFailure { path: path.into(), reason: reason.to_string() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            MalformedInput(what) => write!(fmt, "malformed input: {}", what),
            IncompleteGrid(attempts) => {
                write!(fmt, "incomplete grid: no block size tiles the cells exactly")?;
                for a in attempts {
                    write!(fmt,
                        "; size {} fails at group ({} {} {}) level {} with {} of {} cells",
                        a.block_size, a.group.x(), a.group.y(), a.group.z(), a.level, a.count, a.expected)?;
                }
                Ok(())
            }
            SizeMismatch { field, expected, found } => write!(fmt,
                "size mismatch in field '{}': expected {} values, found {}", field, expected, found),
            SourceOpenFailure { path, reason } => write!(fmt,
                "failed to open '{}': {}", path.display(), reason),
            InvalidModel(what) => write!(fmt, "invalid model: {}", what),
            Io(e) => write!(fmt, "i/o error: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}




/// Result type alias for conversions and model persistence
pub type Result<T> = std::result::Result<T, Error>;




// ============================================================================
#[cfg(test)]
mod test {

    use std::error::Error as _;
    use std::io;
    use super::{CoverageFailure, Error};
    use crate::num_vec::Int3;

    #[test]
    fn incomplete_grid_lists_every_attempt() {
        let attempts = vec![
            CoverageFailure { block_size: 4, group: Int3::xyz(0, -1, 2), level: 1, count: 30, expected: 64 },
            CoverageFailure { block_size: 2, group: Int3::xyz(1, 0, 0), level: 0, count: 3, expected: 8 },
        ];
        let text = Error::IncompleteGrid(attempts).to_string();
        assert!(text.contains("size 4 fails at group (0 -1 2) level 1 with 30 of 64 cells"));
        assert!(text.contains("size 2 fails at group (1 0 0) level 0 with 3 of 8 cells"));
    }

    #[test]
    fn messages_name_the_offending_input() {
        let e = Error::SizeMismatch { field: "dens".into(), expected: 8, found: 7 };
        assert_eq!(e.to_string(), "size mismatch in field 'dens': expected 8 values, found 7");

        let e = Error::open_failure("a.cells", "no such file");
        assert_eq!(e.to_string(), "failed to open 'a.cells': no such file");
    }

    #[test]
    fn only_io_errors_have_a_source() {
        let e = Error::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert!(e.source().is_some());
        assert!(Error::MalformedInput("x".into()).source().is_none());
    }

    #[test]
    fn end_of_file_means_truncated() {
        let eof = Error::truncated("grid record")(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(eof, Error::MalformedInput(ref s) if s == "truncated grid record"));
        let other = Error::truncated("grid record")(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(other, Error::Io(_)));
    }
}
