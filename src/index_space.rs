use crate::num_vec::{Float3, Int3, Vector};




/**
 * Represents a box-shaped region in a discrete 3D index space, given by its
 * lower corner and its extent. The index type is signed 32-bit integer.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSpace {
    origin: Int3,
    dims: Int3,
}




// ============================================================================
impl IndexSpace {


    /**
     * Construct an index space, panicking if the dimensions are negative or
     * the upper corner is not representable.
     */
    pub fn new(origin: Int3, dims: Int3) -> Self {
        match Self::try_new(origin, dims) {
            Some(space) => space,
            None => panic!("invalid index space {:?} + {:?}", origin.as_array(), dims.as_array()),
        }
    }


    /**
     * Construct an index space, or return `None` if any dimension is
     * negative or `origin + dims` overflows.
     */
    pub fn try_new(origin: Int3, dims: Int3) -> Option<Self> {
        if !dims.all(|d| d >= 0) {
            return None
        }
        origin.checked_add(dims)?;
        Some(Self { origin, dims })
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> Int3 {
        self.origin
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> Int3 {
        self.origin + self.dims
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: Int3) -> bool {
        let (s, e) = (self.start(), self.end());
        (0..3).all(|a| s[a] <= index[a] && index[a] < e[a])
    }


    /**
     * Return the linear offset for the given index, in a z-major memory
     * buffer aligned with the start of this index space (the x index
     * increases fastest). Returns `None` if the index is outside.
     */
    pub fn z_major_offset(&self, index: Int3) -> Option<usize> {
        if !self.contains(index) {
            return None
        }
        let local = index - self.origin;
        let (nx, ny) = (self.dims.x() as usize, self.dims.y() as usize);
        Some(local.x() as usize + nx * (local.y() as usize + ny * local.z() as usize))
    }


    /**
     * Return an iterator which traverses the index space in z-major order
     * (x fastest, then y, then z), the order of a block's scalars in memory.
     */
    pub fn iter(&self) -> impl Iterator<Item = Int3> + '_ {
        let (s, e) = (self.start(), self.end());
        (s.z()..e.z()).flat_map(move |k| {
            (s.y()..e.y()).flat_map(move |j| (s.x()..e.x()).map(move |i| Int3::xyz(i, j, k)))
        })
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range3d(origin: [i32; 3], dims: [i32; 3]) -> IndexSpace {
    IndexSpace::new(origin.into(), dims.into())
}




/**
 * An axis-aligned box spanned by two corners. The upper corner is the upper
 * extent of the region; whether it is inclusive depends on the caller.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb<T> {
    pub lower: Vector<T, 3>,
    pub upper: Vector<T, 3>,
}

/// Physical region in simulation units
pub type Aabb3d = Aabb<f64>;

/// Integer region in cell units
pub type Aabb3i = Aabb<i32>;




// ============================================================================
impl<T: Copy + PartialOrd> Aabb<T> {

    pub fn new(lower: Vector<T, 3>, upper: Vector<T, 3>) -> Self {
        Self { lower, upper }
    }

    /**
     * A degenerate box containing only the given point.
     */
    pub fn from_point(point: Vector<T, 3>) -> Self {
        Self { lower: point, upper: point }
    }

    pub fn extend_point(&mut self, point: Vector<T, 3>) {
        self.lower = self.lower.component_min(point);
        self.upper = self.upper.component_max(point);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            lower: self.lower.component_min(other.lower),
            upper: self.upper.component_max(other.upper),
        }
    }
}

impl Aabb3d {
    pub fn size(&self) -> Float3 {
        self.upper - self.lower
    }
}
