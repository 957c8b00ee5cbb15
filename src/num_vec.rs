use core::ops::{Add, Sub, Mul, Index};
use serde::ser::{Serialize, SerializeTuple, Serializer};




/**
 * A statically-sized numeric vector over a generic scalar data type T, which
 * supports arithmetic operations also supported by T. Vectors compare
 * lexicographically, first component first.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Vector<T, const DIM: usize> {
    data: [T; DIM]
}




/// Integer cell coordinates or cell counts
pub type Int3 = Vector<i32, 3>;

/// Physical positions or extents
pub type Float3 = Vector<f64, 3>;




// ============================================================================
impl<T: Copy, const DIM: usize> Vector<T, DIM> {

    pub fn splat(value: T) -> Self {
        Self { data: [value; DIM] }
    }

    pub fn as_array(&self) -> [T; DIM] {
        self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /**
     * Apply a function to each component.
     */
    pub fn map<U, F: Fn(T) -> U>(&self, f: F) -> Vector<U, DIM> {
        Vector { data: core::array::from_fn(|i| f(self.data[i])) }
    }

    /**
     * Combine two vectors component-wise.
     */
    pub fn zip_map<U: Copy, V, F: Fn(T, U) -> V>(&self, other: Vector<U, DIM>, f: F) -> Vector<V, DIM> {
        Vector { data: core::array::from_fn(|i| f(self.data[i], other.data[i])) }
    }

    pub fn all<F: Fn(T) -> bool>(&self, f: F) -> bool {
        self.data.iter().all(|&x| f(x))
    }
}

impl<T: Copy + PartialOrd, const DIM: usize> Vector<T, DIM> {

    pub fn component_min(&self, other: Self) -> Self {
        self.zip_map(other, |a, b| if b < a { b } else { a })
    }

    pub fn component_max(&self, other: Self) -> Self {
        self.zip_map(other, |a, b| if b > a { b } else { a })
    }
}

impl<T: Copy> Vector<T, 3> {

    pub fn xyz(x: T, y: T, z: T) -> Self {
        Self { data: [x, y, z] }
    }

    pub fn x(&self) -> T { self.data[0] }
    pub fn y(&self) -> T { self.data[1] }
    pub fn z(&self) -> T { self.data[2] }
}




// ============================================================================
impl<const DIM: usize> Vector<i32, DIM> {

    /**
     * Divide each component by `d`, rounding toward negative infinity. For
     * cell coordinates this yields the index of the enclosing coarse cell,
     * also for negative coordinates.
     */
    pub fn floor_div(&self, d: i32) -> Self {
        self.map(|x| x.div_euclid(d))
    }

    /**
     * Add two vectors, returning `None` if any component overflows.
     */
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        let mut data = self.data;

        for (x, y) in data.iter_mut().zip(other.data) {
            *x = x.checked_add(y)?;
        }
        Some(Self { data })
    }

    pub fn as_f64(&self) -> Vector<f64, DIM> {
        self.map(f64::from)
    }

    /**
     * Return the product of the components, or `None` if any is negative.
     */
    pub fn volume(&self) -> Option<u64> {
        self.data
            .iter()
            .try_fold(1u64, |v, &x| u64::try_from(x).ok().and_then(|x| v.checked_mul(x)))
    }
}

impl<const DIM: usize> Vector<f64, DIM> {

    /**
     * Round each component to the nearest integer. Returns `None` if any
     * component is not finite or lies outside the `i32` range.
     */
    pub fn round_to_int(&self) -> Option<Vector<i32, DIM>> {
        let mut data = [0; DIM];

        for (i, x) in data.iter_mut().enumerate() {
            let r = self.data[i].round();
            if !r.is_finite() || r < i32::MIN as f64 || r > i32::MAX as f64 {
                return None
            }
            *x = r as i32;
        }
        Some(Vector { data })
    }

    pub fn component_div(&self, other: Self) -> Self {
        self.zip_map(other, |a, b| a / b)
    }
}




// ============================================================================
impl<T, U, V, const DIM: usize> Add<Vector<U, DIM>> for Vector<T, DIM>
where
    T: Copy + Add<U, Output = V>,
    U: Copy,
{
    type Output = Vector<V, DIM>;

    fn add(self, other: Vector<U, DIM>) -> Self::Output {
        self.zip_map(other, |a, b| a + b)
    }
}

impl<T, U, V, const DIM: usize> Sub<Vector<U, DIM>> for Vector<T, DIM>
where
    T: Copy + Sub<U, Output = V>,
    U: Copy,
{
    type Output = Vector<V, DIM>;

    fn sub(self, other: Vector<U, DIM>) -> Self::Output {
        self.zip_map(other, |a, b| a - b)
    }
}

impl<T, U, V, const DIM: usize> Mul<U> for Vector<T, DIM>
where
    T: Copy + Mul<U, Output = V>,
    U: Copy,
{
    type Output = Vector<V, DIM>;

    fn mul(self, other: U) -> Self::Output {
        self.map(|a| a * other)
    }
}





// ============================================================================
impl<T, const DIM: usize> Index<usize> for Vector<T, DIM> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: Copy, const DIM: usize> From<[T; DIM]> for Vector<T, DIM> {
    fn from(data: [T; DIM]) -> Self {
        Self { data }
    }
}

impl<T: Serialize, const DIM: usize> Serialize for Vector<T, DIM> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(DIM)?;
        for x in &self.data {
            tuple.serialize_element(x)?;
        }
        tuple.end()
    }
}
