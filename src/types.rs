//! Core data types: element types and dynamically typed arrays

use crate::error::{NataError, Result};
use ndarray::{Array, ArrayD, Axis as ArrayAxis, Dimension, IxDyn};
use num_traits::{NumCast, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types a dataset can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// Signed 8-bit integer
    I8 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 7,
    /// Signed 64-bit integer
    I64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
}

impl DataType {
    /// Size in bytes of this data type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Scalar types that can be stored in an [`ArrayData`]
pub trait Element: Copy + PartialEq + fmt::Debug + NumCast + Send + Sync + 'static {
    /// Runtime tag of this element type
    const DATA_TYPE: DataType;

    /// Wrap a typed array
    fn into_data(array: ArrayD<Self>) -> ArrayData;

    /// Borrow the typed array if `data` holds this element type
    fn from_data(data: &ArrayData) -> Option<&ArrayD<Self>>;

    /// Mutably borrow the typed array if `data` holds this element type
    fn from_data_mut(data: &mut ArrayData) -> Option<&mut ArrayD<Self>>;
}

/// An n-dimensional array of one of the supported element types
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn into_data(array: ArrayD<Self>) -> ArrayData {
                    ArrayData::$variant(array)
                }

                fn from_data(data: &ArrayData) -> Option<&ArrayD<Self>> {
                    match data {
                        ArrayData::$variant(array) => Some(array),
                        _ => None,
                    }
                }

                fn from_data_mut(data: &mut ArrayData) -> Option<&mut ArrayD<Self>> {
                    match data {
                        ArrayData::$variant(array) => Some(array),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

/// Evaluate `$body` with `$array` bound to the typed array of any variant.
macro_rules! on_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            ArrayData::U8($array) => $body,
            ArrayData::U16($array) => $body,
            ArrayData::U32($array) => $body,
            ArrayData::U64($array) => $body,
            ArrayData::I8($array) => $body,
            ArrayData::I16($array) => $body,
            ArrayData::I32($array) => $body,
            ArrayData::I64($array) => $body,
            ArrayData::F32($array) => $body,
            ArrayData::F64($array) => $body,
        }
    };
}

/// Like `on_array!`, rewrapping the resulting array in the same variant.
macro_rules! map_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            ArrayData::U8($array) => ArrayData::U8($body),
            ArrayData::U16($array) => ArrayData::U16($body),
            ArrayData::U32($array) => ArrayData::U32($body),
            ArrayData::U64($array) => ArrayData::U64($body),
            ArrayData::I8($array) => ArrayData::I8($body),
            ArrayData::I16($array) => ArrayData::I16($body),
            ArrayData::I32($array) => ArrayData::I32($body),
            ArrayData::I64($array) => ArrayData::I64($body),
            ArrayData::F32($array) => ArrayData::F32($body),
            ArrayData::F64($array) => ArrayData::F64($body),
        }
    };
}

/// Evaluate `$body` with `$ty` aliased to the element type of a [`DataType`].
macro_rules! with_element {
    ($dtype:expr, $ty:ident => $body:expr) => {
        match $dtype {
            DataType::U8 => {
                type $ty = u8;
                $body
            }
            DataType::U16 => {
                type $ty = u16;
                $body
            }
            DataType::U32 => {
                type $ty = u32;
                $body
            }
            DataType::U64 => {
                type $ty = u64;
                $body
            }
            DataType::I8 => {
                type $ty = i8;
                $body
            }
            DataType::I16 => {
                type $ty = i16;
                $body
            }
            DataType::I32 => {
                type $ty = i32;
                $body
            }
            DataType::I64 => {
                type $ty = i64;
                $body
            }
            DataType::F32 => {
                type $ty = f32;
                $body
            }
            DataType::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}

fn dtype_of<T: Element>(_: &ArrayD<T>) -> DataType {
    T::DATA_TYPE
}

impl ArrayData {
    /// Build an array from a shape and row-major values
    pub fn from_shape_vec<T: Element>(shape: &[usize], values: Vec<T>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(T::into_data(array))
    }

    /// Element type of the array
    pub fn dtype(&self) -> DataType {
        on_array!(self, a => dtype_of(a))
    }

    /// Shape of the array
    pub fn shape(&self) -> &[usize] {
        on_array!(self, a => a.shape())
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        on_array!(self, a => a.len())
    }

    /// Check if the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the payload in bytes
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().size_in_bytes()
    }

    /// Borrow as a typed array
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::from_data(self)
    }

    /// Mutably borrow as a typed array
    pub fn as_array_mut<T: Element>(&mut self) -> Option<&mut ArrayD<T>> {
        T::from_data_mut(self)
    }

    /// Convert every element to `f64`
    ///
    /// Values that cannot be represented become NaN.
    pub fn to_f64(&self) -> ArrayD<f64> {
        on_array!(self, a => a.mapv(|v| v.to_f64().unwrap_or(f64::NAN)))
    }

    /// Extract entry `index` of the leading axis
    pub fn index_leading(&self, index: usize) -> Result<Self> {
        let len = self.shape().first().copied().unwrap_or(0);
        if self.ndim() == 0 || index >= len {
            return Err(NataError::IndexOutOfRange { index, len });
        }
        Ok(map_array!(self, a => a.index_axis(ArrayAxis(0), index).to_owned()))
    }

    /// Split along the leading axis into one array per entry
    pub fn split_leading(&self) -> Result<Vec<Self>> {
        if self.ndim() == 0 {
            return Err(NataError::ShapeMismatch(
                "cannot split a zero-dimensional array".to_string(),
            ));
        }
        (0..self.shape()[0])
            .map(|index| self.index_leading(index))
            .collect()
    }

    /// Add a new leading axis of length one
    pub fn insert_leading(self) -> Self {
        map_array!(self, a => a.insert_axis(ArrayAxis(0)))
    }

    /// Stack equally shaped arrays of one element type along a new leading axis
    pub fn stack(arrays: &[&ArrayData]) -> Result<Self> {
        let first = arrays.first().ok_or_else(|| {
            NataError::ShapeMismatch("cannot stack an empty sequence of arrays".to_string())
        })?;
        with_element!(first.dtype(), T => stack_typed::<T>(arrays))
    }
}

fn stack_typed<T: Element>(arrays: &[&ArrayData]) -> Result<ArrayData> {
    let views = arrays
        .iter()
        .map(|data| {
            T::from_data(data).map(|a| a.view()).ok_or_else(|| {
                NataError::IncompatibleGrid(format!(
                    "cannot stack {} with {}",
                    T::DATA_TYPE,
                    data.dtype()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let stacked = ndarray::stack(ArrayAxis(0), &views)?;
    Ok(T::into_data(stacked))
}

impl<T: Element, D: Dimension> From<Array<T, D>> for ArrayData {
    fn from(array: Array<T, D>) -> Self {
        T::into_data(array.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array1};

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::U8.size_in_bytes(), 1);
        assert_eq!(DataType::I16.size_in_bytes(), 2);
        assert_eq!(DataType::F32.size_in_bytes(), 4);
        assert_eq!(DataType::F64.size_in_bytes(), 8);
        assert!(DataType::F32.is_float());
        assert!(DataType::I64.is_integer());
    }

    #[test]
    fn test_array_data_from_ndarray() {
        let data = ArrayData::from(arr2(&[[1.0f32, 2.0], [3.0, 4.0]]));
        assert_eq!(data.dtype(), DataType::F32);
        assert_eq!(data.shape(), &[2, 2]);
        assert_eq!(data.ndim(), 2);
        assert_eq!(data.len(), 4);
        assert_eq!(data.nbytes(), 16);
        assert!(data.as_array::<f32>().is_some());
        assert!(data.as_array::<f64>().is_none());
    }

    #[test]
    fn test_from_shape_vec_rejects_bad_shape() {
        let result = ArrayData::from_shape_vec(&[3, 2], vec![1i32, 2, 3]);
        assert!(matches!(result, Err(NataError::ShapeMismatch(_))));
    }

    #[test]
    fn test_stack_and_split() {
        let a = ArrayData::from(arr1(&[1i64, 2, 3]));
        let b = ArrayData::from(arr1(&[4i64, 5, 6]));
        let stacked = ArrayData::stack(&[&a, &b]).unwrap();
        assert_eq!(stacked.shape(), &[2, 3]);

        let parts = stacked.split_leading().unwrap();
        assert_eq!(parts, vec![a, b]);
    }

    #[test]
    fn test_stack_rejects_mixed_dtypes() {
        let a = ArrayData::from(arr1(&[1.0f64]));
        let b = ArrayData::from(arr1(&[1.0f32]));
        assert!(matches!(
            ArrayData::stack(&[&a, &b]),
            Err(NataError::IncompatibleGrid(_))
        ));
    }

    #[test]
    fn test_index_leading_bounds() {
        let data = ArrayData::from(Array1::<u16>::zeros(4));
        assert_eq!(data.index_leading(3).unwrap().ndim(), 0);
        assert!(matches!(
            data.index_leading(4),
            Err(NataError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_insert_leading_and_to_f64() {
        let data = ArrayData::from(arr1(&[1u8, 2])).insert_leading();
        assert_eq!(data.shape(), &[1, 2]);
        let values = data.to_f64();
        assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0]);
    }
}
