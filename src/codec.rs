//! The value codec.
//!
//! [`ScribeValue`] maps a Rust value's shape to a canonical type name and a byte
//! encoding:
//!
//! | Shape                      | Type name        | Encoding                                  |
//! |----------------------------|------------------|-------------------------------------------|
//! | float / signed / unsigned  | `f<n>` `i<n>` `u<n>` | native bytes, `n` = byte width        |
//! | `[T; N]`                   | `T#N`            | `N` elements, no prefix                   |
//! | `Vec<T>`, `[T]`            | `T#`             | `u32` count, then the elements            |
//! | `(A, B, ...)`              | `(A,B,...)`      | fields back to back                       |
//! | `Option<T>`                | `[null,T]`       | `u8` discriminant, then the payload       |
//! | `()`                       | `null`           | nothing                                   |
//! | `str`, `String`            | `u1#`            | `u32` byte count, then UTF-8 bytes        |
//!
//! Values are written in the producer's native byte order.
//!
//! User-defined aggregates implement the trait through `#[derive(ScribeObject)]`;
//! their field lists are added to a [`TypeDict`] by [`ScribeValue::register_types`].

use std::collections::VecDeque;

use crate::constants::NULL_TYPE;
use crate::error::{Result, ScribeError};
use crate::schema::TypeDict;

/// A value the writer knows how to name and encode.
pub trait ScribeValue {
    /// Canonical type name, e.g. `f8#` or `(i4,f8)`.
    fn type_name() -> String;

    /// Appends the encoding of `self` to `out`.
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Adds the definitions of every user-defined type reachable from `Self`.
    ///
    /// Must be idempotent: registering the same type twice is a no-op.
    fn register_types(_types: &mut TypeDict) -> Result<()> {
        Ok(())
    }
}

/// A fixed-width fundamental value that can be read back from raw bytes.
pub trait Scalar: ScribeValue + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decodes a value from exactly [`Self::WIDTH`] native-order bytes.
    fn read_ne(bytes: &[u8]) -> Option<Self>;
}

/// Writes the `u32` element count that prefixes a dynamic array.
pub fn write_size(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let n = u32::try_from(len).map_err(|_| {
        ScribeError::Format(format!("sequence of {len} elements exceeds the u32 count prefix"))
    })?;
    out.extend_from_slice(&n.to_ne_bytes());
    Ok(())
}

/// Writes the one-byte discriminant that precedes a union payload.
pub fn write_union_index(out: &mut Vec<u8>, index: usize) -> Result<()> {
    let i = u8::try_from(index)
        .map_err(|_| ScribeError::Format(format!("union index {index} does not fit in one byte")))?;
    out.push(i);
    Ok(())
}

// --- FUNDAMENTALS ---

macro_rules! impl_scalar {
    ($($t:ty => $prefix:literal),* $(,)?) => {
        $(
            impl ScribeValue for $t {
                fn type_name() -> String {
                    format!("{}{}", $prefix, std::mem::size_of::<$t>())
                }
                fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
                    out.extend_from_slice(&self.to_ne_bytes());
                    Ok(())
                }
            }

            impl Scalar for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();
                fn read_ne(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$t>::from_ne_bytes)
                }
            }
        )*
    }
}

impl_scalar!(
    f32 => "f", f64 => "f",
    i8 => "i", i16 => "i", i32 => "i", i64 => "i", i128 => "i", isize => "i",
    u8 => "u", u16 => "u", u32 => "u", u64 => "u", u128 => "u", usize => "u",
);

impl ScribeValue for bool {
    fn type_name() -> String {
        "u1".into()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(u8::from(*self));
        Ok(())
    }
}

impl Scalar for bool {
    const WIDTH: usize = 1;
    fn read_ne(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(*b != 0),
            _ => None,
        }
    }
}

impl ScribeValue for () {
    fn type_name() -> String {
        NULL_TYPE.into()
    }
    fn write_value(&self, _out: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

// --- STRINGS ---

impl ScribeValue for str {
    fn type_name() -> String {
        format!("{}#", u8::type_name())
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_size(out, self.len())?;
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl ScribeValue for String {
    fn type_name() -> String {
        str::type_name()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_str().write_value(out)
    }
}

// --- SEQUENCES ---

impl<T: ScribeValue, const N: usize> ScribeValue for [T; N] {
    fn type_name() -> String {
        format!("{}#{}", T::type_name(), N)
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.iter().try_for_each(|x| x.write_value(out))
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

impl<T: ScribeValue> ScribeValue for [T] {
    fn type_name() -> String {
        format!("{}#", T::type_name())
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_size(out, self.len())?;
        self.iter().try_for_each(|x| x.write_value(out))
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

impl<T: ScribeValue> ScribeValue for Vec<T> {
    fn type_name() -> String {
        <[T]>::type_name()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_slice().write_value(out)
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

impl<T: ScribeValue> ScribeValue for VecDeque<T> {
    fn type_name() -> String {
        <[T]>::type_name()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_size(out, self.len())?;
        self.iter().try_for_each(|x| x.write_value(out))
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

// --- INDIRECTION ---

impl<T: ScribeValue + ?Sized> ScribeValue for &T {
    fn type_name() -> String {
        T::type_name()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        (**self).write_value(out)
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

impl<T: ScribeValue + ?Sized> ScribeValue for Box<T> {
    fn type_name() -> String {
        T::type_name()
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        (**self).write_value(out)
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

// --- SUM TYPES ---

impl<T: ScribeValue> ScribeValue for Option<T> {
    fn type_name() -> String {
        crate::rt::union_name(None, || vec![NULL_TYPE.to_owned(), T::type_name()])
    }
    fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            None => write_union_index(out, 0),
            Some(x) => {
                write_union_index(out, 1)?;
                x.write_value(out)
            }
        }
    }
    fn register_types(types: &mut TypeDict) -> Result<()> {
        T::register_types(types)
    }
}

// --- TUPLES ---

macro_rules! impl_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ScribeValue),+> ScribeValue for ($($name,)+) {
            fn type_name() -> String {
                let names: &[String] = &[$($name::type_name()),+];
                format!("({})", names.join(","))
            }
            fn write_value(&self, out: &mut Vec<u8>) -> Result<()> {
                $( self.$idx.write_value(out)?; )+
                Ok(())
            }
            fn register_types(types: &mut TypeDict) -> Result<()> {
                $( $name::register_types(types)?; )+
                Ok(())
            }
        }
    }
}

impl_tuple!(A: 0);
impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);
