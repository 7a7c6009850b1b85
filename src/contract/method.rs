//! Typed method descriptors and argument tuples.
//!
//! A [`Method`] names one operation together with its parameter tuple and
//! return type. The same constant drives server registration and client
//! calls, so both sides agree on the shape at compile time while the wire
//! only carries the name.
//!
//! # Example
//!
//! ```
//! use wirecall::contract::{Arguments, Method};
//!
//! const ADD: Method<(i32, i32), i32> = Method::new("Add");
//!
//! assert_eq!(ADD.name(), "Add");
//! assert_eq!(ADD.arity(), 2);
//! assert_eq!(<(i32, i32) as Arguments>::ARITY, 2);
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::MsgPackCodec;
use crate::error::{Result, RpcError};
use crate::protocol::Blob;

/// Typed reference to one contract operation.
pub struct Method<P, R> {
    name: &'static str,
    _marker: PhantomData<fn(P) -> R>,
}

impl<P, R> Method<P, R> {
    /// Describe the operation called `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Wire name of the operation.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P: Arguments, R> Method<P, R> {
    /// Number of declared parameters.
    #[inline]
    pub fn arity(&self) -> usize {
        P::ARITY
    }
}

impl<P, R> Clone for Method<P, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, R> Copy for Method<P, R> {}

impl<P, R> fmt::Debug for Method<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Method").field(&self.name).finish()
    }
}

/// Parameter tuple of an operation.
///
/// Implemented for tuples of up to six elements. Each element is encoded to
/// its own blob; an empty or absent blob decodes to the element's `Default`.
pub trait Arguments: Send + Sized + 'static {
    /// Number of parameters.
    const ARITY: usize;

    /// Encode each parameter into its own blob.
    fn encode(&self) -> Result<Vec<Option<Vec<u8>>>>;

    /// Decode parameters from blobs. Callers check the arity first.
    fn decode(operation: &str, blobs: &[Blob]) -> Result<Self>;
}

impl Arguments for () {
    const ARITY: usize = 0;

    fn encode(&self) -> Result<Vec<Option<Vec<u8>>>> {
        Ok(Vec::new())
    }

    fn decode(_operation: &str, _blobs: &[Blob]) -> Result<Self> {
        Ok(())
    }
}

fn decode_arg<T>(operation: &str, blobs: &[Blob], index: usize) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = blobs
        .get(index)
        .and_then(|blob| blob.as_deref())
        .filter(|bytes| !bytes.is_empty());

    match bytes {
        None => Ok(T::default()),
        Some(bytes) => {
            rmp_serde::from_slice(bytes).map_err(|source| RpcError::InvalidArgument {
                operation: operation.to_string(),
                index,
                source,
            })
        }
    }
}

macro_rules! impl_arguments {
    ($arity:expr; $($idx:tt => $name:ident),+) => {
        impl<$($name),+> Arguments for ($($name,)+)
        where
            $($name: Serialize + DeserializeOwned + Default + Send + 'static),+
        {
            const ARITY: usize = $arity;

            fn encode(&self) -> Result<Vec<Option<Vec<u8>>>> {
                Ok(vec![$(Some(MsgPackCodec::encode(&self.$idx)?)),+])
            }

            fn decode(operation: &str, blobs: &[Blob]) -> Result<Self> {
                Ok(($(decode_arg::<$name>(operation, blobs, $idx)?,)+))
            }
        }
    };
}

impl_arguments!(1; 0 => A);
impl_arguments!(2; 0 => A, 1 => B);
impl_arguments!(3; 0 => A, 1 => B, 2 => C);
impl_arguments!(4; 0 => A, 1 => B, 2 => C, 3 => D);
impl_arguments!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_arguments!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
