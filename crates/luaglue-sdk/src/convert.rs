//! Traits mapping native Rust types onto the closed value kinds.
//!
//! A parameter type must implement [`FromArg`] and a return type
//! [`IntoRet`]; binding a method with any other type fails to compile.
//!
//! # Example
//!
//! ```ignore
//! use luaglue_sdk::{FromArg, Arg, ParamKind};
//!
//! struct Celsius(f64);
//!
//! impl FromArg for Celsius {
//!     const KIND: ParamKind = ParamKind::Number;
//!     fn from_arg(arg: Arg) -> Option<Self> {
//!         f64::from_arg(arg).map(Celsius)
//!     }
//! }
//! ```

use std::fmt::Display;

use serde_json::Value as DynamicValue;

use crate::error::GlueError;
use crate::reference::ScriptRef;
use crate::value::{Arg, ParamKind, Ret, Scalar};
use crate::variant::Variant;

/// Native type that can be received as a method argument.
pub trait FromArg: Sized {
    /// Descriptor driving the fetch of this argument
    const KIND: ParamKind;

    /// Extract from an argument fetched as [`Self::KIND`].
    /// Returns `None` if `arg` was fetched as a different kind.
    fn from_arg(arg: Arg) -> Option<Self>;
}

/// Native type that can be returned from a bound method.
pub trait IntoRet {
    /// Encode into results
    fn into_ret(self) -> Result<Ret, GlueError>;
}

// ============================================================================
// Parameter implementations
// ============================================================================

macro_rules! from_arg {
    ($ty:ty, $kind:ident) => {
        impl FromArg for $ty {
            const KIND: ParamKind = ParamKind::$kind;

            fn from_arg(arg: Arg) -> Option<Self> {
                match arg {
                    Arg::$kind(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

from_arg!(i32, Int32);
from_arg!(u32, UInt32);
from_arg!(i64, Int64);
from_arg!(f64, Number);
from_arg!(bool, Bool);
from_arg!(String, Str);
from_arg!(ScriptRef, Ref);
from_arg!(Variant, Variant);
from_arg!(DynamicValue, Dynamic);

// ============================================================================
// Return implementations
// ============================================================================

/// Native type that encodes as a single scalar.
pub trait IntoScalar {
    /// Convert into a scalar
    fn into_scalar(self) -> Scalar;
}

macro_rules! into_scalar {
    ($ty:ty, $variant:ident) => {
        impl IntoScalar for $ty {
            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
        }
    };
}

into_scalar!(i32, Int32);
into_scalar!(u32, UInt32);
into_scalar!(i64, Int64);
into_scalar!(f64, Number);
into_scalar!(bool, Bool);
into_scalar!(String, Str);
into_scalar!(ScriptRef, Ref);

impl IntoScalar for &str {
    fn into_scalar(self) -> Scalar {
        Scalar::Str(self.to_string())
    }
}

/// The nil value, as a return type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nil;

impl IntoScalar for Nil {
    fn into_scalar(self) -> Scalar {
        Scalar::Nil
    }
}

impl<T: IntoScalar> IntoScalar for Option<T> {
    fn into_scalar(self) -> Scalar {
        match self {
            Some(value) => value.into_scalar(),
            None => Scalar::Nil,
        }
    }
}

macro_rules! scalar_ret {
    ($($ty:ty),*) => {
        $(
            impl IntoRet for $ty {
                fn into_ret(self) -> Result<Ret, GlueError> {
                    Ok(Ret::Scalar(self.into_scalar()))
                }
            }
        )*
    };
}

scalar_ret!(i32, u32, i64, f64, bool, String, ScriptRef, Nil, &str);

impl<T: IntoScalar> IntoRet for Option<T> {
    fn into_ret(self) -> Result<Ret, GlueError> {
        Ok(Ret::Scalar(self.into_scalar()))
    }
}

// Unit type (methods that return nothing)
impl IntoRet for () {
    fn into_ret(self) -> Result<Ret, GlueError> {
        Ok(Ret::Void)
    }
}

impl IntoRet for DynamicValue {
    fn into_ret(self) -> Result<Ret, GlueError> {
        Ok(Ret::Dynamic(self))
    }
}

impl IntoRet for Variant {
    fn into_ret(self) -> Result<Ret, GlueError> {
        let ret = match self {
            Variant::Nil | Variant::Opaque(_) => Ret::Scalar(Scalar::Nil),
            Variant::Boolean(b) => Ret::Scalar(Scalar::Bool(b)),
            Variant::Integer(i) => Ret::Scalar(Scalar::Int64(i)),
            Variant::Number(n) => Ret::Scalar(Scalar::Number(n)),
            Variant::String(s) => Ret::Scalar(Scalar::Str(s)),
            Variant::Table(value) => Ret::Dynamic(value),
        };
        Ok(ret)
    }
}

// Result type (for fallible methods)
impl<T: IntoRet, E: Display> IntoRet for Result<T, E> {
    fn into_ret(self) -> Result<Ret, GlueError> {
        match self {
            Ok(value) => value.into_ret(),
            Err(error) => Err(GlueError::Method(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_arg_matching_kind() {
        assert_eq!(i32::from_arg(Arg::Int32(42)), Some(42));
        assert_eq!(String::from_arg(Arg::Str("hi".into())), Some("hi".to_string()));
        assert_eq!(bool::from_arg(Arg::Bool(true)), Some(true));
    }

    #[test]
    fn test_from_arg_kind_mismatch() {
        assert_eq!(i32::from_arg(Arg::Int64(42)), None);
        assert_eq!(f64::from_arg(Arg::Str("1".into())), None);
    }

    #[test]
    fn test_descriptor_kinds() {
        assert_eq!(<u32 as FromArg>::KIND, ParamKind::UInt32);
        assert_eq!(<DynamicValue as FromArg>::KIND, ParamKind::Dynamic);
        assert_eq!(<ScriptRef as FromArg>::KIND, ParamKind::Ref);
    }

    #[test]
    fn test_into_ret() {
        assert_eq!(().into_ret().unwrap(), Ret::Void);
        assert_eq!(7i32.into_ret().unwrap(), Ret::Scalar(Scalar::Int32(7)));
        assert_eq!(None::<i32>.into_ret().unwrap(), Ret::Scalar(Scalar::Nil));
        assert_eq!(
            DynamicValue::Bool(true).into_ret().unwrap(),
            Ret::Dynamic(DynamicValue::Bool(true))
        );
    }

    #[test]
    fn test_result_error_becomes_method_error() {
        let ret: Result<i32, String> = Err("no such item".into());
        assert_eq!(ret.into_ret(), Err(GlueError::Method("no such item".into())));
    }
}
