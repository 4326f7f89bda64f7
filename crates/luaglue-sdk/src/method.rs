//! Argument fetch pipeline and the [`Method`] abstraction.
//!
//! A bound method declares its parameter kinds as a constant list. The
//! pipeline folds over that list, fetching exactly one stack slot per
//! descriptor in order, and hands the accumulated arguments to the method.

use std::vec;

use crate::codec;
use crate::context::ScriptStack;
use crate::convert::{FromArg, IntoRet};
use crate::error::{GlueError, GlueResult};
use crate::object::{NativeObjectHandle, ScriptClass};
use crate::value::{Arg, ParamKind};

/// Fetch one argument per descriptor, starting at slot `first`.
///
/// A descriptor list that is exactly `[Void]` fetches nothing. Type errors
/// are numbered from the first argument slot, so the first argument is #1.
/// When a fetch fails, references persisted for earlier arguments are
/// released before the error is returned.
pub fn fetch_args(
    stack: &mut dyn ScriptStack,
    params: &[ParamKind],
    first: i32,
) -> GlueResult<Vec<Arg>> {
    let params = if params == [ParamKind::Void] {
        &[][..]
    } else {
        params
    };

    let mut args = Vec::with_capacity(params.len());
    for (i, kind) in params.iter().enumerate() {
        let slot = first + i as i32;
        match codec::fetch(stack, slot, *kind) {
            Ok(arg) => {
                tracing::trace!(
                    slot,
                    kind = kind.name(),
                    done = args.len(),
                    remaining = params.len() - i - 1,
                    "fetched argument"
                );
                args.push(arg);
            }
            Err(err) => {
                release_args(stack, args);
                return Err(rebase(err, first));
            }
        }
    }
    Ok(args)
}

fn rebase(err: GlueError, first: i32) -> GlueError {
    match err {
        GlueError::TypeMismatch { arg, expected, got } => GlueError::TypeMismatch {
            arg: arg - first + 1,
            expected,
            got,
        },
        other => other,
    }
}

/// Give back the registry slots held by arguments that will never reach
/// the method.
pub fn release_args(stack: &mut dyn ScriptStack, args: impl IntoIterator<Item = Arg>) {
    for arg in args {
        if let Arg::Ref(r) = arg {
            tracing::trace!(key = r.key(), "releasing undelivered reference");
            r.release(stack);
        }
    }
}

/// Check fetched arguments against the declared descriptors.
///
/// On mismatch the arguments are released and a signature error returned.
pub fn check_args(
    stack: &mut dyn ScriptStack,
    args: Vec<Arg>,
    params: &[ParamKind],
) -> GlueResult<Vec<Arg>> {
    let matches =
        args.len() == params.len() && args.iter().zip(params).all(|(arg, kind)| arg.kind() == *kind);
    if matches {
        return Ok(args);
    }
    let err = GlueError::Signature(format!(
        "fetched ({}) where ({}) was declared",
        args.iter().map(|a| a.kind().name()).collect::<Vec<_>>().join(", "),
        params.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    ));
    release_args(stack, args);
    Err(err)
}

/// Take the next fetched argument as `A`.
pub fn take<A: FromArg>(args: &mut vec::IntoIter<Arg>) -> GlueResult<A> {
    let arg = args.next().ok_or_else(|| {
        GlueError::Signature(format!("missing '{}' argument", A::KIND.name()))
    })?;
    let kind = arg.kind();
    A::from_arg(arg).ok_or_else(|| {
        GlueError::Signature(format!(
            "argument fetched as '{}' where '{}' was declared",
            kind.name(),
            A::KIND.name()
        ))
    })
}

fn busy<T: ScriptClass>(stack: &mut dyn ScriptStack, args: Vec<Arg>) -> GlueError {
    release_args(stack, args);
    GlueError::ReceiverBusy {
        class: T::CLASS_NAME,
    }
}

// ============================================================================
// Method
// ============================================================================

/// Marker for methods taking `&mut self`
#[doc(hidden)]
pub struct Exclusive;

/// Marker for methods taking `&self`
#[doc(hidden)]
pub struct Shared;

/// Marker for methods taking `&mut self` and the calling stack
#[doc(hidden)]
pub struct ExclusiveWithStack;

/// Marker for methods taking `&self` and the calling stack
#[doc(hidden)]
pub struct SharedWithStack;

/// A native method callable on receivers of type `T`.
///
/// Implemented for every `Fn(&mut T, A1, .., An) -> R` and
/// `Fn(&T, A1, .., An) -> R` with `n <= 8`, where each `Ai: FromArg` and
/// `R: IntoRet`. A method may also take `&mut dyn ScriptStack` right after
/// the receiver to call back into the runtime, for example to invoke or
/// release a stored [`crate::ScriptRef`]. `Marker` only disambiguates the
/// blanket implementations.
///
/// `&self` methods borrow the receiver shared, so nested calls on the same
/// object succeed as long as none of them needs `&mut self`.
pub trait Method<T, Marker>: 'static {
    /// Return type
    type Output: IntoRet;

    /// Parameter descriptors in declaration order
    const PARAMS: &'static [ParamKind];

    /// Borrow `receiver` and invoke with arguments fetched per
    /// [`Self::PARAMS`].
    ///
    /// Arguments are released if the call cannot go ahead.
    fn invoke(
        &self,
        stack: &mut dyn ScriptStack,
        receiver: &NativeObjectHandle<T>,
        args: Vec<Arg>,
    ) -> GlueResult<Self::Output>;
}

macro_rules! impl_method {
    (@one $marker:ident, $borrow:ident, ($($recv:tt)*), ($($stack:ident)?), $($ty:ident $var:ident),*) => {
        impl<T, F, R, $($ty,)*> Method<T, ($marker, $($ty,)*)> for F
        where
            T: ScriptClass,
            F: Fn($($recv)* T, $(&mut dyn $stack,)? $($ty),*) -> R + 'static,
            R: IntoRet,
            $($ty: FromArg,)*
        {
            type Output = R;

            const PARAMS: &'static [ParamKind] = &[$(<$ty as FromArg>::KIND),*];

            #[allow(unused_mut, unused_variables)]
            fn invoke(
                &self,
                stack: &mut dyn ScriptStack,
                receiver: &NativeObjectHandle<T>,
                args: Vec<Arg>,
            ) -> GlueResult<R> {
                let args = check_args(stack, args, Self::PARAMS)?;
                let Some(mut receiver) = receiver.$borrow() else {
                    return Err(busy::<T>(stack, args));
                };
                let mut args = args.into_iter();
                $(let $var = take::<$ty>(&mut args)?;)*
                Ok((self)(impl_method!(@recv receiver $($recv)*), $(impl_method!(@stack stack $stack),)? $($var),*))
            }
        }
    };
    (@recv $r:ident &mut) => { &mut *$r };
    (@recv $r:ident &) => { &*$r };
    (@stack $s:ident $t:ident) => { &mut *$s };
    ($($ty:ident $var:ident),*) => {
        impl_method!(@one Exclusive, try_borrow_mut, (&mut), (), $($ty $var),*);
        impl_method!(@one Shared, try_borrow, (&), (), $($ty $var),*);
        impl_method!(@one ExclusiveWithStack, try_borrow_mut, (&mut), (ScriptStack), $($ty $var),*);
        impl_method!(@one SharedWithStack, try_borrow, (&), (ScriptStack), $($ty $var),*);
    };
}

impl_method!();
impl_method!(A1 a1);
impl_method!(A1 a1, A2 a2);
impl_method!(A1 a1, A2 a2, A3 a3);
impl_method!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_method!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_method!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_method!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_method!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i64,
    }

    impl ScriptClass for Counter {
        const CLASS_NAME: &'static str = "Counter";
    }

    impl Counter {
        fn add(&mut self, by: i64) -> i64 {
            self.value += by;
            self.value
        }

        fn label(&self, prefix: String, width: i32) -> String {
            format!("{prefix}{:>width$}", self.value, width = width as usize)
        }

        fn reset(&mut self) {
            self.value = 0;
        }

        fn announce(&self, stack: &mut dyn ScriptStack, times: i32) {
            for _ in 0..times {
                stack.push_integer(self.value);
            }
        }
    }

    fn params_of<T, M: Method<T, Marker>, Marker>(_: &M) -> &'static [ParamKind] {
        M::PARAMS
    }

    #[test]
    fn test_params_follow_signature() {
        assert_eq!(params_of::<Counter, _, _>(&Counter::add), &[ParamKind::Int64]);
        assert_eq!(
            params_of::<Counter, _, _>(&Counter::label),
            &[ParamKind::Str, ParamKind::Int32]
        );
        assert!(params_of::<Counter, _, _>(&Counter::reset).is_empty());
    }

    #[test]
    fn test_stack_parameter_is_not_a_descriptor() {
        assert_eq!(
            params_of::<Counter, _, _>(&Counter::announce),
            &[ParamKind::Int32]
        );
    }

    #[test]
    fn test_take_rejects_mismatched_args() {
        let mut args = vec![Arg::Bool(true)].into_iter();
        let err = take::<i64>(&mut args).unwrap_err();
        assert!(matches!(err, GlueError::Signature(_)));

        let err = take::<i64>(&mut args).unwrap_err();
        assert!(matches!(err, GlueError::Signature(_)));
    }

    #[test]
    fn test_take_in_order() {
        let mut args = vec![Arg::Str("n=".into()), Arg::Int32(3)].into_iter();
        assert_eq!(take::<String>(&mut args).unwrap(), "n=");
        assert_eq!(take::<i32>(&mut args).unwrap(), 3);
        assert!(args.next().is_none());
    }
}
