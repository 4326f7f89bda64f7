//! Dispatch binder
//!
//! Turns a receiver type plus a [`Method`] into a dispatch entry point: the
//! single function the runtime calls for one method invocation. The entry
//! point resolves the receiver from slot 1, fetches arguments from slot 2
//! onward, invokes the method, pushes its results and returns their count.
//!
//! The receiver stays borrowed only while the method runs. Methods that
//! take the stack may call back into the runtime, including into other
//! methods of the same object.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::codec;
use crate::context::ScriptStack;
use crate::convert::IntoRet;
use crate::error::{GlueError, GlueResult};
use crate::method::{fetch_args, release_args, Method};
use crate::object::{NativeObjectHandle, ScriptClass};
use crate::value::{Arg, ParamList, Ret};

/// Stack slot holding the receiver
pub const RECEIVER_SLOT: i32 = 1;

/// Stack slot holding the first argument
pub const FIRST_ARG_SLOT: i32 = 2;

/// Dispatch entry point: runs one call against the current stack frame and
/// returns the number of results left on top of the stack.
pub type DispatchFn = Rc<dyn Fn(&mut dyn ScriptStack) -> GlueResult<usize>>;

/// Build the entry point for `method` on receivers of type `T`.
pub fn bind<T, M, Marker>(name: &str, method: M) -> DispatchFn
where
    T: ScriptClass,
    M: Method<T, Marker>,
    Marker: 'static,
{
    let name = name.to_string();
    Rc::new(move |stack: &mut dyn ScriptStack| {
        dispatch::<T, M, Marker>(stack, &name, &method)
    })
}

/// Build the entry point for a handler with a hand-written descriptor list.
pub fn bind_signature<T, F>(name: &str, params: ParamList, handler: F) -> DispatchFn
where
    T: ScriptClass,
    F: Fn(&mut T, Vec<Arg>) -> GlueResult<Ret> + 'static,
{
    let name = name.to_string();
    Rc::new(move |stack: &mut dyn ScriptStack| {
        run::<T>(stack, &name, params.kinds(), |stack, handle, args| {
            let Some(mut receiver) = handle.try_borrow_mut() else {
                release_args(stack, args);
                return Err(GlueError::ReceiverBusy {
                    class: T::CLASS_NAME,
                });
            };
            handler(&mut *receiver, args)
        })
    })
}

/// Run one call of `method` against the current stack frame.
///
/// An unresolvable receiver is not an error: the call returns zero results
/// without fetching arguments or invoking the method.
pub fn dispatch<T, M, Marker>(
    stack: &mut dyn ScriptStack,
    name: &str,
    method: &M,
) -> GlueResult<usize>
where
    T: ScriptClass,
    M: Method<T, Marker>,
{
    run::<T>(stack, name, M::PARAMS, |stack, handle, args| {
        method.invoke(stack, handle, args)?.into_ret()
    })
}

fn run<T: ScriptClass>(
    stack: &mut dyn ScriptStack,
    name: &str,
    params: &[crate::ParamKind],
    invoke: impl FnOnce(&mut dyn ScriptStack, &NativeObjectHandle<T>, Vec<Arg>) -> GlueResult<Ret>,
) -> GlueResult<usize> {
    let Some(handle) = T::resolve(stack, RECEIVER_SLOT) else {
        tracing::debug!(
            class = T::CLASS_NAME,
            method = name,
            "receiver did not resolve, returning no results"
        );
        return Ok(0);
    };

    let args = fetch_args(stack, params, FIRST_ARG_SLOT).map_err(|err| err.in_call(name))?;
    let ret = guarded(|| invoke(&mut *stack, &handle, args)).map_err(|err| err.in_call(name))?;

    let count = codec::encode(stack, ret);
    tracing::trace!(class = T::CLASS_NAME, method = name, count, "pushed results");
    Ok(count)
}

/// Run `f` with panics converted into [`GlueError::Panic`].
fn guarded<R>(f: impl FnOnce() -> GlueResult<R>) -> GlueResult<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Err(GlueError::Panic(msg))
    })
}
