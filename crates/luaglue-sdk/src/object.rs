//! Native receivers exposed to scripts.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::context::ScriptStack;

/// A native type whose instances can receive method calls from scripts.
///
/// The default [`ScriptClass::resolve`] expects instances to have been
/// pushed with [`NativeObjectHandle::push`]. Registration layers with their
/// own object representation override it.
pub trait ScriptClass: Sized + 'static {
    /// Userdata type name of instances
    const CLASS_NAME: &'static str;

    /// Resolve the receiver stored in `slot`, or `None` if the slot does not
    /// hold an instance of this class.
    fn resolve(stack: &dyn ScriptStack, slot: i32) -> Option<NativeObjectHandle<Self>> {
        let data = stack.userdata(slot, Self::CLASS_NAME)?;
        NativeObjectHandle::from_any(data)
    }
}

/// Shared handle to a native object instance.
///
/// The runtime keeps one clone alive per userdata; the handle itself is not
/// tied to any runtime.
#[derive(Debug)]
pub struct NativeObjectHandle<T>(Rc<RefCell<T>>);

impl<T> Clone for NativeObjectHandle<T> {
    fn clone(&self) -> Self {
        NativeObjectHandle(Rc::clone(&self.0))
    }
}

impl<T: 'static> NativeObjectHandle<T> {
    /// Wrap a native object
    pub fn new(object: T) -> Self {
        NativeObjectHandle(Rc::new(RefCell::new(object)))
    }

    /// Recover a handle from a userdata payload
    pub fn from_any(data: Rc<dyn Any>) -> Option<Self> {
        data.downcast::<RefCell<T>>().ok().map(NativeObjectHandle)
    }

    /// Shared access for the duration of a call, `None` if mutably borrowed
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        self.0.try_borrow().ok()
    }

    /// Mutable access for the duration of a call, `None` if already borrowed
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, T>> {
        self.0.try_borrow_mut().ok()
    }

    /// Run `f` with shared access
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Whether two handles refer to the same instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ScriptClass> NativeObjectHandle<T> {
    /// Push the instance as a userdata of type [`ScriptClass::CLASS_NAME`],
    /// declaring the type on first use.
    pub fn push(&self, stack: &mut dyn ScriptStack) {
        stack.register_type(T::CLASS_NAME);
        let data: Rc<dyn Any> = self.0.clone();
        stack.push_userdata(T::CLASS_NAME, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lamp {
        on: bool,
    }

    #[test]
    fn test_handle_round_trips_through_any() {
        let handle = NativeObjectHandle::new(Lamp { on: false });
        let data: Rc<dyn Any> = handle.0.clone();
        let back = NativeObjectHandle::<Lamp>::from_any(data).unwrap();
        assert!(back.ptr_eq(&handle));
        back.try_borrow_mut().unwrap().on = true;
        assert!(handle.with(|lamp| lamp.on));
    }

    #[test]
    fn test_wrong_type_does_not_downcast() {
        let data: Rc<dyn Any> = Rc::new(RefCell::new(5u8));
        assert!(NativeObjectHandle::<Lamp>::from_any(data).is_none());
    }

    #[test]
    fn test_busy_receiver() {
        let handle = NativeObjectHandle::new(Lamp { on: false });
        let outer = handle.try_borrow_mut().unwrap();
        assert!(handle.try_borrow_mut().is_none());
        assert!(handle.try_borrow().is_none());
        drop(outer);

        let _first = handle.try_borrow().unwrap();
        assert!(handle.try_borrow().is_some());
        assert!(handle.try_borrow_mut().is_none());
    }
}
