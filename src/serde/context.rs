//! Debug-build type-context tracking for richer error messages.
//!
//! While a value is being (de)serialized, the drivers keep a thread-local
//! stack of the type paths currently in flight. Custom errors raised inside
//! the bridge append the stack, which turns "unknown type tag" into
//! something a reader can locate in a deeply nested payload.
//!
//! Compiled away unless the `debug` feature is on **and** this is a debug
//! build.

use core::fmt::Display;

#[cfg(all(debug_assertions, feature = "debug"))]
mod stack {
    use core::cell::RefCell;
    use core::fmt;

    std::thread_local! {
        static TYPE_CONTEXT: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    pub(super) fn push(path: &'static str) {
        TYPE_CONTEXT.with_borrow_mut(|stack| stack.push(path));
    }

    pub(super) fn pop() {
        TYPE_CONTEXT.with_borrow_mut(|stack| {
            stack.pop();
        });
    }

    pub(super) struct Render;

    impl fmt::Display for Render {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            TYPE_CONTEXT.with_borrow(|stack| {
                let mut iter = stack.iter();
                if let Some(first) = iter.next() {
                    write!(f, "`{first}`")?;
                }
                for path in iter {
                    write!(f, " -> `{path}`")?;
                }
                Ok(())
            })
        }
    }

    pub(super) fn is_empty() -> bool {
        TYPE_CONTEXT.with_borrow(|stack| stack.is_empty())
    }
}

// -----------------------------------------------------------------------------
// Guard

/// Pushes a type path onto the context stack for the guard's lifetime.
pub(crate) struct TypeContextGuard {
    _private: (),
}

impl TypeContextGuard {
    #[cfg_attr(not(all(debug_assertions, feature = "debug")), allow(unused_variables))]
    pub(crate) fn enter(path: &'static str) -> Self {
        #[cfg(all(debug_assertions, feature = "debug"))]
        stack::push(path);
        Self { _private: () }
    }
}

impl Drop for TypeContextGuard {
    fn drop(&mut self) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        stack::pop();
    }
}

// -----------------------------------------------------------------------------
// Error helper

/// Builds a custom deserialization error, appending the in-flight type
/// context in debug builds.
///
/// Prefer this over calling `Error::custom` directly inside the bridge.
pub(crate) fn make_custom_error<E>(msg: impl Display) -> E
where
    E: serde_core::de::Error,
{
    #[cfg(all(debug_assertions, feature = "debug"))]
    {
        if !stack::is_empty() {
            return E::custom(format_args!("{msg} (while handling {})", stack::Render));
        }
        E::custom(msg)
    }
    #[cfg(not(all(debug_assertions, feature = "debug")))]
    {
        E::custom(msg)
    }
}

/// The serialization-side counterpart of [`make_custom_error`].
pub(crate) fn make_custom_ser_error<E>(msg: impl Display) -> E
where
    E: serde_core::ser::Error,
{
    #[cfg(all(debug_assertions, feature = "debug"))]
    {
        if !stack::is_empty() {
            return E::custom(format_args!("{msg} (while handling {})", stack::Render));
        }
        E::custom(msg)
    }
    #[cfg(not(all(debug_assertions, feature = "debug")))]
    {
        E::custom(msg)
    }
}
