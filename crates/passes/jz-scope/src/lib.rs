//! Lexical scope chain
//!
//! [`ScopeTree`] holds every frame of a compilation. Lookups walk parent links
//! and return the nearest definition; declarations only ever touch the local
//! frame. Besides members each frame carries three dynamic slots (arguments,
//! content block, current rule) that fall back to the nearest ancestor.

mod error;
mod interop;
mod member;
mod scope;

pub use error::ScopeError;
pub use interop::{
    BindError, BoundArguments, CallError, Callable, NativeFn, NativeFunction, bind,
};
pub use member::{Function, Member, MemberKind, Mixin, Variable};
pub use scope::{ContentBlock, ScopeFrame, ScopeId, ScopeTree, qualify};
