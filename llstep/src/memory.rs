//! Machine memory.
//!
//! All storage lives in a single flat [`Heap`] of cells: stack allocations,
//! built-in allocations and global variables alike. Register environments and
//! saved caller frames live in [`stack`].

pub mod heap;
pub mod stack;
pub mod statics;

pub use heap::{Address, Heap};
pub use stack::{Activation, CallStack, Registers, StackFrame};
pub use statics::load_globals;
