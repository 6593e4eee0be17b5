use crate::types::TypeHandle;
use std::fmt;

/// Generation error
///
/// Degradations (cycles, depth cutoffs, overflows, throttling) are never
/// errors; they are reported through the diagnostic sink and generation
/// continues. Only internal consistency failures surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The recursion guard was asked to exit a type it is not expanding
    ///
    /// Indicates a traversal bug: every `enter` must be paired with an
    /// `exit` for the same type, innermost first.
    GuardStackMismatch {
        /// Type on top of the stack, if any
        expected: Option<TypeHandle>,
        /// Type passed to `exit`
        found: TypeHandle,
    },
    /// The introspector does not know a handle it was asked about
    UnknownType(TypeHandle),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::GuardStackMismatch { expected, found } => match expected {
                Some(expected) => write!(
                    f,
                    "recursion guard mismatch: exiting {found} but {expected} is innermost"
                ),
                None => write!(
                    f,
                    "recursion guard mismatch: exiting {found} with an empty stack"
                ),
            },
            GenerationError::UnknownType(ty) => {
                write!(f, "type {ty} is not known to the introspector")
            }
        }
    }
}

impl std::error::Error for GenerationError {}
