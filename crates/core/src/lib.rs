//! qb-core: identifier, type, and error types shared by the rest of the
//! QB/VBDOS detokenizer workspace.

pub mod encoding;
pub mod errors;
pub mod ident;
pub mod types;

pub use errors::{QbError, QbResult};
pub use ident::{Identifier, IdentifierName};
pub use types::Type;
