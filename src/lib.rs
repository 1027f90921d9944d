mod depth;
mod dot;
mod empty;
mod error;
mod scapegoat;

pub use crate::depth::Depth;
pub use crate::empty::Empty;
pub use crate::error::ScapegoatError;
pub use crate::scapegoat::{Iter, Node, Scapegoat, Stats};
