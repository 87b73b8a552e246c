mod simplify;
mod slice;
mod translate;
mod union;

pub use simplify::Simplify;
pub use slice::Slice;
pub use translate::{duplicate_with_offset, Translate};
pub use union::Union;
