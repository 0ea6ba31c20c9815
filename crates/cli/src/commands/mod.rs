pub mod demangle;
pub mod inspect;
pub mod resolve;
pub mod symbols;
pub mod util;

pub use demangle::*;
pub use inspect::*;
pub use resolve::*;
pub use symbols::*;
pub use util::*;
