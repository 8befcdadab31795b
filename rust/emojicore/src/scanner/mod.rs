pub mod document;
pub mod changes;
pub mod emoji;
pub mod change;
pub mod syntax;
pub mod markdown;

pub use document::*;
pub use changes::*;
pub use emoji::*;
pub use change::*;
pub use syntax::*;
pub use markdown::*;
