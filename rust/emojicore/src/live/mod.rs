pub mod proximity;
pub mod state;
pub mod decorations;
pub mod conductor;
pub mod surface;
pub mod wasm;

pub use proximity::*;
pub use state::*;
pub use decorations::*;
pub use conductor::*;
pub use surface::*;
pub use wasm::*;
