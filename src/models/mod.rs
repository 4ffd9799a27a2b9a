pub mod chunk;
pub mod record;
pub mod transcript;

pub use chunk::*;
pub use record::*;
pub use transcript::*;
