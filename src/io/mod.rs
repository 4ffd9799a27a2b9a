pub mod input;
pub mod output;
pub mod qmsum;

pub use input::*;
pub use output::*;
pub use qmsum::*;
