pub mod node;
pub mod report;
pub mod settings;

pub use node::*;
pub use report::*;
pub use settings::*;
