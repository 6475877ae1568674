mod context;
mod report;
mod result;
mod violation;

pub use context::*;
pub use report::*;
pub use result::*;
pub use violation::*;
