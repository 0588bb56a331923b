mod activity;
mod allocation;
mod budget;
mod dto;
mod engineer;
mod priority;
mod status;

pub use activity::*;
pub use allocation::*;
pub use budget::*;
pub use dto::*;
pub use engineer::*;
pub use priority::*;
pub use status::*;
