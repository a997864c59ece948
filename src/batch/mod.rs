pub mod range_index;
pub mod table;

pub use range_index::{IndexRange, InstanceRangeIndex};
pub use table::{AttributeDefinition, BatchTable};
