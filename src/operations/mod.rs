pub mod decompose;

pub use decompose::{
    DecomposeAll, DecomposeOptions, DecomposeWall, Decomposition, DEFAULT_GRANULARITY,
};
