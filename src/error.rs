use thiserror::Error;

/// Top-level error type for the drapewall crate.
#[derive(Debug, Error)]
pub enum DrapeError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Errors related to input geometry and decomposition parameters.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid input geometry: {0}")]
    InvalidInputGeometry(String),

    #[error("invalid terrain bounds: minimum {minimum}, maximum {maximum}")]
    InvalidTerrainBounds { minimum: f64, maximum: f64 },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("line handle refers to released geometry")]
    StaleLine,
}

/// Errors related to encoding, decoding and writing per-instance attributes.
#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("unsupported attribute arity {0}, expected 1 to 4 components")]
    UnsupportedArity(usize),

    #[error("invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("attribute {0} is read-only")]
    ReadOnlyAttribute(String),
}

/// Errors related to the batched attribute store and the instance range index.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("lines have not been decomposed")]
    NotDecomposed,

    #[error("attribute access before the batch was built")]
    BatchNotBuilt,

    #[error("the batch backing this view has been released")]
    BatchReleased,

    #[error("the batch is already borrowed")]
    BatchBorrowed,

    #[error("instance index {index} is out of range for {len} instances")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid range [{first}, {last}]")]
    InvalidRange { first: usize, last: usize },

    #[error("identifier already registered: {0}")]
    DuplicateIdentifier(String),

    #[error("range [{first}, {last}] for {id} overlaps an existing range")]
    OverlappingRange { id: String, first: usize, last: usize },

    #[error("duplicate attribute definition: {0}")]
    DuplicateAttribute(String),

    #[error("inconsistent attributes across segments: {0}")]
    InconsistentAttributes(String),
}

/// Convenience type alias for results using [`DrapeError`].
pub type Result<T> = std::result::Result<T, DrapeError>;
