pub mod codec;

pub use codec::{decode, encode, AttributeValue, RawComponents, MAX_ARITY};

/// Name of the per-segment line width attribute.
pub const WIDTH: &str = "width";

/// Name of the per-segment distance attribute: start distance, segment
/// length and total line length.
pub const DISTANCE: &str = "distance";

/// Conventional name of the RGBA color attribute.
pub const COLOR: &str = "color";

/// Conventional name of the visibility attribute.
pub const SHOW: &str = "show";

/// Numeric storage type of one attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentDatatype {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
}

impl ComponentDatatype {
    /// Returns `true` for the integer types.
    #[must_use]
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float | Self::Double)
    }

    /// Returns the inclusive value range of the type.
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::Byte => (f64::from(i8::MIN), f64::from(i8::MAX)),
            Self::UnsignedByte => (0.0, f64::from(u8::MAX)),
            Self::Short => (f64::from(i16::MIN), f64::from(i16::MAX)),
            Self::UnsignedShort => (0.0, f64::from(u16::MAX)),
            Self::Int => (f64::from(i32::MIN), f64::from(i32::MAX)),
            Self::UnsignedInt => (0.0, f64::from(u32::MAX)),
            Self::Float => (f64::from(f32::MIN), f64::from(f32::MAX)),
            Self::Double => (f64::MIN, f64::MAX),
        }
    }

    /// Converts `value` to the value this type stores, or `None` if it is
    /// not representable. Integer types require integral values in range;
    /// `Float` rounds to single precision.
    #[must_use]
    pub fn quantize(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let (min, max) = self.range();
        if value < min || value > max {
            return None;
        }
        match self {
            Self::Float => {
                #[allow(clippy::cast_possible_truncation)]
                let single = value as f32;
                Some(f64::from(single))
            }
            Self::Double => Some(value),
            _ if value.fract() == 0.0 => Some(value),
            _ => None,
        }
    }
}

/// Whether an attribute may be written through an instance view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeAccess {
    /// Derived by decomposition; never written after the batch is built.
    ReadOnly,
    /// Uniform across a logical line and writable through its view.
    ReadWrite,
}

/// A per-instance attribute: its storage layout and initial value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceAttribute {
    pub datatype: ComponentDatatype,
    pub normalize: bool,
    pub access: AttributeAccess,
    pub value: AttributeValue,
}

impl InstanceAttribute {
    /// Creates a writable attribute.
    #[must_use]
    pub fn new(datatype: ComponentDatatype, normalize: bool, value: AttributeValue) -> Self {
        Self {
            datatype,
            normalize,
            access: AttributeAccess::ReadWrite,
            value,
        }
    }

    /// Creates a read-only attribute.
    #[must_use]
    pub fn read_only(datatype: ComponentDatatype, normalize: bool, value: AttributeValue) -> Self {
        Self {
            datatype,
            normalize,
            access: AttributeAccess::ReadOnly,
            value,
        }
    }

    /// An RGBA color stored as normalized unsigned bytes.
    #[must_use]
    pub fn color(rgba: [u8; 4]) -> Self {
        Self::new(
            ComponentDatatype::UnsignedByte,
            true,
            AttributeValue::from(rgba.map(f64::from)),
        )
    }

    /// A visibility flag stored as one unsigned byte.
    #[must_use]
    pub fn show(visible: bool) -> Self {
        Self::new(
            ComponentDatatype::UnsignedByte,
            false,
            AttributeValue::Scalar(if visible { 1.0 } else { 0.0 }),
        )
    }

    /// Returns the number of components.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.value.arity()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn quantize_integers() {
        assert_eq!(ComponentDatatype::UnsignedByte.quantize(255.0), Some(255.0));
        assert_eq!(ComponentDatatype::UnsignedByte.quantize(-1.0), None);
        assert_eq!(ComponentDatatype::Byte.quantize(-128.0), Some(-128.0));
        assert_eq!(ComponentDatatype::Short.quantize(1.5), None);
    }

    #[test]
    fn quantize_floats() {
        assert_eq!(ComponentDatatype::Double.quantize(0.1), Some(0.1));
        assert_eq!(ComponentDatatype::Float.quantize(1e300), None);
        assert_eq!(ComponentDatatype::Float.quantize(f64::INFINITY), None);
    }

    #[test]
    fn color_is_normalized_bytes() {
        let color = InstanceAttribute::color([255, 0, 0, 255]);
        assert_eq!(color.arity(), 4);
        assert!(color.normalize);
        assert_eq!(color.access, AttributeAccess::ReadWrite);
        assert_eq!(color.value.as_slice(), &[255.0, 0.0, 0.0, 255.0]);
    }

    #[test]
    fn integer_types() {
        assert!(ComponentDatatype::UnsignedInt.is_integer());
        assert!(!ComponentDatatype::Float.is_integer());
    }
}
