use crate::error::AttributeError;
use crate::math::{Vector2, Vector3, Vector4};

use super::ComponentDatatype;

/// Largest number of components an attribute value may carry.
pub const MAX_ARITY: usize = 4;

/// A decoded attribute value of arity 1 to 4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Scalar(f64),
    Vec2(Vector2),
    Vec3(Vector3),
    Vec4(Vector4),
}

impl AttributeValue {
    /// Returns the number of components.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vec2(_) => 2,
            Self::Vec3(_) => 3,
            Self::Vec4(_) => 4,
        }
    }

    /// Returns the components in order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Self::Scalar(s) => std::slice::from_ref(s),
            Self::Vec2(v) => v.as_slice(),
            Self::Vec3(v) => v.as_slice(),
            Self::Vec4(v) => v.as_slice(),
        }
    }

    /// Packs a vector value into the leading slots of `out`.
    fn pack(&self, out: &mut [f64]) {
        let components = self.as_slice();
        out[..components.len()].copy_from_slice(components);
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vector2> for AttributeValue {
    fn from(value: Vector2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vector3> for AttributeValue {
    fn from(value: Vector3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vector4> for AttributeValue {
    fn from(value: Vector4) -> Self {
        Self::Vec4(value)
    }
}

impl From<[f64; 2]> for AttributeValue {
    fn from(value: [f64; 2]) -> Self {
        Self::Vec2(Vector2::from(value))
    }
}

impl From<[f64; 3]> for AttributeValue {
    fn from(value: [f64; 3]) -> Self {
        Self::Vec3(Vector3::from(value))
    }
}

impl From<[f64; 4]> for AttributeValue {
    fn from(value: [f64; 4]) -> Self {
        Self::Vec4(Vector4::from(value))
    }
}

impl TryFrom<&[f64]> for AttributeValue {
    type Error = AttributeError;

    fn try_from(components: &[f64]) -> Result<Self, Self::Error> {
        decode(components).map_err(|_| {
            AttributeError::InvalidAttributeValue(format!(
                "{} components cannot form an attribute value",
                components.len()
            ))
        })
    }
}

/// Raw storage components of one attribute slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawComponents {
    values: [f64; MAX_ARITY],
    len: usize,
}

impl RawComponents {
    /// Returns the populated components.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a raw slot holds at least one component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Decodes a raw slot into a semantic value. The arity is the buffer length.
///
/// # Errors
///
/// Returns [`AttributeError::UnsupportedArity`] unless `raw` holds 1 to 4
/// components.
pub fn decode(raw: &[f64]) -> Result<AttributeValue, AttributeError> {
    match *raw {
        [x] => Ok(AttributeValue::Scalar(x)),
        [x, y] => Ok(AttributeValue::Vec2(Vector2::new(x, y))),
        [x, y, z] => Ok(AttributeValue::Vec3(Vector3::new(x, y, z))),
        [x, y, z, w] => Ok(AttributeValue::Vec4(Vector4::new(x, y, z, w))),
        _ => Err(AttributeError::UnsupportedArity(raw.len())),
    }
}

/// Encodes `value` for a slot of `arity` components of type `datatype`.
///
/// # Errors
///
/// Returns [`AttributeError::UnsupportedArity`] if `arity` is outside 1 to 4,
/// or [`AttributeError::InvalidAttributeValue`] if the value has a different
/// arity or a component is not representable in `datatype`.
pub fn encode(
    value: &AttributeValue,
    datatype: ComponentDatatype,
    arity: usize,
) -> Result<RawComponents, AttributeError> {
    if !(1..=MAX_ARITY).contains(&arity) {
        return Err(AttributeError::UnsupportedArity(arity));
    }
    if value.arity() != arity {
        return Err(AttributeError::InvalidAttributeValue(format!(
            "expected {arity} components, got {}",
            value.arity()
        )));
    }

    let mut values = [0.0; MAX_ARITY];
    match value {
        AttributeValue::Scalar(s) => values[0] = *s,
        _ => value.pack(&mut values[..arity]),
    }

    for component in &mut values[..arity] {
        let input = *component;
        *component = datatype.quantize(input).ok_or_else(|| {
            AttributeError::InvalidAttributeValue(format!(
                "{input} is not representable as {datatype:?}"
            ))
        })?;
    }

    Ok(RawComponents {
        values,
        len: arity,
    })
}
