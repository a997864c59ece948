use std::collections::HashMap;

use tracing::debug;

use crate::attribute::{
    decode, encode, AttributeAccess, AttributeValue, ComponentDatatype, InstanceAttribute,
    MAX_ARITY,
};
use crate::error::{AttributeError, BatchError, Result};
use crate::geometry::WallSegment;

use super::range_index::IndexRange;

/// Storage layout of one batched attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: String,
    pub datatype: ComponentDatatype,
    pub arity: usize,
    pub normalize: bool,
    pub access: AttributeAccess,
}

impl AttributeDefinition {
    fn from_instance(name: &str, attribute: &InstanceAttribute) -> Self {
        Self {
            name: name.to_owned(),
            datatype: attribute.datatype,
            arity: attribute.arity(),
            normalize: attribute.normalize,
            access: attribute.access,
        }
    }

    /// Layout of every attribute `segment` carries, in name order.
    #[must_use]
    pub fn layout_of(segment: &WallSegment) -> Vec<AttributeDefinition> {
        segment
            .attributes
            .iter()
            .map(|(name, attribute)| Self::from_instance(name, attribute))
            .collect()
    }
}

/// Columnar per-instance attribute storage for a batch of segments.
///
/// Each attribute owns one column of `instance_count * arity` components.
/// Definitions are fixed at construction.
#[derive(Debug, Clone)]
pub struct BatchTable {
    definitions: Vec<AttributeDefinition>,
    indices: HashMap<String, usize>,
    columns: Vec<Vec<f64>>,
    instance_count: usize,
}

impl BatchTable {
    /// Creates a zero-filled table.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::UnsupportedArity`] for a definition outside
    /// 1 to 4 components, or [`BatchError::DuplicateAttribute`] if two
    /// definitions share a name.
    pub fn new(definitions: Vec<AttributeDefinition>, instance_count: usize) -> Result<Self> {
        let mut indices = HashMap::with_capacity(definitions.len());
        for (index, definition) in definitions.iter().enumerate() {
            if !(1..=MAX_ARITY).contains(&definition.arity) {
                return Err(AttributeError::UnsupportedArity(definition.arity).into());
            }
            if indices.insert(definition.name.clone(), index).is_some() {
                return Err(BatchError::DuplicateAttribute(definition.name.clone()).into());
            }
        }
        let columns = definitions
            .iter()
            .map(|d| vec![0.0; d.arity * instance_count])
            .collect();
        Ok(Self {
            definitions,
            indices,
            columns,
            instance_count,
        })
    }

    /// Builds a table with one instance per segment, filled with each
    /// segment's attribute values.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InconsistentAttributes`] if segments declare
    /// different attribute sets or layouts, or an encoding error if a value
    /// is not representable in its declared type.
    pub fn from_segments(segments: &[WallSegment]) -> Result<Self> {
        let definitions = segments
            .first()
            .map(AttributeDefinition::layout_of)
            .unwrap_or_default();

        let mut table = Self::new(definitions, segments.len())?;
        for (instance, segment) in segments.iter().enumerate() {
            if segment.attributes.len() != table.definitions.len() {
                return Err(BatchError::InconsistentAttributes(format!(
                    "segment {instance} of {} has {} attributes, expected {}",
                    segment.id,
                    segment.attributes.len(),
                    table.definitions.len()
                ))
                .into());
            }
            for (name, attribute) in &segment.attributes {
                let index = table.attribute_index(name).ok_or_else(|| {
                    BatchError::InconsistentAttributes(format!(
                        "segment {instance} of {} declares unknown attribute {name}",
                        segment.id
                    ))
                })?;
                if table.definitions[index] != AttributeDefinition::from_instance(name, attribute) {
                    return Err(BatchError::InconsistentAttributes(format!(
                        "segment {instance} of {} changes the layout of {name}",
                        segment.id
                    ))
                    .into());
                }
                let definition = &table.definitions[index];
                let raw = encode(&attribute.value, definition.datatype, definition.arity)?;
                table.set_raw(instance, index, raw.as_slice())?;
            }
        }

        debug!(
            instances = table.instance_count,
            attributes = table.definitions.len(),
            "built batch table"
        );
        Ok(table)
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn definitions(&self) -> &[AttributeDefinition] {
        &self.definitions
    }

    /// Returns the column index of the attribute called `name`.
    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Returns the raw components stored for `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::IndexOutOfRange`] for an unknown instance or
    /// attribute column.
    pub fn get_raw(&self, instance: usize, attribute: usize) -> Result<&[f64]> {
        let arity = self.arity(attribute)?;
        self.check_instance(instance)?;
        let start = instance * arity;
        Ok(&self.columns[attribute][start..start + arity])
    }

    /// Decodes the value stored for `instance`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_raw`].
    pub fn get_value(&self, instance: usize, attribute: usize) -> Result<AttributeValue> {
        Ok(decode(self.get_raw(instance, attribute)?)?)
    }

    /// Overwrites the raw components stored for `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::IndexOutOfRange`] for an unknown instance or
    /// column, or [`AttributeError::InvalidAttributeValue`] if `raw` does not
    /// match the column's arity.
    pub fn set_raw(&mut self, instance: usize, attribute: usize, raw: &[f64]) -> Result<()> {
        let arity = self.checked_arity(attribute, raw)?;
        self.check_instance(instance)?;
        let start = instance * arity;
        self.columns[attribute][start..start + arity].copy_from_slice(raw);
        Ok(())
    }

    /// Writes `raw` to every instance in `range`. Either every slot is
    /// written or, on error, none is.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::set_raw`], checked for the whole range
    /// before any write.
    pub fn fill_raw(&mut self, range: IndexRange, attribute: usize, raw: &[f64]) -> Result<()> {
        let arity = self.checked_arity(attribute, raw)?;
        self.check_instance(range.last())?;
        let column = &mut self.columns[attribute][range.first() * arity..(range.last() + 1) * arity];
        for slot in column.chunks_exact_mut(arity) {
            slot.copy_from_slice(raw);
        }
        Ok(())
    }

    fn arity(&self, attribute: usize) -> Result<usize> {
        self.definitions
            .get(attribute)
            .map(|d| d.arity)
            .ok_or_else(|| {
                BatchError::IndexOutOfRange {
                    index: attribute,
                    len: self.definitions.len(),
                }
                .into()
            })
    }

    fn checked_arity(&self, attribute: usize, raw: &[f64]) -> Result<usize> {
        let arity = self.arity(attribute)?;
        if raw.len() != arity {
            return Err(AttributeError::InvalidAttributeValue(format!(
                "attribute {} expects {arity} components, got {}",
                self.definitions[attribute].name,
                raw.len()
            ))
            .into());
        }
        Ok(arity)
    }

    fn check_instance(&self, instance: usize) -> Result<()> {
        if instance >= self.instance_count {
            return Err(BatchError::IndexOutOfRange {
                index: instance,
                len: self.instance_count,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::DrapeError;

    fn color_definition() -> AttributeDefinition {
        AttributeDefinition {
            name: "color".to_owned(),
            datatype: ComponentDatatype::UnsignedByte,
            arity: 4,
            normalize: true,
            access: AttributeAccess::ReadWrite,
        }
    }

    fn width_definition() -> AttributeDefinition {
        AttributeDefinition {
            name: "width".to_owned(),
            datatype: ComponentDatatype::Float,
            arity: 1,
            normalize: false,
            access: AttributeAccess::ReadOnly,
        }
    }

    #[test]
    fn new_table_is_zeroed() {
        let table = BatchTable::new(vec![color_definition(), width_definition()], 3).unwrap();
        assert_eq!(table.instance_count(), 3);
        assert_eq!(table.attribute_index("width"), Some(1));
        assert_eq!(table.get_raw(2, 0).unwrap(), &[0.0; 4]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = BatchTable::new(vec![color_definition(), color_definition()], 1);
        assert!(matches!(
            err,
            Err(DrapeError::Batch(BatchError::DuplicateAttribute(_)))
        ));
    }

    #[test]
    fn rejects_unsupported_arity() {
        let mut definition = width_definition();
        definition.arity = 5;
        assert!(matches!(
            BatchTable::new(vec![definition], 1),
            Err(DrapeError::Attribute(AttributeError::UnsupportedArity(5)))
        ));
    }

    #[test]
    fn set_and_get_one_instance() {
        let mut table = BatchTable::new(vec![color_definition()], 3).unwrap();
        table.set_raw(1, 0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(table.get_raw(0, 0).unwrap(), &[0.0; 4]);
        assert_eq!(table.get_raw(1, 0).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            table.get_value(1, 0).unwrap(),
            AttributeValue::from([1.0, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut table = BatchTable::new(vec![width_definition()], 2).unwrap();
        assert!(table.get_raw(2, 0).is_err());
        assert!(table.get_raw(0, 1).is_err());
        assert!(table.set_raw(0, 0, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn fill_range_only_touches_range() {
        let mut table = BatchTable::new(vec![color_definition()], 6).unwrap();
        let range = IndexRange::new(1, 3).unwrap();
        table.fill_raw(range, 0, &[9.0, 8.0, 7.0, 6.0]).unwrap();
        for instance in 0..6 {
            let expected = if range.contains(instance) {
                [9.0, 8.0, 7.0, 6.0]
            } else {
                [0.0; 4]
            };
            assert_eq!(table.get_raw(instance, 0).unwrap(), &expected);
        }
    }

    #[test]
    fn fill_past_end_writes_nothing() {
        let mut table = BatchTable::new(vec![width_definition()], 3).unwrap();
        let range = IndexRange::new(1, 3).unwrap();
        assert!(table.fill_raw(range, 0, &[5.0]).is_err());
        assert_eq!(table.get_raw(1, 0).unwrap(), &[0.0]);
        assert_eq!(table.get_raw(2, 0).unwrap(), &[0.0]);
    }

    #[test]
    fn from_no_segments_is_empty() {
        let table = BatchTable::from_segments(&[]).unwrap();
        assert_eq!(table.instance_count(), 0);
        assert_eq!(table.attribute_count(), 0);
    }
}
