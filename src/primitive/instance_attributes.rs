use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::attribute::{encode, AttributeAccess, AttributeValue, ComponentDatatype};
use crate::batch::{BatchTable, IndexRange};
use crate::error::{AttributeError, BatchError, Result};
use crate::geometry::LineId;

/// Reads and writes one batched attribute column for a segment range.
#[derive(Debug, Clone, Copy)]
struct AttributeAccessor {
    index: usize,
    datatype: ComponentDatatype,
    arity: usize,
    access: AttributeAccess,
}

impl AttributeAccessor {
    fn get(&self, table: &BatchTable, range: IndexRange) -> Result<AttributeValue> {
        table.get_value(range.first(), self.index)
    }

    fn set(
        &self,
        name: &str,
        table: &mut BatchTable,
        range: IndexRange,
        value: &AttributeValue,
    ) -> Result<()> {
        if self.access == AttributeAccess::ReadOnly {
            return Err(AttributeError::ReadOnlyAttribute(name.to_owned()).into());
        }
        let raw = encode(value, self.datatype, self.arity)?;
        table.fill_raw(range, self.index, raw.as_slice())
    }
}

/// Single-instance view of a logical line over its segment range.
///
/// Reads come from the first segment of the range; writes go to every
/// segment, so all segments of the line hold identical values for writable
/// attributes. The view does not keep the batch alive.
#[derive(Debug)]
pub struct InstanceAttributes {
    id: LineId,
    range: IndexRange,
    table: Weak<RefCell<BatchTable>>,
    accessors: BTreeMap<String, AttributeAccessor>,
}

impl InstanceAttributes {
    pub(crate) fn new(id: LineId, range: IndexRange, table: &Rc<RefCell<BatchTable>>) -> Self {
        let accessors = table
            .borrow()
            .definitions()
            .iter()
            .enumerate()
            .map(|(index, definition)| {
                (
                    definition.name.clone(),
                    AttributeAccessor {
                        index,
                        datatype: definition.datatype,
                        arity: definition.arity,
                        access: definition.access,
                    },
                )
            })
            .collect();
        Self {
            id,
            range,
            table: Rc::downgrade(table),
            accessors,
        }
    }

    #[must_use]
    pub fn id(&self) -> &LineId {
        &self.id
    }

    #[must_use]
    pub fn range(&self) -> IndexRange {
        self.range
    }

    /// Names of the attributes this view exposes.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.accessors.keys().map(String::as_str)
    }

    /// Returns whether `name` can be written, or `None` if it is not declared.
    #[must_use]
    pub fn is_writable(&self, name: &str) -> Option<bool> {
        self.accessors
            .get(name)
            .map(|a| a.access == AttributeAccess::ReadWrite)
    }

    /// Reads the value of `name` for this line.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::UnknownAttribute`] for an undeclared name or
    /// [`BatchError::BatchReleased`] if the batch no longer exists.
    pub fn get(&self, name: &str) -> Result<AttributeValue> {
        let accessor = self.accessor(name)?;
        let table = self.table()?;
        let table = table.try_borrow().map_err(|_| BatchError::BatchBorrowed)?;
        accessor.get(&table, self.range)
    }

    /// Writes `value` to every segment of this line.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::ReadOnlyAttribute`] for derived attributes,
    /// [`AttributeError::InvalidAttributeValue`] if the value does not fit the
    /// attribute, or the errors of [`Self::get`]. The store is unchanged on
    /// error.
    pub fn set(&self, name: &str, value: impl Into<AttributeValue>) -> Result<()> {
        let accessor = self.accessor(name)?;
        let table = self.table()?;
        let mut table = table
            .try_borrow_mut()
            .map_err(|_| BatchError::BatchBorrowed)?;
        accessor.set(name, &mut table, self.range, &value.into())
    }

    /// Writes a value given as 1 to 4 raw components.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidAttributeValue`] if `components` is
    /// empty or longer than 4, otherwise as [`Self::set`].
    pub fn set_components(&self, name: &str, components: &[f64]) -> Result<()> {
        let value = AttributeValue::try_from(components)?;
        self.set(name, value)
    }

    fn accessor(&self, name: &str) -> Result<AttributeAccessor> {
        self.accessors
            .get(name)
            .copied()
            .ok_or_else(|| AttributeError::UnknownAttribute(name.to_owned()).into())
    }

    fn table(&self) -> Result<Rc<RefCell<BatchTable>>> {
        self.table
            .upgrade()
            .ok_or_else(|| BatchError::BatchReleased.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::batch::AttributeDefinition;
    use crate::error::DrapeError;

    fn table(instances: usize) -> Rc<RefCell<BatchTable>> {
        let definitions = vec![
            AttributeDefinition {
                name: "color".to_owned(),
                datatype: ComponentDatatype::UnsignedByte,
                arity: 4,
                normalize: true,
                access: AttributeAccess::ReadWrite,
            },
            AttributeDefinition {
                name: "width".to_owned(),
                datatype: ComponentDatatype::Float,
                arity: 1,
                normalize: false,
                access: AttributeAccess::ReadOnly,
            },
        ];
        Rc::new(RefCell::new(BatchTable::new(definitions, instances).unwrap()))
    }

    fn view(table: &Rc<RefCell<BatchTable>>, first: usize, last: usize) -> InstanceAttributes {
        InstanceAttributes::new(LineId::from("x"), IndexRange::new(first, last).unwrap(), table)
    }

    #[test]
    fn exposes_declared_names() {
        let t = table(3);
        let v = view(&t, 0, 2);
        assert_eq!(v.names().collect::<Vec<_>>(), ["color", "width"]);
        assert_eq!(v.is_writable("color"), Some(true));
        assert_eq!(v.is_writable("width"), Some(false));
        assert_eq!(v.is_writable("nope"), None);
    }

    #[test]
    fn set_writes_whole_range_only() {
        let t = table(8);
        let v = view(&t, 2, 6);
        v.set("color", [255.0, 0.0, 0.0, 255.0]).unwrap();

        assert_eq!(v.get("color").unwrap(), AttributeValue::from([255.0, 0.0, 0.0, 255.0]));
        let table = t.borrow();
        for instance in 0..8 {
            let raw = table.get_raw(instance, 0).unwrap();
            if (2..=6).contains(&instance) {
                assert_eq!(raw, &[255.0, 0.0, 0.0, 255.0]);
            } else {
                assert_eq!(raw, &[0.0; 4]);
            }
        }
    }

    #[test]
    fn read_only_attribute_rejects_writes() {
        let t = table(2);
        let v = view(&t, 0, 1);
        assert!(matches!(
            v.set("width", 3.0),
            Err(DrapeError::Attribute(AttributeError::ReadOnlyAttribute(_)))
        ));
    }

    #[test]
    fn rejected_set_leaves_store_unchanged() {
        let t = table(4);
        let v = view(&t, 0, 3);
        v.set("color", [1.0, 2.0, 3.0, 4.0]).unwrap();

        assert!(v.set("color", [1.0, 2.0, 3.0]).is_err());
        assert!(v.set("color", [300.0, 0.0, 0.0, 0.0]).is_err());
        assert!(v.set_components("color", &[]).is_err());
        assert!(v.set_components("color", &[0.0; 5]).is_err());

        for instance in 0..4 {
            assert_eq!(t.borrow().get_raw(instance, 0).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn unknown_attribute() {
        let t = table(1);
        let v = view(&t, 0, 0);
        assert!(matches!(
            v.get("missing"),
            Err(DrapeError::Attribute(AttributeError::UnknownAttribute(_)))
        ));
    }

    #[test]
    fn dropped_batch_is_reported() {
        let t = table(1);
        let v = view(&t, 0, 0);
        drop(t);
        assert!(matches!(
            v.get("color"),
            Err(DrapeError::Batch(BatchError::BatchReleased))
        ));
    }

    #[test]
    fn set_components_accepts_slices() {
        let t = table(2);
        let v = view(&t, 0, 1);
        v.set_components("color", &[0.0, 128.0, 255.0, 255.0]).unwrap();
        assert_eq!(
            v.get("color").unwrap().as_slice(),
            &[0.0, 128.0, 255.0, 255.0]
        );
    }
}
