use strata_dtype::Datatype;
use strata_error::{StrataResult, strata_bail, strata_err};

use crate::scalar::{Scalar, ScalarRange};

/// Whether an array stores cells sparsely or densely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// Cells exist only where written.
    Sparse,
    /// Every cell in the domain exists.
    Dense,
}

/// A key column forming part of the array's addressing domain.
///
/// `range` is the maximum domain slot: immutable, fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    /// Column name
    pub name: String,
    /// Declared scalar type
    pub datatype: Datatype,
    /// Immutable maximum-domain bounds
    pub range: ScalarRange,
}

/// A value column. Categorical attributes name their backing enumeration and
/// store indices of the attribute's own (integer) datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Column name
    pub name: String,
    /// On-disk cell type; the index type for categorical attributes
    pub datatype: Datatype,
    /// Name of the backing enumeration, when categorical
    pub enumeration: Option<String>,
}

/// An append-only ordered list of distinct values backing a categorical
/// attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    /// Enumeration name, referenced by attributes
    pub name: String,
    /// Value type of the entries
    pub datatype: Datatype,
    /// Ordered distinct values; cell indices point into this list
    pub values: Vec<Scalar>,
}

impl Enumeration {
    /// Create an empty enumeration.
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            datatype,
            values: Vec::new(),
        }
    }

    /// The position of `value`, if present.
    pub fn position(&self, value: &Scalar) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// A copy of this enumeration with `new_values` appended. Existing value
    /// order never changes.
    pub fn extend(&self, new_values: Vec<Scalar>) -> Self {
        let mut values = self.values.clone();
        values.extend(new_values);
        Self {
            name: self.name.clone(),
            datatype: self.datatype,
            values,
        }
    }
}

/// The optional logical shape of an array: one inclusive range per dimension,
/// each a subset of the maximum domain. Installed once by upgrade, grown
/// monotonically by resize.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentDomain {
    /// Per-dimension ranges, parallel to the schema's dimension list
    pub ranges: Vec<ScalarRange>,
}

/// The storage schema of one array: ordered dimensions and attributes plus
/// array-level flags. Immutable except through explicit schema evolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    /// Sparse or dense
    pub kind: ArrayKind,
    /// Whether duplicate coordinates are allowed
    pub allows_duplicates: bool,
    /// Key columns, in order
    pub dimensions: Vec<Dimension>,
    /// Value columns, in order
    pub attributes: Vec<Attribute>,
    /// Enumerations backing categorical attributes
    pub enumerations: Vec<Enumeration>,
    /// The logical shape, absent on unshaped (legacy) arrays
    pub current_domain: Option<CurrentDomain>,
}

impl ArraySchema {
    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Check whether `name` is a dimension.
    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimension(name).is_some()
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check whether `name` is an attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The on-disk datatype of the named dimension or attribute.
    pub fn column_datatype(&self, name: &str) -> StrataResult<Datatype> {
        if let Some(attr) = self.attribute(name) {
            return Ok(attr.datatype);
        }
        self.dimension(name)
            .map(|d| d.datatype)
            .ok_or_else(|| strata_err!(SchemaViolation: "no dimension or attribute named '{name}'"))
    }

    /// The enumeration name backing `attr_name`, if the attribute is
    /// categorical.
    pub fn enumeration_of(&self, attr_name: &str) -> Option<&str> {
        self.attribute(attr_name)
            .and_then(|a| a.enumeration.as_deref())
    }

    /// Check whether every dimension is 64-bit signed integer.
    pub fn dims_are_int64(&self) -> bool {
        self.dimensions
            .iter()
            .all(|d| d.datatype == Datatype::Int64)
    }

    /// Validate schema invariants at creation time.
    pub fn validate(&self) -> StrataResult<()> {
        if self.dimensions.is_empty() {
            strata_bail!(SchemaViolation: "array schema requires at least one dimension");
        }
        for dim in &self.dimensions {
            if dim.datatype.is_var_sized() {
                continue;
            }
            if dim.range.lo.datatype() != dim.datatype.storage()
                || dim.range.hi.datatype() != dim.datatype.storage()
            {
                strata_bail!(
                    SchemaViolation: "dimension '{}' has {} domain bounds; expected {}",
                    dim.name,
                    dim.range.lo.datatype(),
                    dim.datatype.storage()
                );
            }
        }
        for attr in &self.attributes {
            let Some(enmr_name) = attr.enumeration.as_deref() else {
                continue;
            };
            if attr.datatype.max_index_capacity().is_err() {
                strata_bail!(
                    SchemaViolation: "categorical attribute '{}' has non-integer index type {}",
                    attr.name,
                    attr.datatype
                );
            }
            if !self.enumerations.iter().any(|e| e.name == enmr_name) {
                strata_bail!(
                    SchemaViolation: "categorical attribute '{}' references unknown enumeration '{enmr_name}'",
                    attr.name
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use strata_dtype::Datatype;

    use crate::scalar::{Scalar, ScalarRange};
    use crate::schema::{ArrayKind, ArraySchema, Attribute, Dimension, Enumeration};

    fn schema() -> ArraySchema {
        ArraySchema {
            kind: ArrayKind::Sparse,
            allows_duplicates: false,
            dimensions: vec![Dimension {
                name: "joinid".into(),
                datatype: Datatype::Int64,
                range: ScalarRange::new(0i64, 99i64),
            }],
            attributes: vec![Attribute {
                name: "label".into(),
                datatype: Datatype::UInt8,
                enumeration: Some("label_enum".into()),
            }],
            enumerations: vec![Enumeration::new("label_enum", Datatype::Bytes)],
            current_domain: None,
        }
    }

    #[test]
    fn lookup() {
        let s = schema();
        assert!(s.has_dimension("joinid"));
        assert!(s.has_attribute("label"));
        assert_eq!(s.column_datatype("label").unwrap(), Datatype::UInt8);
        assert_eq!(s.enumeration_of("label"), Some("label_enum"));
        assert!(s.column_datatype("missing").is_err());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn enumeration_extend_preserves_order() {
        let mut e = Enumeration::new("label_enum", Datatype::Bytes);
        e.values = vec![Scalar::from("red"), Scalar::from("blue")];
        let extended = e.extend(vec![Scalar::from("green")]);
        assert_eq!(extended.position(&Scalar::from("blue")), Some(1));
        assert_eq!(extended.position(&Scalar::from("green")), Some(2));
        assert_eq!(e.values.len(), 2);
    }

    #[test]
    fn float_index_type_rejected() {
        let mut s = schema();
        s.attributes[0].datatype = Datatype::Float32;
        assert!(s.validate().is_err());
    }
}
