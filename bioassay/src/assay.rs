use super::*;
use crate::location::{self, Locations};

pub const FIELD_NAME_ID: &str = "id";
pub const FIELD_NAME_DESCRIPTION: &str = "description";
pub const FIELD_NAME_RED: &str = "red";
pub const FIELD_NAME_GREEN: &str = "green";
pub const FIELD_NAME_FLAG: &str = "flags";
pub const FIELD_NAME_RATIO: &str = "ratio";
pub const FIELD_NAME_BRIGHT: &str = "bright";
pub const FIELD_NAME_A: &str = "a";
pub const FIELD_NAME_M: &str = "m";
pub const FIELD_NAME_STD_DEV_A: &str = "stddeva";
pub const FIELD_NAME_STD_DEV_M: &str = "stddevm";
/// Packed spot positions, see [`location`]
pub const FIELD_NAME_LOCATION: &str = "location";

/// Free-form key/value metadata attached to a [`BioAssay`], typically the
/// optional header records of the file it was read from
pub type Annotation = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BioAssayError {
    #[error("field `{field}` has {actual} values but the bioassay has {expected} rows")]
    SizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("no field named `{0}`")]
    MissingField(String),

    #[error("field `{0}` already exists")]
    FieldExists(String),

    #[error("cannot merge bioassays: {0}")]
    MergeMismatch(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Double,
    Text,
}

/// Homogeneously typed values of one field, one value per spot
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Ints(Vec<i32>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
}

impl Column {
    /// Empty column whose variant matches `ty`
    pub fn with_capacity(ty: FieldType, capacity: usize) -> Column {
        match ty {
            FieldType::Int => Column::Ints(Vec::with_capacity(capacity)),
            FieldType::Double => Column::Doubles(Vec::with_capacity(capacity)),
            FieldType::Text => Column::Strings(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Ints(v) => v.len(),
            Column::Doubles(v) => v.len(),
            Column::Strings(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Column::Ints(_) => FieldType::Int,
            Column::Doubles(_) => FieldType::Double,
            Column::Strings(_) => FieldType::Text,
        }
    }
}

impl From<Vec<i32>> for Column {
    fn from(v: Vec<i32>) -> Column {
        Column::Ints(v)
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Column {
        Column::Doubles(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Column {
        Column::Strings(v)
    }
}

/// Column-oriented measurements of one microarray.
///
/// Every column has the same length, the number of spots. The invariant is
/// checked each time a column is set, so a [`BioAssay`] can never hold
/// ragged data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BioAssay {
    pub name: String,
    pub annotation: Annotation,
    order: Vec<String>,
    columns: HashMap<String, Column>,
}

impl BioAssay {
    pub fn new() -> BioAssay {
        BioAssay::default()
    }

    /// Number of spots, 0 for a bioassay without any field
    pub fn len(&self) -> usize {
        self.order
            .first()
            .and_then(|f| self.columns.get(f))
            .map(Column::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names, in the order they were first set
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.columns.get(field).map(Column::field_type)
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.get(field)
    }

    /// Set or replace a field.
    ///
    /// Fails if any other field exists with a different number of values.
    /// A replaced field keeps its position in [`BioAssay::fields`].
    pub fn set_column<S: Into<String>>(&mut self, field: S, data: Column) -> Result<(), BioAssayError> {
        let field = field.into();
        if let Some(other) = self.order.iter().find(|f| **f != field) {
            let expected = self.columns[other].len();
            if data.len() != expected {
                return Err(BioAssayError::SizeMismatch {
                    field,
                    expected,
                    actual: data.len(),
                });
            }
        }
        if self.columns.insert(field.clone(), data).is_none() {
            self.order.push(field);
        }
        Ok(())
    }

    pub fn set_ints<S: Into<String>>(&mut self, field: S, data: Vec<i32>) -> Result<(), BioAssayError> {
        self.set_column(field, Column::Ints(data))
    }

    pub fn set_doubles<S: Into<String>>(&mut self, field: S, data: Vec<f64>) -> Result<(), BioAssayError> {
        self.set_column(field, Column::Doubles(data))
    }

    pub fn set_strings<S: Into<String>>(&mut self, field: S, data: Vec<String>) -> Result<(), BioAssayError> {
        self.set_column(field, Column::Strings(data))
    }

    pub fn ints(&self, field: &str) -> Option<&[i32]> {
        match self.columns.get(field)? {
            Column::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn doubles(&self, field: &str) -> Option<&[f64]> {
        match self.columns.get(field)? {
            Column::Doubles(v) => Some(v),
            _ => None,
        }
    }

    pub fn strings(&self, field: &str) -> Option<&[String]> {
        match self.columns.get(field)? {
            Column::Strings(v) => Some(v),
            _ => None,
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Column> {
        let data = self.columns.remove(field)?;
        self.order.retain(|f| f != field);
        Some(data)
    }

    /// Rename a field in place
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), BioAssayError> {
        if from == to {
            return Ok(());
        }
        if self.columns.contains_key(to) {
            return Err(BioAssayError::FieldExists(to.into()));
        }
        let data = self
            .columns
            .remove(from)
            .ok_or_else(|| BioAssayError::MissingField(from.into()))?;
        self.columns.insert(to.into(), data);
        for f in self.order.iter_mut().filter(|f| f.as_str() == from) {
            *f = to.into();
        }
        Ok(())
    }

    /// Pack four coordinate slices into the `location` field
    pub fn set_locations(
        &mut self,
        meta_rows: &[i32],
        meta_columns: &[i32],
        rows: &[i32],
        columns: &[i32],
    ) -> Result<(), BioAssayError> {
        let packed = location::encode_all(meta_rows, meta_columns, rows, columns).ok_or_else(|| {
            BioAssayError::SizeMismatch {
                field: FIELD_NAME_LOCATION.into(),
                expected: meta_rows.len(),
                actual: [meta_columns.len(), rows.len(), columns.len()]
                    .iter()
                    .copied()
                    .find(|&n| n != meta_rows.len())
                    .unwrap_or(0),
            }
        })?;
        self.set_ints(FIELD_NAME_LOCATION, packed)
    }

    pub fn locations(&self) -> Option<&[i32]> {
        self.ints(FIELD_NAME_LOCATION)
    }

    pub fn unpack_locations(&self) -> Option<Locations> {
        self.locations().map(Locations::decode)
    }

    pub fn ids(&self) -> Option<&[String]> {
        self.strings(FIELD_NAME_ID)
    }

    pub fn descriptions(&self) -> Option<&[String]> {
        self.strings(FIELD_NAME_DESCRIPTION)
    }

    pub fn reds(&self) -> Option<&[i32]> {
        self.ints(FIELD_NAME_RED)
    }

    pub fn greens(&self) -> Option<&[i32]> {
        self.ints(FIELD_NAME_GREEN)
    }

    pub fn flags(&self) -> Option<&[i32]> {
        self.ints(FIELD_NAME_FLAG)
    }

    pub fn set_ids(&mut self, ids: Vec<String>) -> Result<(), BioAssayError> {
        self.set_strings(FIELD_NAME_ID, ids)
    }

    pub fn set_descriptions(&mut self, descriptions: Vec<String>) -> Result<(), BioAssayError> {
        self.set_strings(FIELD_NAME_DESCRIPTION, descriptions)
    }

    pub fn set_reds(&mut self, reds: Vec<i32>) -> Result<(), BioAssayError> {
        self.set_ints(FIELD_NAME_RED, reds)
    }

    pub fn set_greens(&mut self, greens: Vec<i32>) -> Result<(), BioAssayError> {
        self.set_ints(FIELD_NAME_GREEN, greens)
    }

    pub fn set_flags(&mut self, flags: Vec<i32>) -> Result<(), BioAssayError> {
        self.set_ints(FIELD_NAME_FLAG, flags)
    }

    /// Positional, column-wise merge of `other` into `self`.
    ///
    /// Both bioassays must describe the same spots: same number of rows,
    /// and identical `location` and `id` fields wherever both carry them.
    /// Fields already present in `self` are kept as they are.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// # use bioassay::*;
    /// let mut a = BioAssay::new();
    /// a.set_greens(vec![10, 20])?;
    /// let mut b = BioAssay::new();
    /// b.set_reds(vec![30, 40])?;
    ///
    /// let merged = a.merge(b)?;
    /// assert_eq!(merged.reds(), Some(&[30, 40][..]));
    /// ```
    pub fn merge(mut self, other: BioAssay) -> Result<BioAssay, BioAssayError> {
        if self.field_count() != 0 && other.field_count() != 0 {
            if self.len() != other.len() {
                return Err(BioAssayError::MergeMismatch(format!(
                    "{} rows against {} rows",
                    self.len(),
                    other.len()
                )));
            }
            if let (Some(a), Some(b)) = (self.locations(), other.locations()) {
                if a != b {
                    return Err(BioAssayError::MergeMismatch("locations differ".into()));
                }
            }
            if let (Some(a), Some(b)) = (self.ids(), other.ids()) {
                if a != b {
                    return Err(BioAssayError::MergeMismatch("identifiers differ".into()));
                }
            }
        }

        let BioAssay {
            annotation,
            mut order,
            mut columns,
            ..
        } = other;

        for field in order.drain(..) {
            if self.contains(&field) {
                continue;
            }
            if let Some(data) = columns.remove(&field) {
                self.set_column(field, data)?;
            }
        }
        for (key, value) in annotation {
            self.annotation.entry(key).or_insert(value);
        }
        Ok(self)
    }

    /// Fold `next` into an optional accumulator
    pub fn merge_optional(acc: Option<BioAssay>, next: BioAssay) -> Result<BioAssay, BioAssayError> {
        match acc {
            Some(acc) => acc.merge(next),
            None => Ok(next),
        }
    }
}
