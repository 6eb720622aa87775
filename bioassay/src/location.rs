//! Packed spot coordinates
//!
//! A spot position is four integers: the print-tip block position
//! (meta-row, meta-column) and the spot position inside that block
//! (row, column). They are packed into a single `i32` so that two
//! tables can be aligned row-for-row by comparing one column.
//!
//! ```text
//!  31        22 21        12 11     6 5      0
//! +------------+------------+--------+--------+
//! |   column   |    row     | meta c | meta r |
//! +------------+------------+--------+--------+
//! ```

const MASK_6BITS: i32 = 0x3f;
const MASK_10BITS: i32 = 0x3ff;

const SHIFT_META_ROW: u32 = 0;
const SHIFT_META_COLUMN: u32 = 6;
const SHIFT_ROW: u32 = 12;
const SHIFT_COLUMN: u32 = 22;

/// Number of distinct meta-row values that can be packed
pub const MAX_META_ROW: i32 = 64;
/// Number of distinct meta-column values that can be packed
pub const MAX_META_COLUMN: i32 = 64;
/// Number of distinct row values that can be packed
pub const MAX_ROW: i32 = 1024;
/// Number of distinct column values that can be packed
pub const MAX_COLUMN: i32 = 1024;

/// Pack a spot position. Each coordinate is masked to its bit width.
#[inline]
pub fn encode(meta_row: i32, meta_column: i32, row: i32, column: i32) -> i32 {
    ((meta_row & MASK_6BITS) << SHIFT_META_ROW)
        | ((meta_column & MASK_6BITS) << SHIFT_META_COLUMN)
        | ((row & MASK_10BITS) << SHIFT_ROW)
        | ((column & MASK_10BITS) << SHIFT_COLUMN)
}

#[inline]
pub fn meta_row(location: i32) -> i32 {
    (location >> SHIFT_META_ROW) & MASK_6BITS
}

#[inline]
pub fn meta_column(location: i32) -> i32 {
    (location >> SHIFT_META_COLUMN) & MASK_6BITS
}

#[inline]
pub fn row(location: i32) -> i32 {
    (location >> SHIFT_ROW) & MASK_10BITS
}

#[inline]
pub fn column(location: i32) -> i32 {
    (location >> SHIFT_COLUMN) & MASK_10BITS
}

/// Pack four parallel coordinate slices, returning `None` if their
/// lengths differ
pub fn encode_all(
    meta_rows: &[i32],
    meta_columns: &[i32],
    rows: &[i32],
    columns: &[i32],
) -> Option<Vec<i32>> {
    let n = meta_rows.len();
    if meta_columns.len() != n || rows.len() != n || columns.len() != n {
        return None;
    }
    Some(
        (0..n)
            .map(|i| encode(meta_rows[i], meta_columns[i], rows[i], columns[i]))
            .collect(),
    )
}

/// Unpacked location column, one vector per coordinate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Locations {
    pub meta_rows: Vec<i32>,
    pub meta_columns: Vec<i32>,
    pub rows: Vec<i32>,
    pub columns: Vec<i32>,
}

impl Locations {
    pub fn decode(locations: &[i32]) -> Locations {
        Locations {
            meta_rows: locations.iter().map(|&l| meta_row(l)).collect(),
            meta_columns: locations.iter().map(|&l| meta_column(l)).collect(),
            rows: locations.iter().map(|&l| row(l)).collect(),
            columns: locations.iter().map(|&l| column(l)).collect(),
        }
    }

    /// Coordinate `index` (0 = meta-row, 1 = meta-column, 2 = row,
    /// 3 = column) of every spot
    pub fn coordinate(&self, index: usize) -> Option<&[i32]> {
        match index {
            0 => Some(&self.meta_rows),
            1 => Some(&self.meta_columns),
            2 => Some(&self.rows),
            3 => Some(&self.columns),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.meta_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta_rows.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pack_and_unpack() {
        let loc = encode(1, 2, 3, 4);
        assert_eq!(meta_row(loc), 1);
        assert_eq!(meta_column(loc), 2);
        assert_eq!(row(loc), 3);
        assert_eq!(column(loc), 4);
    }

    #[test]
    fn high_columns_use_sign_bit() {
        let loc = encode(MAX_META_ROW - 1, MAX_META_COLUMN - 1, MAX_ROW - 1, MAX_COLUMN - 1);
        assert!(loc < 0);
        assert_eq!(meta_row(loc), 63);
        assert_eq!(meta_column(loc), 63);
        assert_eq!(row(loc), 1023);
        assert_eq!(column(loc), 1023);
    }

    #[test]
    fn values_are_masked() {
        // 65 does not fit in 6 bits and wraps to 1
        let loc = encode(65, 0, 0, 0);
        assert_eq!(meta_row(loc), 1);
        assert_eq!(meta_column(loc), 0);
    }

    #[test]
    fn encode_all_rejects_ragged_input() {
        assert!(encode_all(&[0, 0], &[1, 1], &[2, 2], &[3]).is_none());

        let packed = encode_all(&[0, 1], &[1, 1], &[2, 5], &[3, 9]).unwrap();
        let locs = Locations::decode(&packed);
        assert_eq!(locs.meta_rows, vec![0, 1]);
        assert_eq!(locs.rows, vec![2, 5]);
        assert_eq!(locs.columns, vec![3, 9]);
        assert_eq!(locs.coordinate(1), Some(&[1, 1][..]));
        assert_eq!(locs.coordinate(4), None);
    }
}
