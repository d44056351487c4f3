use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Dirty item-slot count and total value-byte count for a transaction or a
/// single holder's reservation.
///
/// Signed because tracking the deletion of already-dirty items contributes a
/// negative delta at [`track`](crate::TransactionManager::track) time;
/// reservation counts themselves are always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemCount {
    pub items: i64,
    pub vals: i64,
}

impl ItemCount {
    pub const ZERO: Self = Self { items: 0, vals: 0 };

    pub const fn new(items: i64, vals: i64) -> Self {
        Self { items, vals }
    }

    /// `true` if both components are within the other's, componentwise.
    #[inline]
    pub fn fits_within(&self, other: &ItemCount) -> bool {
        self.items <= other.items && self.vals <= other.vals
    }
}

impl Add for ItemCount {
    type Output = ItemCount;
    fn add(self, rhs: ItemCount) -> ItemCount {
        ItemCount::new(self.items + rhs.items, self.vals + rhs.vals)
    }
}

impl AddAssign for ItemCount {
    fn add_assign(&mut self, rhs: ItemCount) {
        self.items += rhs.items;
        self.vals += rhs.vals;
    }
}

impl Sub for ItemCount {
    type Output = ItemCount;
    fn sub(self, rhs: ItemCount) -> ItemCount {
        ItemCount::new(self.items - rhs.items, self.vals - rhs.vals)
    }
}

impl SubAssign for ItemCount {
    fn sub_assign(&mut self, rhs: ItemCount) {
        self.items -= rhs.items;
        self.vals -= rhs.vals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_is_componentwise() {
        let reserved = ItemCount::new(10, 1024);
        assert!(ItemCount::new(10, 1024).fits_within(&reserved));
        assert!(ItemCount::new(5, 1024).fits_within(&reserved));
        assert!(!ItemCount::new(11, 0).fits_within(&reserved));
        assert!(!ItemCount::new(0, 1025).fits_within(&reserved));
    }

    #[test]
    fn add_and_sub_round_trip() {
        let a = ItemCount::new(3, 40);
        let b = ItemCount::new(5, 6);
        assert_eq!((a + b) - b, a);
    }
}
