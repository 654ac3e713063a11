use serde::Serialize;

const WORD_BITS: usize = u64::BITS as usize;

/// A set of slot indices stored as a bitmap.
///
/// Trailing zero words are never stored so two masks with the same members compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SlotMask {
    bits: Vec<u64>,
}

impl SlotMask {
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Every index in `0..len`.
    #[must_use]
    pub fn full(len: usize) -> Self {
        (0..len).collect()
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.bits
            .get(index / WORD_BITS)
            .is_some_and(|word| word & (1_u64 << (index % WORD_BITS)) != 0)
    }

    pub fn insert(&mut self, index: usize) {
        let word = index / WORD_BITS;
        if self.bits.len() <= word {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1_u64 << (index % WORD_BITS);
    }

    pub fn remove(&mut self, index: usize) {
        if let Some(word) = self.bits.get_mut(index / WORD_BITS) {
            *word &= !(1_u64 << (index % WORD_BITS));
        }
        while self.bits.last() == Some(&0) {
            self.bits.pop();
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// True if every index in `0..len` is a member.
    #[must_use]
    pub fn covers(&self, len: usize) -> bool {
        (0..len).all(|index| self.contains(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(word_index, word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1_u64 << bit) != 0)
                .map(move |bit| word_index * WORD_BITS + bit)
        })
    }
}

impl FromIterator<usize> for SlotMask {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut mask = Self::new();
        for index in iter {
            mask.insert(index);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::SlotMask;

    #[test]
    fn insert_and_remove_past_one_word() {
        let mut mask = SlotMask::new();
        mask.insert(3);
        mask.insert(70);
        assert!(mask.contains(3));
        assert!(mask.contains(70));
        assert!(!mask.contains(4));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![3, 70]);

        mask.remove(70);
        assert_eq!(mask, [3].into_iter().collect());
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn covers_checks_every_index() {
        let mask = SlotMask::full(5);
        assert!(mask.covers(5));
        assert!(!mask.covers(6));
        assert!(SlotMask::new().covers(0));
    }
}
