//! # Component Sets
//!
//! Per-entity membership bitmask. Bit `k` of word `k / 64` is set while the
//! entity owns [`ComponentKind`] `k`.
//!
//! ## Performance
//!
//! - Has / add / remove: O(1)
//! - Subset match against a required mask: O(words), no per-bit branching

use super::component::ComponentKind;

const WORD_BITS: usize = u64::BITS as usize;

/// Growable bitmask of component kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentSet {
    /// Bitset: 1 = present. 64 kinds per u64.
    words: Vec<u64>,
}

impl ComponentSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates an empty set pre-sized for kinds below `kind_limit`.
    #[must_use]
    pub fn with_kind_limit(kind_limit: usize) -> Self {
        Self {
            words: Vec::with_capacity(kind_limit.div_ceil(WORD_BITS)),
        }
    }

    /// Builds a set from a list of kinds.
    #[must_use]
    pub fn from_kinds(kinds: &[ComponentKind]) -> Self {
        let mut set = Self::new();
        for &kind in kinds {
            set.add_component(kind);
        }
        set
    }

    /// Checks if the kind is present.
    #[inline]
    #[must_use]
    pub fn has_component(&self, kind: ComponentKind) -> bool {
        let index = kind.index();
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| (word >> (index % WORD_BITS)) & 1 == 1)
    }

    /// Marks the kind as present, growing the word sequence if needed.
    #[inline]
    pub fn add_component(&mut self, kind: ComponentKind) {
        let index = kind.index();
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            self.grow(word + 1);
        }
        self.words[word] |= 1 << (index % WORD_BITS);
    }

    /// Clears the kind. Storage is never shrunk.
    #[inline]
    pub fn remove_component(&mut self, kind: ComponentKind) {
        let index = kind.index();
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1 << (index % WORD_BITS));
        }
    }

    /// True iff every listed kind is present.
    #[inline]
    #[must_use]
    pub fn matches(&self, required: &[ComponentKind]) -> bool {
        required.iter().all(|&kind| self.has_component(kind))
    }

    /// True iff every kind in `required` is present in `self`.
    ///
    /// This is the per-entity test run once per system per tick.
    #[inline]
    #[must_use]
    pub fn contains_all(&self, required: &Self) -> bool {
        let mut missing = 0u64;
        for (i, &want) in required.words.iter().enumerate() {
            let have = self.words.get(i).copied().unwrap_or(0);
            missing |= want & !have;
        }
        missing == 0
    }

    /// Number of kinds present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Clears all kinds.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// Number of allocated words.
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Iterates over the present kinds in ascending order.
    ///
    /// Uses `trailing_zeros` to skip clear regions.
    pub fn iter(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                // Bits are only ever set from a u16 kind.
                let index = u16::try_from(word_idx * WORD_BITS + bit).unwrap_or(u16::MAX);
                Some(ComponentKind::new(index))
            })
        })
    }

    /// Doubles the word count until at least `needed` words exist.
    fn grow(&mut self, needed: usize) {
        let mut len = self.words.len().max(1);
        while len < needed {
            len *= 2;
        }
        self.words.resize(len, 0);
    }
}
