/// A growable bit-set over atom indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomSelection {
    words: Vec<u64>,
}

const WORD_BITS: usize = 64;

impl AtomSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every index in `0..count`.
    pub fn all(count: usize) -> Self {
        let mut selection = Self::new();
        for i in 0..count {
            selection.insert(i);
        }
        selection
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut selection = Self::new();
        for i in indices {
            selection.insert(i);
        }
        selection
    }

    pub fn insert(&mut self, index: usize) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % WORD_BITS);
    }

    pub fn remove(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1 << (index % WORD_BITS));
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| word & (1 << (index % WORD_BITS)) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &bits)| {
            (0..WORD_BITS)
                .filter(move |b| bits & (1 << b) != 0)
                .map(move |b| w * WORD_BITS + b)
        })
    }
}

impl FromIterator<usize> for AtomSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}
