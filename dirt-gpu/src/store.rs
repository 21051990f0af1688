use crate::{DepthConvention, Sortable};

/// What happens to fragments arriving at an already-full store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverflowPolicy {
    /// Excess fragments are lost; O(1) per fragment.
    #[default]
    Drop,

    /// The farthest stored fragment gets replaced if the incoming one is
    /// nearer, so the store always keeps the nearest fragments; O(capacity)
    /// per overflowing fragment.
    ReplaceMax,
}

impl OverflowPolicy {
    pub fn encode(self) -> u32 {
        match self {
            OverflowPolicy::Drop => 0,
            OverflowPolicy::ReplaceMax => 1,
        }
    }

    pub fn decode(value: u32) -> Self {
        if value == 1 {
            OverflowPolicy::ReplaceMax
        } else {
            OverflowPolicy::Drop
        }
    }
}

/// Fixed-capacity list of fragments belonging to a single pixel.
///
/// `N` is the size of the backing array, while `capacity` (at most `N`) is
/// the number of fragments the store actually accepts - this way the same
/// store type can serve differently configured buffers.
#[derive(Clone, Copy, Debug)]
pub struct FragmentStore<F, const N: usize> {
    items: [F; N],
    len: usize,
    capacity: usize,
}

impl<F, const N: usize> FragmentStore<F, N>
where
    F: Sortable + Default,
{
    pub fn new() -> Self {
        Self::with_capacity(N)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: [F::default(); N],
            len: 0,
            capacity: capacity.min(N),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Shortens the store, e.g. after its fragments got deduplicated.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    pub fn get(&self, layer: usize) -> Option<F> {
        self.as_slice().get(layer).copied()
    }

    pub fn as_slice(&self) -> &[F] {
        &self.items[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.items[..self.len]
    }

    /// Inserts fragment, applying `policy` if the store is already full;
    /// returns whether the fragment got stored.
    pub fn push(
        &mut self,
        fragment: F,
        policy: OverflowPolicy,
        convention: DepthConvention,
    ) -> bool {
        if !self.is_full() {
            self.items[self.len] = fragment;
            self.len += 1;

            return true;
        }

        match policy {
            OverflowPolicy::Drop => false,

            OverflowPolicy::ReplaceMax => {
                let Some(farthest) = self.farthest(convention) else {
                    return false;
                };

                let farthest_key = self.items[farthest].key();

                if convention.is_farther(farthest_key, fragment.key()) {
                    self.items[farthest] = fragment;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Returns index of the farthest stored fragment.
    pub fn farthest(&self, convention: DepthConvention) -> Option<usize> {
        let items = self.as_slice();

        if items.is_empty() {
            return None;
        }

        let mut farthest = 0;

        for (idx, item) in items.iter().enumerate().skip(1) {
            if convention.is_farther(item.key(), items[farthest].key()) {
                farthest = idx;
            }
        }

        Some(farthest)
    }
}

impl<F, const N: usize> Default for FragmentStore<F, N>
where
    F: Sortable + Default,
{
    fn default() -> Self {
        Self::new()
    }
}
