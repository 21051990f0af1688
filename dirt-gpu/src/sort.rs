use crate::{DepthConvention, FragmentStore, Sortable, MAX_LAYERS};

/// Algorithm used to order a pixel's fragments.
///
/// | algorithm   | best       | average      | worst        |
/// |-------------|------------|--------------|--------------|
/// | `Shell`     | n          | n (log n)^2  | n (log n)^2  |
/// | `Merge`     | n log n    | n log n      | n log n      |
/// | `Insertion` | n          | n^2          | n^2          |
/// | `Selection` | n^2        | n^2          | n^2          |
/// | `Bubble`    | n          | n^2          | n^2          |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortAlgorithm {
    /// Insertion sort for lists up to [`Sorter::threshold`] fragments, shell
    /// sort for longer ones.
    #[default]
    Hybrid,
    Insertion,
    Shell,
    Merge,
    Selection,
    Bubble,
}

impl SortAlgorithm {
    pub fn encode(self) -> u32 {
        match self {
            SortAlgorithm::Hybrid => 0,
            SortAlgorithm::Insertion => 1,
            SortAlgorithm::Shell => 2,
            SortAlgorithm::Merge => 3,
            SortAlgorithm::Selection => 4,
            SortAlgorithm::Bubble => 5,
        }
    }

    pub fn decode(value: u32) -> Self {
        match value {
            1 => SortAlgorithm::Insertion,
            2 => SortAlgorithm::Shell,
            3 => SortAlgorithm::Merge,
            4 => SortAlgorithm::Selection,
            5 => SortAlgorithm::Bubble,
            _ => SortAlgorithm::Hybrid,
        }
    }
}

/// Orders fragments from the nearest to the farthest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sorter {
    pub algorithm: SortAlgorithm,
    pub threshold: usize,
    pub convention: DepthConvention,
}

impl Sorter {
    pub const DEFAULT_THRESHOLD: usize = 16;

    pub fn new(
        algorithm: SortAlgorithm,
        threshold: usize,
        convention: DepthConvention,
    ) -> Self {
        Self {
            algorithm,
            threshold,
            convention,
        }
    }

    pub fn sort<F>(&self, items: &mut [F])
    where
        F: Sortable + Default,
    {
        let convention = self.convention;

        match self.algorithm {
            SortAlgorithm::Hybrid => {
                if items.len() <= self.threshold {
                    insertion_sort(items, convention);
                } else {
                    shell_sort(items, convention);
                }
            }

            SortAlgorithm::Insertion => {
                insertion_sort(items, convention);
            }

            SortAlgorithm::Shell => {
                shell_sort(items, convention);
            }

            SortAlgorithm::Merge => {
                let mut scratch = [F::default(); MAX_LAYERS];

                if items.len() <= scratch.len() {
                    merge_sort(items, &mut scratch, convention);
                } else {
                    // Lists this long can only come from a caller bypassing
                    // `MAX_LAYERS`; there's no scratch space for them
                    shell_sort(items, convention);
                }
            }

            SortAlgorithm::Selection => {
                selection_sort(items, convention);
            }

            SortAlgorithm::Bubble => {
                bubble_sort(items, convention);
            }
        }
    }

    pub fn sort_store<F, const N: usize>(&self, store: &mut FragmentStore<F, N>)
    where
        F: Sortable + Default,
    {
        self.sort(store.as_mut_slice());
    }

    pub fn is_sorted<F>(&self, items: &[F]) -> bool
    where
        F: Sortable,
    {
        items.windows(2).all(|pair| {
            !self.convention.is_farther(pair[0].key(), pair[1].key())
        })
    }
}

impl Default for Sorter {
    fn default() -> Self {
        Self::new(
            Default::default(),
            Self::DEFAULT_THRESHOLD,
            Default::default(),
        )
    }
}

pub fn insertion_sort<F>(items: &mut [F], convention: DepthConvention)
where
    F: Sortable,
{
    for j in 1..items.len() {
        let item = items[j];
        let mut i = j;

        while i > 0 && convention.is_farther(items[i - 1].key(), item.key()) {
            items[i] = items[i - 1];
            i -= 1;
        }

        items[i] = item;
    }
}

/// Shell sort with gaps going `n / 2`, then `gap / 2.2` (rounded) down to
/// one.
pub fn shell_sort<F>(items: &mut [F], convention: DepthConvention)
where
    F: Sortable,
{
    let mut gap = items.len() >> 1;

    while gap > 0 {
        for i in gap..items.len() {
            let item = items[i];
            let mut j = i;

            while j >= gap
                && convention.is_farther(items[j - gap].key(), item.key())
            {
                items[j] = items[j - gap];
                j -= gap;
            }

            items[j] = item;
        }

        gap = (gap as f32 / 2.2 + 0.5) as usize;
    }
}

/// Bottom-up merge sort; `scratch` must be at least as long as `items`.
pub fn merge_sort<F>(
    items: &mut [F],
    scratch: &mut [F],
    convention: DepthConvention,
) where
    F: Sortable,
{
    let len = items.len();
    let mut width = 1;

    while width < len {
        let mut start = 0;

        while start + width < len {
            let mid = start + width;
            let end = (mid + width).min(len);

            merge(&mut items[start..end], width, scratch, convention);
            start += width << 1;
        }

        width <<= 1;
    }
}

/// Merges two sorted runs: `items[..mid]` and `items[mid..]`.
fn merge<F>(
    items: &mut [F],
    mid: usize,
    scratch: &mut [F],
    convention: DepthConvention,
) where
    F: Sortable,
{
    let left = &mut scratch[..mid];

    left.copy_from_slice(&items[..mid]);

    let mut i = 0;
    let mut j = mid;

    for k in 0..items.len() {
        let take_left = j >= items.len()
            || (i < mid
                && !convention.is_farther(left[i].key(), items[j].key()));

        if take_left {
            items[k] = left[i];
            i += 1;
        } else {
            items[k] = items[j];
            j += 1;
        }
    }
}

pub fn selection_sort<F>(items: &mut [F], convention: DepthConvention)
where
    F: Sortable,
{
    for j in 0..items.len().saturating_sub(1) {
        let mut nearest = j;

        for i in (j + 1)..items.len() {
            if convention.is_farther(items[nearest].key(), items[i].key()) {
                nearest = i;
            }
        }

        items.swap(nearest, j);
    }
}

pub fn bubble_sort<F>(items: &mut [F], convention: DepthConvention)
where
    F: Sortable,
{
    for i in (0..items.len().saturating_sub(1)).rev() {
        for j in 0..=i {
            if convention.is_farther(items[j].key(), items[j + 1].key()) {
                items.swap(j, j + 1);
            }
        }
    }
}

/// Removes consecutive fragments sharing the same key, keeping the first one
/// of each run; returns the number of fragments left at the beginning of
/// `items`.
///
/// Expects `items` to be sorted already - with unsorted input only adjacent
/// duplicates are removed.
pub fn dedup<F>(items: &mut [F]) -> usize
where
    F: Sortable,
{
    if items.is_empty() {
        return 0;
    }

    let mut last = 0;

    for i in 1..items.len() {
        if items[i].key() != items[last].key() {
            last += 1;
            items[last] = items[i];
        }
    }

    last + 1
}

/// Removes fragments identical to an earlier one, keeping fragments that
/// only share the key (e.g. two primitives at the same depth); returns the
/// number of fragments left at the beginning of `items`.
///
/// Expects `items` to be sorted already. Fragments sharing a key don't have
/// to be adjacent to their duplicates, as long as they sit in the same run of
/// equal keys.
pub fn dedup_identical<F>(items: &mut [F]) -> usize
where
    F: Sortable + PartialEq,
{
    let mut len = 0;

    // Start of the run of equal keys the last kept fragment belongs to
    let mut run = 0;

    for i in 0..items.len() {
        let item = items[i];

        if len > 0 && items[len - 1].key() != item.key() {
            run = len;
        }

        if !items[run..len].contains(&item) {
            items[len] = item;
            len += 1;
        }
    }

    len
}
