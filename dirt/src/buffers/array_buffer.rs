use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use glam::UVec2;
use log::debug;

use super::{pixel_idx, FragmentBuffer, PixelStore};
use crate::gpu::{DepthConvention, Fragment, OverflowPolicy};
use crate::Config;

/// Fragment buffer with a fixed number of slots per pixel.
///
/// Each pixel owns a counter that's bumped on every append; the value it had
/// before the bump says which slot the fragment goes to. Fragments that
/// don't get a slot are handled according to the configured
/// [`OverflowPolicy`].
#[derive(Debug)]
pub struct ArrayBuffer {
    size: UVec2,
    capacity: usize,
    overflow: OverflowPolicy,
    convention: DepthConvention,
    counters: Vec<AtomicU32>,

    /// Fragments packed through [`Fragment::pack()`]; `capacity` slots per
    /// pixel.
    slots: Vec<AtomicU64>,

    dropped: AtomicU32,
}

impl ArrayBuffer {
    /// Marks a slot that's been reserved (or not even that) but not written
    /// yet; corresponds to a NaN depth, which is never stored.
    const EMPTY: u64 = u64::MAX;

    pub fn new(config: &Config) -> Self {
        let pixels = config.pixels();

        debug!(
            "Allocating array buffer; size={}, capacity={}",
            config.size, config.capacity
        );

        Self {
            size: config.size,
            capacity: config.capacity,
            overflow: config.overflow,
            convention: config.convention,
            counters: (0..pixels).map(|_| AtomicU32::new(0)).collect(),
            slots: (0..(pixels * config.capacity))
                .map(|_| AtomicU64::new(Self::EMPTY))
                .collect(),
            dropped: AtomicU32::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn pixel_slots(&self, idx: usize) -> &[AtomicU64] {
        &self.slots[(idx * self.capacity)..((idx + 1) * self.capacity)]
    }

    /// Puts fragment in place of the farthest one, provided the new fragment
    /// is nearer.
    ///
    /// Slots only ever get replaced with nearer fragments, so when the
    /// compare-exchange fails we can just look again.
    fn replace_max(&self, slots: &[AtomicU64], fragment: Fragment) -> bool {
        let packed = fragment.pack();

        loop {
            let mut farthest: Option<(usize, u64)> = None;

            for (slot_idx, slot) in slots.iter().enumerate() {
                let value = slot.load(Ordering::Acquire);

                if value == Self::EMPTY {
                    farthest = Some((slot_idx, value));
                    break;
                }

                let is_farther = farthest.map_or(true, |(_, farthest)| {
                    self.convention.is_farther(
                        Fragment::unpack(value).depth,
                        Fragment::unpack(farthest).depth,
                    )
                });

                if is_farther {
                    farthest = Some((slot_idx, value));
                }
            }

            let Some((slot_idx, value)) = farthest else {
                return false;
            };

            if value != Self::EMPTY
                && !self
                    .convention
                    .is_farther(Fragment::unpack(value).depth, fragment.depth)
            {
                return false;
            }

            let replaced = slots[slot_idx]
                .compare_exchange(
                    value,
                    packed,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok();

            if replaced {
                if value != Self::EMPTY {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }

                return true;
            }
        }
    }
}

impl FragmentBuffer for ArrayBuffer {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn append(&self, pixel: UVec2, depth: f32, payload: u32) -> bool {
        let Some(idx) = pixel_idx(self.size, pixel) else {
            return false;
        };

        if depth.is_nan() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let fragment = Fragment::new(depth, payload);
        let slots = self.pixel_slots(idx);
        let slot_idx = self.counters[idx].fetch_add(1, Ordering::Relaxed);

        if let Some(slot) = slots.get(slot_idx as usize) {
            let stored = slot
                .compare_exchange(
                    Self::EMPTY,
                    fragment.pack(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok();

            if stored {
                return true;
            }

            // Someone overflowing this pixel took our slot before we got to
            // write it
        }

        match self.overflow {
            OverflowPolicy::Drop => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }

            OverflowPolicy::ReplaceMax => {
                let stored = self.replace_max(slots, fragment);

                if !stored {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }

                stored
            }
        }
    }

    fn gather(&self, pixel: UVec2, store: &mut PixelStore) {
        store.clear();

        let Some(idx) = pixel_idx(self.size, pixel) else {
            return;
        };

        for slot in self.pixel_slots(idx) {
            let value = slot.load(Ordering::Acquire);

            if value != Self::EMPTY {
                store.push(
                    Fragment::unpack(value),
                    self.overflow,
                    self.convention,
                );
            }
        }
    }

    fn begin_frame(&mut self) {
        for counter in &mut self.counters {
            *counter.get_mut() = 0;
        }

        for slot in &mut self.slots {
            *slot.get_mut() = Self::EMPTY;
        }

        *self.dropped.get_mut() = 0;
    }

    fn len(&self) -> usize {
        self.counters
            .iter()
            .map(|counter| {
                (counter.load(Ordering::Relaxed) as usize).min(self.capacity)
            })
            .sum()
    }

    fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use glam::uvec2;

    use super::*;

    fn target(capacity: usize, overflow: OverflowPolicy) -> ArrayBuffer {
        ArrayBuffer::new(
            &Config::new(uvec2(4, 3))
                .with_capacity(capacity)
                .with_overflow(overflow),
        )
    }

    fn gather(target: &ArrayBuffer, pixel: UVec2) -> Vec<f32> {
        let mut store = PixelStore::with_capacity(target.capacity());

        target.gather(pixel, &mut store);

        let mut depths: Vec<_> =
            store.as_slice().iter().map(|frag| frag.depth).collect();

        depths.sort_by(f32::total_cmp);
        depths
    }

    #[test]
    fn append_and_gather() {
        let target = target(4, OverflowPolicy::Drop);

        assert!(target.append(uvec2(1, 2), 0.5, 10));
        assert!(target.append(uvec2(1, 2), 0.25, 20));
        assert!(target.append(uvec2(3, 0), 0.75, 30));

        let mut store = PixelStore::with_capacity(4);

        target.gather(uvec2(1, 2), &mut store);

        assert_eq!(
            [Fragment::new(0.5, 10), Fragment::new(0.25, 20)],
            store.as_slice()
        );

        assert_eq!(vec![0.75], gather(&target, uvec2(3, 0)));
        assert!(gather(&target, uvec2(0, 0)).is_empty());
        assert_eq!(3, target.len());
        assert_eq!(0, target.dropped());
    }

    #[test]
    fn rejects_invalid_fragments() {
        let target = target(4, OverflowPolicy::Drop);

        assert!(!target.append(uvec2(4, 0), 0.5, 0));
        assert!(!target.append(uvec2(0, 3), 0.5, 0));
        assert!(!target.append(uvec2(0, 0), f32::NAN, 0));
        assert_eq!(0, target.len());
    }

    #[test]
    fn drop_policy() {
        let target = target(2, OverflowPolicy::Drop);

        assert!(target.append(uvec2(0, 0), 0.5, 0));
        assert!(target.append(uvec2(0, 0), 0.7, 0));
        assert!(!target.append(uvec2(0, 0), 0.1, 0));

        assert_eq!(vec![0.5, 0.7], gather(&target, uvec2(0, 0)));
        assert_eq!(2, target.len());
        assert_eq!(1, target.dropped());
    }

    #[test]
    fn replace_max_policy() {
        let target = target(3, OverflowPolicy::ReplaceMax);

        for depth in [0.5, 0.9, 0.3] {
            assert!(target.append(uvec2(2, 1), depth, 0));
        }

        assert!(target.append(uvec2(2, 1), 0.1, 0));
        assert!(!target.append(uvec2(2, 1), 0.95, 0));
        assert!(!target.append(uvec2(2, 1), 0.5, 0));

        assert_eq!(vec![0.1, 0.3, 0.5], gather(&target, uvec2(2, 1)));
        assert_eq!(3, target.dropped());
    }

    #[test]
    fn begin_frame() {
        let mut target = target(2, OverflowPolicy::Drop);

        for _ in 0..3 {
            target.append(uvec2(0, 0), 0.5, 0);
        }

        target.begin_frame();

        assert_eq!(0, target.len());
        assert_eq!(0, target.dropped());
        assert!(gather(&target, uvec2(0, 0)).is_empty());
        assert!(target.append(uvec2(0, 0), 0.25, 0));
        assert_eq!(vec![0.25], gather(&target, uvec2(0, 0)));
    }

    #[test]
    fn concurrent_appends() {
        const THREADS: u32 = 8;
        const FRAGMENTS: u32 = 100;

        for overflow in [OverflowPolicy::Drop, OverflowPolicy::ReplaceMax] {
            let target = target(8, overflow);

            thread::scope(|scope| {
                for thread_id in 0..THREADS {
                    let target = &target;

                    scope.spawn(move || {
                        // Farthest first, so that replace-max has some work
                        for i in (0..FRAGMENTS).rev() {
                            let depth = (i * THREADS + thread_id) as f32;

                            target.append(uvec2(1, 1), depth, i);
                            target.append(uvec2(2, 2), depth, i);
                        }
                    });
                }
            });

            for pixel in [uvec2(1, 1), uvec2(2, 2)] {
                let depths = gather(&target, pixel);

                assert_eq!(8, depths.len());

                if let OverflowPolicy::ReplaceMax = overflow {
                    assert_eq!(
                        (0..8).map(|depth| depth as f32).collect::<Vec<_>>(),
                        depths
                    );
                }
            }

            assert_eq!(16, target.len());
        }
    }
}
