use std::{panic, thread};

/// Calls `f` for each row in `0..rows`, spreading the rows over up to
/// `threads` scoped workers; returns results in row order.
///
/// Each worker gets one contiguous chunk of rows.
pub fn for_each_row<T, F>(rows: u32, threads: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(u32) -> T + Sync,
{
    let threads = threads.max(1);

    if threads == 1 || rows <= 1 {
        return (0..rows).map(f).collect();
    }

    let rows_per_thread = ((rows as usize + threads - 1) / threads) as u32;
    let f = &f;

    thread::scope(|scope| {
        let workers: Vec<_> = (0..rows)
            .step_by(rows_per_thread as usize)
            .map(|start| {
                let end = (start + rows_per_thread).min(rows);

                scope.spawn(move || (start..end).map(f).collect::<Vec<_>>())
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|err| panic::resume_unwind(err))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn keeps_row_order() {
        for threads in [1, 2, 3, 8, 100] {
            for rows in [0, 1, 2, 7, 64] {
                let actual = for_each_row(rows, threads, |row| row * 10);
                let expected: Vec<_> = (0..rows).map(|row| row * 10).collect();

                assert_eq!(expected, actual, "threads={threads}, rows={rows}");
            }
        }
    }

    #[test]
    fn visits_each_row_once() {
        let visits = AtomicU32::new(0);

        for_each_row(37, 4, |_| {
            visits.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(37, visits.load(Ordering::Relaxed));
    }
}
