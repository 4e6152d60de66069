//! Live progress reporting.
//!
//! Workers add to a shared [`ProgressCounter`]; a [`ProgressMonitor`] thread
//! reads it on a fixed interval and redraws a text bar. The counter is for
//! display only and never feeds into the estimate.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::warn;

/// Width of the bar between the brackets.
pub const DEFAULT_BAR_WIDTH: usize = 70;

/// Samples processed so far, shared by every worker.
#[derive(Debug)]
pub struct ProgressCounter {
    done: AtomicU64,
    total: u64,
}

impl ProgressCounter {
    pub fn new(total: u64) -> Self {
        Self {
            done: AtomicU64::new(0),
            total,
        }
    }

    /// Records `n` more processed samples.
    #[inline]
    pub fn add(&self, n: u64) {
        let before = self.done.fetch_add(n, Ordering::Relaxed);
        debug_assert!(before + n <= self.total, "progress overran total");
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.get().min(self.total) as f64) / (self.total as f64)
    }
}

/// Renders `[=====>    ] 42%` for `current` out of `total`.
pub fn render_bar(current: u64, total: u64, width: usize) -> String {
    let current = current.min(total);
    let (pos, percent) = if total == 0 {
        (width, 100)
    } else {
        (
            (current as u128 * width as u128 / total as u128) as usize,
            (current as u128 * 100 / total as u128) as u64,
        )
    };

    let mut bar = String::with_capacity(width + 8);
    bar.push('[');
    for i in 0..width {
        bar.push(match i.cmp(&pos) {
            std::cmp::Ordering::Less => '=',
            std::cmp::Ordering::Equal => '>',
            std::cmp::Ordering::Greater => ' ',
        });
    }
    bar.push_str(&format!("] {percent}%"));
    bar
}

/// Redraws the progress bar on a dedicated thread until stopped.
///
/// The monitor stops when [`ProgressMonitor::finish`] is called, not when the
/// counter reaches its total. Output errors are ignored.
pub struct ProgressMonitor<W> {
    stop: Sender<()>,
    handle: JoinHandle<W>,
}

impl<W: Write + Send + 'static> ProgressMonitor<W> {
    pub fn spawn(counter: Arc<ProgressCounter>, interval: Duration, mut out: W) -> Self {
        let (stop, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => draw(&mut out, &counter),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            draw(&mut out, &counter);
            let _ = writeln!(out);
            let _ = out.flush();
            out
        });

        Self { stop, handle }
    }

    /// Stops the monitor after one last frame and hands back its writer.
    pub fn finish(self) -> Option<W> {
        let _ = self.stop.send(());
        match self.handle.join() {
            Ok(out) => Some(out),
            Err(_) => {
                warn!("progress monitor panicked");
                None
            }
        }
    }
}

fn draw<W: Write>(out: &mut W, counter: &ProgressCounter) {
    let bar = render_bar(counter.get(), counter.total(), DEFAULT_BAR_WIDTH);
    let _ = write!(out, "\r{bar}");
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0, 10, 10), "[>         ] 0%");
        assert_eq!(render_bar(5, 10, 10), "[=====>    ] 50%");
        assert_eq!(render_bar(10, 10, 10), "[==========] 100%");
    }

    #[test]
    fn test_render_bar_clamps() {
        assert_eq!(render_bar(15, 10, 4), "[====] 100%");
        assert_eq!(render_bar(0, 0, 4), "[====] 100%");
    }

    #[test]
    fn test_counter_concurrent_adds() {
        let counter = Arc::new(ProgressCounter::new(8 * 10_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        counter.add(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), 80_000);
        assert_eq!(counter.fraction(), 1.0);
    }

    #[test]
    fn test_monitor_draws_final_frame() {
        let counter = Arc::new(ProgressCounter::new(100));
        let monitor = ProgressMonitor::spawn(
            Arc::clone(&counter),
            Duration::from_millis(100),
            Vec::new(),
        );

        counter.add(100);
        let out = monitor.finish().unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.ends_with("] 100%\n"));
    }

    #[test]
    fn test_monitor_redraws_while_running() {
        let counter = Arc::new(ProgressCounter::new(4));
        let monitor = ProgressMonitor::spawn(
            Arc::clone(&counter),
            Duration::from_millis(100),
            Vec::new(),
        );

        counter.add(2);
        thread::sleep(Duration::from_millis(350));
        counter.add(2);
        let text = String::from_utf8(monitor.finish().unwrap()).unwrap();

        assert!(text.contains("] 50%"));
        assert!(text.matches('\r').count() >= 2);
    }
}
