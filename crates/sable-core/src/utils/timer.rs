// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wall-clock timing helpers.

use std::time::{Duration, Instant};

/// Measures wall time for a single operation, e.g. a scene or resource load.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Starts a new stopwatch.
    #[inline]
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Time elapsed since [`start`](Self::start).
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Elapsed time in fractional milliseconds, for log lines.
    #[inline]
    pub fn elapsed_ms_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SLEEP_DURATION_MS: u64 = 20;

    #[test]
    fn stopwatch_elapsed_time_after_delay() {
        let watch = Stopwatch::start();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));

        let elapsed = watch.elapsed();
        assert!(
            elapsed >= Duration::from_millis(SLEEP_DURATION_MS),
            "Elapsed duration ({elapsed:?}) should be >= sleep duration"
        );
        assert!(watch.elapsed_ms_f64() >= SLEEP_DURATION_MS as f64);
    }
}
