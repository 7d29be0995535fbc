//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Transfer progress reporting

use tracing::info;

/// Receives byte counts while a program loads
pub trait ProgressReporter: Send + Sync {
    /// `sent` of `total` program bytes have been handed to the transport
    fn report(&self, sent: usize, total: usize);
}

impl<F> ProgressReporter for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, sent: usize, total: usize) {
        self(sent, total)
    }
}

/// Logs progress at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, sent: usize, total: usize) {
        info!("Progress: {}/{}", sent, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |sent: usize, total: usize| seen.lock().unwrap().push((sent, total));
        reporter.report(10, 20);
        reporter.report(20, 20);
        assert_eq!(*seen.lock().unwrap(), vec![(10, 20), (20, 20)]);
    }
}
