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

//! Terminator tables raced by bounded reads
//!
//! A read that races several patterns completes on whichever one ends
//! earliest in the received stream. When two patterns end at the same
//! offset the one listed first wins.

use memchr::memmem;

use crate::block::SAVE_BOUNDARY;

/// Controller output cues
pub mod cue {
    /// Shell prompt marking the end of a command response
    pub const PROMPT: &[u8] = b"\n>";
    /// Bare prompt character, used after login and transfer finalization
    pub const PROMPT_MARK: &[u8] = b">";
    /// Login prompt
    pub const LOGIN: &[u8] = b"login: ";
    /// Pagination cue
    pub const PAGE: &[u8] = b"Press SPACE key to continue.";
    /// Confirmation cue on the command shell
    pub const YES_NO: &[u8] = b"Yes:1, No:0";
    /// Echo of the transfer file name
    pub const FILE_ECHO: &[u8] = b".as";
    /// Another save or load already runs
    pub const LOAD_IN_PROGRESS: &[u8] = b"LOAD in progress";
    /// Menu offered when the loaded program already exists
    pub const LOAD_MENU: &[u8] = b"1:Yes, 0:No / 2:Load all, 3:Exit";
    /// Offer to delete the partially loaded program
    pub const DELETE_AND_ABORT: &[u8] = b"Delete program and abort";
    /// Confirmation prompt during a transfer
    pub const CONFIRM: &[u8] = b"Are you sure";
    /// Full confirmation prompt as terminated on the wire
    pub const CONFIRM_PROMPT: &[u8] = b"Are you sure ? (Yes:1, No:0)";
    /// End-of-transfer marker
    pub const END_OF_TRANSFER: &[u8] = b"E\x17";
    /// Error report during a transfer
    pub const ERRORS: &[u8] = b"errors";
    /// Data frame acknowledgment
    pub const BLOCK_ACK: &[u8] = b"\x02C\x17";
    /// Offer to force the load of a conflicting program
    pub const FORCE_LOAD: &[u8] = b"Force load";
    /// Request to acknowledge a message
    pub const PRESS_ENTER: &[u8] = b"Press ENTER.";
}

/// Position of a completed terminator within a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index of the pattern in its table
    pub index: usize,
    /// Offset one past the last byte of the match
    pub end: usize,
}

/// Finds the terminator that completes earliest in `haystack`.
pub fn first_match(patterns: &[&[u8]], haystack: &[u8]) -> Option<Match> {
    let mut best: Option<Match> = None;
    for (index, pattern) in patterns.iter().enumerate() {
        if pattern.is_empty() {
            continue;
        }
        if let Some(start) = memmem::find(haystack, pattern) {
            let end = start + pattern.len();
            if best.map_or(true, |found| end < found.end) {
                best = Some(Match { index, end });
            }
        }
    }
    best
}

/// Ordered, immutable set of terminator patterns
#[derive(Debug, Clone, Copy)]
pub struct Terminators {
    patterns: &'static [&'static [u8]],
}

impl Terminators {
    /// Create a table from static patterns
    pub const fn new(patterns: &'static [&'static [u8]]) -> Self {
        Self { patterns }
    }

    /// Patterns in priority order
    pub fn patterns(&self) -> &'static [&'static [u8]] {
        self.patterns
    }

    /// Pattern at `index`
    pub fn get(&self, index: usize) -> Option<&'static [u8]> {
        self.patterns.get(index).copied()
    }

    /// Index of `pattern` in this table
    pub fn position(&self, pattern: &[u8]) -> Option<usize> {
        self.patterns.iter().position(|p| *p == pattern)
    }

    /// Earliest completed terminator in `haystack`
    pub fn find(&self, haystack: &[u8]) -> Option<Match> {
        first_match(self.patterns, haystack)
    }
}

/// Terminators of a shell command response
pub const COMMAND_TERMINATORS: Terminators =
    Terminators::new(&[cue::PROMPT, cue::PAGE, cue::YES_NO]);

/// Terminators raced during program transfers
pub const TRANSFER_TERMINATORS: Terminators = Terminators::new(&[
    cue::FILE_ECHO,
    cue::LOAD_IN_PROGRESS,
    cue::LOAD_MENU,
    cue::DELETE_AND_ABORT,
    cue::CONFIRM_PROMPT,
    cue::END_OF_TRANSFER,
    cue::ERRORS,
    cue::BLOCK_ACK,
    cue::FORCE_LOAD,
    cue::PRESS_ENTER,
]);

/// Terminators of the first read of a save stream
pub const SAVE_HEAD_TERMINATORS: Terminators =
    Terminators::new(&[SAVE_BOUNDARY, cue::LOAD_IN_PROGRESS]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_end_wins() {
        let haystack = b"Press SPACE key to continue.\r\n>";
        let found = COMMAND_TERMINATORS.find(haystack).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.end, cue::PAGE.len());
    }

    #[test]
    fn tie_goes_to_lower_index() {
        let patterns: &[&[u8]] = &[b"abc", b"bc"];
        let found = first_match(patterns, b"xxabc").unwrap();
        assert_eq!(found, Match { index: 0, end: 5 });
    }

    #[test]
    fn shorter_pattern_ending_first_wins() {
        let patterns: &[&[u8]] = &[b"abcdef", b"cd"];
        let found = first_match(patterns, b"abcdef").unwrap();
        assert_eq!(found, Match { index: 1, end: 4 });
    }

    #[test]
    fn no_match() {
        assert!(TRANSFER_TERMINATORS.find(b"nothing here").is_none());
        assert!(first_match(&[], b"abc").is_none());
    }

    #[test]
    fn transfer_table_positions() {
        assert_eq!(TRANSFER_TERMINATORS.position(cue::FILE_ECHO), Some(0));
        assert_eq!(TRANSFER_TERMINATORS.position(cue::END_OF_TRANSFER), Some(5));
        assert_eq!(TRANSFER_TERMINATORS.get(7), Some(cue::BLOCK_ACK));
        assert_eq!(TRANSFER_TERMINATORS.patterns().len(), 10);
    }
}
