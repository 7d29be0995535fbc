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

//! Inquiry resolution
//!
//! After every terminated read the client asks an [`InquiryPolicy`] what to
//! do next: stop, answer the controller and keep reading, or give up. The
//! stock policies are first-match rule tables over the raw response bytes.

use bytes::Bytes;
use memchr::memmem;

use crate::terminator::cue;

/// Verdict on a controller response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inquiry {
    /// The exchange is complete
    Done,
    /// Send the reply (possibly empty) and keep reading
    Continue(Bytes),
    /// Stop with an error
    Abort,
}

/// Maps a controller response to an [`Inquiry`].
///
/// Implemented for any `Fn(&[u8]) -> Inquiry`, so a closure can replace the
/// stock resolvers.
pub trait InquiryPolicy: Send + Sync {
    /// Decide what to do after `response` was read
    fn resolve(&self, response: &[u8]) -> Inquiry;
}

impl<F> InquiryPolicy for F
where
    F: Fn(&[u8]) -> Inquiry + Send + Sync,
{
    fn resolve(&self, response: &[u8]) -> Inquiry {
        self(response)
    }
}

/// Static form of an [`Inquiry`] usable in const tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// See [`Inquiry::Done`]
    Done,
    /// See [`Inquiry::Continue`]
    Reply(&'static [u8]),
    /// See [`Inquiry::Abort`]
    Abort,
}

impl From<Verdict> for Inquiry {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Done => Inquiry::Done,
            Verdict::Reply(reply) => Inquiry::Continue(Bytes::from_static(reply)),
            Verdict::Abort => Inquiry::Abort,
        }
    }
}

/// A cue and the verdict it triggers
#[derive(Debug, Clone, Copy)]
pub struct InquiryRule {
    /// Substring looked for in the response
    pub cue: &'static [u8],
    /// Verdict when `cue` is present
    pub verdict: Verdict,
}

/// First-match rule table with a fallback verdict
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    rules: &'static [InquiryRule],
    fallback: Verdict,
}

impl RuleTable {
    /// Create a new rule table
    pub const fn new(rules: &'static [InquiryRule], fallback: Verdict) -> Self {
        Self { rules, fallback }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &'static [InquiryRule] {
        self.rules
    }

    /// Verdict when no rule applies
    pub fn fallback(&self) -> Verdict {
        self.fallback
    }
}

impl InquiryPolicy for RuleTable {
    fn resolve(&self, response: &[u8]) -> Inquiry {
        self.rules
            .iter()
            .find(|rule| memmem::find(response, rule.cue).is_some())
            .map_or(self.fallback, |rule| rule.verdict)
            .into()
    }
}

/// Stock rules for shell commands
pub const COMMAND_RULES: RuleTable = RuleTable::new(
    &[
        InquiryRule {
            cue: cue::PROMPT,
            verdict: Verdict::Done,
        },
        InquiryRule {
            cue: cue::PAGE,
            verdict: Verdict::Reply(b" "),
        },
        InquiryRule {
            cue: cue::YES_NO,
            verdict: Verdict::Reply(b"1"),
        },
    ],
    Verdict::Reply(b""),
);

/// Stock rules for program transfers
pub const TRANSFER_RULES: RuleTable = RuleTable::new(
    &[
        InquiryRule {
            cue: cue::ERRORS,
            verdict: Verdict::Abort,
        },
        InquiryRule {
            cue: cue::LOAD_MENU,
            verdict: Verdict::Reply(b"2\r\n"),
        },
        InquiryRule {
            cue: cue::END_OF_TRANSFER,
            verdict: Verdict::Done,
        },
        InquiryRule {
            cue: cue::DELETE_AND_ABORT,
            verdict: Verdict::Reply(b"0\r\n"),
        },
        InquiryRule {
            cue: cue::CONFIRM,
            verdict: Verdict::Reply(b"1\r\n"),
        },
        InquiryRule {
            cue: cue::FORCE_LOAD,
            verdict: Verdict::Reply(b"9\r\n"),
        },
        InquiryRule {
            cue: cue::PRESS_ENTER,
            verdict: Verdict::Reply(b"\r\n"),
        },
    ],
    Verdict::Done,
);

/// Default resolver for [`Session::execute`](crate::Session::execute)
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInquiry;

impl InquiryPolicy for CommandInquiry {
    fn resolve(&self, response: &[u8]) -> Inquiry {
        COMMAND_RULES.resolve(response)
    }
}

/// Default resolver for program loads and saves
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferInquiry;

impl InquiryPolicy for TransferInquiry {
    fn resolve(&self, response: &[u8]) -> Inquiry {
        TRANSFER_RULES.resolve(response)
    }
}
