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

use super::{CodecError, TelnetFrame, TelnetOption, consts};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Subnegotiation payloads larger than this are treated as a protocol fault.
pub const DEFAULT_SUBNEGOTIATION_LIMIT: usize = 1024;

/// A codec for the Telnet layer underneath a robot controller session.
///
/// Decoding splits the incoming byte stream into coalesced data runs and
/// command frames. NUL and XON bytes are dropped from data the way classic
/// Telnet clients cook their input, so prompts and framing bytes reach the
/// session exactly as the controller printed them.
///
/// The codec does not answer negotiation itself; callers see
/// [`TelnetFrame::Do`], [`TelnetFrame::Will`] and
/// [`TelnetFrame::Subnegotiate`] frames and decide what to send back.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use krcc_telnetcodec::{TelnetCodec, TelnetFrame, TelnetOption};
/// use tokio_util::codec::Decoder;
///
/// let mut codec = TelnetCodec::new();
/// let mut input = BytesMut::from(&b"login: \xFF\xFB\x01"[..]);
/// assert_eq!(
///     codec.decode(&mut input).unwrap(),
///     Some(TelnetFrame::Data(bytes::Bytes::from_static(b"login: ")))
/// );
/// assert_eq!(
///     codec.decode(&mut input).unwrap(),
///     Some(TelnetFrame::Will(TelnetOption::Echo))
/// );
/// ```
#[derive(Debug)]
pub struct TelnetCodec {
    decoder_buffer: BytesMut,
    decoder_state: DecoderState,
    subnegotiation_limit: usize,
}

impl TelnetCodec {
    /// Creates a codec with the default subnegotiation limit.
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Creates a codec that rejects subnegotiations longer than `limit` bytes.
    pub fn with_subnegotiation_limit(limit: usize) -> TelnetCodec {
        TelnetCodec {
            subnegotiation_limit: limit,
            ..TelnetCodec::default()
        }
    }

    /// Whether the decoder is in the middle of an IAC sequence.
    pub fn is_mid_command(&self) -> bool {
        self.decoder_state != DecoderState::NormalData
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            decoder_buffer: BytesMut::new(),
            decoder_state: DecoderState::NormalData,
            subnegotiation_limit: DEFAULT_SUBNEGOTIATION_LIMIT,
        }
    }
}

/// Copies a data run, dropping the bytes a cooked Telnet reader ignores.
fn cook(run: BytesMut) -> Bytes {
    if !run.iter().any(|&b| b == consts::NUL || b == consts::XON) {
        return run.freeze();
    }
    let mut cooked = BytesMut::with_capacity(run.len());
    for &byte in run.iter() {
        if byte != consts::NUL && byte != consts::XON {
            cooked.put_u8(byte);
        }
    }
    cooked.freeze()
}

impl Decoder for TelnetCodec {
    type Item = TelnetFrame;
    type Error = CodecError;

    /// Decodes the next frame from `src`.
    ///
    /// In the `NormalData` state everything up to the next IAC is returned as
    /// one [`TelnetFrame::Data`] run. Command sequences are consumed byte by
    /// byte, so a sequence split across reads resumes where it stopped.
    /// Unknown commands are logged and surface as
    /// [`TelnetFrame::NoOperation`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetFrame>, Self::Error> {
        while src.has_remaining() {
            if self.decoder_state == DecoderState::NormalData {
                let run_len = memchr::memchr(consts::IAC, src).unwrap_or(src.len());
                if run_len > 0 {
                    let data = cook(src.split_to(run_len));
                    if data.is_empty() {
                        continue;
                    }
                    return Ok(Some(TelnetFrame::Data(data)));
                }
                src.advance(1);
                self.decoder_state = DecoderState::InterpretAsCommand;
                continue;
            }

            let byte = src.get_u8();
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, _) => unreachable!("data runs are consumed above"),
                (DecoderState::InterpretAsCommand, consts::IAC) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetFrame::Data(Bytes::from_static(&[consts::IAC]))));
                }
                (DecoderState::InterpretAsCommand, consts::DO) => {
                    self.decoder_state = DecoderState::NegotiateDo;
                }
                (DecoderState::InterpretAsCommand, consts::DONT) => {
                    self.decoder_state = DecoderState::NegotiateDont;
                }
                (DecoderState::InterpretAsCommand, consts::WILL) => {
                    self.decoder_state = DecoderState::NegotiateWill;
                }
                (DecoderState::InterpretAsCommand, consts::WONT) => {
                    self.decoder_state = DecoderState::NegotiateWont;
                }
                (DecoderState::InterpretAsCommand, consts::SB) => {
                    self.decoder_state = DecoderState::Subnegotiate;
                }
                (DecoderState::InterpretAsCommand, command) => {
                    self.decoder_state = DecoderState::NormalData;
                    let frame = match command {
                        consts::NOP => TelnetFrame::NoOperation,
                        consts::DM => TelnetFrame::DataMark,
                        consts::BRK => TelnetFrame::Break,
                        consts::IP => TelnetFrame::InterruptProcess,
                        consts::AO => TelnetFrame::AbortOutput,
                        consts::AYT => TelnetFrame::AreYouThere,
                        consts::EC => TelnetFrame::EraseCharacter,
                        consts::EL => TelnetFrame::EraseLine,
                        consts::GA => TelnetFrame::GoAhead,
                        _ => {
                            warn!("Received Unknown Command {:#X}", command);
                            TelnetFrame::NoOperation
                        }
                    };
                    return Ok(Some(frame));
                }
                (DecoderState::NegotiateDo, option) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetFrame::Do(TelnetOption::from(option))));
                }
                (DecoderState::NegotiateDont, option) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetFrame::Dont(TelnetOption::from(option))));
                }
                (DecoderState::NegotiateWill, option) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetFrame::Will(TelnetOption::from(option))));
                }
                (DecoderState::NegotiateWont, option) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetFrame::Wont(TelnetOption::from(option))));
                }
                (DecoderState::Subnegotiate, option) => {
                    self.decoder_buffer.clear();
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                }
                (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
                }
                (DecoderState::SubnegotiateArgument(option), _) => {
                    if self.decoder_buffer.len() >= self.subnegotiation_limit {
                        self.decoder_state = DecoderState::NormalData;
                        self.decoder_buffer.clear();
                        return Err(CodecError::SubnegotiationOverflow {
                            option,
                            limit: self.subnegotiation_limit,
                        });
                    }
                    self.decoder_buffer.put_u8(byte);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                    self.decoder_buffer.put_u8(consts::IAC);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    let payload = self.decoder_buffer.split().freeze();
                    trace!(option, len = payload.len(), "Subnegotiation complete");
                    return Ok(Some(TelnetFrame::Subnegotiate(
                        TelnetOption::from(option),
                        payload,
                    )));
                }
                (DecoderState::SubnegotiateArgumentIAC(_), _) => {
                    self.decoder_state = DecoderState::NormalData;
                    self.decoder_buffer.clear();
                    warn!(
                        "Received Unknown or invalid Command during Subnegotiation {:#X}. Aborting",
                        byte
                    );
                    return Ok(Some(TelnetFrame::NoOperation));
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    /// Encodes a frame, escaping IAC inside data and subnegotiation payloads.
    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            TelnetFrame::Data(data) => put_escaped(&data, dst),
            TelnetFrame::NoOperation => put_command(consts::NOP, dst),
            TelnetFrame::DataMark => put_command(consts::DM, dst),
            TelnetFrame::Break => put_command(consts::BRK, dst),
            TelnetFrame::InterruptProcess => put_command(consts::IP, dst),
            TelnetFrame::AbortOutput => put_command(consts::AO, dst),
            TelnetFrame::AreYouThere => put_command(consts::AYT, dst),
            TelnetFrame::EraseCharacter => put_command(consts::EC, dst),
            TelnetFrame::EraseLine => put_command(consts::EL, dst),
            TelnetFrame::GoAhead => put_command(consts::GA, dst),
            TelnetFrame::Do(option) => put_negotiation(consts::DO, option, dst),
            TelnetFrame::Dont(option) => put_negotiation(consts::DONT, option, dst),
            TelnetFrame::Will(option) => put_negotiation(consts::WILL, option, dst),
            TelnetFrame::Wont(option) => put_negotiation(consts::WONT, option, dst),
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.reserve(payload.len() + 5);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option.to_u8());
                put_escaped(&payload, dst);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
            }
        }
        Ok(())
    }
}

fn put_command(command: u8, dst: &mut BytesMut) {
    dst.reserve(2);
    dst.put_u8(consts::IAC);
    dst.put_u8(command);
}

fn put_negotiation(verb: u8, option: TelnetOption, dst: &mut BytesMut) {
    dst.reserve(3);
    dst.put_u8(consts::IAC);
    dst.put_u8(verb);
    dst.put_u8(option.to_u8());
}

fn put_escaped(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(data.len());
    let mut rest = data;
    while let Some(at) = memchr::memchr(consts::IAC, rest) {
        dst.put_slice(&rest[..=at]);
        dst.put_u8(consts::IAC);
        rest = &rest[at + 1..];
    }
    dst.put_slice(rest);
}

///
/// Decoder position inside the Telnet byte stream.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    NegotiateDo,
    NegotiateDont,
    NegotiateWill,
    NegotiateWont,
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIAC(u8),
}
