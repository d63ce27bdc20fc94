// SPDX-License-Identifier: CC0-1.0

//! Scripts, as far as filtering needs them.
//!
//! The filtering core never executes scripts. It walks their push-data
//! constants when matching against a bloom filter, and recognizes the two
//! output shapes the update policy distinguishes (pay-to-pubkey and bare
//! multisig).

use std::fmt;
use std::io;

use thiserror::Error;

use crate::consensus::{encode, Decodable, Encodable, VarInt, WriteExt};

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_PUSHNUM_1: u8 = 0x51;
const OP_PUSHNUM_16: u8 = 0x60;
const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKMULTISIG: u8 = 0xae;

/// A script failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A push opcode claimed more data than the script holds.
    #[error("push-data opcode ran past the end of the script")]
    EarlyEndOfScript,
}

/// An owned script.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Script(Box<[u8]>);

impl Script {
    /// Creates a new empty script.
    pub fn new() -> Script {
        Script(Box::default())
    }

    /// Creates a script from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Script {
        Script(bytes.into_boxed_slice())
    }

    /// Returns the script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the script's opcodes and push-data constants.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { data: &self.0 }
    }

    /// Checks for the shape of a pay-to-pubkey output script:
    /// a pushed 33- or 65-byte key followed by `OP_CHECKSIG`.
    pub fn is_p2pk(&self) -> bool {
        match self.0.len() {
            67 => self.0[0] == 65 && self.0[66] == OP_CHECKSIG,
            35 => self.0[0] == 33 && self.0[34] == OP_CHECKSIG,
            _ => false,
        }
    }

    /// Checks for the shape of a bare m-of-n multisig output script:
    /// `OP_m <n pushed keys> OP_n OP_CHECKMULTISIG`.
    pub fn is_multisig(&self) -> bool {
        let mut instructions = self.instructions();
        let required = match instructions.next() {
            Some(Ok(Instruction::Op(op))) => match decode_pushnum(op) {
                Some(m) => m,
                None => return false,
            },
            _ => return false,
        };
        let mut keys = 0u8;
        loop {
            match instructions.next() {
                Some(Ok(Instruction::PushBytes(data))) => {
                    if data.len() != 33 && data.len() != 65 {
                        return false;
                    }
                    keys = match keys.checked_add(1) {
                        Some(keys) => keys,
                        None => return false,
                    };
                }
                Some(Ok(Instruction::Op(op))) => {
                    let total = match decode_pushnum(op) {
                        Some(n) => n,
                        None => return false,
                    };
                    return total == keys
                        && required <= total
                        && matches!(
                            instructions.next(),
                            Some(Ok(Instruction::Op(OP_CHECKMULTISIG)))
                        )
                        && instructions.next().is_none();
                }
                _ => return false,
            }
        }
    }
}

fn decode_pushnum(opcode: u8) -> Option<u8> {
    if (OP_PUSHNUM_1..=OP_PUSHNUM_16).contains(&opcode) {
        Some(opcode - OP_PUSHNUM_1 + 1)
    } else {
        None
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Script {
        Script::from_bytes(bytes)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Script(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// A single parsed script element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// A constant pushed onto the stack.
    PushBytes(&'a [u8]),
    /// Any non-push opcode.
    Op(u8),
}

impl<'a> Instruction<'a> {
    /// Returns the pushed constant, if this element is a push.
    pub fn push_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Instruction::PushBytes(bytes) => Some(bytes),
            Instruction::Op(_) => None,
        }
    }
}

/// Iterator over a script's instructions.
///
/// Stops after yielding an error; a truncated push poisons the remainder of
/// the script.
pub struct Instructions<'a> {
    data: &'a [u8],
}

impl<'a> Instructions<'a> {
    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.data.len() < len {
            self.data = &[];
            return Err(Error::EarlyEndOfScript);
        }
        let (slice, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(slice)
    }

    fn read_push_len(&mut self, size_bytes: usize) -> Result<usize, Error> {
        let le = self.take_slice(size_bytes)?;
        let mut len = 0usize;
        for (i, byte) in le.iter().enumerate() {
            len |= (*byte as usize) << (8 * i);
        }
        Ok(len)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&opcode, rest) = self.data.split_first()?;
        self.data = rest;
        let result = match opcode {
            0x00 => Ok(Instruction::PushBytes(&[])),
            len @ 0x01..=0x4b => self.take_slice(len as usize).map(Instruction::PushBytes),
            OP_PUSHDATA1 => self
                .read_push_len(1)
                .and_then(|len| self.take_slice(len))
                .map(Instruction::PushBytes),
            OP_PUSHDATA2 => self
                .read_push_len(2)
                .and_then(|len| self.take_slice(len))
                .map(Instruction::PushBytes),
            OP_PUSHDATA4 => self
                .read_push_len(4)
                .and_then(|len| self.take_slice(len))
                .map(Instruction::PushBytes),
            op => Ok(Instruction::Op(op)),
        };
        Some(result)
    }
}

impl Encodable for Script {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let vi_len = VarInt(self.0.len() as u64).consensus_encode(w)?;
        w.emit_slice(&self.0)?;
        Ok(vi_len + self.0.len())
    }
}

impl Decodable for Script {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(Script(Vec::<u8>::consensus_decode(r)?.into_boxed_slice()))
    }
}
