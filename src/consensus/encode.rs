// SPDX-License-Identifier: CC0-1.0

//! Wire encoding and decoding.
//!
//! Little-endian, varint-prefixed serialization as the peer-to-peer protocol
//! defines it. Decoding is strict: oversized allocations and non-minimal
//! varints are rejected before any data-dependent work happens.

use std::io::{self, Cursor, Read, Write};
use std::mem;

use thiserror::Error;

use crate::blockdata::transaction::{TxIn, TxOut};
use crate::hash_types::TxMerkleNode;

/// Maximum size, in bytes, of a vector we are allowed to allocate while
/// decoding.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Encoding or decoding error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error surfaced by the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The input asked us to allocate an unreasonably large vector.
    #[error("oversized vector allocation: requested {requested}, maximum {max}")]
    OversizedVectorAllocation {
        /// The allocation the input requested.
        requested: usize,
        /// The maximum allocation we will ever make.
        max: usize,
    },
    /// A variable-length integer was not encoded in its minimal form.
    #[error("non-minimal varint")]
    NonMinimalVarInt,
    /// Parsing failed for the stated reason.
    #[error("parse failed: {0}")]
    ParseFailed(&'static str),
}

/// Encodes an object into a vector.
pub fn serialize<T: Encodable + ?Sized>(data: &T) -> Vec<u8> {
    let mut encoder = Vec::new();
    let len = data.consensus_encode(&mut encoder).expect("in-memory writers don't error");
    debug_assert_eq!(len, encoder.len());
    encoder
}

/// Decodes an object from a byte slice, erroring if the slice is not
/// consumed entirely.
pub fn deserialize<T: Decodable>(data: &[u8]) -> Result<T, Error> {
    let (rv, consumed) = deserialize_partial(data)?;
    if consumed == data.len() {
        Ok(rv)
    } else {
        Err(Error::ParseFailed("data not consumed entirely when explicitly deserializing"))
    }
}

/// Decodes an object from the front of a byte slice, also returning the
/// number of bytes consumed.
pub fn deserialize_partial<T: Decodable>(data: &[u8]) -> Result<(T, usize), Error> {
    let mut decoder = Cursor::new(data);
    let rv = Decodable::consensus_decode(&mut decoder)?;
    Ok((rv, decoder.position() as usize))
}

/// Extensions of `Write` to encode data as per consensus rules.
pub trait WriteExt: Write {
    /// Outputs a 64-bit unsigned integer, little-endian.
    fn emit_u64(&mut self, v: u64) -> Result<(), io::Error>;
    /// Outputs a 32-bit unsigned integer, little-endian.
    fn emit_u32(&mut self, v: u32) -> Result<(), io::Error>;
    /// Outputs a 16-bit unsigned integer, little-endian.
    fn emit_u16(&mut self, v: u16) -> Result<(), io::Error>;
    /// Outputs a single byte.
    fn emit_u8(&mut self, v: u8) -> Result<(), io::Error>;
    /// Outputs a byte slice verbatim.
    fn emit_slice(&mut self, v: &[u8]) -> Result<(), io::Error>;
}

/// Extensions of `Read` to decode data as per consensus rules.
pub trait ReadExt: Read {
    /// Reads a 64-bit unsigned integer, little-endian.
    fn read_u64(&mut self) -> Result<u64, Error>;
    /// Reads a 32-bit unsigned integer, little-endian.
    fn read_u32(&mut self) -> Result<u32, Error>;
    /// Reads a 16-bit unsigned integer, little-endian.
    fn read_u16(&mut self) -> Result<u16, Error>;
    /// Reads a single byte.
    fn read_u8(&mut self) -> Result<u8, Error>;
    /// Fills a byte slice from the reader.
    fn read_slice(&mut self, slice: &mut [u8]) -> Result<(), Error>;
}

macro_rules! encoder_fn {
    ($name:ident, $val_type:ty) => {
        #[inline]
        fn $name(&mut self, v: $val_type) -> Result<(), io::Error> {
            self.write_all(&v.to_le_bytes())
        }
    };
}

macro_rules! decoder_fn {
    ($name:ident, $val_type:ty, $byte_len:expr) => {
        #[inline]
        fn $name(&mut self) -> Result<$val_type, Error> {
            let mut val = [0; $byte_len];
            self.read_exact(&mut val[..]).map_err(Error::Io)?;
            Ok(<$val_type>::from_le_bytes(val))
        }
    };
}

impl<W: Write + ?Sized> WriteExt for W {
    encoder_fn!(emit_u64, u64);
    encoder_fn!(emit_u32, u32);
    encoder_fn!(emit_u16, u16);

    #[inline]
    fn emit_u8(&mut self, v: u8) -> Result<(), io::Error> {
        self.write_all(&[v])
    }

    #[inline]
    fn emit_slice(&mut self, v: &[u8]) -> Result<(), io::Error> {
        self.write_all(v)
    }
}

impl<R: Read + ?Sized> ReadExt for R {
    decoder_fn!(read_u64, u64, 8);
    decoder_fn!(read_u32, u32, 4);
    decoder_fn!(read_u16, u16, 2);

    #[inline]
    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut val = [0; 1];
        self.read_exact(&mut val).map_err(Error::Io)?;
        Ok(val[0])
    }

    #[inline]
    fn read_slice(&mut self, slice: &mut [u8]) -> Result<(), Error> {
        self.read_exact(slice).map_err(Error::Io)
    }
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes an object with a well-defined format.
    ///
    /// Returns the number of bytes written on success.
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes an object with a well-defined format.
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error>;
}

macro_rules! impl_int_encodable {
    ($ty:ident, $meth_dec:ident, $meth_enc:ident) => {
        impl Decodable for $ty {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                ReadExt::$meth_dec(r)
            }
        }

        impl Encodable for $ty {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.$meth_enc(*self)?;
                Ok(mem::size_of::<$ty>())
            }
        }
    };
}
impl_int_encodable!(u8, read_u8, emit_u8);
impl_int_encodable!(u16, read_u16, emit_u16);
impl_int_encodable!(u32, read_u32, emit_u32);
impl_int_encodable!(u64, read_u64, emit_u64);

/// A variable-length unsigned integer.
///
/// One byte below `0xFD` encodes itself; the markers `0xFD`, `0xFE` and
/// `0xFF` prefix 2, 4 and 8 byte little-endian integers respectively.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Returns the number of bytes this varint occupies when encoded.
    pub fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }
}

impl Encodable for VarInt {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        match self.0 {
            0..=0xFC => {
                w.emit_u8(self.0 as u8)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                w.emit_u8(0xFD)?;
                w.emit_u16(self.0 as u16)?;
                Ok(3)
            }
            0x10000..=0xFFFFFFFF => {
                w.emit_u8(0xFE)?;
                w.emit_u32(self.0 as u32)?;
                Ok(5)
            }
            _ => {
                w.emit_u8(0xFF)?;
                w.emit_u64(self.0)?;
                Ok(9)
            }
        }
    }
}

impl Decodable for VarInt {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        match ReadExt::read_u8(r)? {
            0xFF => {
                let x = ReadExt::read_u64(r)?;
                if x < 0x100000000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x))
                }
            }
            0xFE => {
                let x = ReadExt::read_u32(r)?;
                if x < 0x10000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            0xFD => {
                let x = ReadExt::read_u16(r)?;
                if x < 0xFD {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            n => Ok(VarInt(n as u64)),
        }
    }
}

impl Encodable for [u8; 32] {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.emit_slice(&self[..])?;
        Ok(32)
    }
}

impl Decodable for [u8; 32] {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let mut ret = [0; 32];
        r.read_slice(&mut ret)?;
        Ok(ret)
    }
}

impl Encodable for Vec<u8> {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let vi_len = VarInt(self.len() as u64).consensus_encode(w)?;
        w.emit_slice(self)?;
        Ok(vi_len + self.len())
    }
}

impl Decodable for Vec<u8> {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let len = VarInt::consensus_decode(r)?.0 as usize;
        if len > MAX_VEC_SIZE {
            return Err(Error::OversizedVectorAllocation { requested: len, max: MAX_VEC_SIZE });
        }
        let mut ret = vec![0u8; len];
        r.read_slice(&mut ret)?;
        Ok(ret)
    }
}

macro_rules! impl_vec {
    ($type:ty) => {
        impl Encodable for Vec<$type> {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                let mut len = VarInt(self.len() as u64).consensus_encode(w)?;
                for c in self.iter() {
                    len += c.consensus_encode(w)?;
                }
                Ok(len)
            }
        }

        impl Decodable for Vec<$type> {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let len = VarInt::consensus_decode(r)?.0;
                // Bound the allocation by what the input could plausibly
                // contain.
                let byte_size = (len as usize)
                    .checked_mul(mem::size_of::<$type>())
                    .ok_or(Error::ParseFailed("invalid length"))?;
                if byte_size > MAX_VEC_SIZE {
                    return Err(Error::OversizedVectorAllocation {
                        requested: byte_size,
                        max: MAX_VEC_SIZE,
                    });
                }
                let mut ret = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    ret.push(Decodable::consensus_decode(r)?);
                }
                Ok(ret)
            }
        }
    };
}
impl_vec!(TxMerkleNode);
impl_vec!(TxIn);
impl_vec!(TxOut);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_int() {
        assert_eq!(serialize(&1u8), vec![1u8]);
        assert_eq!(serialize(&0xFFu8), vec![0xFF]);
        assert_eq!(serialize(&0x0102u16), vec![2, 1]);
        assert_eq!(serialize(&0x01020304u32), vec![4, 3, 2, 1]);
        assert_eq!(serialize(&0x0102030405060708u64), vec![8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn serialize_varint() {
        assert_eq!(serialize(&VarInt(0x10)), vec![0x10]);
        assert_eq!(serialize(&VarInt(0xFC)), vec![0xFC]);
        assert_eq!(serialize(&VarInt(0xFD)), vec![0xFD, 0xFD, 0]);
        assert_eq!(serialize(&VarInt(0xFFF)), vec![0xFD, 0xFF, 0xF]);
        assert_eq!(serialize(&VarInt(0xF0F0F0F)), vec![0xFE, 0xF, 0xF, 0xF, 0xF]);
        assert_eq!(
            serialize(&VarInt(0xF0F0F0F0F0E0)),
            vec![0xFF, 0xE0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0, 0]
        );
    }

    #[test]
    fn varint_round_trip() {
        for &value in &[0u64, 1, 0xFC, 0xFD, 0xFFFF, 0x10000, 0xFFFFFFFF, 0x100000000, u64::MAX] {
            let encoded = serialize(&VarInt(value));
            assert_eq!(encoded.len(), VarInt(value).len());
            let decoded: VarInt = deserialize(&encoded).unwrap();
            assert_eq!(decoded.0, value);
        }
    }

    #[test]
    fn non_minimal_varint_is_rejected() {
        // 0xFC fits in one byte; the marker forms are non-minimal.
        assert!(matches!(
            deserialize::<VarInt>(&[0xFD, 0xFC, 0x00]),
            Err(Error::NonMinimalVarInt)
        ));
        assert!(matches!(
            deserialize::<VarInt>(&[0xFE, 0xFF, 0xFF, 0x00, 0x00]),
            Err(Error::NonMinimalVarInt)
        ));
        assert!(matches!(
            deserialize::<VarInt>(&[0xFF, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::NonMinimalVarInt)
        ));
    }

    #[test]
    fn serialize_byte_vec() {
        assert_eq!(serialize(&Vec::<u8>::new()), vec![0u8]);
        assert_eq!(serialize(&vec![1u8, 2, 3]), vec![3u8, 1, 2, 3]);
    }

    #[test]
    fn deserialize_requires_full_consumption() {
        assert!(deserialize::<u16>(&[1, 2, 3]).is_err());
        let (value, consumed) = deserialize_partial::<u16>(&[1, 2, 3]).unwrap();
        assert_eq!((value, consumed), (0x0201, 2));
    }

    #[test]
    fn oversized_vec_is_rejected() {
        // Claims four billion bytes follow.
        let input = [0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            deserialize::<Vec<u8>>(&input),
            Err(Error::OversizedVectorAllocation { .. })
        ));
    }

    #[test]
    fn short_input_is_io_error() {
        assert!(matches!(deserialize::<u32>(&[1, 2]), Err(Error::Io(_))));
    }
}
