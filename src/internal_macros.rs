// SPDX-License-Identifier: CC0-1.0

//! Macros implementing the consensus codec for plain structs and hash
//! newtypes.

macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => {
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: ::std::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, ::std::io::Error> {
                let mut len = 0;
                $(
                    len += $crate::consensus::Encodable::consensus_encode(
                        &self.$field,
                        writer,
                    )?;
                )+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: ::std::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(reader)?),+
                })
            }
        }
    };
}
pub(crate) use impl_consensus_encoding;

macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl $crate::consensus::Encodable for $hashtype {
            fn consensus_encode<W: ::std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, ::std::io::Error> {
                let bytes = hashes::Hash::to_byte_array(*self);
                $crate::consensus::Encodable::consensus_encode(&bytes, w)
            }
        }

        impl $crate::consensus::Decodable for $hashtype {
            fn consensus_decode<R: ::std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                let bytes = <[u8; 32] as $crate::consensus::Decodable>::consensus_decode(r)?;
                Ok(<$hashtype as hashes::Hash>::from_byte_array(bytes))
            }
        }
    };
}
pub(crate) use impl_hashencode;
