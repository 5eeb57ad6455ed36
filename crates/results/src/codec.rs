//! Compact binary primitives: LEB128 small longs and length-prefixed strings.

use std::io::{self, Read, Write};

/// Writes primitives to a byte sink.
#[derive(Debug)]
pub struct Encoder<W> {
    inner: W,
}

impl<W: Write> Encoder<W> {
    /// Wrap a sink.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a single byte.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn write_byte(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_all(&[value])
    }

    /// Write an unsigned value in 7-bit groups, low bits first. Values below
    /// 128 take one byte.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_small_long(&mut self, mut value: u64) -> io::Result<()> {
        let mut buf = [0u8; 10];
        let mut len = 0;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }
            buf[len] = byte | 0x80;
            len += 1;
        }
        self.inner.write_all(&buf[..len])
    }

    /// Write a UTF-8 string prefixed by its byte length.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_small_long(value.len() as u64)?;
        self.inner.write_all(value.as_bytes())
    }

    /// Flush the sink.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads primitives written by [`Encoder`].
#[derive(Debug)]
pub struct Decoder<R> {
    inner: R,
}

impl<R: Read> Decoder<R> {
    /// Wrap a source.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] at end of stream.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a value written by [`Encoder::write_small_long`].
    ///
    /// # Errors
    ///
    /// Fails on end of stream or when the value overflows 64 bits.
    pub fn read_small_long(&mut self) -> io::Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            if shift >= 64 || (shift == 63 && byte & 0x7e != 0) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "small long overflows 64 bits",
                ));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a string written by [`Encoder::write_string`].
    ///
    /// # Errors
    ///
    /// Fails on end of stream or invalid UTF-8.
    pub fn read_string(&mut self) -> io::Result<String> {
        let len = usize::try_from(self.read_small_long()?)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "string length too large"))?;
        let mut bytes = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
