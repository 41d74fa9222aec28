use crate::cdr::{align_up, CodeSets, Endian, MAX_OCTET_SEQ_LEN, MAX_STRING_LEN};
use crate::error::{CorbaError, CorbaResult};

/// A borrowed, aligned, byte-order-tagged input buffer.
///
/// See [`crate::cdr::CdrOutput`] for the meaning of `base_offset`.
#[derive(Debug, Clone)]
pub struct CdrInput<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
    codesets: Option<CodeSets>,
    base_offset: usize,
}

impl<'a> CdrInput<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
            codesets: None,
            base_offset: 0,
        }
    }

    /// Wraps an encapsulation's raw bytes: reads the leading byte-order octet to
    /// determine endianness and sets the alignment origin to this stream's own start.
    pub fn from_encapsulation(buf: &'a [u8]) -> CorbaResult<Self> {
        let flag = *buf.first().ok_or_else(|| {
            CorbaError::marshal("encapsulation is empty, missing byte-order octet")
        })?;
        if flag > 1 {
            return Err(CorbaError::marshal(format!(
                "invalid byte-order flag 0x{flag:02x} in encapsulation"
            )));
        }
        let mut input = Self::new(buf, Endian::from_flag(flag == 1));
        input.pos = 1;
        Ok(input)
    }

    pub fn with_base_offset(mut self, base_offset: usize) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn with_codesets(mut self, codesets: CodeSets) -> Self {
        self.codesets = Some(codesets);
        self
    }

    pub fn set_codesets(&mut self, codesets: CodeSets) {
        self.codesets = Some(codesets);
    }

    pub fn codesets(&self) -> CodeSets {
        self.codesets.unwrap_or_default()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Rewinds the cursor to `mark` without touching the underlying buffer. The
    /// stream remains usable after a recoverable read error only via an explicit
    /// reset such as this one.
    pub fn reset(&mut self, mark: usize) {
        self.pos = mark.min(self.buf.len());
    }

    fn align(&mut self, alignment: usize) -> CorbaResult<()> {
        let target = align_up(self.base_offset + self.pos, alignment) - self.base_offset;
        if target > self.buf.len() {
            return Err(CorbaError::marshal(format!(
                "buffer underflow: need {} alignment pad bytes, only {} remain",
                target - self.pos,
                self.remaining()
            )));
        }
        self.pos = target;
        Ok(())
    }

    /// Skips to the next `alignment` boundary, relative to `base_offset`. Used by
    /// GIOP 1.2 to align a message body to 8 bytes from the start of the whole
    /// message.
    pub fn align_to(&mut self, alignment: usize) -> CorbaResult<()> {
        self.align(alignment)
    }

    fn take(&mut self, alignment: usize, len: usize) -> CorbaResult<&'a [u8]> {
        self.align(alignment)?;
        if self.pos + len > self.buf.len() {
            return Err(CorbaError::marshal(format!(
                "buffer underflow: need {len} bytes, only {} remain",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_octet(&mut self) -> CorbaResult<u8> {
        let b = self.take(1, 1)?[0];
        Ok(b)
    }

    pub fn read_boolean(&mut self) -> CorbaResult<bool> {
        Ok(self.read_octet()? != 0)
    }

    pub fn read_char(&mut self) -> CorbaResult<u8> {
        self.read_octet()
    }

    pub fn read_wchar(&mut self) -> CorbaResult<u16> {
        let bytes = self.take(2, 2)?;
        Ok(self.decode_u16(bytes))
    }

    pub fn read_short(&mut self) -> CorbaResult<i16> {
        Ok(self.read_ushort()? as i16)
    }

    pub fn read_ushort(&mut self) -> CorbaResult<u16> {
        let bytes = self.take(2, 2)?;
        Ok(self.decode_u16(bytes))
    }

    pub fn read_long(&mut self) -> CorbaResult<i32> {
        Ok(self.read_ulong()? as i32)
    }

    pub fn read_ulong(&mut self) -> CorbaResult<u32> {
        let bytes = self.take(4, 4)?;
        Ok(self.decode_u32(bytes))
    }

    pub fn read_longlong(&mut self) -> CorbaResult<i64> {
        Ok(self.read_ulonglong()? as i64)
    }

    pub fn read_ulonglong(&mut self) -> CorbaResult<u64> {
        let bytes = self.take(8, 8)?;
        Ok(self.decode_u64(bytes))
    }

    pub fn read_float(&mut self) -> CorbaResult<f32> {
        let bytes = self.take(4, 4)?;
        Ok(f32::from_bits(self.decode_u32(bytes)))
    }

    pub fn read_double(&mut self) -> CorbaResult<f64> {
        let bytes = self.take(8, 8)?;
        Ok(f64::from_bits(self.decode_u64(bytes)))
    }

    /// Raw bytes with no length prefix and no alignment.
    pub fn read_octet_array(&mut self, len: usize) -> CorbaResult<&'a [u8]> {
        self.take(1, len)
    }

    /// `ulong` length prefix, then that many raw bytes. The declared length is
    /// bounds-checked before any allocation proportional to it.
    pub fn read_octet_sequence(&mut self) -> CorbaResult<&'a [u8]> {
        let len = self.read_ulong()?;
        if len > MAX_OCTET_SEQ_LEN || len as usize > self.remaining() {
            return Err(CorbaError::marshal(format!(
                "octet sequence length {len} exceeds sanity bound or remaining bytes ({})",
                self.remaining()
            )));
        }
        self.read_octet_array(len as usize)
    }

    /// Narrow string: `ulong` length (including trailing NUL), sanity-checked before
    /// any proportional allocation, then the bytes decoded against the stream's char
    /// code set, with the NUL stripped.
    pub fn read_string(&mut self) -> CorbaResult<String> {
        let len = self.read_ulong()?;
        if len > MAX_STRING_LEN || len as usize > self.remaining() {
            return Err(CorbaError::marshal(format!(
                "string length {len} exceeds sanity bound or remaining bytes ({})",
                self.remaining()
            )));
        }
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_octet_array(len as usize)?;
        let (body, nul) = bytes.split_at(bytes.len() - 1);
        if nul != [0] {
            return Err(CorbaError::marshal(
                "narrow string is not NUL-terminated",
            ));
        }
        decode_narrow(body, self.codesets().char_codeset)
    }

    /// Wide string: `ulong` length in code units, then that many UTF-16 code units.
    /// Honors a leading byte-order mark if present, else falls back to the stream's
    /// endianness.
    pub fn read_wstring(&mut self) -> CorbaResult<String> {
        let len = self.read_ulong()?;
        if len > MAX_STRING_LEN || (len as usize).saturating_mul(2) > self.remaining() {
            return Err(CorbaError::marshal(format!(
                "wstring length {len} exceeds sanity bound or remaining bytes ({})",
                self.remaining()
            )));
        }
        let mut units = Vec::with_capacity(len as usize);
        let mut endian = self.endian;
        for i in 0..len {
            let bytes = self.take(2, 2)?;
            let unit = match endian {
                Endian::Big => u16::from_be_bytes([bytes[0], bytes[1]]),
                Endian::Little => u16::from_le_bytes([bytes[0], bytes[1]]),
            };
            if i == 0 {
                match unit {
                    0xFEFF => {
                        endian = Endian::Big;
                        continue;
                    }
                    0xFFFE => {
                        endian = Endian::Little;
                        continue;
                    }
                    _ => {}
                }
            }
            units.push(unit);
        }
        String::from_utf16(&units)
            .map_err(|e| CorbaError::marshal(format!("invalid UTF-16 in wstring: {e}")))
    }

    /// Reads a `ulong` length and returns an independently-aligned input stream over
    /// the following raw bytes, without interpreting a byte-order octet: plain
    /// Carves out a fixed-length nested input sharing this stream's byte order,
    /// distinct from [`Self::from_encapsulation`] which additionally consumes a
    /// byte-order flag.
    pub fn create_sub_stream(&mut self, length: usize) -> CorbaResult<CdrInput<'a>> {
        let bytes = self.read_octet_array(length)?;
        Ok(CdrInput::new(bytes, self.endian))
    }

    /// Reads a `ulong` length, then returns an encapsulation-flavored sub-stream over
    /// the following bytes (byte-order octet consumed, origin reset to its own
    /// start).
    pub fn read_encapsulation(&mut self) -> CorbaResult<CdrInput<'a>> {
        let len = self.read_ulong()?;
        if len as usize > self.remaining() {
            return Err(CorbaError::marshal(format!(
                "encapsulation length {len} exceeds remaining bytes ({})",
                self.remaining()
            )));
        }
        let bytes = self.read_octet_array(len as usize)?;
        CdrInput::from_encapsulation(bytes)
    }

    fn decode_u16(&self, bytes: &[u8]) -> u16 {
        match self.endian {
            Endian::Big => u16::from_be_bytes([bytes[0], bytes[1]]),
            Endian::Little => u16::from_le_bytes([bytes[0], bytes[1]]),
        }
    }

    fn decode_u32(&self, bytes: &[u8]) -> u32 {
        match self.endian {
            Endian::Big => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Endian::Little => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    fn decode_u64(&self, bytes: &[u8]) -> u64 {
        let arr: [u8; 8] = bytes.try_into().expect("take(8, 8) yields 8 bytes");
        match self.endian {
            Endian::Big => u64::from_be_bytes(arr),
            Endian::Little => u64::from_le_bytes(arr),
        }
    }
}

fn decode_narrow(bytes: &[u8], codeset: u32) -> CorbaResult<String> {
    match codeset {
        crate::DEFAULT_CHAR_CODESET => Ok(bytes.iter().map(|&b| b as char).collect()),
        crate::NATIVE_CHAR_CODESET => String::from_utf8(bytes.to_vec())
            .map_err(|e| CorbaError::marshal(format!("invalid UTF-8 in string: {e}"))),
        other => Err(CorbaError::no_implement(format!(
            "unsupported char code set 0x{other:08x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::CdrOutput;

    #[test]
    fn primitive_round_trip_both_endiannesses() {
        for endian in [Endian::Big, Endian::Little] {
            let mut out = CdrOutput::new(endian);
            out.write_octet(0x7F);
            out.write_short(-12);
            out.write_ulong(0xDEAD_BEEF);
            out.write_double(3.5);
            let bytes = out.into_bytes();
            let mut input = CdrInput::new(&bytes, endian);
            assert_eq!(input.read_octet().unwrap(), 0x7F);
            assert_eq!(input.read_short().unwrap(), -12);
            assert_eq!(input.read_ulong().unwrap(), 0xDEAD_BEEF);
            assert_eq!(input.read_double().unwrap(), 3.5);
        }
    }

    #[test]
    fn string_length_sanity_rejects_oversized_declared_length() {
        // declared length far exceeds remaining bytes
        let bytes = [0x00, 0x00, 0x00, 0xFF, b'h', b'i', 0];
        let mut input = CdrInput::new(&bytes, Endian::Big);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn string_length_sanity_rejects_over_10mib() {
        let mut bytes = vec![0u8; 8];
        bytes[0..4].copy_from_slice(&(11 * 1024 * 1024u32).to_be_bytes());
        let mut input = CdrInput::new(&bytes, Endian::Big);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn endianness_mismatch_does_not_loop() {
        // length field 30 written little-endian, read as big-endian: 0x1E000000,
        // far beyond remaining bytes. Must fail, not allocate/loop.
        let mut out = CdrOutput::new(Endian::Little);
        out.write_string("012345678901234567890123456789").unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn alignment_invariant() {
        let mut out = CdrOutput::new(Endian::Big);
        out.write_octet(0xAA);
        out.write_ulong(1);
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[1..4], &[0, 0, 0]);
    }

    #[test]
    fn reset_rewinds_cursor() {
        let mut out = CdrOutput::new(Endian::Big);
        out.write_ulong(1);
        out.write_ulong(2);
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        let mark = input.position();
        assert_eq!(input.read_ulong().unwrap(), 1);
        input.reset(mark);
        assert_eq!(input.read_ulong().unwrap(), 1);
        assert_eq!(input.read_ulong().unwrap(), 2);
    }

    #[test]
    fn encapsulation_round_trip() {
        let mut inner = CdrOutput::new_encapsulation(Endian::Little);
        inner.write_ulong(7);
        let mut outer = CdrOutput::new(Endian::Big);
        outer.write_encapsulation(&inner.into_bytes());
        let bytes = outer.into_bytes();
        let mut outer_in = CdrInput::new(&bytes, Endian::Big);
        let mut sub = outer_in.read_encapsulation().unwrap();
        assert_eq!(sub.endian(), Endian::Little);
        assert_eq!(sub.read_ulong().unwrap(), 7);
    }
}
