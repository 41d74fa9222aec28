use crate::cdr::{align_up, CodeSets, Endian};
use crate::config::CdrBufferConfig;
use crate::error::{CorbaError, CorbaResult};

/// A growable, aligned, byte-order-tagged output buffer.
///
/// Alignment is always computed relative to `base_offset + buf.len()`. `base_offset`
/// is zero for a freshly built encapsulation (whose own bytes are offset 0 of
/// themselves) and non-zero when the stream is the body of a larger framed message
/// whose header precedes it on the wire — GIOP 1.2 body alignment is relative to the
/// start of the whole message, header included, so the body's `CdrOutput` is built
/// with `base_offset` set to the header size.
#[derive(Debug, Clone)]
pub struct CdrOutput {
    buf: Vec<u8>,
    endian: Endian,
    codesets: Option<CodeSets>,
    growth_factor_percent: u32,
    base_offset: usize,
}

impl CdrOutput {
    pub fn new(endian: Endian) -> Self {
        Self::with_config(endian, CdrBufferConfig::default())
    }

    pub fn with_config(endian: Endian, config: CdrBufferConfig) -> Self {
        Self {
            buf: Vec::with_capacity(config.initial_capacity),
            endian,
            codesets: None,
            growth_factor_percent: config.growth_factor_percent.max(100),
            base_offset: 0,
        }
    }

    /// Builds a fresh encapsulation: writes the leading byte-order octet and sets the
    /// alignment origin to this stream's own start.
    pub fn new_encapsulation(endian: Endian) -> Self {
        let mut out = Self::new(endian);
        out.write_octet(endian.flag_bit());
        out
    }

    pub fn with_base_offset(mut self, base_offset: usize) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn with_codesets(mut self, codesets: CodeSets) -> Self {
        self.codesets = Some(codesets);
        self
    }

    pub fn codesets(&self) -> CodeSets {
        self.codesets.unwrap_or_default()
    }

    pub fn set_codesets(&mut self, codesets: CodeSets) {
        self.codesets = Some(codesets);
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Consumes the stream, returning its raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.buf.len() + additional;
        if needed > self.buf.capacity() {
            let grown = (self.buf.capacity() as u64 * u64::from(self.growth_factor_percent))
                / 100;
            let new_capacity = grown.max(needed as u64) as usize;
            self.buf.reserve(new_capacity - self.buf.len());
        }
    }

    fn align(&mut self, alignment: usize) {
        let target = align_up(self.base_offset + self.buf.len(), alignment) - self.base_offset;
        if target > self.buf.len() {
            let pad = target - self.buf.len();
            self.ensure_capacity(pad);
            self.buf.resize(target, 0);
        }
    }

    /// Pads with zero bytes up to the next `alignment` boundary, relative to
    /// `base_offset`. Used by GIOP 1.2 to align a message body to 8 bytes from the
    /// start of the whole message rather than from any particular CDR primitive.
    pub fn align_to(&mut self, alignment: usize) {
        self.align(alignment);
    }

    fn push_aligned(&mut self, alignment: usize, bytes: &[u8]) {
        self.align(alignment);
        self.ensure_capacity(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_octet(&mut self, v: u8) {
        self.ensure_capacity(1);
        self.buf.push(v);
    }

    pub fn write_boolean(&mut self, v: bool) {
        self.write_octet(u8::from(v));
    }

    pub fn write_char(&mut self, v: u8) {
        self.write_octet(v);
    }

    pub fn write_wchar(&mut self, v: u16) {
        let bytes = self.endian_u16(v);
        self.push_aligned(2, &bytes);
    }

    pub fn write_short(&mut self, v: i16) {
        let bytes = self.endian_u16(v as u16);
        self.push_aligned(2, &bytes);
    }

    pub fn write_ushort(&mut self, v: u16) {
        let bytes = self.endian_u16(v);
        self.push_aligned(2, &bytes);
    }

    pub fn write_long(&mut self, v: i32) {
        let bytes = self.endian_u32(v as u32);
        self.push_aligned(4, &bytes);
    }

    pub fn write_ulong(&mut self, v: u32) {
        let bytes = self.endian_u32(v);
        self.push_aligned(4, &bytes);
    }

    pub fn write_longlong(&mut self, v: i64) {
        let bytes = self.endian_u64(v as u64);
        self.push_aligned(8, &bytes);
    }

    pub fn write_ulonglong(&mut self, v: u64) {
        let bytes = self.endian_u64(v);
        self.push_aligned(8, &bytes);
    }

    pub fn write_float(&mut self, v: f32) {
        let bytes = self.endian_u32(v.to_bits());
        self.push_aligned(4, &bytes);
    }

    pub fn write_double(&mut self, v: f64) {
        let bytes = self.endian_u64(v.to_bits());
        self.push_aligned(8, &bytes);
    }

    /// Raw bytes with no length prefix and no alignment (octet alignment is 1).
    pub fn write_octet_array(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// `ulong` length prefix, then the raw bytes.
    pub fn write_octet_sequence(&mut self, bytes: &[u8]) {
        self.write_ulong(bytes.len() as u32);
        self.write_octet_array(bytes);
    }

    /// Narrow string: `ulong` length including the trailing NUL, then the bytes
    /// encoded in the stream's char code set, then the NUL.
    pub fn write_string(&mut self, s: &str) -> CorbaResult<()> {
        let encoded = encode_narrow(s, self.codesets().char_codeset)?;
        self.write_ulong(encoded.len() as u32 + 1);
        self.write_octet_array(&encoded);
        self.write_octet(0);
        Ok(())
    }

    /// Wide string: `ulong` length in code units (no terminator), then each UTF-16
    /// code unit in the stream's endianness.
    pub fn write_wstring(&mut self, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_ulong(units.len() as u32);
        for unit in units {
            self.write_wchar(unit);
        }
    }

    /// `ulong(length(inner))` then the raw bytes of `inner` (already a complete
    /// encapsulation, byte-order octet included).
    pub fn write_encapsulation(&mut self, inner: &[u8]) {
        self.write_ulong(inner.len() as u32);
        self.write_octet_array(inner);
    }

    /// Rewrites a 4-byte field already written at `position`, without disturbing the
    /// cursor. Used to back-patch message/body sizes.
    pub fn write_ulong_at(&mut self, position: usize, v: u32) -> CorbaResult<()> {
        if position + 4 > self.buf.len() {
            return Err(CorbaError::marshal(format!(
                "write_ulong_at: position {position} out of range for buffer of length {}",
                self.buf.len()
            )));
        }
        let bytes = self.endian_u32(v);
        self.buf[position..position + 4].copy_from_slice(&bytes);
        Ok(())
    }

    fn endian_u16(&self, v: u16) -> [u8; 2] {
        match self.endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        }
    }

    fn endian_u32(&self, v: u32) -> [u8; 4] {
        match self.endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        }
    }

    fn endian_u64(&self, v: u64) -> [u8; 8] {
        match self.endian {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        }
    }
}

/// Encodes `s` into the given char code set. Only ISO-8859-1 (default) and UTF-8
/// (this runtime's native advertised set) are supported for narrow strings.
fn encode_narrow(s: &str, codeset: u32) -> CorbaResult<Vec<u8>> {
    match codeset {
        crate::DEFAULT_CHAR_CODESET => {
            let mut out = Vec::with_capacity(s.len());
            for ch in s.chars() {
                let cp = ch as u32;
                if cp > 0xFF {
                    return Err(CorbaError::marshal(format!(
                        "character {ch:?} is not representable in ISO-8859-1"
                    )));
                }
                out.push(cp as u8);
            }
            Ok(out)
        }
        crate::NATIVE_CHAR_CODESET => Ok(s.as_bytes().to_vec()),
        other => Err(CorbaError::no_implement(format!(
            "unsupported char code set 0x{other:08x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sequence_big_endian() {
        let mut out = CdrOutput::new(Endian::Big);
        out.write_octet(0x01);
        out.write_short(0x0203);
        out.write_long(0x0405_0607);
        assert_eq!(
            out.into_bytes(),
            vec![0x01, 0x00, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]
        );
    }

    #[test]
    fn primitive_sequence_little_endian() {
        let mut out = CdrOutput::new(Endian::Little);
        out.write_octet(0x01);
        out.write_short(0x0203);
        out.write_long(0x0405_0607);
        assert_eq!(
            out.into_bytes(),
            vec![0x01, 0x00, 0x03, 0x02, 0x07, 0x06, 0x05, 0x04]
        );
    }

    #[test]
    fn string_round_trip_literal() {
        let mut out = CdrOutput::new(Endian::Big);
        out.write_string("Hello").unwrap();
        assert_eq!(
            out.into_bytes(),
            vec![0x00, 0x00, 0x00, 0x06, 0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x00]
        );
    }

    #[test]
    fn write_ulong_at_patches_without_moving_cursor() {
        let mut out = CdrOutput::new(Endian::Big);
        out.write_ulong(0);
        let mark = out.position();
        out.write_octet(0xAB);
        out.write_ulong_at(0, 42).unwrap();
        assert_eq!(out.position(), mark + 1);
        assert_eq!(&out.as_bytes()[0..4], &[0, 0, 0, 42]);
    }

    #[test]
    fn encapsulation_starts_with_byte_order_octet() {
        let out = CdrOutput::new_encapsulation(Endian::Little);
        assert_eq!(out.as_bytes(), &[1]);
    }

    #[test]
    fn base_offset_shifts_alignment_origin() {
        // body buffer starting after a 12-byte GIOP header: first 8-aligned write
        // lands at absolute offset 16, i.e. buffer offset 4.
        let mut out = CdrOutput::new(Endian::Big).with_base_offset(12);
        out.write_octet(0x01);
        out.write_double(1.0);
        assert_eq!(out.position(), 4 + 8);
    }

    #[test]
    fn growth_factor_reserves_geometrically() {
        let config = CdrBufferConfig::default().with_initial_capacity(1);
        let mut out = CdrOutput::with_config(Endian::Big, config);
        for i in 0..100u8 {
            out.write_octet(i);
        }
        assert_eq!(out.position(), 100);
    }
}
