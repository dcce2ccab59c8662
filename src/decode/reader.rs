use crate::foundation::error::DecodeError;

/// Bounds-checked cursor over the source bytes. Every read names what it was reading so a
/// truncation error points at the block that was cut short.
#[derive(Clone, Debug)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.pos
    }

    #[cfg(test)]
    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub(crate) fn u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(DecodeError::Truncated { context })?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn u16_le(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        let b = self.bytes(2, context)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::Truncated { context })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Read a chain of length-prefixed sub-blocks up to the zero terminator and return their
    /// concatenated payload.
    pub(crate) fn sub_blocks(&mut self, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        loop {
            let len = self.u8(context)? as usize;
            if len == 0 {
                return Ok(out);
            }
            out.extend_from_slice(self.bytes(len, context)?);
        }
    }

    pub(crate) fn skip_sub_blocks(&mut self, context: &'static str) -> Result<(), DecodeError> {
        loop {
            let len = self.u8(context)? as usize;
            if len == 0 {
                return Ok(());
            }
            self.bytes(len, context)?;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/reader.rs"]
mod tests;
