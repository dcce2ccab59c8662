use crate::foundation::error::DecodeError;

const MAX_CODE_BITS: u8 = 12;
const MAX_CODES: usize = 1 << MAX_CODE_BITS;

/// LSB-first bit reader over the concatenated image data sub-blocks.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    nbits: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            nbits: 0,
        }
    }

    fn read(&mut self, width: u8) -> Option<u16> {
        while self.nbits < width {
            let b = *self.data.get(self.pos)?;
            self.pos += 1;
            self.acc |= u32::from(b) << self.nbits;
            self.nbits += 8;
        }
        let code = (self.acc & ((1u32 << width) - 1)) as u16;
        self.acc >>= width;
        self.nbits -= width;
        Some(code)
    }
}

/// Dictionary stored as prefix links; each entry also remembers its first byte and length so
/// expansion can write backwards into the output without a scratch stack.
struct Dictionary {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    len: Vec<u16>,
}

impl Dictionary {
    fn new(clear: u16) -> Self {
        let mut dict = Self {
            prefix: vec![0; MAX_CODES],
            suffix: vec![0; MAX_CODES],
            first: vec![0; MAX_CODES],
            len: vec![0; MAX_CODES],
        };
        for code in 0..clear {
            let c = code as usize;
            dict.suffix[c] = code as u8;
            dict.first[c] = code as u8;
            dict.len[c] = 1;
        }
        dict
    }

    fn expand_into(&self, code: u16, out: &mut Vec<u8>) {
        let len = self.len[code as usize] as usize;
        let start = out.len();
        out.resize(start + len, 0);
        let mut c = code as usize;
        for slot in out[start..].iter_mut().rev() {
            *slot = self.suffix[c];
            c = self.prefix[c] as usize;
        }
    }

    fn push(&mut self, at: u16, prefix: u16, suffix: u8) {
        let (i, p) = (at as usize, prefix as usize);
        self.prefix[i] = prefix;
        self.suffix[i] = suffix;
        self.first[i] = self.first[p];
        self.len[i] = self.len[p] + 1;
    }
}

/// Decompress one frame's LZW stream into exactly `expected` palette indices.
///
/// `min_code_size` is the value stored in front of the image data sub-blocks. Decoding stops
/// at the end-of-information code or when the data runs out; in both cases the produced count
/// must equal `expected`.
pub(crate) fn decompress(
    min_code_size: u8,
    data: &[u8],
    expected: usize,
) -> Result<Vec<u8>, DecodeError> {
    if !(1..=8).contains(&min_code_size) {
        return Err(DecodeError::UnsupportedColorDepth { min_code_size });
    }

    let clear: u16 = 1 << min_code_size;
    let eoi = clear + 1;
    let mut width = min_code_size + 1;
    let mut next = eoi + 1;
    let mut prev: Option<u16> = None;

    let mut dict = Dictionary::new(clear);
    let mut bits = BitReader::new(data);
    let mut out = Vec::with_capacity(expected);

    while let Some(code) = bits.read(width) {
        if code == clear {
            width = min_code_size + 1;
            next = eoi + 1;
            prev = None;
            continue;
        }
        if code == eoi {
            break;
        }

        match prev {
            None => {
                if code >= clear {
                    return Err(DecodeError::InvalidCode { code, next });
                }
                dict.expand_into(code, &mut out);
            }
            Some(p) => {
                let first = if code < next {
                    dict.expand_into(code, &mut out);
                    dict.first[code as usize]
                } else if code == next {
                    // KwKwK: the code being defined is the previous string plus its own first byte.
                    let first = dict.first[p as usize];
                    dict.expand_into(p, &mut out);
                    out.push(first);
                    first
                } else {
                    return Err(DecodeError::InvalidCode { code, next });
                };

                if (next as usize) < MAX_CODES {
                    dict.push(next, p, first);
                    next += 1;
                    if next == (1 << width) && width < MAX_CODE_BITS {
                        width += 1;
                    }
                }
            }
        }
        prev = Some(code);

        if out.len() > expected {
            return Err(DecodeError::PixelCountMismatch {
                expected,
                actual: out.len(),
            });
        }
    }

    if out.len() != expected {
        return Err(DecodeError::PixelCountMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/lzw.rs"]
mod tests;
