//! Minimal GIF writer used to build test fixtures in code.
//!
//! The LZW stream it writes only ever uses literal codes and resets the dictionary before the
//! code width would grow, so the output is valid but not compressed.
#![allow(dead_code)]

pub type Rgb = [u8; 3];

#[derive(Clone, Debug)]
pub struct FixtureFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Row-major palette indices.
    pub indices: Vec<u8>,
    pub local_palette: Option<Vec<Rgb>>,
    pub transparent: Option<u8>,
    /// Raw disposal code (0..=7).
    pub disposal: u8,
    /// Delay in centiseconds.
    pub delay_cs: u16,
    pub interlaced: bool,
    /// Emit a graphic control extension in front of the image.
    pub control: bool,
    /// Replace the encoded image data with `(min_code_size, lzw_bytes)`.
    pub raw_lzw: Option<(u8, Vec<u8>)>,
}

impl FixtureFrame {
    pub fn new(width: u16, height: u16, indices: Vec<u8>) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
            indices,
            local_palette: None,
            transparent: None,
            disposal: 1,
            delay_cs: 10,
            interlaced: false,
            control: true,
            raw_lzw: None,
        }
    }

    pub fn filled(width: u16, height: u16, index: u8) -> Self {
        Self::new(width, height, vec![index; width as usize * height as usize])
    }

    pub fn at(mut self, left: u16, top: u16) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    pub fn disposal(mut self, code: u8) -> Self {
        self.disposal = code;
        self
    }

    pub fn delay_cs(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    pub fn transparent(mut self, index: u8) -> Self {
        self.transparent = Some(index);
        self
    }

    pub fn local_palette(mut self, palette: Vec<Rgb>) -> Self {
        self.local_palette = Some(palette);
        self
    }

    pub fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub fn without_control(mut self) -> Self {
        self.control = false;
        self
    }
}

#[derive(Clone, Debug)]
pub struct GifFixture {
    pub width: u16,
    pub height: u16,
    pub global_palette: Option<Vec<Rgb>>,
    pub loop_count: Option<u16>,
    pub comment: Option<Vec<u8>>,
    pub frames: Vec<FixtureFrame>,
    pub trailer: bool,
}

/// Palette used by most fixtures: 0 black, 1 red, 2 green, 3 blue.
pub fn rgbk_palette() -> Vec<Rgb> {
    vec![[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]]
}

impl GifFixture {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            global_palette: Some(rgbk_palette()),
            loop_count: None,
            comment: None,
            frames: Vec::new(),
            trailer: true,
        }
    }

    pub fn frame(mut self, frame: FixtureFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn looping(mut self, count: u16) -> Self {
        self.loop_count = Some(count);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"GIF89a");
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        match &self.global_palette {
            Some(p) => {
                let (size_bits, _) = table_size(p.len());
                out.push(0x80 | (size_bits << 4) | size_bits);
            }
            None => out.push(0),
        }
        out.push(0); // background index
        out.push(0); // aspect ratio
        if let Some(p) = &self.global_palette {
            write_palette(&mut out, p);
        }

        if let Some(n) = self.loop_count {
            out.extend_from_slice(&[0x21, 0xff, 11]);
            out.extend_from_slice(b"NETSCAPE2.0");
            out.extend_from_slice(&[3, 1]);
            out.extend_from_slice(&n.to_le_bytes());
            out.push(0);
        }
        if let Some(c) = &self.comment {
            out.extend_from_slice(&[0x21, 0xfe]);
            write_sub_blocks(&mut out, c);
        }

        for f in &self.frames {
            if f.control {
                out.extend_from_slice(&[0x21, 0xf9, 4]);
                let packed = ((f.disposal & 0x07) << 2) | u8::from(f.transparent.is_some());
                out.push(packed);
                out.extend_from_slice(&f.delay_cs.to_le_bytes());
                out.push(f.transparent.unwrap_or(0));
                out.push(0);
            }

            out.push(0x2c);
            out.extend_from_slice(&f.left.to_le_bytes());
            out.extend_from_slice(&f.top.to_le_bytes());
            out.extend_from_slice(&f.width.to_le_bytes());
            out.extend_from_slice(&f.height.to_le_bytes());
            let mut packed = 0u8;
            if f.interlaced {
                packed |= 0x40;
            }
            if let Some(p) = &f.local_palette {
                let (size_bits, _) = table_size(p.len());
                packed |= 0x80 | size_bits;
            }
            out.push(packed);
            if let Some(p) = &f.local_palette {
                write_palette(&mut out, p);
            }

            let palette_len = f
                .local_palette
                .as_ref()
                .or(self.global_palette.as_ref())
                .map_or(4, Vec::len);
            let (min_code_size, data) = match &f.raw_lzw {
                Some((m, d)) => (*m, d.clone()),
                None => {
                    let min = min_code_size_for(palette_len);
                    let rows = if f.interlaced {
                        interlace(&f.indices, f.width as usize, f.height as usize)
                    } else {
                        f.indices.clone()
                    };
                    (min, lzw_encode(min, &rows))
                }
            };
            out.push(min_code_size);
            write_sub_blocks(&mut out, &data);
        }

        if self.trailer {
            out.push(0x3b);
        }
        out
    }
}

fn table_size(len: usize) -> (u8, usize) {
    let mut bits = 0u8;
    while (2usize << bits) < len {
        bits += 1;
    }
    (bits, 2usize << bits)
}

fn write_palette(out: &mut Vec<u8>, palette: &[Rgb]) {
    let (_, padded) = table_size(palette.len());
    for i in 0..padded {
        out.extend_from_slice(&palette.get(i).copied().unwrap_or([0, 0, 0]));
    }
}

fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

pub fn min_code_size_for(palette_len: usize) -> u8 {
    let (bits, _) = table_size(palette_len);
    (bits + 1).max(2)
}

/// Rows reordered into the four-pass interlace order.
pub fn interlace(indices: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len());
    for (start, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        let mut y = start;
        while y < height {
            out.extend_from_slice(&indices[y * width..(y + 1) * width]);
            y += step;
        }
    }
    out
}

struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    nbits: u8,
}

impl BitWriter {
    fn write(&mut self, code: u16, width: u8) {
        self.acc |= u32::from(code) << self.nbits;
        self.nbits += width;
        while self.nbits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

/// Literal-only LZW: a clear code is written before the dictionary would force a wider code.
pub fn lzw_encode(min_code_size: u8, indices: &[u8]) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let eoi = clear + 1;
    let width = min_code_size + 1;
    let run = ((1usize << min_code_size) - 2).max(1);

    let mut w = BitWriter {
        out: Vec::new(),
        acc: 0,
        nbits: 0,
    };
    w.write(clear, width);
    for (i, chunk) in indices.chunks(run).enumerate() {
        if i > 0 {
            w.write(clear, width);
        }
        for &idx in chunk {
            w.write(u16::from(idx), width);
        }
    }
    w.write(eoi, width);
    w.finish()
}

/// Pack raw codes at a fixed width, for building deliberately broken streams.
pub fn pack_codes(codes: &[u16], width: u8) -> Vec<u8> {
    let mut w = BitWriter {
        out: Vec::new(),
        acc: 0,
        nbits: 0,
    };
    for &c in codes {
        w.write(c, width);
    }
    w.finish()
}

/// Pack `(code, width)` pairs, for streams whose code width changes mid-way.
pub fn pack_code_widths(codes: &[(u16, u8)]) -> Vec<u8> {
    let mut w = BitWriter {
        out: Vec::new(),
        acc: 0,
        nbits: 0,
    };
    for &(c, width) in codes {
        w.write(c, width);
    }
    w.finish()
}
