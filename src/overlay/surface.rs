#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        DirtyRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Straight-alpha RGBA8 pixel grid. The ink layer starts fully transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InkLayer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl InkLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = self.index(x, y);
        Rgba::new(
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        )
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        let idx = self.index(x, y);
        self.pixels[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn painted_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    /// New layer of the given size holding the overlapping region of `self`.
    pub fn resized(&self, width: u32, height: u32) -> InkLayer {
        let mut out = InkLayer::new(width, height);
        let copy_w = self.width.min(width) as usize;
        for y in 0..self.height.min(height) {
            let src = self.index(0, y);
            let dst = out.index(0, y);
            out.pixels[dst..dst + copy_w * 4].copy_from_slice(&self.pixels[src..src + copy_w * 4]);
        }
        out
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }
}
