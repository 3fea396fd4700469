/// Framebuffer for software rendering
/// Dense row-major `0x00RRGGBB` pixels, row 0 at the top
///
/// Workers never share rows: the buffer is carved into disjoint
/// stripes with `split_at_mut`, so parallel writes need no locking.

/// View into a contiguous set of rows in the framebuffer.
/// Used for multi-core raycasting where each worker owns a disjoint slice.
pub struct FrameSlice<'a> {
    pub width: usize,
    pub full_height: usize,
    pub y0: usize,
    pub height: usize,
    pub color: &'a mut [u32],
}

impl<'a> FrameSlice<'a> {
    /// Write a pixel addressed by its framebuffer row.
    /// Rows outside this slice are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y_global: usize, color: u32) {
        if x >= self.width || y_global < self.y0 {
            return;
        }
        let y_local = y_global - self.y0;
        if y_local >= self.height {
            return;
        }
        self.color[y_local * self.width + x] = color;
    }

    /// Fill the rectangle `[x0, x1) x [y0, y1)` clipped to this slice
    #[inline]
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: u32) {
        let x1 = x1.min(self.width);
        let y_start = y0.max(self.y0);
        let y_end = y1.min(self.y0 + self.height);
        if x0 >= x1 {
            return;
        }
        for y in y_start..y_end {
            let row = (y - self.y0) * self.width;
            self.color[row + x0..row + x1].fill(color);
        }
    }

    /// Get slice bounds: (x0, y0, x1, y1) in global framebuffer coordinates
    #[inline(always)]
    pub fn bounds(&self) -> (usize, usize, usize, usize) {
        (0, self.y0, self.width, self.y0 + self.height)
    }
}

pub struct Framebuffer {
    // Hot data: used for every bounds check and index calculation
    pub width: usize,
    pub height: usize,
    pub color_buffer: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            color_buffer: vec![0; width * height],
        }
    }

    /// Row-major pixels for the presenter
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.color_buffer
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.color_buffer[y * self.width + x])
    }

    /// Resize framebuffer
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.color_buffer.resize(width * height, 0);
    }

    /// Split the framebuffer into horizontal stripes for multi-core rendering.
    /// Each stripe owns a disjoint subset of rows, so they can be rendered in parallel.
    /// Every stripe except the last starts and ends on a multiple of `row_alignment`.
    pub fn split_into_stripes(&mut self, stripes: usize, row_alignment: usize) -> Vec<FrameSlice<'_>> {
        let stripes = stripes.max(1);
        let row_alignment = row_alignment.max(1);
        let width = self.width;
        let height = self.height;

        let mut slices = Vec::with_capacity(stripes);
        let mut remaining_color: &mut [u32] = self.color_buffer.as_mut_slice();

        let mut y0 = 0usize;
        let min_rows_per_stripe = (height + stripes - 1) / stripes;
        let rows_per_stripe =
            ((min_rows_per_stripe + row_alignment - 1) / row_alignment).max(1) * row_alignment;

        while y0 < height {
            let rows = (height - y0).min(rows_per_stripe);
            let (color_head, color_tail) = remaining_color.split_at_mut(rows * width);

            slices.push(FrameSlice {
                width,
                full_height: height,
                y0,
                height: rows,
                color: color_head,
            });

            remaining_color = color_tail;
            y0 += rows;
        }

        slices
    }
}
