// src/services/mask.rs
//! Binary pixel masks: morphology and connected-region selection.

/// A width x height grid of selected / unselected pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.set(x, y, f(x, y));
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let i = self.index(x, y);
        self.bits[i] = value;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|b| *b)
    }

    fn zip_with(&self, other: &Mask, f: impl Fn(bool, bool) -> bool) -> Mask {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "mask extents must match"
        );
        Mask {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }

    pub fn and(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn union(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn and_not(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && !b)
    }

    /// Applies a square `size` x `size` window. Neighbours outside the image
    /// are skipped, so borders neither erode nor dilate.
    fn sweep(&self, size: u32, erode: bool) -> Mask {
        let r = (size / 2) as i64;
        let (w, h) = (self.width as i64, self.height as i64);
        Mask::from_fn(self.width, self.height, |x, y| {
            let mut window = (-r..=r).flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)));
            let inside = |(dx, dy): (i64, i64)| {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                (nx >= 0 && nx < w && ny >= 0 && ny < h).then(|| self.get(nx as u32, ny as u32))
            };
            if erode {
                window.all(|d| inside(d).unwrap_or(true))
            } else {
                window.any(|d| inside(d).unwrap_or(false))
            }
        })
    }

    pub fn erode(&self, size: u32) -> Mask {
        self.sweep(size, true)
    }

    pub fn dilate(&self, size: u32) -> Mask {
        self.sweep(size, false)
    }

    /// Erode then dilate: removes specks smaller than the element.
    pub fn open(&self, size: u32) -> Mask {
        self.erode(size).dilate(size)
    }

    /// Dilate then erode: fills gaps smaller than the element.
    pub fn close(&self, size: u32) -> Mask {
        self.dilate(size).erode(size)
    }

    /// Labels 8-connected regions, largest first.
    pub fn regions(&self) -> Vec<Vec<(u32, u32)>> {
        let mut visited = vec![false; self.bits.len()];
        let mut regions = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let start = self.index(x, y);
                if !self.bits[start] || visited[start] {
                    continue;
                }

                visited[start] = true;
                let mut queue = vec![(x, y)];
                let mut region = Vec::new();

                while let Some((cx, cy)) = queue.pop() {
                    region.push((cx, cy));
                    for (nx, ny) in self.neighbours(cx, cy, true) {
                        let i = self.index(nx, ny);
                        if self.bits[i] && !visited[i] {
                            visited[i] = true;
                            queue.push((nx, ny));
                        }
                    }
                }

                regions.push(region);
            }
        }

        regions.sort_by(|a, b| b.len().cmp(&a.len()));
        regions
    }

    /// Keeps only the largest connected region, with enclosed holes filled.
    /// A mask with no selected pixels is returned unchanged.
    pub fn keep_largest_region(&self) -> Mask {
        let Some(largest) = self.regions().into_iter().next() else {
            return self.clone();
        };

        let mut region = Mask::new(self.width, self.height);
        for (x, y) in largest {
            region.set(x, y, true);
        }
        region.fill_holes()
    }

    /// Selects every unselected pixel that cannot reach the border through
    /// other unselected pixels.
    fn fill_holes(&self) -> Mask {
        let mut outside = vec![false; self.bits.len()];
        let mut queue = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let on_border =
                    x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height;
                let i = self.index(x, y);
                if on_border && !self.bits[i] {
                    outside[i] = true;
                    queue.push((x, y));
                }
            }
        }

        while let Some((cx, cy)) = queue.pop() {
            for (nx, ny) in self.neighbours(cx, cy, false) {
                let i = self.index(nx, ny);
                if !self.bits[i] && !outside[i] {
                    outside[i] = true;
                    queue.push((nx, ny));
                }
            }
        }

        Mask {
            width: self.width,
            height: self.height,
            bits: outside.into_iter().map(|o| !o).collect(),
        }
    }

    fn neighbours(&self, x: u32, y: u32, diagonal: bool) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if (dx == 0 && dy == 0) || (!diagonal && dx != 0 && dy != 0) {
                    continue;
                }
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx >= 0 && nx < self.width as i64 && ny >= 0 && ny < self.height as i64 {
                    out.push((nx as u32, ny as u32));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
        Mask::from_fn(w, h, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1)
    }

    #[test]
    fn opening_removes_specks_but_keeps_large_blocks() {
        let mut mask = rect(30, 30, 5, 5, 20, 20);
        mask.set(27, 27, true);

        let opened = mask.open(5);
        assert!(!opened.get(27, 27));
        assert_eq!(opened, rect(30, 30, 5, 5, 20, 20));
    }

    #[test]
    fn closing_fills_narrow_gaps() {
        let mut mask = rect(30, 30, 5, 5, 20, 20);
        mask.set(12, 12, false);

        let closed = mask.close(5);
        assert!(closed.get(12, 12));
        assert_eq!(closed.count(), 15 * 15);
    }

    #[test]
    fn borders_do_not_erode() {
        let full = Mask::from_fn(10, 10, |_, _| true);
        assert_eq!(full.erode(5), full);
    }

    #[test]
    fn largest_region_wins_and_holes_are_filled() {
        let big = rect(40, 40, 2, 2, 22, 22);
        let small = rect(40, 40, 30, 30, 35, 35);
        let mut mask = big.union(&small);
        // hole inside the big region
        for y in 8..12 {
            for x in 8..12 {
                mask.set(x, y, false);
            }
        }

        let kept = mask.keep_largest_region();
        assert_eq!(kept, big);
    }

    #[test]
    fn diagonal_pixels_connect() {
        let mut mask = Mask::new(5, 5);
        mask.set(1, 1, true);
        mask.set(2, 2, true);
        assert_eq!(mask.regions().len(), 1);
    }

    #[test]
    fn empty_mask_has_no_regions() {
        let mask = Mask::new(6, 6);
        assert!(mask.regions().is_empty());
        assert!(mask.keep_largest_region().is_empty());
    }

    #[test]
    fn set_operations() {
        let a = rect(10, 1, 0, 0, 6, 1);
        let b = rect(10, 1, 4, 0, 10, 1);
        assert_eq!(a.and(&b).count(), 2);
        assert_eq!(a.union(&b).count(), 10);
        assert_eq!(a.and_not(&b).count(), 4);
    }
}
