/// Binary membership mask, one byte per pixel (0 or 255), tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Mask {
    /// All-zero mask of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.data[y * self.width + x] = if on { 255 } else { 0 };
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_count() {
        let mut mask = Mask::new(4, 3);
        assert_eq!(mask.count(), 0);
        mask.set(1, 2, true);
        mask.set(3, 0, true);
        assert!(mask.get(1, 2));
        assert!(!mask.get(0, 0));
        assert_eq!(mask.count(), 2);
        mask.set(1, 2, false);
        assert_eq!(mask.count(), 1);
    }
}
