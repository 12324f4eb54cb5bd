use image::GrayImage;

/// Summed-area tables of a grayscale image: plain sums, sums of squares and, when requested, the
/// 45 degree rotated sums used by tilted Haar features.
///
/// All tables are `(width + 1) x (height + 1)` with a zero first row and column, so the sum of
/// the rectangle `[x, x + w) x [y, y + h)` is four lookups.
pub struct IntegralImage {
    stride: usize,
    sum: Vec<i64>,
    squares: Vec<i64>,
    tilted: Option<Vec<i64>>,
}

impl IntegralImage {
    pub fn new(image: &GrayImage, with_tilted: bool) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let rows = height as usize + 1;
        let mut sum = vec![0i64; stride * rows];
        let mut squares = vec![0i64; stride * rows];

        for y in 0..height as usize {
            let mut row_sum = 0i64;
            let mut row_squares = 0i64;
            for x in 0..width as usize {
                let value = image.get_pixel(x as u32, y as u32)[0] as i64;
                row_sum += value;
                row_squares += value * value;
                let index = (y + 1) * stride + x + 1;
                sum[index] = sum[index - stride] + row_sum;
                squares[index] = squares[index - stride] + row_squares;
            }
        }

        let tilted = with_tilted.then(|| tilted_table(image));

        Self {
            stride,
            sum,
            squares,
            tilted,
        }
    }

    fn at(&self, table: &[i64], x: u32, y: u32) -> i64 {
        table[y as usize * self.stride + x as usize]
    }

    fn area(&self, table: &[i64], x: u32, y: u32, w: u32, h: u32) -> i64 {
        self.at(table, x, y) - self.at(table, x + w, y) - self.at(table, x, y + h)
            + self.at(table, x + w, y + h)
    }

    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        self.area(&self.sum, x, y, w, h)
    }

    pub fn rect_square_sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        self.area(&self.squares, x, y, w, h)
    }

    /// Sum of the rectangle rotated by 45 degrees whose top corner is `(x, y)`, `w` pixels along
    /// the down-right edge and `h` along the down-left edge. Requires `x >= h`.
    ///
    /// # Panics
    /// When the table was built without tilted sums.
    pub fn tilted_sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        let table = self
            .tilted
            .as_deref()
            .expect("tilted sums were not computed for this image");
        self.at(table, x, y) - self.at(table, x - h, y + h) - self.at(table, x + w, y + w)
            + self.at(table, x + w - h, y + w + h)
    }
}

/// `T(X, Y)` is the sum of pixels `(x, y)` with `y < Y` and `|x - X + 1| <= Y - y - 1`, an upside
/// down triangle whose apex is the pixel `(X - 1, Y - 1)`. It obeys
/// `T(X, Y) = T(X - 1, Y - 1) + T(X + 1, Y - 1) - T(X, Y - 2) + I(X - 1, Y - 1) + I(X - 1, Y - 2)`.
/// The recurrence reads one column outside the current range on every row, so it runs over a
/// grid padded by `height + 1` columns on both sides.
fn tilted_table(image: &GrayImage) -> Vec<i64> {
    let (width, height) = image.dimensions();
    let pad = height as i64 + 1;
    let columns = (width as i64 + 1 + 2 * pad) as usize;
    let rows = height as usize + 1;
    let mut grid = vec![0i64; columns * rows];

    let pixel = |x: i64, y: i64| -> i64 {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            0
        } else {
            image.get_pixel(x as u32, y as u32)[0] as i64
        }
    };

    for row in 1..rows {
        for column in 0..columns {
            let x = column as i64 - pad;
            let y = row as i64;
            let mut value = pixel(x - 1, y - 1) + pixel(x - 1, y - 2);
            if column > 0 {
                value += grid[(row - 1) * columns + column - 1];
            }
            if column + 1 < columns {
                value += grid[(row - 1) * columns + column + 1];
            }
            if row >= 2 {
                value -= grid[(row - 2) * columns + column];
            }
            grid[row * columns + column] = value;
        }
    }

    let stride = width as usize + 1;
    let mut table = vec![0i64; stride * rows];
    for row in 0..rows {
        let offset = row * columns + pad as usize;
        table[row * stride..(row + 1) * stride].copy_from_slice(&grid[offset..offset + stride]);
    }
    table
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::IntegralImage;

    fn random_image(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]))
    }

    fn brute_tilted(image: &GrayImage, big_x: i64, big_y: i64) -> i64 {
        let mut total = 0;
        for y in 0..image.height() as i64 {
            for x in 0..image.width() as i64 {
                if y < big_y && (x - big_x + 1).abs() <= big_y - y - 1 {
                    total += image.get_pixel(x as u32, y as u32)[0] as i64;
                }
            }
        }
        total
    }

    #[test]
    fn upright_sums_match_brute_force() {
        let image = random_image(13, 9, 3);
        let integral = IntegralImage::new(&image, false);
        let (x, y, w, h) = (2, 3, 7, 5);
        let mut sum = 0;
        let mut squares = 0;
        for py in y..y + h {
            for px in x..x + w {
                let v = image.get_pixel(px, py)[0] as i64;
                sum += v;
                squares += v * v;
            }
        }
        assert_eq!(integral.rect_sum(x, y, w, h), sum);
        assert_eq!(integral.rect_square_sum(x, y, w, h), squares);
        assert_eq!(integral.rect_sum(0, 0, 13, 9), image.pixels().map(|p| p[0] as i64).sum::<i64>());
        assert!(integral.tilted.is_none());
    }

    #[test]
    fn tilted_table_matches_definition() {
        let image = random_image(11, 8, 9);
        let integral = IntegralImage::new(&image, true);
        let table = integral.tilted.as_deref().unwrap();
        for big_y in 0..=8 {
            for big_x in 0..=11 {
                assert_eq!(
                    table[big_y as usize * 12 + big_x as usize],
                    brute_tilted(&image, big_x, big_y),
                    "T({big_x}, {big_y})"
                );
            }
        }
    }

    #[test]
    fn tilted_rect_covers_twice_its_sides() {
        let image = GrayImage::from_pixel(16, 16, Luma([3]));
        let integral = IntegralImage::new(&image, true);
        assert_eq!(integral.tilted_sum(2, 0, 1, 1), 2 * 3);
        assert_eq!(integral.tilted_sum(3, 0, 2, 1), 2 * 2 * 3);
        assert_eq!(integral.tilted_sum(6, 2, 4, 3), 2 * 4 * 3 * 3);
    }
}
