use serde::Serialize;

/// Axis aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection with an image of the given size. `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.width, b.x + b.width)
        && close(a.y + a.height, b.y + b.height)
}

fn find(parents: &mut [usize], mut node: usize) -> usize {
    while parents[node] != node {
        parents[node] = parents[parents[node]];
        node = parents[node];
    }
    node
}

/// Splits rectangles into equivalence classes of similar rectangles. Class ids follow the order
/// in which classes first appear in `rects`.
fn partition(rects: &[Rect], eps: f64) -> (Vec<usize>, usize) {
    let mut parents = (0..rects.len()).collect::<Vec<_>>();
    for i in 0..rects.len() {
        for j in i + 1..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let a = find(&mut parents, i);
                let b = find(&mut parents, j);
                if a != b {
                    parents[a.max(b)] = a.min(b);
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut classes = 0;
    let mut labels = Vec::with_capacity(rects.len());
    for i in 0..rects.len() {
        let root = find(&mut parents, i);
        if class_of_root[root] == usize::MAX {
            class_of_root[root] = classes;
            classes += 1;
        }
        labels.push(class_of_root[root]);
    }
    (labels, classes)
}

/// Merges raw detector hits. Clusters with `min_neighbors` or fewer members are dropped, the rest
/// are averaged, and averaged rectangles sitting inside a better supported one are suppressed.
/// With `min_neighbors == 0` the hits are returned untouched.
pub fn group_rectangles(rects: &[Rect], min_neighbors: u32, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, classes) = partition(rects, eps);
    let mut sums = vec![[0u64; 4]; classes];
    let mut counts = vec![0u32; classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        let sum = &mut sums[label];
        sum[0] += rect.x as u64;
        sum[1] += rect.y as u64;
        sum[2] += rect.width as u64;
        sum[3] += rect.height as u64;
        counts[label] += 1;
    }

    let averaged = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            let mean = |v: u64| (v as f64 / count as f64).round() as u32;
            Rect::new(mean(sum[0]), mean(sum[1]), mean(sum[2]), mean(sum[3]))
        })
        .collect::<Vec<_>>();

    let mut grouped = vec![];
    for (i, inner) in averaged.iter().enumerate() {
        let inner_count = counts[i];
        if inner_count <= min_neighbors {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, outer)| {
            let outer_count = counts[j];
            if j == i || outer_count <= min_neighbors {
                return false;
            }
            let dx = (outer.width as f64 * eps).round() as i64;
            let dy = (outer.height as f64 * eps).round() as i64;
            let (ix, iy, iw, ih) = (inner.x as i64, inner.y as i64, inner.width as i64, inner.height as i64);
            let (ox, oy, ow, oh) = (outer.x as i64, outer.y as i64, outer.width as i64, outer.height as i64);
            ix >= ox - dx
                && iy >= oy - dy
                && ix + iw <= ox + ow + dx
                && iy + ih <= oy + oh + dy
                && (outer_count > inner_count.max(3) || inner_count < 3)
        });
        if !swallowed {
            grouped.push(*inner);
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{group_rectangles, Rect};

    #[test]
    fn clusters_are_averaged() {
        let rects = [
            Rect::new(10, 10, 20, 20),
            Rect::new(12, 10, 20, 20),
            Rect::new(10, 12, 20, 20),
            Rect::new(12, 12, 20, 20),
            Rect::new(80, 80, 20, 20),
        ];
        let grouped = group_rectangles(&rects, 2, 0.2);
        assert_eq!(grouped, vec![Rect::new(11, 11, 20, 20)]);
    }

    #[test]
    fn zero_neighbors_keeps_raw_hits() {
        let rects = [Rect::new(1, 1, 5, 5), Rect::new(1, 1, 5, 5)];
        assert_eq!(group_rectangles(&rects, 0, 0.2), rects.to_vec());
        assert!(group_rectangles(&[], 3, 0.2).is_empty());
    }

    #[test]
    fn weak_nested_cluster_is_suppressed() {
        let mut rects = vec![];
        for shift in 0..6 {
            rects.push(Rect::new(40 + shift, 40, 60, 60));
        }
        for shift in 0..2 {
            rects.push(Rect::new(50 + shift, 50, 20, 20));
        }
        let grouped = group_rectangles(&rects, 1, 0.2);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 60);
    }

    #[test]
    fn clamping() {
        assert_eq!(
            Rect::new(90, 5, 20, 10).clamp_to(100, 100),
            Some(Rect::new(90, 5, 10, 10))
        );
        assert_eq!(Rect::new(100, 5, 20, 10).clamp_to(100, 100), None);
    }
}
