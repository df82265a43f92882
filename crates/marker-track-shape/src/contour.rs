//! External contour extraction and polygon geometry.

use nalgebra::Point2;

use marker_track_core::Mask;

/// Closed boundary polygon in pixel coordinates, wound as traced
/// (clockwise in image coordinates, y down).
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub points: Vec<Point2<f32>>,
}

impl Contour {
    /// Shoelace area of the closed polygon.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0f32;
        for (a, b) in self.edges() {
            sum += a.x * b.y - b.x * a.y;
        }
        (sum * 0.5).abs()
    }

    /// Length of the closed boundary.
    pub fn perimeter(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Polygon centroid; falls back to the vertex mean for degenerate
    /// (near-zero-area) contours.
    pub fn centroid(&self) -> Point2<f32> {
        let n = self.points.len();
        if n == 0 {
            return Point2::new(0.0, 0.0);
        }
        let mut cx = 0.0f32;
        let mut cy = 0.0f32;
        let mut signed_area = 0.0f32;
        for (a, b) in self.edges() {
            let cross = a.x * b.y - b.x * a.y;
            signed_area += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        if signed_area.abs() > 1e-3 {
            let scale = 1.0 / (3.0 * signed_area);
            Point2::new(cx * scale, cy * scale)
        } else {
            let inv = 1.0 / n as f32;
            let sx: f32 = self.points.iter().map(|p| p.x).sum();
            let sy: f32 = self.points.iter().map(|p| p.y).sum();
            Point2::new(sx * inv, sy * inv)
        }
    }

    /// Ray-casting point-in-polygon test (boundary counts as inside
    /// loosely, which is adequate for pixel contours).
    pub fn contains(&self, p: Point2<f32>) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn edges(&self) -> impl Iterator<Item = (Point2<f32>, Point2<f32>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// Clockwise 8-neighborhood starting east, y pointing down.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Extract the outer boundary of every 8-connected component.
///
/// Components are labeled by flood fill first, then each outer boundary
/// is traced once with Moore neighbor following.
pub fn find_external_contours(mask: &Mask) -> Vec<Contour> {
    let width = mask.width as i32;
    let height = mask.height as i32;
    let mut labels = vec![0u32; mask.width * mask.height];
    let mut contours = Vec::new();
    let mut next_label = 0u32;

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if !mask.get(x as usize, y as usize) || labels[idx] != 0 {
                continue;
            }
            next_label += 1;
            flood_fill(mask, &mut labels, (x, y), next_label);

            let label = next_label;
            let is_on = |px: i32, py: i32| -> bool {
                px >= 0
                    && py >= 0
                    && px < width
                    && py < height
                    && labels[(py * width + px) as usize] == label
            };
            let boundary = trace_boundary(&is_on, (x, y));
            contours.push(Contour {
                points: boundary
                    .into_iter()
                    .map(|(px, py)| Point2::new(px as f32, py as f32))
                    .collect(),
            });
        }
    }
    contours
}

fn flood_fill(mask: &Mask, labels: &mut [u32], start: (i32, i32), label: u32) {
    let width = mask.width as i32;
    let height = mask.height as i32;
    let mut stack = vec![start];
    labels[(start.1 * width + start.0) as usize] = label;
    while let Some((x, y)) = stack.pop() {
        for (dx, dy) in DIRS {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            let idx = (ny * width + nx) as usize;
            if labels[idx] == 0 && mask.get(nx as usize, ny as usize) {
                labels[idx] = label;
                stack.push((nx, ny));
            }
        }
    }
}

/// Moore neighbor tracing from the component's topmost-leftmost pixel.
///
/// The start pixel has clear west and north neighbors, so the first
/// clockwise probe starts at north-west. Terminates on Jacob's criterion:
/// re-entering the start pixel with the same initial move.
fn trace_boundary(is_on: &dyn Fn(i32, i32) -> bool, start: (i32, i32)) -> Vec<(i32, i32)> {
    let mut points = vec![start];
    let mut cur = start;
    let mut search = 5usize; // north-west
    let mut first_move: Option<((i32, i32), usize)> = None;

    // generous cap; a boundary never exceeds the component's pixel count * 4
    let cap = 1 << 22;
    for _ in 0..cap {
        let mut step = None;
        for k in 0..8 {
            let d = (search + k) % 8;
            let (dx, dy) = DIRS[d];
            let next = (cur.0 + dx, cur.1 + dy);
            if is_on(next.0, next.1) {
                step = Some((d, next));
                break;
            }
        }
        let Some((d, next)) = step else {
            break; // isolated pixel
        };
        match first_move {
            Some(first) if first == (cur, d) => break,
            None => first_move = Some((cur, d)),
            _ => {}
        }
        cur = next;
        points.push(cur);
        search = (d + 6) % 8;
    }

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The ring is split at two mutually distant anchors and each open chain
/// is simplified independently; vertices farther than `tolerance` from
/// the chord survive.
pub fn approx_polygon(points: &[Point2<f32>], tolerance: f32) -> Vec<Point2<f32>> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let p0 = points[0];
    let mut far = 0usize;
    let mut far_d = 0.0f32;
    for (i, p) in points.iter().enumerate() {
        let d = (p - p0).norm_squared();
        if d > far_d {
            far_d = d;
            far = i;
        }
    }
    if far == 0 {
        return vec![p0];
    }

    let first: Vec<Point2<f32>> = points[..=far].to_vec();
    let mut second: Vec<Point2<f32>> = points[far..].to_vec();
    second.push(p0);

    let mut out = dp_chain(&first, tolerance);
    out.pop(); // shared anchor, re-added by the second chain
    let tail = dp_chain(&second, tolerance);
    out.extend_from_slice(&tail[..tail.len() - 1]); // drop closing p0
    out
}

fn dp_chain(chain: &[Point2<f32>], tolerance: f32) -> Vec<Point2<f32>> {
    if chain.len() <= 2 {
        return chain.to_vec();
    }
    let a = chain[0];
    let b = chain[chain.len() - 1];
    let mut worst = 0usize;
    let mut worst_d = 0.0f32;
    for (i, p) in chain.iter().enumerate().skip(1).take(chain.len() - 2) {
        let d = perpendicular_distance(*p, a, b);
        if d > worst_d {
            worst_d = d;
            worst = i;
        }
    }
    if worst_d <= tolerance {
        return vec![a, b];
    }
    let mut left = dp_chain(&chain[..=worst], tolerance);
    let right = dp_chain(&chain[worst..], tolerance);
    left.pop();
    left.extend(right);
    left
}

fn perpendicular_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}
