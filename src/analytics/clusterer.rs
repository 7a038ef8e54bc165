//! Spatial grouping of tracks by distance-graph connected components.

use ndarray::Array2;

use crate::entity::{Group, Track};

/// Groups tracks whose centers are transitively linked by short distances.
#[derive(Debug, Clone)]
pub struct GroupClusterer {
    threshold: f64,
}

impl Default for GroupClusterer {
    fn default() -> Self {
        Self::new(150.0)
    }
}

impl GroupClusterer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cluster `tracks` into groups of two or more members.
    ///
    /// Two tracks are adjacent when their centers are strictly closer than the
    /// threshold. Components are discovered in input order with an explicit stack,
    /// and group ids count up from 0 in discovery order. Singletons are dropped.
    pub fn cluster(&self, tracks: &[Track]) -> Vec<Group> {
        let n = tracks.len();
        if n < 2 {
            return Vec::new();
        }

        let centers: Vec<(i32, i32)> = tracks.iter().map(Track::center).collect();
        let adjacency = distance_matrix(&centers).mapv(|d| d < self.threshold);

        let mut visited = vec![false; n];
        let mut groups = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(curr) = stack.pop() {
                component.push(curr);
                for next in 0..n {
                    if adjacency[[curr, next]] && !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }

            if component.len() > 1 {
                groups.push(Group {
                    group_id: groups.len(),
                    members: component.iter().map(|&i| tracks[i].track_id).collect(),
                    centroid: mean_center(component.iter().map(|&i| centers[i])),
                });
            }
        }

        groups
    }
}

/// Pairwise Euclidean distances between centers, shape (N, N).
pub fn distance_matrix(centers: &[(i32, i32)]) -> Array2<f64> {
    let n = centers.len();
    let mut dists = Array2::zeros((n, n));
    for (i, a) in centers.iter().enumerate() {
        for (j, b) in centers.iter().enumerate().skip(i + 1) {
            let d = (a.0 as f64 - b.0 as f64).hypot(a.1 as f64 - b.1 as f64);
            dists[[i, j]] = d;
            dists[[j, i]] = d;
        }
    }
    dists
}

/// Integer mean of the given points, truncated toward zero.
fn mean_center(points: impl Iterator<Item = (i32, i32)>) -> (i32, i32) {
    let (mut sx, mut sy, mut count) = (0i64, 0i64, 0i64);
    for (x, y) in points {
        sx += x as i64;
        sy += y as i64;
        count += 1;
    }
    if count == 0 {
        return (0, 0);
    }
    (
        (sx as f64 / count as f64).trunc() as i32,
        (sy as f64 / count as f64).trunc() as i32,
    )
}
