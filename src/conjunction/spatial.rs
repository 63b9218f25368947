//! k-d tree for per-tick nearest-neighbour queries
//!
//! Built once per tick over the hazard positions and thrown away afterwards.
//! The tree is stored implicitly: a permutation of point indices where each
//! subrange's median is the splitting node, so there are no node
//! allocations beyond one `Vec<usize>`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Vector3;

/// One query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the point slice the tree was built from
    pub index: usize,
    /// Euclidean distance to the query point
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    index: usize,
}

// Ordered by (distance, index) so equal distances resolve deterministically
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

fn distance_sq(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).norm_squared()
}

pub struct KdTree<'a> {
    points: &'a [Vector3<f64>],
    order: Vec<usize>,
}

impl<'a> KdTree<'a> {
    /// Build over `points`. Points must be finite.
    pub fn build(points: &'a [Vector3<f64>]) -> Self {
        let mut order: Vec<usize> = (0..points.len()).collect();
        split(points, &mut order, 0);
        Self { points, order }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `k` nearest points, closest first. Fewer are returned when the
    /// tree holds fewer than `k` points.
    pub fn nearest(&self, query: &Vector3<f64>, k: usize) -> Vec<Neighbor> {
        let k = k.min(self.points.len());
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(query, k, 0, self.order.len(), 0, &mut heap);
        into_neighbors(heap)
    }

    fn search(
        &self,
        query: &Vector3<f64>,
        k: usize,
        lo: usize,
        hi: usize,
        depth: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let index = self.order[mid];
        let point = &self.points[index];

        offer(
            heap,
            k,
            Candidate {
                dist_sq: distance_sq(query, point),
                index,
            },
        );

        let axis = depth % 3;
        let diff = query[axis] - point[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(query, k, near.0, near.1, depth + 1, heap);

        // Inclusive so a far-side point at exactly the current worst
        // distance can still win on index
        let worst = heap.peek().map_or(f64::INFINITY, |c| c.dist_sq);
        if heap.len() < k || diff * diff <= worst {
            self.search(query, k, far.0, far.1, depth + 1, heap);
        }
    }
}

fn split(points: &[Vector3<f64>], order: &mut [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }
    let axis = depth % 3;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| points[a][axis].total_cmp(&points[b][axis]));

    let (left, rest) = order.split_at_mut(mid);
    split(points, left, depth + 1);
    split(points, &mut rest[1..], depth + 1);
}

fn offer(heap: &mut BinaryHeap<Candidate>, k: usize, candidate: Candidate) {
    if heap.len() < k {
        heap.push(candidate);
    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
        heap.pop();
        heap.push(candidate);
    }
}

fn into_neighbors(heap: BinaryHeap<Candidate>) -> Vec<Neighbor> {
    heap.into_sorted_vec()
        .into_iter()
        .map(|c| Neighbor {
            index: c.index,
            distance: c.dist_sq.sqrt(),
        })
        .collect()
}

/// Exhaustive k-nearest search with the same ordering as [`KdTree::nearest`]
pub fn nearest_brute_force(points: &[Vector3<f64>], query: &Vector3<f64>, k: usize) -> Vec<Neighbor> {
    let k = k.min(points.len());
    if k == 0 {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (index, point) in points.iter().enumerate() {
        offer(
            &mut heap,
            k,
            Candidate {
                dist_sq: distance_sq(query, point),
                index,
            },
        );
    }
    into_neighbors(heap)
}
