use crate::error::{Error, Result};
use crate::parse::Point;
use log::debug;
use rayon::prelude::*;

/// Result of cutting the Ward dendrogram.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    /// Label per input point, in input order.
    pub labels: Vec<usize>,
    pub num_clusters: usize,
    /// Point count per label.
    pub sizes: Vec<usize>,
    /// Mean position per label.
    pub centroids: Vec<Point>,
}

/// One agglomeration step: the clusters represented by points `a` and `b`
/// (`a < b`) were joined at `height`. The merged cluster lives on in `b`.
#[derive(Debug, Clone, Copy)]
struct Merge {
    a: usize,
    b: usize,
    height: f64,
}

/// Union-Find that names every merged cluster with a fresh node id:
/// leaves are `0..n`, the cluster made by the i-th merge is `n + i`.
struct NodeUnionFind {
    parent: Vec<usize>,
    next_label: usize,
}

impl NodeUnionFind {
    fn new(n: usize) -> Self {
        NodeUnionFind {
            parent: (0..2 * n - 1).collect(),
            next_label: n,
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn merge(&mut self, x: usize, y: usize) {
        self.parent[x] = self.next_label;
        self.parent[y] = self.next_label;
        self.next_label += 1;
    }
}

fn distance(p: &Point, q: &Point) -> f64 {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    (dx * dx + dy * dy).sqrt()
}

/// Lance-Williams update for Ward linkage on Euclidean distances:
/// distance from the union of clusters i and j to cluster k.
fn ward_update(d_ik: f64, d_jk: f64, d_ij: f64, n_i: usize, n_j: usize, n_k: usize) -> f64 {
    let (n_i, n_j, n_k) = (n_i as f64, n_j as f64, n_k as f64);
    let t = 1.0 / (n_i + n_j + n_k);
    let sq = (n_i + n_k) * t * d_ik * d_ik + (n_j + n_k) * t * d_jk * d_jk - n_k * t * d_ij * d_ij;
    // rounding can dip below zero; NaN from overflow must survive
    if sq < 0.0 {
        0.0
    } else {
        sq.sqrt()
    }
}

/// Build the full Ward dendrogram with the nearest-neighbor chain
/// algorithm. Merges are returned in the order they were performed, which
/// is not necessarily sorted by height.
fn ward_dendrogram(points: &[Point]) -> Result<Vec<Merge>> {
    let n = points.len();
    if n < 2 {
        return Ok(Vec::new());
    }

    debug!("Computing {}x{} pairwise distance matrix", n, n);
    let mut dist: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| points.iter().map(|q| distance(&points[i], q)).collect())
        .collect();
    if dist.iter().flatten().any(|d| !d.is_finite()) {
        return Err(Error::cluster("coordinates too large: distances overflow"));
    }

    let mut size = vec![1usize; n];
    let mut merges = Vec::with_capacity(n - 1);
    let mut chain: Vec<usize> = Vec::with_capacity(n);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            // `merges.len() < n - 1` guarantees at least two live clusters
            let first = size.iter().position(|&s| s > 0).unwrap_or(0);
            chain.push(first);
        }

        // Grow the chain until two clusters are reciprocal nearest neighbors
        let (x, y) = loop {
            let tip = chain[chain.len() - 1];
            let prev = if chain.len() >= 2 { Some(chain[chain.len() - 2]) } else { None };

            // Ties prefer the previous chain element so the chain terminates
            let mut best = prev;
            let mut best_dist = prev.map_or(f64::INFINITY, |p| dist[tip][p]);
            for k in 0..n {
                if k != tip && size[k] > 0 && dist[tip][k] < best_dist {
                    best_dist = dist[tip][k];
                    best = Some(k);
                }
            }

            let next = best.ok_or_else(|| {
                Error::cluster(format!("no finite distance from cluster {}", tip))
            })?;
            if Some(next) == prev {
                break (tip, next);
            }
            chain.push(next);
        };
        chain.pop();
        chain.pop();

        let (gone, keep) = if x < y { (x, y) } else { (y, x) };
        let d_xy = dist[x][y];
        if !d_xy.is_finite() {
            return Err(Error::cluster("merge distance overflowed"));
        }
        merges.push(Merge { a: gone, b: keep, height: d_xy });

        for k in 0..n {
            if size[k] > 0 && k != keep && k != gone {
                let d = ward_update(dist[gone][k], dist[keep][k], d_xy, size[gone], size[keep], size[k]);
                if !d.is_finite() {
                    return Err(Error::cluster("merged cluster distance overflowed"));
                }
                dist[keep][k] = d;
                dist[k][keep] = d;
            }
        }
        size[keep] += size[gone];
        size[gone] = 0;
    }

    Ok(merges)
}

/// Sort merges by height (stable) and name their operands by node id, the
/// smaller id first. Row i creates node `n + i`.
fn linkage_children(mut merges: Vec<Merge>, n: usize) -> Vec<[usize; 2]> {
    merges.sort_by(|x, y| x.height.total_cmp(&y.height));

    let mut uf = NodeUnionFind::new(n);
    merges
        .iter()
        .map(|m| {
            let (ra, rb) = (uf.find(m.a), uf.find(m.b));
            uf.merge(ra, rb);
            debug!("Merge node {} + node {} at height {:.3}", ra, rb, m.height);
            if ra < rb {
                [ra, rb]
            } else {
                [rb, ra]
            }
        })
        .collect()
}

/// Binary min-heap helpers laid out exactly like Python's `heapq`, so the
/// final list order (and hence the label numbering) is reproducible.
fn heap_sift_down(heap: &mut [i64], start: usize, mut pos: usize) {
    let item = heap[pos];
    while pos > start {
        let parent = (pos - 1) >> 1;
        if item < heap[parent] {
            heap[pos] = heap[parent];
            pos = parent;
            continue;
        }
        break;
    }
    heap[pos] = item;
}

fn heap_sift_up(heap: &mut [i64], mut pos: usize) {
    let end = heap.len();
    let start = pos;
    let item = heap[pos];
    let mut child = 2 * pos + 1;
    while child < end {
        let right = child + 1;
        if right < end && heap[child] >= heap[right] {
            child = right;
        }
        heap[pos] = heap[child];
        pos = child;
        child = 2 * pos + 1;
    }
    heap[pos] = item;
    heap_sift_down(heap, start, pos);
}

fn heap_push(heap: &mut Vec<i64>, item: i64) {
    heap.push(item);
    let last = heap.len() - 1;
    heap_sift_down(heap, 0, last);
}

fn heap_push_pop(heap: &mut [i64], item: i64) {
    if !heap.is_empty() && heap[0] < item {
        heap[0] = item;
        heap_sift_up(heap, 0);
    }
}

fn leaves_under(node: usize, children: &[[usize; 2]], n_leaves: usize) -> Vec<usize> {
    let mut leaves = Vec::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node < n_leaves {
            leaves.push(node);
        } else {
            stack.extend_from_slice(&children[node - n_leaves]);
        }
    }
    leaves
}

/// Cut the tree into `n_clusters` clusters by repeatedly splitting the
/// highest node. Nodes sit in a heap of negated ids; a leaf's label is the
/// heap position of the node it ends up under.
fn cut_tree(n_clusters: usize, children: &[[usize; 2]], n_leaves: usize) -> Vec<usize> {
    let Some(root_children) = children.last() else {
        return vec![0; n_leaves];
    };
    let root = root_children[0].max(root_children[1]) + 1;

    let mut nodes: Vec<i64> = vec![-(root as i64)];
    for _ in 1..n_clusters {
        let split = (-nodes[0]) as usize;
        let [left, right] = children[split - n_leaves];
        heap_push(&mut nodes, -(left as i64));
        heap_push_pop(&mut nodes, -(right as i64));
    }

    let mut labels = vec![0usize; n_leaves];
    for (label, &node) in nodes.iter().enumerate() {
        for leaf in leaves_under((-node) as usize, children, n_leaves) {
            labels[leaf] = label;
        }
    }
    labels
}

/// Agglomerative clustering with Euclidean distance and Ward linkage,
/// cut at exactly `n_clusters` clusters.
///
/// The procedure has no random component, so identical input always gives
/// identical labels. Labels are numbered the way scikit-learn's
/// `AgglomerativeClustering` numbers them, which is the order
/// `LOCATION_NAMES` was curated against.
pub fn ward_clustering(points: &[Point], n_clusters: usize) -> Result<ClusteringResult> {
    if n_clusters == 0 {
        return Err(Error::cluster("cannot extract zero clusters"));
    }
    if points.is_empty() {
        return Ok(ClusteringResult {
            labels: Vec::new(),
            num_clusters: 0,
            sizes: Vec::new(),
            centroids: Vec::new(),
        });
    }
    let n = points.len();
    if n < n_clusters {
        return Err(Error::cluster(format!(
            "cannot extract {} clusters from {} points",
            n_clusters, n
        )));
    }

    let merges = ward_dendrogram(points)?;
    if merges.len() != n - 1 {
        return Err(Error::cluster(format!(
            "dendrogram has {} merges, expected {}",
            merges.len(),
            n - 1
        )));
    }
    let children = linkage_children(merges, n);
    let labels = cut_tree(n_clusters, &children, n);
    let num_clusters = labels.iter().max().map_or(0, |&m| m + 1);
    if num_clusters != n_clusters {
        return Err(Error::cluster(format!(
            "tree cut gave {} clusters, expected {}",
            num_clusters, n_clusters
        )));
    }

    let mut sizes = vec![0usize; num_clusters];
    let mut sums = vec![(0.0f64, 0.0f64); num_clusters];
    for (point, &label) in points.iter().zip(&labels) {
        sizes[label] += 1;
        sums[label].0 += point.x;
        sums[label].1 += point.y;
    }
    let centroids = sums
        .iter()
        .zip(&sizes)
        .map(|(&(sx, sy), &count)| Point {
            x: sx / count as f64,
            y: sy / count as f64,
        })
        .collect();

    debug!("Ward clustering produced {} clusters, sizes {:?}", num_clusters, sizes);

    Ok(ClusteringResult {
        labels,
        num_clusters,
        sizes,
        centroids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point { x, y }).collect()
    }

    /// Three tight blobs far apart, interleaved in input order.
    fn three_blobs() -> Vec<Point> {
        pts(&[
            (0.0, 0.0),
            (100.0, 100.0),
            (200.0, 0.0),
            (1.0, 0.5),
            (101.0, 99.0),
            (199.0, 1.0),
            (0.5, 1.0),
            (100.5, 101.0),
            (201.0, -1.0),
            (-1.0, 0.0),
        ])
    }

    #[test]
    fn recovers_separated_blobs() {
        let result = ward_clustering(&three_blobs(), 3).unwrap();
        assert_eq!(result.num_clusters, 3);
        let l = &result.labels;
        let (a, b, c) = (l[0], l[1], l[2]);
        assert!(a != b && b != c && a != c);
        assert_eq!(l, &vec![a, b, c, a, b, c, a, b, c, a]);
        assert_eq!(result.sizes[a], 4);
        assert_eq!(result.sizes[b], 3);
        assert!((result.centroids[b].x - 100.5).abs() < 1e-9);
    }

    #[test]
    fn clustering_is_deterministic() {
        let points: Vec<Point> = (0..60)
            .map(|i| {
                let t = i as f64;
                Point { x: (t * 37.0) % 256.0, y: -((t * 91.0) % 256.0) }
            })
            .collect();
        let first = ward_clustering(&points, 22).unwrap();
        let second = ward_clustering(&points, 22).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.num_clusters, 22);
        assert_eq!(first.sizes.iter().sum::<usize>(), 60);
        assert!(first.labels.iter().all(|&l| l < 22));
    }

    #[test]
    fn one_cluster_per_point() {
        let points = pts(&[(0.0, 0.0), (5.0, 5.0), (9.0, 1.0)]);
        let result = ward_clustering(&points, 3).unwrap();
        // the pair (5,5),(9,1) is split last, so its leaves take the
        // first and last heap slots
        assert_eq!(result.labels, vec![1, 2, 0]);
    }

    #[test]
    fn labels_follow_scikit_learn_numbering() {
        // (0,0) and (1,0) merge first; the cut leaves node 3 at the top of
        // the heap and leaf 0 after it
        let points = pts(&[(10.0, 0.0), (0.0, 0.0), (1.0, 0.0)]);
        let result = ward_clustering(&points, 2).unwrap();
        assert_eq!(result.labels, vec![1, 0, 0]);
        assert_eq!(result.sizes, vec![2, 1]);
    }

    #[test]
    fn linkage_rows_use_node_ids() {
        let points = pts(&[(10.0, 0.0), (0.0, 0.0), (1.0, 0.0)]);
        let merges = ward_dendrogram(&points).unwrap();
        assert_eq!(linkage_children(merges, 3), vec![[1, 2], [0, 3]]);
    }

    #[test]
    fn cut_follows_heap_layout() {
        // ((0,1),(2,3)): splitting node 6 then node 5
        let children = [[0, 1], [2, 3], [4, 5]];
        assert_eq!(cut_tree(3, &children, 4), vec![0, 0, 2, 1]);
        assert_eq!(cut_tree(1, &children, 4), vec![0, 0, 0, 0]);
        assert_eq!(cut_tree(4, &children, 4).iter().max(), Some(&3));
    }

    #[test]
    fn overflowing_coordinates_are_an_error() {
        let points = pts(&[
            (1e200, 1e200),
            (-1e200, -1e200),
            (1e200, -1e200),
            (-1e200, 1e200),
        ]);
        assert!(matches!(ward_clustering(&points, 2), Err(Error::Cluster(_))));

        // pairwise distances fit, but the Ward update squares them
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (1.2e154, 0.0)]);
        assert!(matches!(ward_clustering(&points, 2), Err(Error::Cluster(_))));
    }

    #[test]
    fn single_cluster_takes_everything() {
        let result = ward_clustering(&three_blobs(), 1).unwrap();
        assert!(result.labels.iter().all(|&l| l == 0));
        assert_eq!(result.sizes, vec![10]);
    }

    #[test]
    fn duplicate_points_still_cluster() {
        let points = pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (50.0, 50.0)]);
        let result = ward_clustering(&points, 2).unwrap();
        assert_eq!(result.labels, vec![0, 0, 0, 1]);
    }

    #[test]
    fn ward_prefers_merging_small_clusters() {
        // A pair at distance 4 and a lone point; Ward joins the closest pair first.
        let points = pts(&[(0.0, 0.0), (4.0, 0.0), (20.0, 0.0)]);
        let result = ward_clustering(&points, 2).unwrap();
        assert_eq!(result.labels, vec![0, 0, 1]);
    }

    #[test]
    fn empty_input_is_empty_result() {
        let result = ward_clustering(&[], 22).unwrap();
        assert!(result.labels.is_empty());
        assert_eq!(result.num_clusters, 0);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = pts(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(matches!(ward_clustering(&points, 3), Err(Error::Cluster(_))));
        assert!(ward_clustering(&points, 0).is_err());
    }

    #[test]
    fn lance_williams_matches_centroid_formula() {
        // Ward distance between {p, q} and {r} is sqrt(2*|pq|*|r|/(|pq|+|r|)) * |c_pq - r|
        let p = Point { x: 0.0, y: 0.0 };
        let q = Point { x: 2.0, y: 0.0 };
        let r = Point { x: 1.0, y: 3.0 };
        let d = ward_update(distance(&p, &r), distance(&q, &r), distance(&p, &q), 1, 1, 1);
        let centroid = Point { x: 1.0, y: 0.0 };
        let expected = (2.0 * 2.0 * 1.0 / 3.0f64).sqrt() * distance(&centroid, &r);
        assert!((d - expected).abs() < 1e-9);
    }
}
