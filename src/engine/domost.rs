//! Vertical-span clipper.
//!
//! The viewport's x-range is partitioned into strips `[x, next.x)`; each
//! strip carries the still-unpainted window between a ceiling line and a
//! floor line. Every call to [`SpanList::clip_edge`] consumes one directed
//! screen edge, emits the newly exposed trapezoids and tightens the window.
//!
//! Nodes live in a fixed pool linked as a ring through a head sentinel
//! (index 0, `x = x_max`), so the list never allocates while a frame runs.

use smallvec::SmallVec;

use crate::{engine::types::BunchId, renderer::Trapezoid};

const HEAD: u32 = 0;

/// Floor edges are lifted by this much so that a floor and the wall
/// above it never leave a hairline gap.
const EDGE_BIAS: f64 = 0.01;

/// Slack used when comparing an edge against a boundary.
const TOUCH: f64 = 0.01;

/// Who last tightened a boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanTag {
    Open,
    /// `stamp` is unique per [`SpanList::clip_edge`] call, so equal tags
    /// always describe the same straight line.
    Edge { bunch: BunchId, stamp: u32 },
    Closed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Split {
    #[default]
    None,
    /// the edge meets the ceiling line here
    Ceiling,
    /// the edge meets the floor line here
    Floor,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    x: f64,
    cy: [f64; 2],
    fy: [f64; 2],
    ctag: SpanTag,
    ftag: SpanTag,
    split: Split,
    prev: u32,
    next: u32,
}

impl Node {
    fn sentinel(x: f64) -> Self {
        Self {
            x,
            cy: [0.0; 2],
            fy: [0.0; 2],
            ctag: SpanTag::Closed,
            ftag: SpanTag::Closed,
            split: Split::None,
            prev: HEAD,
            next: HEAD,
        }
    }
}

/// Read-only view of one strip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strip {
    pub x0: f64,
    pub x1: f64,
    pub cy: [f64; 2],
    pub fy: [f64; 2],
    pub ctag: SpanTag,
    pub ftag: SpanTag,
}

impl Strip {
    pub fn is_closed(&self) -> bool {
        self.ctag == SpanTag::Closed
    }
}

pub struct SpanList {
    nodes: Vec<Node>,
    free: Vec<u32>,
    x_min: f64,
    x_max: f64,
    stamp: u32,
    overflows: u32,
}

impl SpanList {
    /// `capacity` strips at most (the head sentinel comes on top).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut list = Self {
            nodes: vec![Node::sentinel(0.0); capacity + 1],
            free: Vec::with_capacity(capacity),
            x_min: 0.0,
            x_max: 0.0,
            stamp: 0,
            overflows: 0,
        };
        list.reset(0.0, 1.0, 0.0, 1.0);
        list
    }

    /// One open strip over `[x_min, x_max)` spanning `y_min..y_max`.
    pub fn reset(&mut self, x_min: f32, x_max: f32, y_min: f32, y_max: f32) {
        self.x_min = x_min as f64;
        self.x_max = x_max as f64;
        self.stamp = 0;
        self.overflows = 0;

        self.nodes[HEAD as usize] = Node {
            next: 1,
            prev: 1,
            ..Node::sentinel(self.x_max)
        };
        self.nodes[1] = Node {
            x: self.x_min,
            cy: [y_min as f64; 2],
            fy: [y_max as f64; 2],
            ctag: SpanTag::Open,
            ftag: SpanTag::Open,
            split: Split::None,
            prev: HEAD,
            next: HEAD,
        };
        self.free.clear();
        self.free.extend((2..self.nodes.len() as u32).rev());
    }

    /// Times a node had to be clipped unsplit since the last reset.
    pub fn overflows(&self) -> u32 {
        self.overflows
    }

    pub fn strip_count(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    pub fn strips(&self) -> impl Iterator<Item = Strip> + '_ {
        let mut i = self.nodes[HEAD as usize].next;
        std::iter::from_fn(move || {
            if i == HEAD {
                return None;
            }
            let n = &self.nodes[i as usize];
            i = n.next;
            Some(Strip {
                x0: n.x,
                x1: self.nodes[n.next as usize].x,
                cy: n.cy,
                fy: n.fy,
                ctag: n.ctag,
                ftag: n.ftag,
            })
        })
    }

    /// True if any strip overlapping `(x0, x1)` can still be painted.
    pub fn test_visible(&self, x0: f32, x1: f32) -> bool {
        let (x0, x1) = (x0 as f64, x1 as f64);
        self.strips()
            .any(|s| s.x1 > x0 && s.x0 < x1 && !s.is_closed())
    }

    /*──────────────────────────── pool ────────────────────────────*/

    /// Insert a copy of node `i` right after it.
    fn insert_after(&mut self, i: u32) -> Option<u32> {
        let ni = self.free.pop()?;
        let next = self.nodes[i as usize].next;
        self.nodes[ni as usize] = Node {
            prev: i,
            next,
            ..self.nodes[i as usize]
        };
        self.nodes[next as usize].prev = ni;
        self.nodes[i as usize].next = ni;
        Some(ni)
    }

    fn remove(&mut self, i: u32) {
        let Node { prev, next, .. } = self.nodes[i as usize];
        self.nodes[prev as usize].next = next;
        self.nodes[next as usize].prev = prev;
        self.free.push(i);
    }

    /*──────────────────────────── clipping ────────────────────────────*/

    /// Clip one directed edge.
    ///
    /// * `x0 < x1`: floor side, paints below the edge and raises the floor.
    /// * `x0 > x1`: ceiling side, paints above the edge and lowers the
    ///   ceiling.
    /// * `x0 == x1`: nothing.
    pub fn clip_edge(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        bunch: BunchId,
        mut emit: impl FnMut(&Trapezoid),
    ) {
        let (mut x0, mut y0, mut x1, mut y1) = (x0 as f64, y0 as f64, x1 as f64, y1 as f64);
        let floor = if x0 < x1 {
            y0 -= EDGE_BIAS;
            y1 -= EDGE_BIAS;
            true
        } else if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
            false
        } else {
            return;
        };

        let slope = (y1 - y0) / (x1 - x0);
        if x0 < self.x_min {
            y0 += (self.x_min - x0) * slope;
            x0 = self.x_min;
        }
        if x1 > self.x_max {
            y1 -= (x1 - self.x_max) * slope;
            x1 = self.x_max;
        }
        if !(x0 < x1) {
            return;
        }
        let at = |x: f64| y0 + (x - x0) * slope;

        self.stamp = self.stamp.wrapping_add(1);
        let tag = SpanTag::Edge {
            bunch,
            stamp: self.stamp,
        };

        let mut i = self.nodes[HEAD as usize].next;
        while i != HEAD {
            let end = self.nodes[i as usize].next;
            let n = self.nodes[i as usize];
            let (nx0, nx1) = (n.x, self.nodes[end as usize].x);
            if x0 >= nx1 || nx0 >= x1 || n.ctag == SpanTag::Closed {
                i = end;
                continue;
            }

            let mut cuts = split_points(&n, nx1, [x0, y0, x1, y1]);
            if self.free.len() < cuts.len() {
                self.overflows += 1;
                // endpoints first, boundary crossings get what is left
                let ends = cuts.iter().filter(|c| c.1 == Split::None).count();
                let mut ends_left = self.free.len();
                let mut cross_left = self.free.len().saturating_sub(ends);
                cuts.retain(|c| {
                    let left = if c.1 == Split::None {
                        &mut ends_left
                    } else {
                        &mut cross_left
                    };
                    let keep = *left > 0;
                    *left = left.saturating_sub(1);
                    keep
                });
            }

            let ndx = nx1 - nx0;
            for &(sx, kind) in cuts.iter().rev() {
                let Some(ni) = self.insert_after(i) else { break };
                let t = (sx - nx0) / ndx;
                let cy = n.cy[0] + (n.cy[1] - n.cy[0]) * t;
                let fy = n.fy[0] + (n.fy[1] - n.fy[0]) * t;
                self.nodes[i as usize].cy[1] = cy;
                self.nodes[i as usize].fy[1] = fy;
                let new = &mut self.nodes[ni as usize];
                new.x = sx;
                new.cy[0] = cy;
                new.fy[0] = fy;
                new.split = kind;
            }

            // only strips the edge spans end to end are touched; without an
            // endpoint cut the edge is dropped over the rest of the node
            let mut z = i;
            while z != end {
                let nz = self.nodes[z as usize].next;
                let (dx0, dx1) = (self.nodes[z as usize].x, self.nodes[nz as usize].x);
                if dx0 >= x0 && dx1 <= x1 && dx0 < dx1 {
                    let right = self.nodes[nz as usize].split;
                    let ny = [at(dx0), at(dx1)];
                    let node = &mut self.nodes[z as usize];
                    let k = classify(node, right, ny);
                    if let Some(trap) = resolve(node, k, floor, [dx0, dx1], ny, tag) {
                        emit(&trap);
                    }
                }
                z = nz;
            }

            let mut z = i;
            while z != end {
                self.nodes[z as usize].split = Split::None;
                z = self.nodes[z as usize].next;
            }
            i = end;
        }

        self.close_and_merge();
    }

    fn close_and_merge(&mut self) {
        let mut i = self.nodes[HEAD as usize].next;
        while i != HEAD {
            let n = &mut self.nodes[i as usize];
            if n.cy[0] >= n.fy[0] && n.cy[1] >= n.fy[1] {
                n.ctag = SpanTag::Closed;
                n.ftag = SpanTag::Closed;
            }
            i = n.next;
        }

        let mut i = self.nodes[HEAD as usize].next;
        while i != HEAD {
            let ni = self.nodes[i as usize].next;
            if ni == HEAD {
                break;
            }
            let (a, b) = (self.nodes[i as usize], self.nodes[ni as usize]);
            if a.ctag == b.ctag && a.ftag == b.ftag {
                let n = &mut self.nodes[i as usize];
                n.cy[1] = b.cy[1];
                n.fy[1] = b.fy[1];
                self.remove(ni);
            } else {
                i = ni;
            }
        }
    }
}

/// Where the edge `[x0, y0, x1, y1]` must cut node `n` (which ends at
/// `nx1`): its endpoints and its crossings with either boundary, strictly
/// inside the node and strictly increasing.
fn split_points(n: &Node, nx1: f64, edge: [f64; 4]) -> SmallVec<[(f64, Split); 4]> {
    let [x0, y0, x1, y1] = edge;
    let nx0 = n.x;
    let ndx = nx1 - nx0;
    let inside = |x: f64| x > nx0 && x < nx1;

    let mut cuts: SmallVec<[(f64, Split); 4]> = SmallVec::new();
    if inside(x0) {
        cuts.push((x0, Split::None));
    }

    let mut cross: SmallVec<[(f64, Split); 2]> = SmallVec::new();
    for (base, delta, kind) in [
        (n.cy[0], n.cy[1] - n.cy[0], Split::Ceiling),
        (n.fy[0], n.fy[1] - n.fy[0], Split::Floor),
    ] {
        let d = (y0 - y1) * ndx - (x0 - x1) * delta;
        let num = (y0 - base) * ndx - (x0 - nx0) * delta;
        if d != 0.0 && num.abs() <= d.abs() && d * num >= 0.0 {
            let x = x0 + (x1 - x0) * (num / d);
            if inside(x) {
                cross.push((x, kind));
            }
        }
    }
    if cross.len() == 2 && cross[1].0 < cross[0].0 {
        cross.swap(0, 1);
    }
    cuts.extend(cross);

    if inside(x1) {
        cuts.push((x1, Split::None));
    }
    cuts.dedup_by(|cur, prev| cur.0 <= prev.0);
    cuts
}

/// 3×3 position code of the edge against the strip: each end counts as
/// above the ceiling (-1), inside (0) or below the floor (+1); the left end
/// weighs 1, the right end 3, offset by 4.
fn classify(n: &Node, right: Split, ny: [f64; 2]) -> i32 {
    let mut k = 4;
    if n.split == Split::Ceiling || ny[0] <= n.cy[0] + TOUCH {
        k -= 1;
    }
    if n.split == Split::Floor || ny[0] >= n.fy[0] - TOUCH {
        k += 1;
    }
    if right == Split::Ceiling || ny[1] <= n.cy[1] + TOUCH {
        k -= 3;
    }
    if right == Split::Floor || ny[1] >= n.fy[1] - TOUCH {
        k += 3;
    }
    k
}

/// Apply the decision for position code `k`: update the node and return
/// the region to paint.
fn resolve(
    n: &mut Node,
    k: i32,
    floor: bool,
    dx: [f64; 2],
    ny: [f64; 2],
    tag: SpanTag,
) -> Option<Trapezoid> {
    let (c, f) = (n.cy, n.fy);
    let trap = |top: [f64; 2], bottom: [f64; 2]| Trapezoid {
        x0: dx[0] as f32,
        x1: dx[1] as f32,
        top: top.map(|y| y as f32),
        bottom: bottom.map(|y| y as f32),
    };

    if !floor {
        let out = match k {
            1 | 2 => {
                n.cy[0] = ny[0];
                trap(c, [ny[0], c[1]])
            }
            3 | 6 => {
                n.cy[1] = ny[1];
                trap(c, [c[0], ny[1]])
            }
            4 | 5 | 7 => {
                n.cy = ny;
                trap(c, ny)
            }
            8 => {
                n.ctag = SpanTag::Closed;
                n.ftag = SpanTag::Closed;
                return Some(trap(c, f));
            }
            _ => return None,
        };
        n.ctag = tag;
        Some(out)
    } else {
        let out = match k {
            7 | 6 => {
                n.fy[0] = ny[0];
                trap([ny[0], f[1]], f)
            }
            5 | 2 => {
                n.fy[1] = ny[1];
                trap([f[0], ny[1]], f)
            }
            4 | 3 | 1 => {
                n.fy = ny;
                trap(ny, f)
            }
            0 => {
                n.ctag = SpanTag::Closed;
                n.ftag = SpanTag::Closed;
                return Some(trap(c, f));
            }
            _ => return None,
        };
        n.ftag = tag;
        Some(out)
    }
}
