use serde::{Deserialize, Serialize};

use crate::world::vector::{angular_distance, Vector3D};

/// Cube-sphere grid: six square faces of resolution R presented as one
/// continuous spherical surface.
///
/// Face labels and axes: 0 Front (+Z), 1 Back (−Z), 2 Left (−X),
/// 3 Right (+X), 4 Top (+Y), 5 Bottom (−Y). On each face x grows east
/// (rightward in the cube net) and y grows downward, so N reduces y.
/// The net layout is Top above Front, Left/Right beside Front, Back right
/// of Right.

/// A cell on one of the six cube faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub face: u8,
    pub x: u32,
    pub y: u32,
}

impl Coordinate {
    pub fn new(face: u8, x: u32, y: u32) -> Self {
        Self { face, x, y }
    }
}

/// Movement directions. N/S/E/W/diagonals operate on the face grid;
/// Up/Down only affect altitude in flat movement and leave a surface
/// coordinate unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthWest => Direction::SouthEast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

/// Which edge of a face a step crosses or enters through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    N,
    S,
    E,
    W,
}

impl Edge {
    /// The direction that exits a face through this edge.
    fn exit_direction(self) -> Direction {
        match self {
            Edge::N => Direction::North,
            Edge::S => Direction::South,
            Edge::E => Direction::East,
            Edge::W => Direction::West,
        }
    }
}

/// One face-to-face transition: crossing `from` face's edge lands on
/// `target` face entering through `entry`, with the edge position index
/// mirrored when `reversed` is set. The (entry, reversed) pair encodes
/// the net rotation: entering the opposite edge unflipped is 0°, a
/// perpendicular entry edge is ±90°, the same-side edge flipped is 180°.
#[derive(Debug, Clone, Copy)]
struct Transition {
    target: u8,
    entry: Edge,
    reversed: bool,
}

const fn t(target: u8, entry: Edge, reversed: bool) -> Transition {
    Transition {
        target,
        entry,
        reversed,
    }
}

/// The 24 edge transitions, indexed by [face][edge] with edge order
/// N, S, E, W. Derived from the face embeddings in `face_point`; every
/// transition's inverse appears in the table and the cycles close
/// (see tests). Pinned adjacencies: Front-E → Right, Top-S → Front,
/// Right-E → Back.
const TRANSITIONS: [[Transition; 4]; 6] = [
    // 0 Front
    [
        t(4, Edge::S, false),
        t(5, Edge::N, false),
        t(3, Edge::W, false),
        t(2, Edge::E, false),
    ],
    // 1 Back
    [
        t(4, Edge::N, true),
        t(5, Edge::S, true),
        t(2, Edge::W, false),
        t(3, Edge::E, false),
    ],
    // 2 Left
    [
        t(4, Edge::W, false),
        t(5, Edge::W, true),
        t(0, Edge::W, false),
        t(1, Edge::E, false),
    ],
    // 3 Right
    [
        t(4, Edge::E, true),
        t(5, Edge::E, false),
        t(1, Edge::W, false),
        t(0, Edge::E, false),
    ],
    // 4 Top
    [
        t(1, Edge::N, true),
        t(0, Edge::N, false),
        t(3, Edge::N, true),
        t(2, Edge::N, false),
    ],
    // 5 Bottom
    [
        t(0, Edge::S, false),
        t(1, Edge::S, true),
        t(3, Edge::S, false),
        t(2, Edge::S, true),
    ],
];

/// The cube-sphere topology at a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeSphere {
    resolution: u32,
}

impl CubeSphere {
    pub fn new(resolution: u32) -> Self {
        assert!(resolution >= 2, "Cube-sphere resolution must be at least 2");
        Self { resolution }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Total cell count across all six faces.
    pub fn cell_count(&self) -> usize {
        6 * (self.resolution as usize) * (self.resolution as usize)
    }

    /// Flat index of a coordinate: face-major, then row-major.
    pub fn cell_index(&self, c: Coordinate) -> usize {
        let r = self.resolution as usize;
        c.face as usize * r * r + c.y as usize * r + c.x as usize
    }

    /// Inverse of `cell_index`.
    pub fn coordinate_of(&self, index: usize) -> Coordinate {
        let r = self.resolution as usize;
        let face = (index / (r * r)) as u8;
        let rem = index % (r * r);
        Coordinate::new(face, (rem % r) as u32, (rem / r) as u32)
    }

    /// Iterate every coordinate in index order.
    pub fn iter(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.cell_count()).map(move |i| self.coordinate_of(i))
    }

    /// One step in the given direction. Deterministic and total: steps off
    /// a face edge follow the transition table; diagonal steps compose the
    /// vertical then horizontal cardinal; Up/Down return the coordinate
    /// unchanged.
    pub fn neighbor(&self, c: Coordinate, dir: Direction) -> Coordinate {
        match dir {
            Direction::North => self.step(c, 0, -1),
            Direction::South => self.step(c, 0, 1),
            Direction::East => self.step(c, 1, 0),
            Direction::West => self.step(c, -1, 0),
            Direction::NorthEast => self.neighbor(self.step(c, 0, -1), Direction::East),
            Direction::SouthEast => self.neighbor(self.step(c, 0, 1), Direction::East),
            Direction::SouthWest => self.neighbor(self.step(c, 0, 1), Direction::West),
            Direction::NorthWest => self.neighbor(self.step(c, 0, -1), Direction::West),
            Direction::Up | Direction::Down => c,
        }
    }

    /// The four cardinal neighbors of a cell, in N, S, E, W order.
    pub fn cardinal_neighbors(&self, c: Coordinate) -> [Coordinate; 4] {
        [
            self.neighbor(c, Direction::North),
            self.neighbor(c, Direction::South),
            self.neighbor(c, Direction::East),
            self.neighbor(c, Direction::West),
        ]
    }

    fn step(&self, c: Coordinate, dx: i64, dy: i64) -> Coordinate {
        let r = self.resolution as i64;
        let nx = c.x as i64 + dx;
        let ny = c.y as i64 + dy;

        if (0..r).contains(&nx) && (0..r).contains(&ny) {
            return Coordinate::new(c.face, nx as u32, ny as u32);
        }

        // Identify the crossed edge and the index along it.
        let (edge, i) = if ny < 0 {
            (Edge::N, nx.clamp(0, r - 1))
        } else if ny >= r {
            (Edge::S, nx.clamp(0, r - 1))
        } else if nx >= r {
            (Edge::E, ny)
        } else {
            (Edge::W, ny)
        };

        let tr = TRANSITIONS[c.face as usize][edge as usize];
        let j = if tr.reversed { r - 1 - i } else { i } as u32;
        let last = self.resolution - 1;
        match tr.entry {
            Edge::N => Coordinate::new(tr.target, j, 0),
            Edge::S => Coordinate::new(tr.target, j, last),
            Edge::E => Coordinate::new(tr.target, last, j),
            Edge::W => Coordinate::new(tr.target, 0, j),
        }
    }

    /// Map an integer cell to a point on the unit sphere (cell center).
    pub fn to_sphere(&self, c: Coordinate) -> Vector3D {
        let r = self.resolution as f64;
        let u = (c.x as f64 + 0.5) / r * 2.0 - 1.0;
        let v = (c.y as f64 + 0.5) / r * 2.0 - 1.0;
        face_point(c.face, u, v).normalize()
    }

    /// Map an arbitrary vector back to the containing cell. The face is the
    /// one whose axis dominates in magnitude; ties prefer Y, then X, then Z.
    pub fn from_vector(&self, v: Vector3D) -> Coordinate {
        let p = v.normalize();
        let (ax, ay, az) = (p.x.abs(), p.y.abs(), p.z.abs());

        let (face, u, w) = if ay >= ax && ay >= az {
            if p.y > 0.0 {
                (4, p.x / ay, p.z / ay)
            } else {
                (5, p.x / ay, -p.z / ay)
            }
        } else if ax >= az {
            if p.x > 0.0 {
                (3, -p.z / ax, -p.y / ax)
            } else {
                (2, p.z / ax, -p.y / ax)
            }
        } else if p.z > 0.0 {
            (0, p.x / az, -p.y / az)
        } else {
            (1, -p.x / az, -p.y / az)
        };

        Coordinate::new(face, self.axis_to_grid(u), self.axis_to_grid(w))
    }

    fn axis_to_grid(&self, t: f64) -> u32 {
        let r = self.resolution;
        let idx = ((t + 1.0) / 2.0 * r as f64).floor() as i64;
        idx.clamp(0, r as i64 - 1) as u32
    }

    /// Great-circle distance between two cells, in radians.
    pub fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        angular_distance(self.to_sphere(a), self.to_sphere(b))
    }

    /// Geographic latitude of a cell center, in degrees (+Y is north).
    pub fn latitude_of(&self, c: Coordinate) -> f64 {
        self.to_sphere(c).y.clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Unit tangent vector pointing from cell `a` toward cell `b` in the
    /// tangent plane at `a`. ZERO for coincident or antipodal cells.
    pub fn tangent_toward(&self, a: Coordinate, b: Coordinate) -> Vector3D {
        let pa = self.to_sphere(a);
        let pb = self.to_sphere(b);
        let delta = pb.sub(pa);
        let radial = pa.scale(delta.dot(pa));
        delta.sub(radial).normalize()
    }
}

/// Embed face-plane coordinates into 3-D space before normalization.
/// These embeddings define the transition table above.
fn face_point(face: u8, u: f64, v: f64) -> Vector3D {
    match face {
        0 => Vector3D::new(u, -v, 1.0),
        1 => Vector3D::new(-u, -v, -1.0),
        2 => Vector3D::new(-1.0, -v, u),
        3 => Vector3D::new(1.0, -v, -u),
        4 => Vector3D::new(u, 1.0, v),
        5 => Vector3D::new(u, -1.0, -v),
        _ => unreachable!("face out of range"),
    }
}
