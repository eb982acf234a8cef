//! Stage catalog - static platform layouts and spawn points

use serde::Serialize;

/// Arena width in pixels
pub const ARENA_WIDTH: f32 = 800.0;
/// Arena height in pixels
pub const ARENA_HEIGHT: f32 = 600.0;
/// Distance beyond the arena bounds past which a player is knocked out
pub const OFFSCREEN_MARGIN: f32 = 150.0;

/// Axis-aligned rectangle, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap test; touching edges do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// True once any edge is past the margin around the arena
    pub fn is_off_stage(&self) -> bool {
        self.x < -OFFSCREEN_MARGIN
            || self.right() > ARENA_WIDTH + OFFSCREEN_MARGIN
            || self.y < -OFFSCREEN_MARGIN
            || self.bottom() > ARENA_HEIGHT + OFFSCREEN_MARGIN
    }
}

/// A solid platform. Only its top face collides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Platform {
    #[serde(flatten)]
    pub rect: Rect,
    pub color: &'static str,
}

impl Platform {
    const fn new(x: f32, y: f32, width: f32, height: f32, color: &'static str) -> Self {
        Self {
            rect: Rect::new(x, y, width, height),
            color,
        }
    }
}

/// Spawn location, given as the player's center
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// Immutable stage layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stage {
    pub id: &'static str,
    pub name: &'static str,
    pub platforms: &'static [Platform],
    /// Index 0 is slot 0's spawn, index 1 is slot 1's
    pub spawn_points: &'static [SpawnPoint],
    pub background: &'static str,
}

impl Stage {
    pub fn spawn_point(&self, slot_index: usize) -> Option<SpawnPoint> {
        self.spawn_points.get(slot_index).copied()
    }
}

const W: f32 = ARENA_WIDTH;
const H: f32 = ARENA_HEIGHT;

/// Built-in stage rotation, selected uniformly at random each round
pub static STAGES: &[Stage] = &[
    Stage {
        id: "center_platform",
        name: "Center Platform",
        platforms: &[Platform::new(W * 0.2, H - 50.0, W * 0.6, 50.0, "#228b22")],
        spawn_points: &[
            SpawnPoint { x: W / 4.0, y: H - 150.0 },
            SpawnPoint { x: W * 3.0 / 4.0, y: H - 150.0 },
        ],
        background: "#add8e6",
    },
    Stage {
        id: "dual_platforms",
        name: "Dual Platforms",
        platforms: &[
            Platform::new(W * 0.1, H - 150.0, W * 0.3, 30.0, "#a0522d"),
            Platform::new(W * 0.6, H - 150.0, W * 0.3, 30.0, "#a0522d"),
        ],
        spawn_points: &[
            SpawnPoint { x: W * 0.25, y: H - 250.0 },
            SpawnPoint { x: W * 0.75, y: H - 250.0 },
        ],
        background: "#d3d3d3",
    },
    Stage {
        id: "sky_bridges",
        name: "Sky Bridges",
        platforms: &[
            Platform::new(W * 0.35, H - 80.0, W * 0.3, 40.0, "#4682b4"),
            Platform::new(W * 0.05, H - 200.0, W * 0.2, 25.0, "#696969"),
            Platform::new(W * 0.1, H - 320.0, W * 0.15, 25.0, "#696969"),
            Platform::new(W * 0.75, H - 200.0, W * 0.2, 25.0, "#696969"),
            Platform::new(W * 0.75, H - 320.0, W * 0.15, 25.0, "#696969"),
            Platform::new(W * 0.4, H - 400.0, W * 0.2, 20.0, "#696969"),
        ],
        spawn_points: &[
            SpawnPoint { x: W * 0.15, y: H - 300.0 },
            SpawnPoint { x: W * 0.82, y: H - 300.0 },
        ],
        background: "#87ceeb",
    },
    Stage {
        id: "arena_walls",
        name: "Arena Walls",
        platforms: &[
            Platform::new(W * 0.15, H - 50.0, W * 0.7, 50.0, "#8b4513"),
            Platform::new(W * 0.05, H - 300.0, 30.0, 250.0, "#696969"),
            Platform::new(W * 0.915, H - 300.0, 30.0, 250.0, "#696969"),
            Platform::new(W * 0.08, H - 180.0, 80.0, 20.0, "#a0522d"),
            Platform::new(W * 0.84, H - 180.0, 80.0, 20.0, "#a0522d"),
        ],
        spawn_points: &[
            SpawnPoint { x: W * 0.25, y: H - 150.0 },
            SpawnPoint { x: W * 0.75, y: H - 150.0 },
        ],
        background: "#2f4f4f",
    },
];
