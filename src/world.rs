use std::collections::{HashMap, VecDeque};

use crate::types::{Direction, PickupKind, PixelPos, Point, Vec2};

const CENTER_EPSILON: f32 = 1e-4;

pub const CLASSIC_MAZE: [&str; 31] = [
    "XXXXXXXXXXXXXXXXXXXXXXXXXXXX",
    "XooooooooooooXXooooooooooooX",
    "XoXXXXoXXXXXoXXoXXXXXoXXXXoX",
    "XOXXXXoXXXXXoXXoXXXXXoXXXXOX",
    "XoXXXXoXXXXXoXXoXXXXXoXXXXoX",
    "XooooooooooooooooooooooooooX",
    "XoXXXXoXXoXXXXXXXXoXXoXXXXoX",
    "XoXXXXoXXoXXXXXXXXoXXoXXXXoX",
    "XooooooXXooooXXooooXXooooooX",
    "XXXXXXoXXXXX XX XXXXXoXXXXXX",
    "XXXXXXoXXXXX XX XXXXXoXXXXXX",
    "XXXXXXoXX          XXoXXXXXX",
    "XXXXXXoXX XXXXXXXX XXoXXXXXX",
    "XXXXXXoXX X      X XXoXXXXXX",
    "      o   X      X   o      ",
    "XXXXXXoXX X      X XXoXXXXXX",
    "XXXXXXoXX XXXXXXXX XXoXXXXXX",
    "XXXXXXoXX          XXoXXXXXX",
    "XXXXXXoXX XXXXXXXX XXoXXXXXX",
    "XXXXXXoXX XXXXXXXX XXoXXXXXX",
    "XooooooooooooXXooooooooooooX",
    "XoXXXXoXXXXXoXXoXXXXXoXXXXoX",
    "XoXXXXoXXXXXoXXoXXXXXoXXXXoX",
    "XOooXXooooooo  oooooooXXooOX",
    "XXXoXXoXXoXXXXXXXXoXXoXXoXXX",
    "XXXoXXoXXoXXXXXXXXoXXoXXoXXX",
    "XooooooXXooooXXooooXXooooooX",
    "XoXXXXXXXXXXoXXoXXXXXXXXXXoX",
    "XoXXXXXXXXXXoXXoXXXXXXXXXXoX",
    "XooooooooooooooooooooooooooX",
    "XXXXXXXXXXXXXXXXXXXXXXXXXXXX",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Open,
    Dot,
    PowerPellet,
}

impl Tile {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'X' => Some(Self::Wall),
            ' ' => Some(Self::Open),
            'o' => Some(Self::Dot),
            'O' => Some(Self::PowerPellet),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Wall => 'X',
            Self::Open => ' ',
            Self::Dot => 'o',
            Self::PowerPellet => 'O',
        }
    }
}

#[derive(Clone, Debug)]
pub struct MazeWorld {
    pub width: i32,
    pub height: i32,
    pub tile_size: f32,
    tiles: Vec<Vec<Tile>>,
}

impl MazeWorld {
    pub fn classic(tile_size: f32) -> Self {
        let tiles = CLASSIC_MAZE
            .iter()
            .map(|row| {
                row.chars()
                    .map(|symbol| Tile::from_symbol(symbol).unwrap_or(Tile::Wall))
                    .collect()
            })
            .collect();
        Self::from_tiles(tiles, tile_size)
    }

    pub fn from_rows(rows: &[&str], tile_size: f32) -> Option<Self> {
        let width = rows.first()?.chars().count();
        if width == 0 || tile_size <= 0.0 {
            return None;
        }
        let mut tiles = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed: Vec<Tile> = row
                .chars()
                .map(Tile::from_symbol)
                .collect::<Option<Vec<_>>>()?;
            if parsed.len() != width {
                return None;
            }
            tiles.push(parsed);
        }
        Some(Self::from_tiles(tiles, tile_size))
    }

    fn from_tiles(tiles: Vec<Vec<Tile>>, tile_size: f32) -> Self {
        let height = tiles.len() as i32;
        let width = tiles.first().map(|row| row.len()).unwrap_or(0) as i32;
        Self {
            width,
            height,
            tile_size,
            tiles,
        }
    }

    pub fn rows(&self) -> Vec<String> {
        self.tiles
            .iter()
            .map(|row| row.iter().map(|tile| tile.symbol()).collect())
            .collect()
    }

    pub fn tile(&self, at: Vec2) -> Tile {
        if at.y < 0 || at.y >= self.height {
            return Tile::Wall;
        }
        if at.x < 0 || at.x >= self.width {
            return if self.is_tunnel_row(at.y) {
                Tile::Open
            } else {
                Tile::Wall
            };
        }
        self.tiles[at.y as usize][at.x as usize]
    }

    pub fn is_wall(&self, at: Vec2) -> bool {
        self.tile(at) == Tile::Wall
    }

    pub fn is_tunnel_row(&self, row: i32) -> bool {
        if row < 0 || row >= self.height || self.width == 0 {
            return false;
        }
        let cells = &self.tiles[row as usize];
        cells[0] != Tile::Wall && cells[cells.len() - 1] != Tile::Wall
    }

    pub fn in_tunnel_zone(&self, pos: Point) -> bool {
        let row = pos.y.round() as i32;
        self.is_tunnel_row(row) && (pos.x < 6.0 || pos.x > (self.width - 7) as f32)
    }

    pub fn to_pixel(&self, pos: Point) -> PixelPos {
        PixelPos::new(pos.x * self.tile_size, pos.y * self.tile_size)
    }

    pub fn to_grid(&self, pos: PixelPos) -> Point {
        Point::new(pos.x / self.tile_size, pos.y / self.tile_size)
    }

    pub fn nearest_tile(&self, pos: Point) -> Vec2 {
        Vec2::new(pos.x.round() as i32, pos.y.round() as i32)
    }

    pub fn snapped_tile(&self, pos: PixelPos) -> Vec2 {
        self.nearest_tile(self.to_grid(pos))
    }

    pub fn is_tile_center(&self, pos: PixelPos) -> bool {
        is_at_center(self.to_grid(pos))
    }

    pub fn can_move(&self, from: Vec2, dir: Direction) -> bool {
        !self.is_wall(from.step(dir, 1))
    }

    pub fn is_legal_move(&self, pos: PixelPos, dir: Direction) -> bool {
        self.can_move(self.snapped_tile(pos), dir)
    }

    pub fn wrap(&self, pos: Point) -> Option<Point> {
        let right_edge = self.width as f32 - 0.25;
        if pos.x < -0.75 {
            return Some(Point::new(right_edge, pos.y));
        }
        if pos.x > right_edge {
            return Some(Point::new(-0.75, pos.y));
        }
        None
    }

    pub fn wrap_pixel(&self, pos: PixelPos) -> PixelPos {
        let grid = self.to_grid(pos);
        match self.wrap(grid) {
            Some(wrapped) => self.to_pixel(wrapped),
            None => pos,
        }
    }

    pub fn pickup_tiles(&self) -> Vec<(Vec2, Tile)> {
        let mut out = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if matches!(tile, Tile::Dot | Tile::PowerPellet) {
                    out.push((Vec2::new(x as i32, y as i32), *tile));
                }
            }
        }
        out
    }

    pub fn pickup_kind(tile: Tile) -> Option<PickupKind> {
        match tile {
            Tile::Dot => Some(PickupKind::Dot),
            Tile::PowerPellet => Some(PickupKind::PowerPellet),
            _ => None,
        }
    }

    pub fn neighbor(&self, from: Vec2, dir: Direction) -> Option<Vec2> {
        let mut next = from.step(dir, 1);
        if self.is_tunnel_row(next.y) && self.width > 0 {
            next.x = next.x.rem_euclid(self.width);
        }
        if next.x < 0 || next.y < 0 || next.x >= self.width || next.y >= self.height {
            return None;
        }
        if self.is_wall(next) {
            return None;
        }
        Some(next)
    }

    pub fn first_step_toward(
        &self,
        from: Vec2,
        goal: impl Fn(Vec2) -> bool,
        blocked: impl Fn(Vec2) -> bool,
    ) -> Option<Direction> {
        let mut first_step: HashMap<Vec2, Direction> = HashMap::new();
        let mut queue = VecDeque::new();
        for dir in Direction::PRIORITY {
            let Some(next) = self.neighbor(from, dir) else {
                continue;
            };
            if blocked(next) || first_step.contains_key(&next) {
                continue;
            }
            first_step.insert(next, dir);
            queue.push_back(next);
        }

        while let Some(tile) = queue.pop_front() {
            let Some(dir) = first_step.get(&tile).copied() else {
                continue;
            };
            if goal(tile) {
                return Some(dir);
            }
            for next_dir in Direction::PRIORITY {
                let Some(next) = self.neighbor(tile, next_dir) else {
                    continue;
                };
                if next == from || blocked(next) || first_step.contains_key(&next) {
                    continue;
                }
                first_step.insert(next, dir);
                queue.push_back(next);
            }
        }
        None
    }
}

pub fn is_at_center(pos: Point) -> bool {
    (pos.x - pos.x.round()).abs() < CENTER_EPSILON && (pos.y - pos.y.round()).abs() < CENTER_EPSILON
}
