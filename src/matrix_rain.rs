use std::collections::VecDeque;

use rand::Rng;

pub const REVEAL_RADIUS: f32 = 9.0;
const REVEAL_GROWTH: f32 = 1.5;
const TRAIL_LIFETIME: u8 = 12;
const TRAIL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RainCell {
    Empty,
    Rain { glyph: char, intensity: f32 },
    Trail { intensity: f32 },
    Reveal(char),
}

#[derive(Debug, Clone, Copy)]
struct RainDrop {
    head: f32,
    speed: f32,
    length: u16,
    seed: u32,
}

#[derive(Debug, Clone, Copy)]
struct TrailPoint {
    col: u16,
    row: u16,
    age: u8,
}

/// Binary rain over a character grid. A banner hidden underneath shows through a
/// circle around the cursor, and the cursor leaves a fading trail.
#[derive(Debug, Clone)]
pub struct MatrixRain {
    width: u16,
    height: u16,
    drops: Vec<RainDrop>,
    trail: VecDeque<TrailPoint>,
    cursor: Option<(u16, u16)>,
    reveal_radius: f32,
    banner: Vec<String>,
}

impl MatrixRain {
    pub fn new<R: Rng + ?Sized>(width: u16, height: u16, banner: Vec<String>, rng: &mut R) -> Self {
        let mut rain = Self {
            width: 0,
            height: 0,
            drops: Vec::new(),
            trail: VecDeque::new(),
            cursor: None,
            reveal_radius: 0.0,
            banner,
        };
        rain.resize(width, height, rng);
        rain
    }

    pub fn reveal_radius(&self) -> f32 {
        self.reveal_radius
    }

    pub fn set_banner(&mut self, banner: Vec<String>) {
        self.banner = banner;
    }

    pub fn resize<R: Rng + ?Sized>(&mut self, width: u16, height: u16, rng: &mut R) {
        if width == self.width && height == self.height && !self.drops.is_empty() {
            return;
        }
        self.width = width;
        self.height = height;
        self.trail.clear();
        self.drops = (0..width).map(|_| spawn_drop(height, true, rng)).collect();
    }

    pub fn set_cursor(&mut self, col: u16, row: u16) {
        if col >= self.width || row >= self.height {
            return;
        }
        self.cursor = Some((col, row));
        if self.trail.len() >= TRAIL_CAPACITY {
            self.trail.pop_front();
        }
        self.trail.push_back(TrailPoint { col, row, age: 0 });
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let height = self.height;
        for drop in &mut self.drops {
            drop.head += drop.speed;
            if drop.head - f32::from(drop.length) > f32::from(height) {
                *drop = spawn_drop(height, false, rng);
            } else if rng.gen_range(0..8) == 0 {
                drop.seed = drop.seed.wrapping_add(1);
            }
        }

        for point in &mut self.trail {
            point.age = point.age.saturating_add(1);
        }
        self.trail.retain(|p| p.age < TRAIL_LIFETIME);

        self.reveal_radius = if self.cursor.is_some() {
            (self.reveal_radius + REVEAL_GROWTH).min(REVEAL_RADIUS)
        } else {
            (self.reveal_radius - REVEAL_GROWTH).max(0.0)
        };
    }

    pub fn cell(&self, col: u16, row: u16) -> RainCell {
        if col >= self.width || row >= self.height {
            return RainCell::Empty;
        }

        if let Some((cx, cy)) = self.cursor {
            // Terminal cells are roughly twice as tall as wide.
            let dx = f32::from(col) - f32::from(cx);
            let dy = (f32::from(row) - f32::from(cy)) * 2.0;
            if (dx * dx + dy * dy).sqrt() <= self.reveal_radius {
                if let Some(ch) = self.banner_char(col, row) {
                    return RainCell::Reveal(ch);
                }
            }
        }

        if let Some(point) = self
            .trail
            .iter()
            .rev()
            .find(|p| p.col == col && p.row == row)
        {
            return RainCell::Trail {
                intensity: 1.0 - f32::from(point.age) / f32::from(TRAIL_LIFETIME),
            };
        }

        let Some(drop) = self.drops.get(usize::from(col)) else {
            return RainCell::Empty;
        };
        let dist = drop.head - f32::from(row);
        if dist < 0.0 || dist >= f32::from(drop.length) {
            return RainCell::Empty;
        }
        let bit = (u32::from(col) * 31 + u32::from(row) * 17 + drop.seed) & 1;
        RainCell::Rain {
            glyph: if bit == 0 { '0' } else { '1' },
            intensity: 1.0 - dist / f32::from(drop.length),
        }
    }

    fn banner_char(&self, col: u16, row: u16) -> Option<char> {
        let lines = self.banner.len();
        if lines == 0 {
            return None;
        }
        let top = usize::from(self.height).saturating_sub(lines) / 2;
        let line = self.banner.get(usize::from(row).checked_sub(top)?)?;
        let len = line.chars().count();
        let left = usize::from(self.width).saturating_sub(len) / 2;
        let ch = line.chars().nth(usize::from(col).checked_sub(left)?)?;
        (!ch.is_whitespace()).then_some(ch)
    }
}

fn spawn_drop<R: Rng + ?Sized>(height: u16, anywhere: bool, rng: &mut R) -> RainDrop {
    let h = f32::from(height.max(1));
    let max_len = (height / 2).max(4);
    let length = rng.gen_range(3..=max_len);
    let head = if anywhere {
        rng.gen_range(-h..h)
    } else {
        -rng.gen_range(0.0..h / 2.0 + 1.0)
    };
    RainDrop {
        head,
        speed: rng.gen_range(0.3..1.2),
        length,
        seed: rng.gen_range(0..1024),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn reveal_grows_under_cursor_and_shows_banner() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut rain = MatrixRain::new(20, 5, vec!["GOAL".to_string()], &mut rng);
        rain.set_cursor(9, 2);
        for _ in 0..10 {
            rain.tick(&mut rng);
        }
        assert_eq!(rain.reveal_radius(), REVEAL_RADIUS);
        // "GOAL" is centred: columns 8..12 on row 2.
        assert_eq!(rain.cell(8, 2), RainCell::Reveal('G'));
        assert_eq!(rain.cell(11, 2), RainCell::Reveal('L'));

        rain.clear_cursor();
        for _ in 0..10 {
            rain.tick(&mut rng);
        }
        assert_eq!(rain.reveal_radius(), 0.0);
        assert!(!matches!(rain.cell(8, 2), RainCell::Reveal(_)));
    }

    #[test]
    fn out_of_grid_cells_are_empty() {
        let mut rng = StdRng::seed_from_u64(9);
        let rain = MatrixRain::new(4, 4, Vec::new(), &mut rng);
        assert_eq!(rain.cell(4, 0), RainCell::Empty);
        assert_eq!(rain.cell(0, 4), RainCell::Empty);
    }

    #[test]
    fn trail_fades_out() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut rain = MatrixRain::new(10, 10, Vec::new(), &mut rng);
        rain.set_cursor(1, 1);
        rain.clear_cursor();
        assert!(matches!(rain.cell(1, 1), RainCell::Trail { .. }));
        for _ in 0..TRAIL_LIFETIME {
            rain.tick(&mut rng);
        }
        assert!(!matches!(rain.cell(1, 1), RainCell::Trail { .. }));
    }
}
