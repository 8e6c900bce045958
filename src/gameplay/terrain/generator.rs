use super::simplify::simplify_polyline;
use bevy::math::Vec2;
use rand::Rng;
use std::error::Error;
use std::f32::consts::PI;
use std::fmt::{Display, Formatter};

/// First slope of the very first span is this many times the longest slope.
const FLAT_START_LENGTH_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSettings {
    pub viewport_height: f32,
    /// Baseline ground height as a fraction of the viewport, measured from the top.
    pub start_terrain_height: f32,
    pub amplitude: f32,
    pub slope_length_min: u32,
    pub slope_length_max: u32,
    pub slopes_per_mountain: u32,
    pub simplify_tolerance: f32,
}

impl TerrainSettings {
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.slope_length_min == 0 {
            return Err(TerrainError::ZeroSlopeLength);
        }
        if self.slope_length_min > self.slope_length_max {
            return Err(TerrainError::InvertedSlopeRange {
                min: self.slope_length_min,
                max: self.slope_length_max,
            });
        }
        if self.slopes_per_mountain == 0 {
            return Err(TerrainError::NoSlopes);
        }
        if self.simplify_tolerance <= 0.0 || !self.simplify_tolerance.is_finite() {
            return Err(TerrainError::InvalidTolerance(self.simplify_tolerance));
        }
        if self.viewport_height <= 0.0 {
            return Err(TerrainError::InvalidViewport(self.viewport_height));
        }
        Ok(())
    }

    fn flat_start_length(&self) -> u32 {
        (self.slope_length_max as f32 * FLAT_START_LENGTH_FACTOR).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerrainError {
    ZeroSlopeLength,
    InvertedSlopeRange { min: u32, max: u32 },
    NoSlopes,
    InvalidTolerance(f32),
    InvalidViewport(f32),
}

impl Display for TerrainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroSlopeLength => write!(f, "slope length minimum must be >= 1"),
            Self::InvertedSlopeRange { min, max } => {
                write!(f, "slope length range is inverted ({min} > {max})")
            }
            Self::NoSlopes => write!(f, "a mountain needs at least one slope"),
            Self::InvalidTolerance(value) => {
                write!(f, "simplify tolerance must be a positive number, got {value}")
            }
            Self::InvalidViewport(value) => {
                write!(f, "viewport height must be > 0, got {value}")
            }
        }
    }
}

impl Error for TerrainError {}

/// Dense samples of one span before simplification.
#[derive(Debug, Clone)]
pub struct RawSpan {
    /// One point per integer x step; x is span-local, y is a screen-space height.
    pub points: Vec<Vec2>,
    /// Span-local x of every slope seam, in order.
    pub seams: Vec<u32>,
    /// Absolute end coordinate: x in world units, y as a normalized slope value.
    pub end: Vec2,
}

#[derive(Debug, Clone)]
pub struct GeneratedSpan {
    pub start_x: f32,
    pub width: f32,
    pub points: Vec<Vec2>,
    pub raw_point_count: usize,
    pub end: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct SlopeSegment {
    start_x: u32,
    start_y: f32,
    end_x: u32,
    end_y: f32,
}

impl SlopeSegment {
    fn value_at(&self, x: u32) -> f32 {
        let delta = (x - self.start_x) as f32 / (self.end_x - self.start_x) as f32;
        cosine_interpolate(self.start_y, self.end_y, delta)
    }
}

pub fn cosine_interpolate(from: f32, to: f32, delta: f32) -> f32 {
    let ease = (1.0 - (delta * PI).cos()) * 0.5;
    from * (1.0 - ease) + to * ease
}

#[derive(Debug, Clone)]
pub struct TerrainGenerator<R: Rng> {
    settings: TerrainSettings,
    rng: R,
}

impl<R: Rng> TerrainGenerator<R> {
    pub fn new(settings: TerrainSettings, rng: R) -> Result<Self, TerrainError> {
        settings.validate()?;
        Ok(Self { settings, rng })
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TerrainSettings) -> Result<(), TerrainError> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Screen-space y for a normalized slope value.
    pub fn pixel_height(&self, value: f32) -> f32 {
        self.settings.viewport_height * self.settings.start_terrain_height
            + value * self.settings.amplitude
    }

    pub fn generate(&mut self, start: Vec2) -> GeneratedSpan {
        let raw = self.sample_raw(start);
        let points = simplify_polyline(&raw.points, self.settings.simplify_tolerance, true);

        GeneratedSpan {
            start_x: start.x,
            width: raw.end.x - start.x,
            raw_point_count: raw.points.len(),
            points,
            end: raw.end,
        }
    }

    pub fn sample_raw(&mut self, start: Vec2) -> RawSpan {
        let first_length = self.random_slope_length();
        let mut slope = if start.x == 0.0 {
            SlopeSegment {
                start_x: 0,
                start_y: start.y,
                end_x: self.settings.flat_start_length(),
                end_y: 0.0,
            }
        } else {
            SlopeSegment {
                start_x: 0,
                start_y: start.y,
                end_x: first_length,
                end_y: self.random_height(),
            }
        };

        let mut points = Vec::new();
        let mut seams = Vec::with_capacity(self.settings.slopes_per_mountain as usize);
        let mut point_x: u32 = 0;

        while (seams.len() as u32) < self.settings.slopes_per_mountain {
            let value = if point_x == slope.end_x {
                seams.push(point_x);
                let next_length = self.random_slope_length();
                let next_height = self.random_height();
                slope = SlopeSegment {
                    start_x: point_x,
                    start_y: slope.end_y,
                    end_x: slope.end_x + next_length,
                    end_y: next_height,
                };
                // The seam sits exactly on the previous end point.
                slope.start_y
            } else {
                slope.value_at(point_x)
            };

            points.push(Vec2::new(point_x as f32, self.pixel_height(value)));
            point_x += 1;
        }

        RawSpan {
            points,
            seams,
            end: Vec2::new(start.x + (point_x - 1) as f32, slope.start_y),
        }
    }

    fn random_slope_length(&mut self) -> u32 {
        self.rng.gen_range(self.settings.slope_length_min..=self.settings.slope_length_max)
    }

    fn random_height(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}
