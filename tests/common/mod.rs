#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tilematch::canvas::{Rgb, TileCoordinate};
use tilematch::{
    CanvasDescriptor, DateKey, Endpoints, FetchResponse, RemoteStore, TileMatchError,
    TileMatchResult, TimeOfDayKey,
};

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const RED: Rgb = [255, 0, 0];
pub const BLUE: Rgb = [0, 0, 255];

/// In-memory storage. Unknown URLs answer 404.
#[derive(Default)]
pub struct MemoryStore {
    responses: Mutex<HashMap<String, FetchResponse>>,
    transient: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps for `delay` so overlapping requests are observable.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert(&self, url: impl Into<String>, response: FetchResponse) {
        self.responses.lock().unwrap().insert(url.into(), response);
    }

    pub fn insert_png(&self, url: impl Into<String>, image: &RgbaImage) {
        self.insert(url, FetchResponse::Body(png(image)));
    }

    /// The next `count` requests to `url` fail with a transport error.
    pub fn fail_transiently(&self, url: impl Into<String>, count: u32) {
        self.transient.lock().unwrap().insert(url.into(), count);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.as_str() == url)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, url: &str) -> TileMatchResult<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_owned());
        if let Some(left) = self.transient.lock().unwrap().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(TileMatchError::Transport {
                    url: url.to_owned(),
                    reason: "connection reset".into(),
                });
            }
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(FetchResponse::NotFound))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, url: &str) -> TileMatchResult<FetchResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.respond(url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints::new("https://api.test", "https://tiles.test")
}

pub fn date(key: &str) -> DateKey {
    key.parse().unwrap()
}

pub fn time(key: &str) -> TimeOfDayKey {
    key.parse().unwrap()
}

/// Canvas "0" of edge `size` with a white background.
pub fn canvas(size: u32) -> CanvasDescriptor {
    CanvasDescriptor {
        id: "0".into(),
        title: "Earth".into(),
        pixel_size: size,
        colors: vec![WHITE, BLACK, RED, BLUE],
        historical_sizes: Vec::new(),
        is_3d: false,
    }
}

pub fn day_url(date: DateKey, tile_x: i64, tile_y: i64) -> String {
    endpoints().day_tile_url(date, "0", TileCoordinate { tile_x, tile_y })
}

pub fn time_url(date: DateKey, time: &TimeOfDayKey, tile_x: i64, tile_y: i64) -> String {
    endpoints().time_tile_url(date, "0", time, TileCoordinate { tile_x, tile_y })
}

pub fn solid(width: u32, height: u32, color: Rgb) -> RgbaImage {
    let [r, g, b] = color;
    RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]))
}

/// A 256×256 tile that is not a single color; `seed` varies the content.
pub fn textured_tile(seed: u8) -> RgbaImage {
    RgbaImage::from_fn(256, 256, |x, y| {
        let v = ((x * 7) ^ (y * 13)) as u8;
        Rgba([v, v.wrapping_add(seed), seed, 255])
    })
}

pub fn png(image: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn rgb_at(image: &RgbaImage, x: u32, y: u32) -> Rgb {
    let p = image.get_pixel(x, y);
    [p[0], p[1], p[2]]
}

/// A 5×5 plus sign of `color` on white.
pub fn plus(color: Rgb) -> RgbaImage {
    let mut image = solid(5, 5, WHITE);
    let [r, g, b] = color;
    for i in 0..5 {
        image.put_pixel(2, i, Rgba([r, g, b, 255]));
        image.put_pixel(i, 2, Rgba([r, g, b, 255]));
    }
    image
}

/// Copies `src` into `dest` at `(x, y)`.
pub fn stamp(dest: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    for (sx, sy, p) in src.enumerate_pixels() {
        dest.put_pixel(x + sx, y + sy, *p);
    }
}
