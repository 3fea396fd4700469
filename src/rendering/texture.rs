/// Block textures: fixed 16x16 grids of packed 0x00RRGGBB pixels.
/// Each registry slot loads at most once (OnceLock) and is then shared
/// read-only by every raycasting worker.
use crate::error::AssetLoadError;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const TEXTURE_WIDTH: usize = 16;
pub const TEXTURE_HEIGHT: usize = 16;
pub const TEXTURE_TEXELS: usize = TEXTURE_WIDTH * TEXTURE_HEIGHT;

pub type TextureId = u8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pixels: Box<[u32; TEXTURE_TEXELS]>,
}

impl Texture {
    pub fn from_pixels(pixels: Box<[u32; TEXTURE_TEXELS]>) -> Self {
        Self { pixels }
    }

    /// Decode a PNG (or any format `image` was built with) into a texture
    pub fn load(name: &str, path: &Path) -> Result<Self, AssetLoadError> {
        let image = image::open(path).map_err(|source| AssetLoadError::Decode {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = image.to_rgb8();

        if rgb.width() as usize != TEXTURE_WIDTH || rgb.height() as usize != TEXTURE_HEIGHT {
            return Err(AssetLoadError::Size {
                name: name.to_string(),
                width: rgb.width(),
                height: rgb.height(),
                expected_width: TEXTURE_WIDTH,
                expected_height: TEXTURE_HEIGHT,
            });
        }

        let mut pixels = Box::new([0u32; TEXTURE_TEXELS]);
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            pixels[y as usize * TEXTURE_WIDTH + x as usize] = pack_rgb(r, g, b);
        }
        Ok(Self::from_pixels(pixels))
    }

    /// Texel at (x, y), y = 0 is the top row of the source image.
    /// Panics outside the grid.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        assert!(
            x < TEXTURE_WIDTH && y < TEXTURE_HEIGHT,
            "texel ({x}, {y}) out of range"
        );
        self.pixels[y * TEXTURE_WIDTH + x]
    }

    pub fn pixels(&self) -> &[u32; TEXTURE_TEXELS] {
        &self.pixels
    }
}

#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Generated stand-ins used when no asset directory is configured
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Procedural {
    Checkerboard { a: u32, b: u32 },
    Noise { base: u32, dark: u32, seed: u32 },
    /// Noise with a differently colored band of rows along the top edge
    Capped {
        cap: u32,
        cap_rows: usize,
        base: u32,
        dark: u32,
        seed: u32,
    },
    Stripes { light: u32, dark: u32, period: usize },
}

impl Procedural {
    pub fn generate(self) -> Texture {
        let mut pixels = Box::new([0u32; TEXTURE_TEXELS]);
        match self {
            Procedural::Checkerboard { a, b } => {
                for (i, pixel) in pixels.iter_mut().enumerate() {
                    let x = i % TEXTURE_WIDTH;
                    let y = i / TEXTURE_WIDTH;
                    *pixel = if (x + y) % 2 == 0 { a } else { b };
                }
            }
            Procedural::Noise { base, dark, seed } => {
                fill_noise(&mut pixels[..], base, dark, seed);
            }
            Procedural::Capped {
                cap,
                cap_rows,
                base,
                dark,
                seed,
            } => {
                fill_noise(&mut pixels[..], base, dark, seed);
                let rows = cap_rows.min(TEXTURE_HEIGHT);
                pixels[..rows * TEXTURE_WIDTH].fill(cap);
            }
            Procedural::Stripes {
                light,
                dark,
                period,
            } => {
                let period = period.max(1);
                for (i, pixel) in pixels.iter_mut().enumerate() {
                    let y = i / TEXTURE_WIDTH;
                    *pixel = if y % period == period - 1 { dark } else { light };
                }
            }
        }
        for pixel in pixels.iter_mut() {
            *pixel &= 0x00FF_FFFF;
        }
        Texture::from_pixels(pixels)
    }
}

// LCG picks between the two palette entries per texel
fn fill_noise(pixels: &mut [u32], base: u32, dark: u32, seed: u32) {
    let mut state = seed;
    for pixel in pixels.iter_mut() {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        *pixel = if (state >> 16) & 3 == 0 { dark } else { base };
    }
}

#[derive(Clone, Debug)]
pub enum TextureSource {
    File(PathBuf),
    Procedural(Procedural),
}

impl TextureSource {
    fn load(&self, name: &str) -> Result<Texture, AssetLoadError> {
        match self {
            TextureSource::File(path) => Texture::load(name, path),
            TextureSource::Procedural(procedural) => Ok(procedural.generate()),
        }
    }
}

#[derive(Debug)]
struct TextureEntry {
    name: String,
    source: TextureSource,
    cell: OnceLock<Texture>,
}

/// Texture table indexed by `TextureId`
#[derive(Debug, Default)]
pub struct TextureRegistry {
    entries: Vec<TextureEntry>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a texture slot; the source is not touched until first access
    pub fn register(&mut self, name: impl Into<String>, source: TextureSource) -> TextureId {
        let id = self.entries.len();
        assert!(id <= TextureId::MAX as usize, "texture registry is full");
        self.entries.push(TextureEntry {
            name: name.into(),
            source,
            cell: OnceLock::new(),
        });
        id as TextureId
    }

    /// Stock textures backed by PNG files under `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        for entry in builtin::TABLE {
            registry.register(entry.name, TextureSource::File(dir.join(entry.file)));
        }
        registry
    }

    /// Stock textures generated in memory
    pub fn procedural() -> Self {
        let mut registry = Self::new();
        for entry in builtin::TABLE {
            registry.register(entry.name, TextureSource::Procedural(entry.procedural));
        }
        registry
    }

    /// Fetch a texture, loading it on first access. Panics on unknown ids.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, AssetLoadError> {
        let entry = match self.entries.get(id as usize) {
            Some(entry) => entry,
            None => panic!(
                "texture id {} out of range (registry holds {})",
                id,
                self.entries.len()
            ),
        };

        if let Some(texture) = entry.cell.get() {
            return Ok(texture);
        }

        let texture = entry.source.load(&entry.name)?;
        log::debug!("Loaded texture '{}' ({})", entry.name, id);
        // A concurrent loader may have won; both decoded the same source.
        Ok(entry.cell.get_or_init(|| texture))
    }

    /// Load every slot now, reporting the first failure
    pub fn load_all(&self) -> Result<(), AssetLoadError> {
        for id in 0..self.entries.len() {
            self.texture(id as TextureId)?;
        }
        Ok(())
    }

    pub fn is_loaded(&self, id: TextureId) -> bool {
        self.entries
            .get(id as usize)
            .map_or(false, |entry| entry.cell.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stock texture ids, file names and procedural stand-ins
pub mod builtin {
    use super::{Procedural, TextureId};

    pub const GRASS_TOP: TextureId = 0;
    pub const GRASS_SIDE: TextureId = 1;
    pub const DIRT: TextureId = 2;
    pub const PLANKS: TextureId = 3;
    pub const QUARTZ_TOP: TextureId = 4;
    pub const QUARTZ_SIDE: TextureId = 5;

    pub struct BuiltinTexture {
        pub name: &'static str,
        pub file: &'static str,
        pub procedural: Procedural,
    }

    const GRASS: u32 = 0x5DA73D;
    const GRASS_DARK: u32 = 0x4A8A2F;
    const SOIL: u32 = 0x8B5A2B;
    const SOIL_DARK: u32 = 0x6B4420;
    const QUARTZ: u32 = 0xECE6DC;
    const QUARTZ_DARK: u32 = 0xCFC7B9;

    pub const TABLE: [BuiltinTexture; 6] = [
        BuiltinTexture {
            name: "grass_top",
            file: "grass_carried.png",
            procedural: Procedural::Noise {
                base: GRASS,
                dark: GRASS_DARK,
                seed: 11,
            },
        },
        BuiltinTexture {
            name: "grass_side",
            file: "grass_side_carried.png",
            procedural: Procedural::Capped {
                cap: GRASS,
                cap_rows: 3,
                base: SOIL,
                dark: SOIL_DARK,
                seed: 23,
            },
        },
        BuiltinTexture {
            name: "dirt",
            file: "dirt.png",
            procedural: Procedural::Noise {
                base: SOIL,
                dark: SOIL_DARK,
                seed: 23,
            },
        },
        BuiltinTexture {
            name: "planks",
            file: "planks_big_oak.png",
            procedural: Procedural::Stripes {
                light: 0xA0783F,
                dark: 0x6E5229,
                period: 4,
            },
        },
        BuiltinTexture {
            name: "quartz_top",
            file: "quartz_block_chiseled_top.png",
            procedural: Procedural::Checkerboard {
                a: QUARTZ,
                b: QUARTZ_DARK,
            },
        },
        BuiltinTexture {
            name: "quartz_side",
            file: "quartz_block_chiseled.png",
            procedural: Procedural::Stripes {
                light: QUARTZ,
                dark: QUARTZ_DARK,
                period: 8,
            },
        },
    ];
}
