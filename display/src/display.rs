use anyhow::{Context, Result};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::WindowCanvas;

use quirk8_core::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use quirk8_core::FrameBuffer;

/// Bytes per texel of an RGB24 texture
const RGB24: usize = 3;

/// A two colour palette; unset pixels are drawn `dark`, set pixels `light`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Palette {
    pub dark: (u8, u8, u8),
    pub light: (u8, u8, u8),
}

/// Palettes from https://lospec.com/palette-list
pub const PALETTES: [Palette; 8] = [
    // 1bit-monitor-glow
    Palette {
        dark: (0x22, 0x23, 0x23),
        light: (0xf0, 0xf6, 0xf0),
    },
    // paperback-2
    Palette {
        dark: (0x38, 0x2b, 0x26),
        light: (0xb8, 0xc2, 0xb9),
    },
    // noire-truth
    Palette {
        dark: (0x1e, 0x1c, 0x32),
        light: (0xc6, 0xba, 0xac),
    },
    // pixel-ink
    Palette {
        dark: (0x3e, 0x23, 0x2c),
        light: (0xed, 0xf6, 0xd6),
    },
    // obra-dinn-ibm-8503
    Palette {
        dark: (0x2e, 0x30, 0x37),
        light: (0xeb, 0xe5, 0xce),
    },
    // knockia3310
    Palette {
        dark: (0x21, 0x2c, 0x28),
        light: (0x72, 0xa4, 0x88),
    },
    // note-2c
    Palette {
        dark: (0x22, 0x2a, 0x3d),
        light: (0xed, 0xf2, 0xe2),
    },
    // gato-roboto-starboard
    Palette {
        dark: (0x0a, 0x2e, 0x44),
        light: (0xfc, 0xff, 0xcc),
    },
];

/// # Display
/// The Chip-8 display is composed of 64x32 two-colour pixels.
/// The on/off state of these pixels is encoded as 1/0 respectively in a 2d array of 64x32 bytes.
/// The display only gets a call to `render` when the Chip-8 FrameBuffer is updated.
pub struct Display {
    canvas: WindowCanvas,
    palette: usize,
}

impl Display {
    /// Creates a new display object bound to an sdl2 context.
    ///
    /// # Arguments
    /// * `sdl` an sdl2 context with which to draw
    /// * `scale` the size multiplier for each pixel
    /// * `palette` index into `PALETTES`, taken modulo its length
    pub fn new(sdl: &sdl2::Sdl, scale: u32, palette: usize) -> Result<Self> {
        let video_subsystem = sdl.video().map_err(anyhow::Error::msg)?;
        let window = video_subsystem
            .window(
                "Quirk-8",
                DISPLAY_WIDTH as u32 * scale,
                DISPLAY_HEIGHT as u32 * scale,
            )
            .position_centered()
            .resizable()
            .build()
            .context("unable to create window")?;
        let mut canvas = window
            .into_canvas()
            .build()
            .context("unable to create canvas")?;
        canvas
            .set_logical_size(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32)
            .context("unable to set logical size")?;

        Ok(Display {
            canvas,
            palette: palette % PALETTES.len(),
        })
    }

    /// Index of the palette in use
    pub fn palette(&self) -> usize {
        self.palette
    }

    /// Switches to the next palette in `PALETTES`, wrapping around
    pub fn cycle_palette(&mut self) {
        self.palette = (self.palette + 1) % PALETTES.len();
    }

    /// Formats a Chip-8 FrameBuffer for rendering as an SDL2 RGB24 texture.
    ///
    /// An SDL2 texture is a 1D array of bytes that represent concatenated rows of RGB pixels,
    /// so every Chip-8 pixel becomes the three bytes of its palette colour.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    /// * `palette` the colours to draw with
    pub fn frame_to_rgb24(frame: &FrameBuffer, palette: &Palette) -> Vec<u8> {
        frame
            .iter()
            .flatten()
            .flat_map(|&pixel| {
                let (r, g, b) = if pixel == 0 {
                    palette.dark
                } else {
                    palette.light
                };
                [r, g, b]
            })
            .collect()
    }

    /// Formats the Chip-8 FrameBuffer as an SDL2 RGB24 texture and renders it.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    pub fn render(&mut self, frame: &FrameBuffer) -> Result<()> {
        let texture_creator = self.canvas.texture_creator();

        let mut texture = texture_creator
            .create_texture_streaming(
                PixelFormatEnum::RGB24,
                DISPLAY_WIDTH as u32,
                DISPLAY_HEIGHT as u32,
            )
            .context("unable to create texture")?;

        let pixels = Display::frame_to_rgb24(frame, &PALETTES[self.palette]);
        texture
            .update(None, &pixels, DISPLAY_WIDTH * RGB24)
            .context("unable to update texture")?;

        self.canvas
            .copy(&texture, None, None)
            .map_err(anyhow::Error::msg)?;
        self.canvas.present();
        Ok(())
    }
}
