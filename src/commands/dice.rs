// ABOUTME: dice command rendering an animated die roll as an in-memory GIF
// ABOUTME: The animation tumbles through random faces and settles on a uniformly rolled one

use anyhow::{Context, Result};
use async_trait::async_trait;
use gordy_core::{BotCommand, CommandContext, ImagePayload};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};
use rand::Rng;

pub const CANVAS: u32 = 112;
const DIE: u32 = 96;
const BORDER: u32 = 3;
const PIP_RADIUS: i64 = 8;

/// Tumbling frames before the final face
pub const ROLL_FRAMES: usize = 10;
const ROLL_FRAME_MS: u32 = 90;
const FINAL_FRAME_MS: u32 = 2_000;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BODY: Rgba<u8> = Rgba([250, 245, 232, 255]);
const INK: Rgba<u8> = Rgba([30, 30, 30, 255]);

/// Pip centers on a 3x3 grid (column, row), per face
fn pips(face: u8) -> &'static [(u32, u32)] {
    match face {
        1 => &[(1, 1)],
        2 => &[(0, 0), (2, 2)],
        3 => &[(0, 0), (1, 1), (2, 2)],
        4 => &[(0, 0), (2, 0), (0, 2), (2, 2)],
        5 => &[(0, 0), (2, 0), (1, 1), (0, 2), (2, 2)],
        _ => &[(0, 0), (2, 0), (0, 1), (2, 1), (0, 2), (2, 2)],
    }
}

/// Canvas pixel at the center of grid cell (column, row) for a die drawn at (x, y)
pub fn pip_center(x: u32, y: u32, column: u32, row: u32) -> (u32, u32) {
    let step = DIE / 4;
    (x + step * (column + 1), y + step * (row + 1))
}

pub fn roll_face<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}

/// Draw one face with the die's top-left corner at (x, y)
pub fn render_face(face: u8, x: u32, y: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(CANVAS, CANVAS, BACKGROUND);

    for py in y..(y + DIE).min(CANVAS) {
        for px in x..(x + DIE).min(CANVAS) {
            let edge = px < x + BORDER
                || py < y + BORDER
                || px >= x + DIE - BORDER
                || py >= y + DIE - BORDER;
            img.put_pixel(px, py, if edge { INK } else { BODY });
        }
    }

    for &(column, row) in pips(face) {
        let (cx, cy) = pip_center(x, y, column, row);
        fill_circle(&mut img, cx as i64, cy as i64, PIP_RADIUS);
    }

    img
}

fn fill_circle(img: &mut RgbaImage, cx: i64, cy: i64, r: i64) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let (px, py) = (cx + dx, cy + dy);
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                img.put_pixel(px as u32, py as u32, INK);
            }
        }
    }
}

/// Encode a full roll ending on `final_face`
pub fn render_roll<R: Rng>(final_face: u8, rng: &mut R) -> Result<ImagePayload> {
    let slack = CANVAS - DIE;
    let mut frames = Vec::with_capacity(ROLL_FRAMES + 1);

    for _ in 0..ROLL_FRAMES {
        let face = roll_face(rng);
        let (x, y) = (rng.gen_range(0..=slack), rng.gen_range(0..=slack));
        frames.push(Frame::from_parts(
            render_face(face, x, y),
            0,
            0,
            Delay::from_numer_denom_ms(ROLL_FRAME_MS, 1),
        ));
    }

    let center = slack / 2;
    frames.push(Frame::from_parts(
        render_face(final_face, center, center),
        0,
        0,
        Delay::from_numer_denom_ms(FINAL_FRAME_MS, 1),
    ));

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, 10);
        encoder
            .set_repeat(Repeat::Infinite)
            .context("Failed to set GIF repeat")?;
        encoder
            .encode_frames(frames)
            .context("Failed to encode dice GIF")?;
    }

    Ok(ImagePayload {
        bytes,
        content_type: "image/gif".to_string(),
        filename: format!("dice-{}.gif", final_face),
        width: CANVAS,
        height: CANVAS,
    })
}

#[derive(Debug, Default)]
pub struct DiceCommand;

#[async_trait]
impl BotCommand for DiceCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        // ThreadRng is not Send, so keep it out of the await below
        let payload = {
            let mut rng = rand::thread_rng();
            let face = roll_face(&mut rng);
            tracing::debug!(room_id = %ctx.room_id, face, "dice: rolled");
            render_roll(face, &mut rng)?
        };
        ctx.reply_image(payload).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ink_at(img: &RgbaImage, (x, y): (u32, u32)) -> bool {
        *img.get_pixel(x, y) == INK
    }

    #[test]
    fn test_roll_face_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let face = roll_face(&mut rng);
            assert!((1..=6).contains(&face));
        }
    }

    #[test]
    fn test_pip_counts_match_faces() {
        for face in 1..=6u8 {
            assert_eq!(pips(face).len(), face as usize);
        }
    }

    #[test]
    fn test_render_face_draws_pips() {
        let img = render_face(1, 8, 8);
        assert!(ink_at(&img, pip_center(8, 8, 1, 1)));
        assert!(!ink_at(&img, pip_center(8, 8, 0, 0)));

        let img = render_face(6, 8, 8);
        assert!(ink_at(&img, pip_center(8, 8, 0, 1)));
        assert!(!ink_at(&img, pip_center(8, 8, 1, 1)));
    }

    #[test]
    fn test_render_roll_produces_animated_gif() {
        let mut rng = StdRng::seed_from_u64(42);
        let payload = render_roll(4, &mut rng).unwrap();

        assert!(payload.bytes.starts_with(b"GIF89a"));
        assert_eq!(payload.content_type, "image/gif");
        assert_eq!(payload.filename, "dice-4.gif");
        assert_eq!((payload.width, payload.height), (CANVAS, CANVAS));
        assert_eq!(payload.size(), payload.bytes.len() as u64);

        let decoder = GifDecoder::new(std::io::Cursor::new(payload.bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), ROLL_FRAMES + 1);
    }
}
