//! Animated GIFs from rendered snapshots
//!
//! A frame function maps a frame number to an RGB image; the frames are
//! collected in memory and encoded as one looping GIF.

use crate::errors::{PapaError, Result};
use crate::netcdf_io::read_variable_f64;
use crate::plot::{render_heatmap, HeatmapOptions};
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame, RgbImage};
use ndarray::{Array2, ArrayD, Axis, Ix2};
use netcdf::File;
use rayon::prelude::*;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Encoding settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationOptions {
    pub fps: f64,
    /// Number of repeats, 0 loops forever
    pub loop_count: u16,
    /// Integer pixel magnification applied to every frame
    pub scale: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            fps: 18.0,
            loop_count: 0,
            scale: 1,
        }
    }
}

impl AnimationOptions {
    fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(PapaError::InvalidArgument(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.scale == 0 {
            return Err(PapaError::InvalidArgument("scale must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Display time of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps
    }
}

/// What was written
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSummary {
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub frame_duration_ms: f64,
    /// Length of one pass through the animation
    pub duration_secs: f64,
}

/// Builds a GIF from `frame_fn(i)` for every `i` in `indices`.
pub fn create_animation<F>(
    mut frame_fn: F,
    indices: &[usize],
    path: &Path,
    opts: &AnimationOptions,
) -> Result<AnimationSummary>
where
    F: FnMut(usize) -> Result<RgbImage>,
{
    opts.validate()?;
    if indices.is_empty() {
        return Err(PapaError::InvalidArgument("no frames requested".to_string()));
    }

    let mut frames = Vec::with_capacity(indices.len());
    for &i in indices {
        frames.push(frame_fn(i)?);
        log::debug!("Frame {} is created", i);
    }
    encode_gif(frames, path, opts)
}

/// Like [`create_animation`], rendering frames on the rayon pool.
pub fn create_animation_parallel<F>(
    frame_fn: F,
    indices: &[usize],
    path: &Path,
    opts: &AnimationOptions,
) -> Result<AnimationSummary>
where
    F: Fn(usize) -> Result<RgbImage> + Sync,
{
    opts.validate()?;
    if indices.is_empty() {
        return Err(PapaError::InvalidArgument("no frames requested".to_string()));
    }

    let frames = indices
        .par_iter()
        .map(|&i| {
            let frame = frame_fn(i);
            log::debug!("Frame {} is created", i);
            frame
        })
        .collect::<Result<Vec<_>>>()?;
    encode_gif(frames, path, opts)
}

fn encode_gif(frames: Vec<RgbImage>, path: &Path, opts: &AnimationOptions) -> Result<AnimationSummary> {
    let (width, height) = frames[0].dimensions();
    if let Some(odd) = frames.iter().find(|f| f.dimensions() != (width, height)) {
        return Err(PapaError::ShapeMismatch {
            context: "animation frames".to_string(),
            left: vec![width as usize, height as usize],
            right: vec![odd.width() as usize, odd.height() as usize],
        });
    }

    let (scaled_width, scaled_height) = width
        .checked_mul(opts.scale)
        .zip(height.checked_mul(opts.scale))
        .ok_or_else(|| {
            PapaError::InvalidArgument(format!(
                "{}x{} frames cannot be scaled by {}",
                width, height, opts.scale
            ))
        })?;

    let n_frames = frames.len();
    let delay = Delay::from_saturating_duration(Duration::from_secs_f64(1.0 / opts.fps));
    let out = std::fs::File::create(path)?;
    let mut encoder = GifEncoder::new(BufWriter::new(out));
    encoder.set_repeat(match opts.loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    })?;

    for frame in frames {
        let frame = if opts.scale > 1 {
            imageops::resize(&frame, scaled_width, scaled_height, FilterType::Nearest)
        } else {
            frame
        };
        let rgba = DynamicImage::ImageRgb8(frame).into_rgba8();
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
    }

    let summary = AnimationSummary {
        frames: n_frames,
        width: scaled_width,
        height: scaled_height,
        frame_duration_ms: opts.frame_duration_ms(),
        duration_secs: n_frames as f64 / opts.fps,
    };
    log::info!(
        "Animation at FPS={} will last for {} seconds",
        opts.fps,
        summary.duration_secs
    );
    Ok(summary)
}

/// 2-D snapshot of `data` at time step `t`.
///
/// The time axis comes first; of the remaining axes the first two are kept
/// and every later one is fixed at index 0. A 1-d snapshot becomes a column.
pub fn snapshot(data: &ArrayD<f64>, t: usize) -> Result<Array2<f64>> {
    if data.ndim() < 2 {
        return Err(PapaError::InvalidArgument(format!(
            "need at least (time, z) to animate, got {} dimensions",
            data.ndim()
        )));
    }
    if t >= data.len_of(Axis(0)) {
        return Err(PapaError::InvalidArgument(format!(
            "time step {} out of range ({} steps)",
            t,
            data.len_of(Axis(0))
        )));
    }

    let mut view = data.index_axis(Axis(0), t);
    while view.ndim() > 2 {
        let last = view.ndim() - 1;
        view = view.index_axis_move(Axis(last), 0);
    }
    if view.ndim() == 1 {
        let n = view.len();
        return Ok(view.to_owned().into_shape((n, 1))?);
    }
    Ok(view.into_dimensionality::<Ix2>()?.to_owned())
}

/// One frame per time step of `var_name`.
pub fn animate_variable(
    file: &File,
    var_name: &str,
    path: &Path,
    heatmap: &HeatmapOptions,
    opts: &AnimationOptions,
) -> Result<AnimationSummary> {
    let (data, dims) = read_variable_f64(file, var_name)?;
    log::info!("animating '{}' over ({})", var_name, dims.join(", "));
    if data.ndim() < 2 {
        return Err(PapaError::InvalidArgument(format!(
            "'{}' needs a time axis and at least one more dimension",
            var_name
        )));
    }
    let steps: Vec<usize> = (0..data.len_of(Axis(0))).collect();

    create_animation_parallel(
        |t| render_heatmap(&snapshot(&data, t)?, heatmap),
        &steps,
        path,
        opts,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::{Array3, IxDyn};

    #[test]
    fn snapshot_drops_trailing_axes() {
        // (time=2, z=3, y=1, x=1)
        let data = ArrayD::from_shape_fn(IxDyn(&[2, 3, 1, 1]), |ix| (ix[0] * 10 + ix[1]) as f64);
        let snap = snapshot(&data, 1).unwrap();
        assert_eq!(snap.dim(), (3, 1));
        assert_eq!(snap[[2, 0]], 12.0);

        let grid = Array3::from_shape_fn((2, 2, 4), |(t, y, x)| (t * 100 + y * 10 + x) as f64).into_dyn();
        let snap = snapshot(&grid, 0).unwrap();
        assert_eq!(snap.dim(), (2, 4));
        assert_eq!(snap[[1, 3]], 13.0);
    }

    #[test]
    fn snapshot_bounds() {
        let data = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
        assert_eq!(snapshot(&data, 0).unwrap().dim(), (3, 1));
        assert!(snapshot(&data, 2).is_err());
        assert!(snapshot(&ArrayD::<f64>::zeros(IxDyn(&[4])), 0).is_err());
    }

    #[test]
    fn writes_gif_with_expected_timing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my-animation.gif");
        let opts = AnimationOptions {
            fps: 4.0,
            loop_count: 0,
            scale: 2,
        };

        let summary = create_animation(
            |i| Ok(RgbImage::from_pixel(5, 3, Rgb([i as u8 * 40, 0, 0]))),
            &[0, 1, 2, 3, 4, 5],
            &path,
            &opts,
        )
        .unwrap();

        assert_eq!(summary.frames, 6);
        assert_eq!((summary.width, summary.height), (10, 6));
        assert_eq!(summary.frame_duration_ms, 250.0);
        assert_eq!(summary.duration_secs, 1.5);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
    }

    #[test]
    fn rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gif");
        let blank = |_| Ok(RgbImage::new(2, 2));

        assert!(create_animation(blank, &[], &path, &AnimationOptions::default()).is_err());
        let zero_fps = AnimationOptions {
            fps: 0.0,
            ..AnimationOptions::default()
        };
        assert!(create_animation(blank, &[0], &path, &zero_fps).is_err());

        let uneven = create_animation_parallel(
            |i| Ok(RgbImage::new(2 + i as u32, 2)),
            &[0, 1],
            &path,
            &AnimationOptions::default(),
        );
        assert!(matches!(uneven, Err(PapaError::ShapeMismatch { .. })));
    }

    #[test]
    fn rejects_overflowing_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.gif");
        let opts = AnimationOptions {
            scale: u32::MAX,
            ..AnimationOptions::default()
        };
        let result = create_animation(|_| Ok(RgbImage::new(4, 2)), &[0], &path, &opts);
        assert!(matches!(result, Err(PapaError::InvalidArgument(_))));
    }
}
