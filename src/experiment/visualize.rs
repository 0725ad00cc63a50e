use std::path::{Path, PathBuf};

use ndarray::Array2;
use plotters::prelude::*;

use super::ExperimentError;

/// Where and how the test run is animated.
#[derive(Debug, Clone, PartialEq)]
pub struct Visualize {
    pub filepath: PathBuf,
    pub n_frames: usize,
    pub gray: bool,
    /// Side of one grid cell, in pixels.
    pub scale: u32,
    /// Delay between frames, in milliseconds.
    pub frame_delay: u32,
}

impl Visualize {
    pub fn new(filepath: impl AsRef<Path>, n_frames: usize, gray: bool) -> Self {
        Self {
            filepath: filepath.as_ref().to_path_buf(),
            n_frames,
            gray,
            scale: 16,
            frame_delay: 100,
        }
    }
}

fn color(value: f64, gray: bool) -> RGBColor {
    let v = value.clamp(0.0, 1.0);
    if gray {
        let c = (v * 255.0).round() as u8;
        return RGBColor(c, c, c);
    }
    // dark purple to yellow
    let lerp = |a: f64, b: f64| (a + (b - a) * v).round() as u8;
    RGBColor(lerp(68.0, 253.0), lerp(1.0, 231.0), lerp(84.0, 37.0))
}

fn render(e: impl std::fmt::Display) -> ExperimentError {
    ExperimentError::Render(e.to_string())
}

/// Writes `frames` as one animated gif, one frame per screen.
pub fn save_gif(frames: &[Array2<f64>], visualize: &Visualize) -> Result<(), ExperimentError> {
    let Some(first) = frames.first() else {
        return Err(render("a gif needs at least one frame"));
    };
    let (rows, cols) = first.dim();
    if let Some(frame) = frames.iter().find(|f| f.dim() != (rows, cols)) {
        return Err(render(format!(
            "frame of shape {:?} differs from {:?}",
            frame.dim(),
            (rows, cols)
        )));
    }
    let scale = visualize.scale.max(1);
    let size = (cols as u32 * scale, rows as u32 * scale);

    let root = BitMapBackend::gif(&visualize.filepath, size, visualize.frame_delay)
        .map_err(render)?
        .into_drawing_area();
    let s = scale as i32;
    for frame in frames {
        root.fill(&WHITE).map_err(render)?;
        for ((i, j), value) in frame.indexed_iter() {
            let (x, y) = (j as i32 * s, i as i32 * s);
            let cell = Rectangle::new(
                [(x, y), (x + s, y + s)],
                color(*value, visualize.gray).filled(),
            );
            root.draw(&cell).map_err(render)?;
        }
        root.present().map_err(render)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Array2<f64>> {
        (0..n)
            .map(|k| Array2::from_shape_fn((5, 5), |(i, j)| ((i + j + k) % 2) as f64))
            .collect()
    }

    #[test]
    fn gray_maps_onto_the_intensity_scale() {
        assert_eq!(color(0.0, true), RGBColor(0, 0, 0));
        assert_eq!(color(1.0, true), RGBColor(255, 255, 255));
        assert_eq!(color(2.0, true), RGBColor(255, 255, 255));
        assert_ne!(color(1.0, false), color(1.0, true));
    }

    #[test]
    fn writes_a_gif_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.gif");
        save_gif(&frames(3), &Visualize::new(&path, 3, false)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], b"GIF");
    }

    #[test]
    fn empty_recording_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.gif");
        let err = save_gif(&[], &Visualize::new(&path, 3, true)).unwrap_err();
        assert!(matches!(err, ExperimentError::Render(_)));
    }

    #[test]
    fn mixed_frame_shapes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorded = frames(2);
        recorded.push(Array2::zeros((4, 4)));
        let visualize = Visualize::new(dir.path().join("x.gif"), 3, true);
        let err = save_gif(&recorded, &visualize).unwrap_err();
        assert!(matches!(err, ExperimentError::Render(_)));
    }
}
