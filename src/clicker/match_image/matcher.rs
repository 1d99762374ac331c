//! Zero-mean normalized cross-correlation against the live screen

use super::screen::{ScreenFrame, ScreenSource};
use super::template::Template;
use crate::clicker::error::CaptureError;
use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, match_template};

/// Best correlation found for one template in one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Correlation coefficient in [-1, 1], 1.0 for an exact copy.
    pub score: f32,
    /// Top-left corner of the best window, absolute screen coordinates.
    pub location: (i32, i32),
}

impl MatchResult {
    pub fn is_hit(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Sum over the `width` x `height` window at `(x, y)` of a padded integral
/// image (one leading row and column of zeros).
fn window_sum(integral: &Image<Luma<u64>>, x: u32, y: u32, width: u32, height: u32) -> u64 {
    let at = |px: u32, py: u32| integral.get_pixel(px, py)[0];
    (at(x + width, y + height) + at(x, y)) - (at(x + width, y) + at(x, y + height))
}

/// Global maximum of the correlation coefficient of `template` over
/// `screen`, as `(score, top-left)`.
///
/// Both the window and the template have their mean removed before
/// correlating, so brightness alone never makes a match:
///
/// ```text
/// score = (n·ΣIT - ΣI·ΣT) / sqrt((n·ΣI² - (ΣI)²) · (n·ΣT² - (ΣT)²))
/// ```
///
/// `ΣIT` comes from a plain cross-correlation pass, the window sums from
/// integral images. Windows without variance have no defined score and are
/// skipped. Returns `None` when there is nothing to correlate: an empty or
/// flat template, a template larger than the screen, or a screen with no
/// textured window at all.
pub fn best_match(screen: &GrayImage, template: &GrayImage) -> Option<(f32, (u32, u32))> {
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 {
        return None;
    }
    if tw > screen.width() || th > screen.height() {
        log::debug!(
            "⚠️ Template {}x{} larger than screen {}x{}",
            tw,
            th,
            screen.width(),
            screen.height()
        );
        return None;
    }

    let n = u128::from(tw) * u128::from(th);
    let (t_sum, t_sq_sum) = template.pixels().fold((0u128, 0u128), |(sum, sq), p| {
        let v = u128::from(p[0]);
        (sum + v, sq + v * v)
    });
    let t_var = n * t_sq_sum - t_sum * t_sum;
    if t_var == 0 {
        log::debug!("⚠️ Template {}x{} is flat, nothing to correlate", tw, th);
        return None;
    }
    let t_norm = (t_var as f64).sqrt();

    let cross = match_template(screen, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(screen);
    let squares = integral_squared_image::<_, u64>(screen);

    let mut best: Option<(f32, (u32, u32))> = None;
    for (x, y, pixel) in cross.enumerate_pixels() {
        let i_sum = u128::from(window_sum(&sums, x, y, tw, th));
        let i_sq_sum = u128::from(window_sum(&squares, x, y, tw, th));
        let i_var = n * i_sq_sum - i_sum * i_sum;
        if i_var == 0 {
            continue;
        }

        let numerator = n as f64 * f64::from(pixel[0]) - i_sum as f64 * t_sum as f64;
        let score = (numerator / ((i_var as f64).sqrt() * t_norm)) as f32;
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|(max, _)| score > max) {
            best = Some((score, (x, y)));
        }
    }
    best
}

/// Pairs a screen source with the correlation step.
pub struct ScreenMatcher<S: ScreenSource> {
    source: S,
}

impl<S: ScreenSource> ScreenMatcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Capture the screen and find `template` in it.
    ///
    /// `Ok(None)` is an ordinary "nothing this poll"; only capture faults
    /// come back as `Err`.
    pub fn locate(&mut self, template: &Template) -> Result<Option<MatchResult>, CaptureError> {
        let frame = self.source.capture()?;
        Ok(match_frame(&frame, template))
    }

    /// Score every template against a single capture.
    pub fn locate_all(
        &mut self,
        templates: &[Template],
    ) -> Result<Vec<(String, Option<MatchResult>)>, CaptureError> {
        let frame = self.source.capture()?;
        Ok(templates
            .iter()
            .map(|template| (template.name.clone(), match_frame(&frame, template)))
            .collect())
    }
}

fn match_frame(frame: &ScreenFrame, template: &Template) -> Option<MatchResult> {
    best_match(&frame.image, &template.image).map(|(score, (x, y))| MatchResult {
        score,
        location: (frame.origin.0 + x as i32, frame.origin.1 + y as i32),
    })
}
