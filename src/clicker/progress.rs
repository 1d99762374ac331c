/// Fraction of the whole plan processed so far, in percent.
///
/// Finished passes count in full; within the active pass every processed
/// template adds its share, whether or not it was found.
pub fn compute_progress(
    current_loop: u32,
    loop_times: u32,
    template_index: usize,
    template_count: usize,
) -> f32 {
    if loop_times == 0 || template_count == 0 {
        return 100.0;
    }
    let loops = loop_times as f64;
    let loop_progress = current_loop as f64 / loops;
    let template_progress = (template_index + 1) as f64 / template_count as f64 / loops;
    ((loop_progress + template_progress) * 100.0).clamp(0.0, 100.0) as f32
}
