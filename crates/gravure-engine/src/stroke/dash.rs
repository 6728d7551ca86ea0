use crate::path::QuadSegment;

use super::{DashPattern, StrokeQuad};

/// Cuts each contour into its "on" runs. Every run becomes its own open
/// contour, numbered from 1.
pub(crate) fn dash(quads: &[StrokeQuad], pattern: &DashPattern) -> Vec<StrokeQuad> {
    let lengths = pattern.normalized();
    let period: f32 = lengths.iter().sum();
    let mut out = Vec::new();
    let mut next_contour = 0u32;

    for contour in super::split_contours(quads) {
        // Position inside the pattern at the start of this contour.
        let mut idx = 0usize;
        let mut left = lengths[0];
        let mut phase = pattern.phase.rem_euclid(period);
        while phase > 0.0 {
            if phase < left {
                left -= phase;
                break;
            }
            phase -= left;
            idx = (idx + 1) % lengths.len();
            left = lengths[idx];
        }

        let mut run_open = false;
        for sq in contour {
            let q = sq.quad;
            let seg_len = q.length();
            let mut pos = 0.0f32;
            while pos < seg_len {
                let take = left.min(seg_len - pos);
                let on = idx % 2 == 0;
                if on && take > 0.0 {
                    if !run_open {
                        next_contour += 1;
                        run_open = true;
                    }
                    let t0 = q.t_at_length(pos);
                    let t1 = q.t_at_length(pos + take);
                    out.push(StrokeQuad {
                        contour: next_contour,
                        quad: sub_quad(&q, t0, t1),
                    });
                }
                pos += take;
                left -= take;
                if left <= 0.0 {
                    idx = (idx + 1) % lengths.len();
                    left = lengths[idx];
                    if idx % 2 == 1 {
                        run_open = false;
                    }
                }
            }
        }
    }
    out
}

fn sub_quad(q: &QuadSegment, t0: f32, t1: f32) -> QuadSegment {
    if t0 <= 0.0 && t1 >= 1.0 {
        return *q;
    }
    q.sub(t0, t1)
}
