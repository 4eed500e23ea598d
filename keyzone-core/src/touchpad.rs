//! Touchpad pitch-pad layout: lets a touchpad X axis drive PitchBend or
//! SmartScaleBend the same way the keyboard zones do. A 1D layout of
//! resting bands (one per step, holds
//! exactly on that step) and transition bands between them (glides
//! smoothly to the next step), built once per config change and then
//! sampled on every touch-move.

/// One band of the built layout: either a resting band (holds `step`
/// exactly) or a transition band (interpolates to `step + 1`).
struct PitchPadBand {
    x_start: f32,
    x_end: f32,
    inv_span: f32,
    step: i32,
    is_rest: bool,
}

pub struct PitchPadLayout {
    bands: Vec<PitchPadBand>,
}

#[derive(Debug, Clone, Copy)]
pub struct PitchPadConfig {
    pub min_step: i32,
    pub max_step: i32,
    /// Width of a resting band vs. a transition band, both as a percent of
    /// total width; normalized together so they always fill [0,1].
    pub rest_zone_percent: f32,
    pub transition_zone_percent: f32,
    /// Legacy single-slider layout, used when both zone percents are 0.
    pub resting_space_percent: f32,
}

impl Default for PitchPadConfig {
    fn default() -> Self {
        Self {
            min_step: -2,
            max_step: 2,
            rest_zone_percent: 10.0,
            transition_zone_percent: 10.0,
            resting_space_percent: 10.0,
        }
    }
}

/// The step sampled at a touch position, possibly mid-transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchSample {
    /// Integer while resting; fractional (`step .. step + 1`) while gliding.
    pub step: f32,
    pub in_resting_band: bool,
    /// Position within the current band, `0.0..=1.0`.
    pub local_t: f32,
}

pub fn build_pitch_pad_layout(config: &PitchPadConfig) -> PitchPadLayout {
    let mut layout = PitchPadLayout { bands: Vec::new() };

    let step_count = if config.max_step >= config.min_step {
        (config.max_step - config.min_step + 1) as usize
    } else {
        0
    };
    if step_count == 0 {
        return layout;
    }
    let transition_count = step_count.saturating_sub(1);

    let rest_pct = config.rest_zone_percent.clamp(0.0, 100.0);
    let trans_pct = config.transition_zone_percent.clamp(0.0, 100.0);
    let raw_total = step_count as f32 * rest_pct + transition_count as f32 * trans_pct;

    let (rest_width, transition_width) = if raw_total > 0.0 {
        let scale = 1.0 / raw_total;
        let rest_width = rest_pct * scale;
        let transition_width = if transition_count > 0 { trans_pct * scale } else { 0.0 };
        (rest_width, transition_width)
    } else {
        let legacy_rest = config.resting_space_percent.clamp(0.0, 80.0);
        let rest_width_total = (legacy_rest / 100.0) * step_count as f32;
        let remaining = (1.0 - rest_width_total).max(0.0);
        let rest_width = if legacy_rest > 0.0 { rest_width_total / step_count as f32 } else { 0.0 };
        let transition_width = if transition_count > 0 { remaining / transition_count as f32 } else { 0.0 };
        (rest_width, transition_width)
    };

    let mut x = 0.0_f32;
    for i in 0..step_count {
        let step = config.min_step + i as i32;

        let rest_end = x + rest_width;
        layout.bands.push(PitchPadBand {
            x_start: x,
            x_end: rest_end,
            inv_span: if rest_width > 0.0 { 1.0 / rest_width } else { 0.0 },
            step,
            is_rest: true,
        });
        x = rest_end;

        if i < step_count - 1 && transition_width > 0.0 {
            let trans_end = x + transition_width;
            layout.bands.push(PitchPadBand {
                x_start: x,
                x_end: trans_end,
                inv_span: if transition_width > 0.0 { 1.0 / transition_width } else { 0.0 },
                step,
                is_rest: false,
            });
            x = trans_end;
        }
    }

    if let Some(last) = layout.bands.last_mut() {
        last.x_end = 1.0;
        let span = last.x_end - last.x_start;
        last.inv_span = if span > 0.0 { 1.0 / span } else { 0.0 };
    }

    layout
}

pub fn map_x_to_step(layout: &PitchPadLayout, x: f32) -> PitchSample {
    let x = x.clamp(0.0, 1.0);
    let Some(band) = layout.bands.iter().find(|b| x >= b.x_start && x < b.x_end) else {
        return match layout.bands.last() {
            Some(last) => PitchSample {
                step: last.step as f32,
                in_resting_band: last.is_rest,
                local_t: 0.0,
            },
            None => PitchSample::default(),
        };
    };

    let u = (x - band.x_start) * band.inv_span;
    if band.is_rest {
        PitchSample {
            step: band.step as f32,
            in_resting_band: true,
            local_t: 0.0,
        }
    } else {
        let frac = u.clamp(0.0, 1.0);
        PitchSample {
            step: band.step as f32 + frac,
            in_resting_band: false,
            local_t: frac,
        }
    }
}

/// Convert a normalized touch position to a pair of `0.0..=1.0` expression
/// values: `bend_0_1` from the X axis via the built layout (rescaled from
/// `config`'s step range), and `aux_0_1` a plain clamp of Y for a second,
/// independent CC/expression mapping.
pub fn norm_xy_to_value(config: &PitchPadConfig, layout: &PitchPadLayout, x: f32, y: f32) -> (f32, f32) {
    let sample = map_x_to_step(layout, x);
    let span = (config.max_step - config.min_step).max(1) as f32;
    let bend_0_1 = ((sample.step - config.min_step as f32) / span).clamp(0.0, 1.0);
    (bend_0_1, y.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_one_resting_band_per_step() {
        let config = PitchPadConfig {
            min_step: -1,
            max_step: 1,
            rest_zone_percent: 0.0,
            transition_zone_percent: 0.0,
            resting_space_percent: 10.0,
        };
        let layout = build_pitch_pad_layout(&config);
        let rest_count = layout.bands.iter().filter(|b| b.is_rest).count();
        assert_eq!(rest_count, (config.max_step - config.min_step + 1) as usize);
    }

    #[test]
    fn center_of_a_resting_band_holds_its_step_exactly() {
        let config = PitchPadConfig {
            min_step: -1,
            max_step: 1,
            rest_zone_percent: 30.0,
            transition_zone_percent: 10.0,
            resting_space_percent: 0.0,
        };
        let layout = build_pitch_pad_layout(&config);
        let first_rest = layout.bands.iter().find(|b| b.is_rest).unwrap();
        let center = (first_rest.x_start + first_rest.x_end) / 2.0;
        let sample = map_x_to_step(&layout, center);
        assert!(sample.in_resting_band);
        assert_eq!(sample.step, -1.0);
    }

    #[test]
    fn transition_band_interpolates_between_neighbors() {
        let config = PitchPadConfig {
            min_step: 0,
            max_step: 1,
            rest_zone_percent: 10.0,
            transition_zone_percent: 80.0,
            resting_space_percent: 0.0,
        };
        let layout = build_pitch_pad_layout(&config);
        let transition = layout.bands.iter().find(|b| !b.is_rest).unwrap();
        let mid = (transition.x_start + transition.x_end) / 2.0;
        let sample = map_x_to_step(&layout, mid);
        assert!(!sample.in_resting_band);
        assert!(sample.step > 0.0 && sample.step < 1.0);
    }

    #[test]
    fn norm_xy_rescales_step_into_unit_range() {
        let config = PitchPadConfig {
            min_step: -2,
            max_step: 2,
            ..PitchPadConfig::default()
        };
        let layout = build_pitch_pad_layout(&config);
        let (bend_at_start, _) = norm_xy_to_value(&config, &layout, 0.0, 0.3);
        let (bend_at_end, _) = norm_xy_to_value(&config, &layout, 1.0, 0.3);
        assert!(bend_at_start < 0.1);
        assert!(bend_at_end > 0.9);
    }
}
