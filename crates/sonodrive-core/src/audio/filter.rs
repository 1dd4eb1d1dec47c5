//! Single-pole IIR smoothing primitives.
//!
//! A filter is described semantically by [`FilterParams`] (`tao`, `gain`)
//! and run with the derived coefficients `(a, b)`:
//! `state = a * x + b * state`.

use crate::params::FilterParams;

/// Convert semantic parameters into IIR coefficients `(a, b)`
///
/// `tao == 0` yields `(1, 0)` regardless of `gain`.
pub fn from_filter_params(params: FilterParams) -> (f32, f32) {
    if params.tao == 0.0 {
        return (1.0, 0.0);
    }
    let b = 0.5 * ((params.tao - 1.0) / params.tao).exp2();
    let a = (1.0 - b) * params.gain;
    (a, b * params.gain)
}

/// Steady-state gain of coefficients `(a, b)`
pub fn gain(a: f32, b: f32) -> f32 {
    a + b
}

/// Time constant of coefficients `(a, b)`; `0` when the gain or `b` is zero
pub fn tao(a: f32, b: f32) -> f32 {
    let g = gain(a, b);
    if g == 0.0 || b == 0.0 {
        return 0.0;
    }
    1.0 / (1.0 - (2.0 * b / g).log2())
}

/// Recover [`FilterParams`] from coefficients
pub fn to_filter_params(a: f32, b: f32) -> FilterParams {
    FilterParams {
        tao: tao(a, b),
        gain: gain(a, b),
    }
}

/// Multi-channel single-pole low-pass filter
#[derive(Debug, Clone)]
pub struct Filter {
    values: Vec<f32>,
    a: f32,
    b: f32,
}

impl Filter {
    /// Create a filter with `size` channels and zeroed state
    pub fn new(size: usize, params: FilterParams) -> Self {
        let (a, b) = from_filter_params(params);
        Self {
            values: vec![0.0; size],
            a,
            b,
        }
    }

    /// Feed one input vector, returning the updated state
    pub fn process(&mut self, x: &[f32]) -> &[f32] {
        for (state, &input) in self.values.iter_mut().zip(x) {
            *state = self.a * input + self.b * *state;
        }
        &self.values
    }

    /// Change coefficients, keeping the current state
    pub fn set_params(&mut self, params: FilterParams) {
        let (a, b) = from_filter_params(params);
        self.a = a;
        self.b = b;
    }

    /// Current state
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Coefficients `(a, b)`
    pub fn coefficients(&self) -> (f32, f32) {
        (self.a, self.b)
    }
}

/// Single-pole filter with separate coefficients for falling and rising input
///
/// Channels whose input is at or below the current state use the `pos`
/// coefficients, the others use `neg`.
#[derive(Debug, Clone)]
pub struct BiasedFilter {
    values: Vec<f32>,
    pos: (f32, f32),
    neg: (f32, f32),
}

impl BiasedFilter {
    /// Create a biased filter with `size` channels and zeroed state
    pub fn new(size: usize, pos_params: FilterParams, neg_params: FilterParams) -> Self {
        Self {
            values: vec![0.0; size],
            pos: from_filter_params(pos_params),
            neg: from_filter_params(neg_params),
        }
    }

    /// Feed one input vector, returning the updated state
    pub fn process(&mut self, x: &[f32]) -> &[f32] {
        for (state, &input) in self.values.iter_mut().zip(x) {
            let (a, b) = if input <= *state { self.pos } else { self.neg };
            *state = a * input + b * *state;
        }
        &self.values
    }

    /// Change both coefficient pairs, keeping the current state
    pub fn set_params(&mut self, pos_params: FilterParams, neg_params: FilterParams) {
        self.pos = from_filter_params(pos_params);
        self.neg = from_filter_params(neg_params);
    }

    /// Current state
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tao_ignores_gain() {
        for &g in &[0.0f32, 1.0, -3.0, 100.0] {
            assert_eq!(from_filter_params(FilterParams { tao: 0.0, gain: g }), (1.0, 0.0));
        }
    }

    #[test]
    fn test_coefficients_roundtrip() {
        let params = FilterParams {
            tao: 12.0,
            gain: 0.5,
        };
        let (a, b) = from_filter_params(params);
        assert!((gain(a, b) - 0.5).abs() < 1e-6);
        assert!((tao(a, b) - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_tao_guards() {
        assert_eq!(tao(1.0, 0.0), 0.0);
        assert_eq!(tao(0.5, -0.5), 0.0);
    }

    #[test]
    fn test_step_response_converges_without_overshoot() {
        let mut filter = Filter::new(
            1,
            FilterParams {
                tao: 138.0,
                gain: 1.0,
            },
        );

        let mut previous = 0.0;
        for _ in 0..5000 {
            let v = filter.process(&[1.0])[0];
            assert!(v >= previous - 1e-6);
            assert!(v <= 1.0 + 1e-6);
            previous = v;
        }
        assert!((previous - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_set_params_keeps_state() {
        let mut filter = Filter::new(2, FilterParams { tao: 4.0, gain: 1.0 });
        filter.process(&[1.0, 2.0]);
        let before = filter.values().to_vec();

        filter.set_params(FilterParams { tao: 0.0, gain: 1.0 });
        assert_eq!(filter.values(), before.as_slice());

        // tao 0 passes input straight through
        assert_eq!(filter.process(&[5.0, 6.0]), &[5.0, 6.0]);
    }

    #[test]
    fn test_biased_filter_attack_and_release() {
        // Slow when falling, instant when rising
        let mut filter = BiasedFilter::new(
            1,
            FilterParams {
                tao: 64.0,
                gain: 1.0,
            },
            FilterParams { tao: 0.0, gain: 1.0 },
        );

        assert_eq!(filter.process(&[1.0])[0], 1.0);

        let after_drop = filter.process(&[0.0])[0];
        assert!(after_drop > 0.9 && after_drop < 1.0);
    }
}
