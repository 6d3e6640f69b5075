// filter.rs — wavelet filter kernels.
//
// A closed tagged union dispatched by pattern match. Each variant carries
// only the data its algorithm needs:
//
//   Reversible53   — integer-lifting 5/3, exact reconstruction on
//                    integer-valued input. The lossless filter.
//   Irreversible97 — four-pass floating-point lifting 9/7 with the fixed
//                    CDF coefficients. The lossy filter.
//   Arbitrary      — caller-supplied analysis/synthesis tap sets, applied
//                    by direct convolution with mirror extension.
//   Lifting        — caller-supplied lifting coefficients with distinct
//                    low/high scale factors. Steps alternate roles:
//                    even-indexed coefficients update the odd (high) band,
//                    odd-indexed coefficients update the even (low) band.

/// CDF 9/7 lifting coefficients (JPEG 2000 Part 1 irreversible filter).
pub mod cdf97 {
    /// First predict step.
    pub const ALPHA: f32 = -1.586_134_342;
    /// First update step.
    pub const BETA: f32 = -0.052_980_118;
    /// Second predict step.
    pub const GAMMA: f32 = 0.882_911_075;
    /// Second update step.
    pub const DELTA: f32 = 0.443_506_852;
    /// Low-pass scale factor; the high-pass band is scaled by `1.0 / K`.
    pub const K: f32 = 1.230_174_105;
}

/// A wavelet filter, selected per engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKernel {
    /// LeGall 5/3 integer lifting. Reversible: integer-valued inputs
    /// reconstruct bit-exactly.
    Reversible53,
    /// CDF 9/7 floating-point lifting. Irreversible: reconstruction is
    /// exact only up to floating-point rounding.
    Irreversible97,
    /// Direct convolution against caller-supplied taps with whole-sample
    /// mirror extension. Analysis taps produce the bands; synthesis taps
    /// reconstruct. Perfect reconstruction holds only for complementary
    /// tap sets; that is the caller's contract.
    Arbitrary {
        analysis_low: Vec<f32>,
        analysis_high: Vec<f32>,
        synthesis_low: Vec<f32>,
        synthesis_high: Vec<f32>,
    },
    /// Generic lifting ladder. `coefficients[0]` is a predict step
    /// (updates the odd band from even neighbours), `coefficients[1]` an
    /// update step, and so on alternating. After all steps the low band
    /// is multiplied by `scale_low` and the high band by `scale_high`.
    Lifting {
        coefficients: Vec<f32>,
        scale_low: f32,
        scale_high: f32,
    },
}

impl FilterKernel {
    /// Short name used in logs and bench labels.
    pub fn name(&self) -> &'static str {
        match self {
            FilterKernel::Reversible53 => "rev53",
            FilterKernel::Irreversible97 => "irr97",
            FilterKernel::Arbitrary { .. } => "arbitrary",
            FilterKernel::Lifting { .. } => "lifting",
        }
    }

    /// True when forward + inverse reproduce integer-valued input exactly.
    pub fn is_reversible(&self) -> bool {
        matches!(self, FilterKernel::Reversible53)
    }

    /// The CDF 9/7 filter expressed as a generic lifting ladder. The two
    /// forms must transform identically; tests rely on it.
    pub fn cdf97_as_lifting() -> FilterKernel {
        FilterKernel::Lifting {
            coefficients: vec![cdf97::ALPHA, cdf97::BETA, cdf97::GAMMA, cdf97::DELTA],
            scale_low: cdf97::K,
            scale_high: 1.0 / cdf97::K,
        }
    }
}
