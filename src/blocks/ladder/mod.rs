use std::fs;
use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorContext, Phase, Result};
use crate::layout::LayerSpec;

pub mod layout;

pub use layout::{Ladder, LadderBuilder};

/// Parameters of a two-stage coupled-ring ladder.
///
/// All lengths are in microns. Per-stage lists are indexed `[stage][..]`;
/// per-ring lists run from the bus a ring pair is attached to, outward.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug), default)]
#[serde(default)]
pub struct LadderParams {
    #[builder(setter(into))]
    pub name: String,
    /// Bus-ring, ring-ring, and ring-bus gaps of each stage.
    pub gaps: [[f64; 3]; 2],
    pub radii: [[f64; 2]; 2],
    /// Length of the horizontal straight section of every ring.
    pub coupling_length: f64,
    /// Length of the vertical straight sections of ring 0 and ring 1.
    pub vertical_lengths: [f64; 2],
    /// Length of the bus shared by both stages.
    pub stage_distance: f64,
    pub wg_width: f64,
    pub heater_width: f64,
    /// Horizontal and vertical extent of each phase line S-bend.
    pub phase_line_offset: f64,

    pub num_pads: usize,
    pub pad_size: f64,
    /// Margin added on every side of the outer pad array.
    pub pad_tolerance: f64,
    pub pad_spacing: f64,
    /// Height of the pad row above the shared bus.
    pub pad_clearance: f64,
    /// Side length of the square contacts landed on heater ends.
    pub contact_size: f64,

    pub layer_heater: LayerSpec,
    pub layer_wg: LayerSpec,
    pub layer_routing: LayerSpec,
    pub layer_pad: LayerSpec,

    pub fiber_array: FiberArrayParams,
    pub electrical_routing: ElectricalRoutingParams,
    pub optical_routing: OpticalRoutingParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiberArrayParams {
    /// Distance of the grating column to the left of the shared bus origin.
    pub clearance: f64,
    pub spacing: f64,
    pub num_gratings: usize,
    /// Width and height of each grating coupler before rotation.
    pub grating_size: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricalRoutingParams {
    pub width: f64,
    pub separation: f64,
    pub start_straight_length: f64,
    pub end_straight_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalRoutingParams {
    pub separation: f64,
    pub start_straight_length: f64,
    pub end_straight_length: f64,
    pub loopback_radius: f64,
    pub loopback_straight_length: f64,
}

impl Default for LadderParams {
    fn default() -> Self {
        Self {
            name: "ring_ladder".to_string(),
            gaps: [[2., 5., 2.], [10., 2., 10.]],
            radii: [[150., 100.], [100., 150.]],
            coupling_length: 20.,
            vertical_lengths: [40., 80.],
            stage_distance: 400.,
            wg_width: 0.5,
            heater_width: 4.,
            phase_line_offset: 50.,
            num_pads: 10,
            pad_size: 76.,
            pad_tolerance: 2.,
            pad_spacing: 100.,
            pad_clearance: 2600.,
            contact_size: 10.,
            layer_heater: LayerSpec(2, 0),
            layer_wg: LayerSpec(1, 0),
            layer_routing: LayerSpec(12, 0),
            layer_pad: LayerSpec(49, 0),
            fiber_array: FiberArrayParams::default(),
            electrical_routing: ElectricalRoutingParams::default(),
            optical_routing: OpticalRoutingParams::default(),
        }
    }
}

impl Default for FiberArrayParams {
    fn default() -> Self {
        Self {
            clearance: 500.,
            spacing: 100.,
            num_gratings: 6,
            grating_size: [12., 39.9],
        }
    }
}

impl Default for ElectricalRoutingParams {
    fn default() -> Self {
        Self {
            width: 10.,
            separation: 15.,
            start_straight_length: 50.,
            end_straight_length: 1.,
        }
    }
}

impl Default for OpticalRoutingParams {
    fn default() -> Self {
        Self {
            separation: 5.,
            start_straight_length: 0.,
            end_straight_length: 0.,
            loopback_radius: 15.,
            loopback_straight_length: 50.,
        }
    }
}

/// The smallest fiber array that can host the four device ports and the loopback.
pub const MIN_GRATINGS: usize = 6;

impl LadderParams {
    #[inline]
    pub fn builder() -> LadderParamsBuilder {
        LadderParamsBuilder::default()
    }

    /// Vertical mismatch between the far buses of stage 0 and stage 1.
    pub fn phase_line_mismatch(&self) -> f64 {
        let radii = self.radii.map(|r| r.iter().sum::<f64>());
        let gaps = self.gaps.map(|g| g.iter().sum::<f64>());
        2. * (radii[0] - radii[1]) + (gaps[0] - gaps[1])
    }

    /// Length of the straight between the two phase line S-bends.
    #[inline]
    pub fn phase_line_length(&self) -> f64 {
        self.stage_distance - 2. * self.phase_line_offset
    }

    /// Checks that every derived dimension is positive.
    pub fn validate(&self) -> Result<()> {
        let context = ErrorContext::phase(Phase::Configure);
        let positive = |what: &str, value: f64| {
            if value > 0. && value.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_geometry(
                    context,
                    format!("{what} must be positive, got {value}"),
                ))
            }
        };
        let non_negative = |what: &str, value: f64| {
            if value >= 0. && value.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_geometry(
                    context,
                    format!("{what} must not be negative, got {value}"),
                ))
            }
        };

        for (stage, (gaps, radii)) in self.gaps.iter().zip(self.radii.iter()).enumerate() {
            for &gap in gaps {
                positive(&format!("stage {stage} gap"), gap)?;
            }
            for &radius in radii {
                positive(&format!("stage {stage} radius"), radius)?;
            }
        }
        for &length in &self.vertical_lengths {
            positive("vertical length", length)?;
        }
        positive("coupling length", self.coupling_length)?;
        positive("stage distance", self.stage_distance)?;
        positive("waveguide width", self.wg_width)?;
        positive("heater width", self.heater_width)?;
        positive("phase line offset", self.phase_line_offset)?;
        positive(
            "stage distance minus twice the phase line offset",
            self.phase_line_length(),
        )?;
        positive("pad size", self.pad_size)?;
        positive("pad spacing", self.pad_spacing)?;
        positive("pad clearance", self.pad_clearance)?;
        non_negative("pad tolerance", self.pad_tolerance)?;
        positive("contact size", self.contact_size)?;

        let electrical = &self.electrical_routing;
        positive("electrical routing width", electrical.width)?;
        positive("electrical routing separation", electrical.separation)?;
        non_negative(
            "electrical routing start straight length",
            electrical.start_straight_length,
        )?;
        non_negative(
            "electrical routing end straight length",
            electrical.end_straight_length,
        )?;

        let optical = &self.optical_routing;
        positive("optical routing separation", optical.separation)?;
        non_negative(
            "optical routing start straight length",
            optical.start_straight_length,
        )?;
        non_negative(
            "optical routing end straight length",
            optical.end_straight_length,
        )?;
        positive("loopback radius", optical.loopback_radius)?;
        positive("loopback straight length", optical.loopback_straight_length)?;

        positive("fiber array spacing", self.fiber_array.spacing)?;
        non_negative("fiber array clearance", self.fiber_array.clearance)?;
        positive("grating width", self.fiber_array.grating_size[0])?;
        positive("grating height", self.fiber_array.grating_size[1])?;
        if self.num_pads == 0 {
            return Err(Error::invalid_geometry(context, "at least one pad is required"));
        }
        if self.fiber_array.num_gratings < MIN_GRATINGS {
            return Err(Error::invalid_geometry(
                context,
                format!(
                    "fiber array needs at least {MIN_GRATINGS} gratings, got {}",
                    self.fiber_array.num_gratings
                ),
            ));
        }
        Ok(())
    }
}

/// Reads ladder parameters from a TOML file. Missing keys take their defaults.
pub fn parse_ladder_config(path: impl AsRef<Path>) -> Result<LadderParams> {
    let contents = fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = LadderParams::default();
        params.validate().unwrap();
        assert_abs_diff_eq!(params.phase_line_mismatch(), -13.);
        assert_abs_diff_eq!(params.phase_line_length(), 300.);
    }

    #[test]
    fn builder_fills_defaults() {
        let params = LadderParams::builder()
            .name("short")
            .stage_distance(300.)
            .build()
            .unwrap();
        assert_eq!(params.name, "short");
        assert_eq!(params.stage_distance, 300.);
        assert_eq!(params.radii, LadderParams::default().radii);
    }

    #[test]
    fn short_stage_distance_is_rejected() {
        let params = LadderParams {
            stage_distance: 100.,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidGeometry {
                context: ErrorContext {
                    phase: Phase::Configure,
                    slot: None
                },
                ..
            }
        ));
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut params = LadderParams::default();
        params.radii[1][0] = 0.;
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("stage 1 radius"), "{err}");
    }

    macro_rules! rejected_params {
        ($($name:ident: $field:ident $(. $sub:ident)* $([$idx:literal])? = $value:expr => $what:literal;)*) => {
            paste::paste! {
                $(
                    #[test]
                    fn [<rejects_ $name>]() {
                        let mut params = LadderParams::default();
                        params.$field $(. $sub)* $([$idx])? = $value;
                        let err = params.validate().unwrap_err();
                        assert!(
                            matches!(err, Error::InvalidGeometry { .. }),
                            "{err}"
                        );
                        assert!(err.to_string().contains($what), "{err}");
                    }
                )*
            }
        };
    }

    rejected_params! {
        negative_pad_clearance: pad_clearance = -500. => "pad clearance";
        negative_pad_tolerance: pad_tolerance = -1. => "pad tolerance";
        negative_electrical_separation: electrical_routing.separation = -15. => "electrical routing separation";
        negative_electrical_start: electrical_routing.start_straight_length = -50. => "electrical routing start";
        negative_electrical_end: electrical_routing.end_straight_length = -1. => "electrical routing end";
        zero_optical_separation: optical_routing.separation = 0. => "optical routing separation";
        negative_optical_start: optical_routing.start_straight_length = -5. => "optical routing start";
        negative_optical_end: optical_routing.end_straight_length = -5. => "optical routing end";
        zero_grating_width: fiber_array.grating_size[0] = 0. => "grating width";
        negative_grating_height: fiber_array.grating_size[1] = -39.9 => "grating height";
        infinite_pad_clearance: pad_clearance = f64::INFINITY => "pad clearance";
    }

    #[test]
    fn small_fiber_array_is_rejected() {
        let mut params = LadderParams::default();
        params.fiber_array.num_gratings = 4;
        assert!(params.validate().is_err());
    }

    #[test]
    fn partial_config_takes_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name = "ladder_a"
stage_distance = 500.0
radii = [[120.0, 80.0], [80.0, 120.0]]
layer_pad = [40, 0]

[fiber_array]
clearance = 600.0
"#
        )
        .unwrap();
        let params = parse_ladder_config(file.path()).unwrap();
        assert_eq!(params.name, "ladder_a");
        assert_eq!(params.stage_distance, 500.);
        assert_eq!(params.radii, [[120., 80.], [80., 120.]]);
        assert_eq!(params.layer_pad, LayerSpec(40, 0));
        assert_eq!(params.fiber_array.clearance, 600.);
        assert_eq!(params.fiber_array.num_gratings, 6);
        assert_eq!(params.gaps, LadderParams::default().gaps);
    }

    #[test]
    fn malformed_config_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stage_distance = \"far\"").unwrap();
        assert!(matches!(
            parse_ladder_config(file.path()),
            Err(Error::Config(_))
        ));
    }
}
