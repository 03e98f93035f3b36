//! Instrument data model (`spec.md` §3 "Instrument").
//!
//! Instruments are built from the DSL's flat `key=value` property list by
//! [`Instrument::from_raw_properties`], which performs the legacy-alias and
//! CSV-envelope normalization `spec.md` §4.C step 4 requires, and returns any
//! warnings alongside the typed value rather than failing the parse: per
//! §7, malformed instrument properties are `ResolveWarning`s, not fatal
//! errors.

use std::fmt;

use crate::diag::Diagnostic;

/// The four Game Boy channel types an instrument can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    /// Square/pulse channel 1 (supports sweep).
    Pulse1,
    /// Square/pulse channel 2.
    Pulse2,
    /// 4-bit wavetable channel.
    Wave,
    /// LFSR noise channel.
    Noise,
}

impl InstrumentType {
    /// Parses the `type=` property value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pulse1" => Some(Self::Pulse1),
            "pulse2" => Some(Self::Pulse2),
            "wave" => Some(Self::Wave),
            "noise" => Some(Self::Noise),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pulse1 => "pulse1",
            Self::Pulse2 => "pulse2",
            Self::Wave => "wave",
            Self::Noise => "noise",
        };
        write!(f, "{s}")
    }
}

/// Envelope direction: `up` ramps toward full volume, `down` toward silence,
/// `none` holds the initial level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeDirection {
    /// Ramp volume up over time.
    Up,
    /// Ramp volume down over time.
    Down,
    /// Hold the initial volume.
    None,
}

impl EnvelopeDirection {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "none" | "flat" => Some(Self::None),
            _ => None,
        }
    }
}

/// NR-style envelope: `{ initial in [0,15], direction, period in [0,7] }`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// Initial volume, 0 (silent) to 15 (full).
    pub initial: u8,
    /// Direction volume moves over time.
    pub direction: EnvelopeDirection,
    /// Number of 1/64s steps per envelope tick, 0 to 7 (0 disables stepping).
    pub period: u8,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            initial: 15,
            direction: EnvelopeDirection::None,
            period: 0,
        }
    }
}

impl Envelope {
    /// Parses the structured form: `initial,direction[,period]` where
    /// `initial` and `direction` are required fields of the same property
    /// (this is also the shape the legacy CSV form uses — see
    /// [`Envelope::parse_legacy_csv`] for the warning-producing entry point).
    fn parse_fields(fields: &[&str]) -> Option<Self> {
        let initial: u8 = fields.first()?.trim().parse().ok()?;
        let direction = EnvelopeDirection::parse(fields.get(1)?)?;
        let period: u8 = match fields.get(2) {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        Some(Self {
            initial: initial.min(15),
            direction,
            period: period.min(7),
        })
    }

    /// Parses a legacy CSV-form envelope (`"12,down"` or `"12,down,4"`),
    /// always normalizing to the structured representation and always
    /// warning that the legacy form was used (`spec.md` §3 Instrument: "Both
    /// structured and CSV-like legacy forms accepted; legacy forms must
    /// produce a warning and normalize").
    pub fn parse_legacy_csv(raw: &str) -> Option<Self> {
        let fields: Vec<&str> = raw.split(',').collect();
        Self::parse_fields(&fields)
    }
}

/// Sweep direction for the NR10-style `sweep` effect/instrument property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDirection {
    /// Frequency rises over time.
    Up,
    /// Frequency falls over time.
    Down,
}

impl SweepDirection {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// NR10-style frequency sweep, only meaningful on `pulse1` instruments.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sweep {
    /// Sweep time, 0 to 7 (0 is a documented no-op).
    pub time: u8,
    /// Whether frequency rises or falls.
    pub direction: SweepDirection,
    /// Shift amount, 0 to 7 (0 is a documented no-op).
    pub shift: u8,
}

/// LFSR noise configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Noise {
    /// Clock shift exponent feeding the LFSR clock divider.
    pub clock_shift: u8,
    /// LFSR width: 15-bit (default) or 7-bit ("Mad Max"-style short noise).
    pub width_mode: u8,
    /// Clock divisor ratio code, 0 to 7 (0 is treated as 0.5 per hardware convention).
    pub divisor: u8,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            clock_shift: 0,
            width_mode: 15,
            divisor: 1,
        }
    }
}

/// Volume scaling for `wave`-type instruments: 0%, 25%, 50%, or 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WaveVolume {
    /// Silent.
    Mute,
    /// Quarter volume.
    Quarter,
    /// Half volume.
    Half,
    /// Full volume (default).
    Full,
}

impl WaveVolume {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(Self::Mute),
            "25" => Some(Self::Quarter),
            "50" => Some(Self::Half),
            "100" => Some(Self::Full),
            _ => None,
        }
    }

    /// The linear gain multiplier this setting applies (`volume/100`).
    pub fn gain(self) -> f32 {
        match self {
            Self::Mute => 0.0,
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::Full => 1.0,
        }
    }
}

impl Default for WaveVolume {
    fn default() -> Self {
        Self::Full
    }
}

const VALID_DUTIES: [f32; 4] = [12.5, 25.0, 50.0, 75.0];

/// A fully-resolved instrument definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Instrument {
    /// Which of the four Game Boy channel types this instrument targets.
    pub instrument_type: InstrumentType,
    /// Duty cycle percentage, meaningful on `pulse1`/`pulse2` only.
    pub duty: Option<f32>,
    /// Volume envelope; defaults to full volume, no ramp, held.
    pub env: Envelope,
    /// 16-sample 4-bit wave table, meaningful on `wave` only.
    pub wave: Option<[u8; 16]>,
    /// Wave channel output scaling; defaults to full.
    pub wave_volume: WaveVolume,
    /// NR10-style sweep, meaningful on `pulse1` only.
    pub sweep: Option<Sweep>,
    /// LFSR noise parameters, meaningful on `noise` only.
    pub noise: Option<Noise>,
}

impl Instrument {
    /// Builds an instrument from the DSL's raw `key=value` property list.
    ///
    /// Property keys are matched case-sensitively against the documented
    /// names; the legacy alias `envelope` is accepted for `env` (normalized
    /// silently — the warning for that comes from using the CSV form, not
    /// from using the alias). Returns `None` only when `type` is missing or
    /// unrecognized (a hard requirement — `spec.md` §3: "type: one of
    /// pulse1, pulse2, wave, noise"); all other malformed properties degrade
    /// to defaults with a warning appended to `diagnostics`.
    pub fn from_raw_properties(
        properties: &[(String, String)],
        loc: crate::diag::SourceLocation,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Self> {
        let mut instrument_type = None;
        let mut duty = None;
        let mut env = Envelope::default();
        let mut wave = None;
        let mut wave_volume = WaveVolume::default();
        let mut sweep = None;
        let mut noise_clock_shift = None;
        let mut noise_width = None;
        let mut noise_divisor = None;

        for (key, value) in properties {
            match key.as_str() {
                "type" => instrument_type = InstrumentType::parse(value),
                "duty" => match value.trim().parse::<f32>() {
                    Ok(d) if VALID_DUTIES.iter().any(|v| (v - d).abs() < 0.01) => duty = Some(d),
                    _ => diagnostics.push(Diagnostic::warning(
                        format!("invalid duty value '{value}', expected one of 12.5/25/50/75"),
                        loc,
                    )),
                },
                "env" | "envelope" => {
                    if value.contains('=') {
                        match parse_structured_envelope(value) {
                            Some(parsed) => env = parsed,
                            None => diagnostics.push(Diagnostic::warning(
                                format!("invalid env value '{value}'"),
                                loc,
                            )),
                        }
                    } else {
                        let fields: Vec<&str> = value.split(',').collect();
                        match Envelope::parse_fields(&fields) {
                            Some(parsed) => {
                                env = parsed;
                                diagnostics.push(Diagnostic::warning(
                                    format!(
                                        "legacy CSV envelope form '{value}' is deprecated, \
                                         use initial=,direction=,period= instead"
                                    ),
                                    loc,
                                ));
                            }
                            None => diagnostics.push(Diagnostic::warning(
                                format!("invalid env value '{value}'"),
                                loc,
                            )),
                        }
                    }
                }
                "wave" => match parse_wave_table(value) {
                    Some(table) => wave = Some(table),
                    None => diagnostics.push(Diagnostic::warning(
                        format!("invalid wave table '{value}', expected 16 comma-separated 4-bit samples"),
                        loc,
                    )),
                },
                "volume" => match WaveVolume::parse(value) {
                    Some(v) => wave_volume = v,
                    None => diagnostics.push(Diagnostic::warning(
                        format!("invalid volume value '{value}', expected one of 0/25/50/100"),
                        loc,
                    )),
                },
                "sweep" => {
                    let fields: Vec<&str> = value.split(',').collect();
                    match parse_sweep_fields(&fields) {
                        Some(parsed) => sweep = Some(parsed),
                        None => diagnostics.push(Diagnostic::warning(
                            format!("invalid sweep value '{value}'"),
                            loc,
                        )),
                    }
                }
                "noise" => {
                    let fields: Vec<&str> = value.split(',').collect();
                    noise_clock_shift = fields.first().and_then(|f| f.trim().parse::<u8>().ok());
                    noise_width = fields.get(1).and_then(|f| f.trim().parse::<u8>().ok());
                    noise_divisor = fields.get(2).and_then(|f| f.trim().parse::<u8>().ok());
                }
                _ => diagnostics.push(Diagnostic::warning(
                    format!("unknown instrument property '{key}'"),
                    loc,
                )),
            }
        }

        let instrument_type = instrument_type?;

        if sweep.is_some() && instrument_type != InstrumentType::Pulse1 {
            diagnostics.push(Diagnostic::warning(
                "sweep is only valid on pulse1 instruments".to_string(),
                loc,
            ));
        }

        let noise = if noise_clock_shift.is_some() || noise_width.is_some() || noise_divisor.is_some() {
            let width_mode = match noise_width {
                Some(7) => 7,
                Some(15) | None => 15,
                Some(_) => {
                    diagnostics.push(Diagnostic::warning(
                        "noise widthMode must be 7 or 15, defaulting to 15".to_string(),
                        loc,
                    ));
                    15
                }
            };
            Some(Noise {
                clock_shift: noise_clock_shift.unwrap_or(0),
                width_mode,
                divisor: noise_divisor.unwrap_or(1),
            })
        } else if instrument_type == InstrumentType::Noise {
            Some(Noise::default())
        } else {
            None
        };

        Some(Self {
            instrument_type,
            duty,
            env,
            wave,
            wave_volume,
            sweep,
            noise,
        })
    }
}

fn parse_wave_table(value: &str) -> Option<[u8; 16]> {
    let mut table = [0u8; 16];
    let mut count = 0;
    for (i, part) in value.split(',').enumerate() {
        if i >= 16 {
            return None;
        }
        let sample: u8 = part.trim().parse().ok()?;
        if sample > 15 {
            return None;
        }
        table[i] = sample;
        count += 1;
    }
    if count != 16 {
        return None;
    }
    Some(table)
}

/// Parses the structured named-field envelope form, e.g.
/// `initial=12,direction=down,period=0`. This is the non-deprecated
/// counterpart to [`Envelope::parse_fields`]'s positional CSV form.
fn parse_structured_envelope(value: &str) -> Option<Envelope> {
    let mut initial = None;
    let mut direction = None;
    let mut period = None;
    for part in value.split(',') {
        let (key, v) = part.split_once('=')?;
        match key.trim() {
            "initial" => initial = Some(v.trim().parse::<u8>().ok()?),
            "direction" => direction = Some(EnvelopeDirection::parse(v)?),
            "period" => period = Some(v.trim().parse::<u8>().ok()?),
            _ => return None,
        }
    }
    Some(Envelope {
        initial: initial?.min(15),
        direction: direction?,
        period: period.unwrap_or(0).min(7),
    })
}

fn parse_sweep_fields(fields: &[&str]) -> Option<Sweep> {
    let time: u8 = fields.first()?.trim().parse().ok()?;
    let direction = SweepDirection::parse(fields.get(1)?)?;
    let shift: u8 = fields.get(2)?.trim().parse().ok()?;
    Some(Sweep {
        time: time.min(7),
        direction,
        shift: shift.min(7),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::point(1, 1)
    }

    #[test]
    fn legacy_csv_envelope_normalizes_and_would_warn() {
        let env = Envelope::parse_legacy_csv("12,down").unwrap();
        assert_eq!(
            env,
            Envelope {
                initial: 12,
                direction: EnvelopeDirection::Down,
                period: 0
            }
        );
    }

    #[test]
    fn from_raw_properties_builds_pulse_instrument() {
        let mut diags = Vec::new();
        let props = vec![
            ("type".to_string(), "pulse1".to_string()),
            ("duty".to_string(), "50".to_string()),
            ("env".to_string(), "12,down".to_string()),
        ];
        let inst = Instrument::from_raw_properties(&props, loc(), &mut diags).unwrap();
        assert_eq!(inst.instrument_type, InstrumentType::Pulse1);
        assert_eq!(inst.duty, Some(50.0));
        assert_eq!(inst.env.initial, 12);
        assert_eq!(diags.len(), 1, "legacy CSV env form should warn");
    }

    #[test]
    fn structured_envelope_form_does_not_warn() {
        let mut diags = Vec::new();
        let props = vec![
            ("type".to_string(), "pulse1".to_string()),
            ("env".to_string(), "initial=12,direction=down,period=3".to_string()),
        ];
        let inst = Instrument::from_raw_properties(&props, loc(), &mut diags).unwrap();
        assert_eq!(
            inst.env,
            Envelope { initial: 12, direction: EnvelopeDirection::Down, period: 3 }
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn sweep_on_non_pulse1_warns() {
        let mut diags = Vec::new();
        let props = vec![
            ("type".to_string(), "pulse2".to_string()),
            ("sweep".to_string(), "2,up,3".to_string()),
        ];
        let inst = Instrument::from_raw_properties(&props, loc(), &mut diags).unwrap();
        assert!(inst.sweep.is_some());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn missing_type_fails() {
        let mut diags = Vec::new();
        let props = vec![("duty".to_string(), "50".to_string())];
        assert!(Instrument::from_raw_properties(&props, loc(), &mut diags).is_none());
    }
}
