//! Abstract syntax tree for a BeatBax song.
//!
//! `spec.md` §4.B Contracts: "Every node carries a source location". Each
//! type below carries a [`SourceLocation`] field (`loc`) for exactly that
//! reason, replacing the loosely-typed, line-number-only nodes a naive
//! port would produce with the sum types DESIGN NOTES call for.

use beatbax_common::diag::SourceLocation;
use serde::{Deserialize, Serialize};

/// Transform modifiers applicable to a pattern/sequence reference, written
/// as a `:name(args)` or bare `:name` suffix chain (`spec.md` §2: "oct(n),
/// rev, slow(n), fast(n), inst(name), pan(v), transpose(n)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    /// `oct(n)` — shift every note atom by `n` octaves.
    Octave(i32),
    /// `rev` — reverse atom order.
    Reverse,
    /// `slow(n)` — multiply every atom's duration by `n`.
    Slow(u32),
    /// `fast(n)` — divide every atom's duration by `n` (minimum 1).
    Fast(u32),
    /// `inst(name)` — force every note atom in this chunk onto `name`.
    Instrument(String),
    /// `pan(v)` — merge a `pan` inline effect onto every note atom.
    Pan(f32),
    /// `transpose(n)` — shift every note atom by `n` semitones.
    Transpose(i32),
    /// A named effect preset applied as a transform (`spec.md` §2: "named
    /// effect preset references" may also appear in a modifier chain).
    EffectPreset(String),
    /// An unrecognized transform name, kept so the resolver can emit a
    /// "unknown transform" warning with a location instead of discarding it.
    Unknown(String),
}

/// One `<effectname:param,param,...>` suffix group on a pattern atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineEffect {
    /// The effect name (matched against the effect registry at playback time).
    pub name: String,
    /// Raw parameter strings, in the order written.
    pub params: Vec<String>,
}

/// A single parsed atom from a pattern's right-hand side.
///
/// `spec.md` §3 "Pattern": atom variants are note/rest/token/inline-inst/
/// temp-inst. Whether a bare identifier names an instrument (a named hit)
/// or should be treated as an arbitrary note-ish string is decided later,
/// by the resolver, once the instrument table is fully merged — at parse
/// time we only know whether the text matches note grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternAtom {
    /// A note-shaped atom (`C4`, `F#3`, ...).
    Note {
        /// The note name text, exactly as written.
        value: String,
        /// Duration in ticks, from an optional trailing `:N` suffix (default 1).
        duration: u32,
        /// Inline `<effect:params>` suffixes attached to this atom.
        effects: Vec<InlineEffect>,
        /// Source location of this atom.
        loc: SourceLocation,
    },
    /// The rest token (`.`), or the `_`/`-` sustain tokens before resolving.
    Rest {
        /// Duration in ticks, from an optional trailing `:N` suffix (default 1).
        duration: u32,
        /// Source location of this atom.
        loc: SourceLocation,
    },
    /// A bare identifier that isn't note-shaped: instrument name (named
    /// hit), `hit(name[,count])` call, or an otherwise unresolved reference.
    Token {
        /// The raw text, exactly as written (including any `hit(...)` call syntax).
        raw: String,
        /// Inline `<effect:params>` suffixes attached to this atom.
        effects: Vec<InlineEffect>,
        /// Source location of this atom.
        loc: SourceLocation,
    },
    /// `inst(name)` — permanent instrument change from this point on.
    InlineInst {
        /// Instrument name to switch to.
        name: String,
        /// Source location of this atom.
        loc: SourceLocation,
    },
    /// `inst(name, count)` — temporary override for the next `count` events.
    TempInst {
        /// Instrument name to switch to.
        name: String,
        /// Number of following note-producing events this override covers.
        count: u32,
        /// Source location of this atom.
        loc: SourceLocation,
    },
}

impl PatternAtom {
    /// This atom's source location, regardless of variant.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Self::Note { loc, .. }
            | Self::Rest { loc, .. }
            | Self::Token { loc, .. }
            | Self::InlineInst { loc, .. }
            | Self::TempInst { loc, .. } => *loc,
        }
    }
}

/// A `pat NAME[:transform...] = <rhs>` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDecl {
    /// Pattern name.
    pub name: String,
    /// Modifier chain attached directly to the declaration (rare; most
    /// transform chains appear on references, not declarations).
    pub modifiers: Vec<Transform>,
    /// Parsed atoms.
    pub atoms: Vec<PatternAtom>,
    /// Flat token-text projection of `atoms`, one-to-one, kept for callers
    /// that want the backward-compatible plain-string view (`spec.md` §4.B:
    /// "emits both flat token arrays... and structured events").
    pub flat_tokens: Vec<String>,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// One item in a sequence's right-hand side: a reference to a pattern or
/// another sequence, with an optional modifier chain and repeat count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    /// Referenced pattern/sequence name.
    pub reference: String,
    /// Modifier chain (`:oct(-1):rev`, in written order).
    pub modifiers: Vec<Transform>,
    /// Repeat count from a trailing `*N` suffix (default 1).
    pub repeat: u32,
    /// Source location of this item.
    pub loc: SourceLocation,
}

/// A `seq NAME = item, item, ...` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDecl {
    /// Sequence name.
    pub name: String,
    /// Structured items, in written order.
    pub items: Vec<SequenceItem>,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// An `inst NAME key=value...` declaration, before instrument-property
/// parsing (`beatbax-common::instrument::Instrument::from_raw_properties`
/// consumes `properties` during resolution, once imports are merged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstDecl {
    /// Instrument name.
    pub name: String,
    /// Raw `key=value` pairs, in written order.
    pub properties: Vec<(String, String)>,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// An `effect NAME = effectname:param,param,...` named preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPresetDecl {
    /// Preset name, referenceable as a transform or inline effect.
    pub name: String,
    /// Underlying effect type (e.g. `vib`).
    pub effect_type: String,
    /// Raw parameter strings.
    pub params: Vec<String>,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// An `import "<source>"` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDirective {
    /// Raw import source string (`local:`, `github:`, `http(s)://`, or a
    /// bare path treated as `local:`).
    pub source: String,
    /// Directive source location.
    pub loc: SourceLocation,
}

/// What a channel plays: a direct reference to a named pattern or
/// sequence, carrying the raw reference-expression text so the resolver
/// can apply the same comma-splitting/transform grammar it uses for
/// sequence items (`spec.md` §4.C step 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelSource {
    /// `pat <ref-expr>`.
    Pattern(String),
    /// `seq <ref-expr>`.
    Sequence(String),
}

/// A `channel N => inst NAME (seq|pat) <ref> [speed N]` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDecl {
    /// Channel number (1-based, per Game Boy channel numbering).
    pub id: u32,
    /// Default instrument for this channel.
    pub instrument_default: Option<String>,
    /// What the channel plays.
    pub source: Option<ChannelSource>,
    /// Optional playback speed multiplier.
    pub speed_multiplier: Option<f64>,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// A `play [auto] [repeat]` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayDecl {
    /// Whether playback should start without an explicit user action.
    pub auto: bool,
    /// Whether playback loops back to the start on completion.
    pub repeat: bool,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// An `export FORMAT "path"` declaration (parsed for completeness; the CLI
/// is the actual export driver — `spec.md` §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDecl {
    /// Export format name (`json`, `midi`, `uge`).
    pub format: String,
    /// Destination path.
    pub path: String,
    /// Declaration source location.
    pub loc: SourceLocation,
}

/// Free-form song metadata from `song name|artist|tags|description "..."`
/// lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Song title.
    pub name: Option<String>,
    /// Author/artist credit.
    pub artist: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Longer free-text description.
    pub description: Option<String>,
}

/// The full parsed song: every statement folded into its typed slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// `chip` target name, if declared.
    pub chip: Option<String>,
    /// Global tempo in beats per minute.
    pub bpm: Option<f64>,
    /// Global master volume, 0.0 to 1.0.
    pub volume: Option<f32>,
    /// Global time signature (`beats`, `unit`), e.g. `(4, 4)`.
    pub time_signature: Option<(u32, u32)>,
    /// Song-level metadata.
    pub metadata: Metadata,
    /// `import` directives, in written order.
    pub imports: Vec<ImportDirective>,
    /// `inst` declarations, in written order.
    pub insts: Vec<InstDecl>,
    /// `pat` declarations, in written order.
    pub patterns: Vec<PatternDecl>,
    /// `seq` declarations, in written order.
    pub sequences: Vec<SequenceDecl>,
    /// `effect` named presets, in written order.
    pub effect_presets: Vec<EffectPresetDecl>,
    /// `channel` declarations, in written order.
    pub channels: Vec<ChannelDecl>,
    /// `play` declaration, if present.
    pub play: Option<PlayDecl>,
    /// `export` declarations, in written order.
    pub exports: Vec<ExportDecl>,
}
