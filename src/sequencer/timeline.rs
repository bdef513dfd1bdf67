// Timeline - Musical time representation
// Handles conversion between ticks, bars, and wall-clock seconds.
// Live playback and file export both go through `TimeBase`, so they agree on timing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticks per quarter note (PPQN - Pulses Per Quarter Note)
pub const TICKS_PER_QUARTER: u32 = 480;

/// Ticks in one 4/4 bar
pub const TICKS_PER_BAR_4_4: u32 = TICKS_PER_QUARTER * 4;

/// Accepted tempo range; out-of-range values are clamped
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 999.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar (typically 3, 4, 5, 6, 7)
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature.
    /// The numerator is clamped to 1..=32 and the denominator snapped to the
    /// nearest power of two in 1..=32.
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator: numerator.clamp(1, 32),
            denominator: nearest_power_of_two(denominator),
        }
    }

    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    pub fn three_four() -> Self {
        Self::new(3, 4)
    }

    pub fn six_eight() -> Self {
        Self::new(6, 8)
    }

    /// Number of quarter notes in one bar (4/4 = 4.0, 6/8 = 3.0)
    pub fn quarters_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }

    /// Ticks in one beat of this signature (the denominator's note value)
    pub fn ticks_per_beat(&self) -> u32 {
        TICKS_PER_BAR_4_4 / self.denominator as u32
    }

    /// Ticks in one bar (1920 in 4/4)
    pub fn ticks_per_bar(&self) -> u32 {
        self.ticks_per_beat() * self.numerator as u32
    }

    /// log2 of the denominator, as stored in MIDI time signature meta events
    pub fn denominator_power(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }
}

fn nearest_power_of_two(value: u8) -> u8 {
    let value = value.clamp(1, 32);
    if value.is_power_of_two() {
        return value;
    }
    let up = value.next_power_of_two();
    let down = up / 2;
    if value - down <= up - value { down } else { up }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo, clamped to [MIN_BPM, MAX_BPM].
    /// Non-finite input falls back to the default tempo.
    pub fn new(bpm: f64) -> Self {
        Self { bpm: clamp_bpm(bpm) }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set BPM value (clamped)
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
    }

    /// Duration of one quarter note in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one bar in seconds at given time signature
    pub fn bar_duration_seconds(&self, time_signature: &TimeSignature) -> f64 {
        self.beat_duration_seconds() * time_signature.quarters_per_bar()
    }

    /// Microseconds per quarter note, as written to MIDI tempo meta events
    pub fn micros_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.bpm).round() as u32
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

impl From<f64> for Tempo {
    fn from(bpm: f64) -> Self {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Editing grid resolution.
/// Also supplies the fallback length for notes whose duration is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapGrid {
    Bar,
    Half,
    Quarter,
    Eighth,
    #[default]
    Sixteenth,
    ThirtySecond,
}

impl SnapGrid {
    /// Grid step in ticks for the given time signature
    pub fn ticks(&self, time_signature: &TimeSignature) -> u64 {
        let quarter = TICKS_PER_QUARTER as u64;
        match self {
            SnapGrid::Bar => time_signature.ticks_per_bar() as u64,
            SnapGrid::Half => quarter * 2,
            SnapGrid::Quarter => quarter,
            SnapGrid::Eighth => quarter / 2,
            SnapGrid::Sixteenth => quarter / 4,
            SnapGrid::ThirtySecond => quarter / 8,
        }
    }

    /// Grid step in beats (quarter notes)
    pub fn beats(&self, time_signature: &TimeSignature) -> f64 {
        self.ticks(time_signature) as f64 / TICKS_PER_QUARTER as f64
    }
}

/// Musical time representation
/// Represents a position in the timeline using bars, beats, and ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicalTime {
    pub bar: u32,  // Bar number (1-based)
    pub beat: u8,  // Beat within bar (1-based)
    pub tick: u16, // Tick within beat (0-based)
}

impl MusicalTime {
    pub fn new(bar: u32, beat: u8, tick: u16) -> Self {
        Self { bar, beat, tick }
    }

    /// Zero position (bar 1, beat 1, tick 0)
    pub fn zero() -> Self {
        Self::new(1, 1, 0)
    }

    /// Convert to total ticks from start
    pub fn to_total_ticks(&self, time_signature: &TimeSignature) -> u64 {
        let ticks_per_beat = time_signature.ticks_per_beat() as u64;
        let ticks_per_bar = time_signature.ticks_per_bar() as u64;

        let bar_0 = self.bar.saturating_sub(1) as u64;
        let beat_0 = self.beat.saturating_sub(1) as u64;

        bar_0 * ticks_per_bar + beat_0 * ticks_per_beat + self.tick as u64
    }

    /// Create from total ticks
    pub fn from_total_ticks(total_ticks: u64, time_signature: &TimeSignature) -> Self {
        let ticks_per_beat = time_signature.ticks_per_beat() as u64;
        let ticks_per_bar = time_signature.ticks_per_bar() as u64;

        let bar = (total_ticks / ticks_per_bar) + 1;
        let remaining_after_bars = total_ticks % ticks_per_bar;
        let beat = (remaining_after_bars / ticks_per_beat) + 1;
        let tick = remaining_after_bars % ticks_per_beat;

        Self::new(bar as u32, beat as u8, tick as u16)
    }
}

impl Default for MusicalTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.bar, self.beat, self.tick)
    }
}

/// Tempo and time signature captured at the moment of use.
///
/// Every conversion is a pure function of the value and this time base.
/// Callers build a fresh `TimeBase` from the project whenever they need one,
/// so a tempo change only affects conversions made after it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeBase {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
}

impl TimeBase {
    pub fn new(tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            tempo,
            time_signature,
        }
    }

    pub fn ticks_per_bar(&self) -> f64 {
        self.time_signature.ticks_per_bar() as f64
    }

    /// ticks -> bars (`ticks / 1920` in 4/4)
    pub fn ticks_to_bars(&self, ticks: f64) -> f64 {
        ticks / self.ticks_per_bar()
    }

    /// bars -> ticks, rounded to the nearest tick (never truncated)
    pub fn bars_to_ticks(&self, bars: f64) -> u64 {
        (bars * self.ticks_per_bar()).round().max(0.0) as u64
    }

    /// bars -> seconds (`bars * 4 * 60 / bpm` in 4/4)
    pub fn bars_to_seconds(&self, bars: f64) -> f64 {
        bars * self.time_signature.quarters_per_bar() * 60.0 / self.tempo.bpm()
    }

    /// seconds -> bars, the inverse of `bars_to_seconds`
    pub fn seconds_to_bars(&self, seconds: f64) -> f64 {
        seconds * self.tempo.bpm() / (60.0 * self.time_signature.quarters_per_bar())
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        self.bars_to_seconds(self.ticks_to_bars(ticks as f64))
    }

    /// seconds -> ticks, rounded to the nearest tick
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        self.bars_to_ticks(self.seconds_to_bars(seconds))
    }

    /// Bar/beat/tick display for a position given in bars
    pub fn musical_time(&self, bars: f64) -> MusicalTime {
        MusicalTime::from_total_ticks(self.bars_to_ticks(bars), &self.time_signature)
    }

    /// Snap a tick position to the nearest grid line
    pub fn quantize_ticks(&self, ticks: u64, grid: SnapGrid) -> u64 {
        let step = grid.ticks(&self.time_signature).max(1);
        ((ticks + step / 2) / step) * step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature() {
        let ts = TimeSignature::four_four();
        assert_eq!(ts.ticks_per_bar(), 1920);
        assert_eq!(ts.quarters_per_bar(), 4.0);
        assert_eq!(ts.to_string(), "4/4");

        let ts_68 = TimeSignature::six_eight();
        assert_eq!(ts_68.ticks_per_beat(), 240);
        assert_eq!(ts_68.ticks_per_bar(), 1440);
        assert_eq!(ts_68.quarters_per_bar(), 3.0);
        assert_eq!(ts_68.denominator_power(), 3);
    }

    #[test]
    fn test_time_signature_clamping() {
        let ts = TimeSignature::new(0, 5);
        assert_eq!(ts.numerator, 1);
        assert_eq!(ts.denominator, 4);

        let ts = TimeSignature::new(7, 0);
        assert_eq!(ts.denominator, 1);

        let ts = TimeSignature::new(7, 200);
        assert_eq!(ts.denominator, 32);
    }

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
        assert_eq!(tempo.bar_duration_seconds(&TimeSignature::four_four()), 2.0);
        assert_eq!(tempo.micros_per_quarter(), 500_000);
    }

    #[test]
    fn test_tempo_clamping() {
        assert_eq!(Tempo::new(0.0).bpm(), MIN_BPM);
        assert_eq!(Tempo::new(-50.0).bpm(), MIN_BPM);
        assert_eq!(Tempo::new(5000.0).bpm(), MAX_BPM);
        assert_eq!(Tempo::new(f64::NAN).bpm(), DEFAULT_BPM);

        let mut tempo = Tempo::default();
        tempo.set_bpm(f64::INFINITY);
        assert_eq!(tempo.bpm(), DEFAULT_BPM);
    }

    #[test]
    fn test_bar_second_conversion() {
        let tb = TimeBase::new(Tempo::new(120.0), TimeSignature::four_four());

        assert_eq!(tb.ticks_to_bars(1920.0), 1.0);
        assert_eq!(tb.bars_to_seconds(1.0), 2.0);
        assert_eq!(tb.seconds_to_bars(2.0), 1.0);
        // Quarter note at 120 BPM = 0.5s
        assert_eq!(tb.ticks_to_seconds(480), 0.5);
        assert_eq!(tb.seconds_to_ticks(0.5), 480);
    }

    #[test]
    fn test_seconds_to_ticks_rounds_to_nearest() {
        let tb = TimeBase::new(Tempo::new(120.0), TimeSignature::four_four());
        // One tick at 120 BPM = 0.5 / 480 s
        let tick = 0.5 / 480.0;
        assert_eq!(tb.seconds_to_ticks(tick * 10.6), 11);
        assert_eq!(tb.seconds_to_ticks(tick * 10.4), 10);
        assert_eq!(tb.seconds_to_ticks(-1.0), 0);
    }

    #[test]
    fn test_round_trip_across_tempos() {
        for bpm in [20.0, 61.3, 90.0, 120.0, 174.0, 999.0] {
            let tb = TimeBase::new(Tempo::new(bpm), TimeSignature::four_four());
            for ticks in [0u64, 1, 119, 480, 1921, 76_800, 1_000_003] {
                let bars = ticks as f64 / 1920.0;
                let back = tb.seconds_to_bars(tb.bars_to_seconds(bars));
                assert!((back - bars).abs() < 1e-6, "bpm {bpm} ticks {ticks}");
                assert_eq!(tb.seconds_to_ticks(tb.ticks_to_seconds(ticks)), ticks);
            }
        }
    }

    #[test]
    fn test_non_four_four_seconds() {
        // 6/8 at 120 BPM: 3 quarters per bar = 1.5s
        let tb = TimeBase::new(Tempo::new(120.0), TimeSignature::six_eight());
        assert_eq!(tb.bars_to_seconds(1.0), 1.5);
        assert_eq!(tb.ticks_to_seconds(1440), 1.5);
    }

    #[test]
    fn test_musical_time_conversion() {
        let ts = TimeSignature::four_four();

        assert_eq!(MusicalTime::new(1, 1, 0).to_total_ticks(&ts), 0);
        assert_eq!(MusicalTime::new(1, 2, 0).to_total_ticks(&ts), 480);
        assert_eq!(MusicalTime::new(2, 1, 0).to_total_ticks(&ts), 1920);

        let converted = MusicalTime::from_total_ticks(1000, &ts);
        assert_eq!(converted, MusicalTime::new(1, 3, 40));
        assert_eq!(converted.to_total_ticks(&ts), 1000);
        assert_eq!(converted.to_string(), "1:03:040");
    }

    #[test]
    fn test_musical_time_from_bars() {
        let tb = TimeBase::new(Tempo::new(120.0), TimeSignature::three_four());
        // 1.5 bars of 3/4 = 4.5 quarters -> bar 2, beat 2, tick 240
        assert_eq!(tb.musical_time(1.5), MusicalTime::new(2, 2, 240));
    }

    #[test]
    fn test_quantize_ticks() {
        let tb = TimeBase::default();
        assert_eq!(tb.quantize_ticks(100, SnapGrid::Sixteenth), 120);
        assert_eq!(tb.quantize_ticks(59, SnapGrid::Sixteenth), 0);
        assert_eq!(tb.quantize_ticks(1000, SnapGrid::Bar), 1920);
        assert_eq!(SnapGrid::default().ticks(&TimeSignature::four_four()), 120);
        assert_eq!(SnapGrid::Eighth.beats(&TimeSignature::four_four()), 0.5);
    }

    #[test]
    fn test_tempo_serde_clamps() {
        let tempo: Tempo = serde_json::from_str("2000.0").unwrap();
        assert_eq!(tempo.bpm(), MAX_BPM);
        assert_eq!(serde_json::to_string(&Tempo::new(90.0)).unwrap(), "90.0");
    }
}
