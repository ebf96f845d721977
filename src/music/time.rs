// Musical time in the notation the rhythm tables are written in, always in 4/4:
//   "4n"     a quarter note (1 beat), "1n" a whole note (4 beats), "3n" a third of a bar
//   "2n."    dotted: one and a half times the plain value
//   "0:0:8"  bars:beats:sixteenths

use std::fmt;

const BEATS_PER_BAR: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MusicalTime {
    Note { division: u16, dotted: bool },
    Position { bars: u16, beats: u16, sixteenths: u16 },
}

impl MusicalTime {
    pub const fn note(division: u16) -> Self {
        MusicalTime::Note { division, dotted: false }
    }

    pub const fn dotted(division: u16) -> Self {
        MusicalTime::Note { division, dotted: true }
    }

    pub const fn position(bars: u16, beats: u16, sixteenths: u16) -> Self {
        MusicalTime::Position { bars, beats, sixteenths }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(body) = s.strip_suffix("n.") {
            let division: u16 = body.parse().ok()?;
            return (division > 0).then_some(Self::dotted(division));
        }
        if let Some(body) = s.strip_suffix('n') {
            let division: u16 = body.parse().ok()?;
            return (division > 0).then_some(Self::note(division));
        }
        let mut parts = s.split(':');
        let bars = parts.next()?.parse().ok()?;
        let beats = parts.next()?.parse().ok()?;
        let sixteenths = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::position(bars, beats, sixteenths))
    }

    pub fn beats(&self) -> f64 {
        match *self {
            MusicalTime::Note { division, dotted } => {
                let plain = BEATS_PER_BAR / division.max(1) as f64;
                if dotted { plain * 1.5 } else { plain }
            }
            MusicalTime::Position { bars, beats, sixteenths } => {
                bars as f64 * BEATS_PER_BAR + beats as f64 + sixteenths as f64 / 4.0
            }
        }
    }

    pub fn seconds(&self, bpm: f64) -> f64 {
        self.beats() * 60.0 / bpm
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MusicalTime::Note { division, dotted: false } => write!(f, "{division}n"),
            MusicalTime::Note { division, dotted: true } => write!(f, "{division}n."),
            MusicalTime::Position { bars, beats, sixteenths } => {
                write!(f, "{bars}:{beats}:{sixteenths}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_values_in_beats() {
        assert_eq!(MusicalTime::parse("4n").unwrap().beats(), 1.0);
        assert_eq!(MusicalTime::parse("1n").unwrap().beats(), 4.0);
        assert_eq!(MusicalTime::parse("2n.").unwrap().beats(), 3.0);
        assert_eq!(MusicalTime::parse("8n.").unwrap().beats(), 0.75);
        assert!((MusicalTime::parse("3n").unwrap().beats() - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn transport_positions() {
        let t = MusicalTime::parse("0:0:8").unwrap();
        assert_eq!(t, MusicalTime::position(0, 0, 8));
        assert_eq!(t.beats(), 2.0);
        assert_eq!(MusicalTime::parse("1:2:0").unwrap().beats(), 6.0);
        assert_eq!(t.to_string(), "0:0:8");
    }

    #[test]
    fn seconds_follow_tempo() {
        let half = MusicalTime::note(2);
        assert_eq!(half.seconds(60.0), 2.0);
        assert_eq!(half.seconds(120.0), 1.0);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "n", "0n", "4x", "1:2", "1:2:3:4", "a:b:c"] {
            assert!(MusicalTime::parse(bad).is_none(), "{bad:?} parsed");
        }
    }
}
