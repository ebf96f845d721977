// Loop scheduler. Every loop and every queued note lives on the absolute frame clock the engine
// keeps. A firing turns a loop's captured pools into one NoteEvent a few ms either side of the
// loop's grid time (jitter), which the engine dispatches to the voice when its frame comes round.
// Loops fire half a jitter window ahead of their grid time so early notes can still be queued.
//
// Random draws per firing, in order: note, duration, jitter, then chord tones (pad/piano).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::{debug, info};
use smallvec::SmallVec;

use super::transport::Transport;
use crate::audio_api::LoopSpec;
use crate::music::{RandomSource, chord_from_note};
use crate::shared::{InstrumentRole, RoleTable};

/// Width of the timing humanization window, centred on the firing time.
pub const JITTER_WINDOW_SECONDS: f64 = 0.02;

const PENDING_CAPACITY: usize = 256; // plenty for five loops, so the heap never grows mid-callback

#[derive(Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub at: u64, // absolute frame
    pub role: InstrumentRole,
    pub freqs: SmallVec<[f32; 3]>,
    pub hold_frames: u64,
    seq: u64,
}

impl Eq for NoteEvent {}

impl Ord for NoteEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

impl PartialOrd for NoteEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Loop {
    spec: LoopSpec,
    next_fire: u64, // grid time of the next firing
    first_fire: u64,
    lead: u64, // frames ahead of next_fire the firing happens
    firings: u64,
}

impl Loop {
    fn fires_at(&self) -> u64 {
        self.next_fire.saturating_sub(self.lead)
    }
}

pub struct Scheduler {
    loops: RoleTable<Option<Loop>>,
    pending: BinaryHeap<Reverse<NoteEvent>>,
    seq: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            loops: RoleTable::default(),
            pending: BinaryHeap::with_capacity(PENDING_CAPACITY),
            seq: 0,
        }
    }

    /// Tears every loop and queued note down, then brings the new set up. The two sets never
    /// coexist.
    pub fn install(&mut self, specs: Vec<LoopSpec>, now: u64, transport: &Transport) {
        self.stop_all();
        for spec in specs {
            self.start_one(spec, now, transport);
        }
    }

    /// Returns how many loops were running. Safe to call when nothing is.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for (_, slot) in self.loops.iter_mut() {
            if slot.take().is_some() {
                stopped += 1;
            }
        }
        self.pending.clear();
        if stopped > 0 {
            info!("stopped {stopped} loops");
        }
        stopped
    }

    /// At most one loop per role: an existing one is replaced.
    pub fn start_one(&mut self, spec: LoopSpec, now: u64, transport: &Transport) {
        let role = spec.role;
        if !role.is_synthesized() {
            return;
        }
        if self.loops[role].is_some() {
            self.stop_one(role);
        }
        let first = now + transport.seconds_to_frames(spec.start_offset);
        let lead = transport.seconds_to_frames(JITTER_WINDOW_SECONDS / 2.0);
        debug!("loop {} ({}) first fires at frame {first}", role.id(), spec.mood);
        self.loops[role] = Some(Loop { spec, next_fire: first, first_fire: first, lead, firings: 0 });
    }

    pub fn stop_one(&mut self, role: InstrumentRole) -> bool {
        let had = self.loops[role].take().is_some();
        self.pending.retain(|Reverse(e)| e.role != role);
        had
    }

    pub fn loop_count(&self) -> usize {
        self.loops.values().filter(|l| l.is_some()).count()
    }

    pub fn loop_roles(&self) -> Vec<InstrumentRole> {
        self.loops.iter().filter(|(_, l)| l.is_some()).map(|(r, _)| r).collect()
    }

    pub fn first_fire(&self, role: InstrumentRole) -> Option<u64> {
        self.loops[role].as_ref().map(|l| l.first_fire)
    }

    pub fn firings(&self, role: InstrumentRole) -> u64 {
        self.loops[role].as_ref().map_or(0, |l| l.firings)
    }

    /// Moods of every live loop; more than one distinct value would mean a torn restart.
    pub fn loop_moods(&self) -> Vec<&str> {
        let mut moods: Vec<&str> = self.loops.values().flatten().map(|l| l.spec.mood.as_str()).collect();
        moods.sort_unstable();
        moods.dedup();
        moods
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest frame anything is due at.
    pub fn next_due(&self) -> Option<u64> {
        let loop_due = self.loops.values().flatten().map(Loop::fires_at).min();
        let event_due = self.pending.peek().map(|Reverse(e)| e.at);
        match (loop_due, event_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fires every loop whose firing point is at or before `now`, queueing their notes.
    pub fn fire_due(&mut self, now: u64, transport: &Transport, rng: &mut dyn RandomSource) {
        let mut seq = self.seq;
        for (role, slot) in self.loops.iter_mut() {
            let Some(lp) = slot.as_mut() else { continue };
            while lp.fires_at() <= now {
                let event = fire(lp, role, now, transport, rng, &mut seq);
                self.pending.push(Reverse(event));
                let interval = transport.beats_to_frames(lp.spec.interval.beats()).max(1);
                lp.next_fire += interval;
                lp.firings += 1;
            }
        }
        self.seq = seq;
    }

    pub fn pop_due(&mut self, now: u64) -> Option<NoteEvent> {
        if self.pending.peek().is_some_and(|Reverse(e)| e.at <= now) {
            return self.pending.pop().map(|Reverse(e)| e);
        }
        None
    }
}

fn fire(
    lp: &Loop,
    role: InstrumentRole,
    now: u64,
    transport: &Transport,
    rng: &mut dyn RandomSource,
    seq: &mut u64,
) -> NoteEvent {
    let spec = &lp.spec;
    // pools are never empty, plan_loop fills them from fallbacks
    let note = spec.pool[rng.pick_index(spec.pool.len())];
    let duration = spec.pattern[rng.pick_index(spec.pattern.len())];
    let jitter = rng.centered(JITTER_WINDOW_SECONDS);

    let freqs: SmallVec<[f32; 3]> = if spec.chords {
        chord_from_note(note, &spec.mood, rng).iter().map(|n| n.frequency()).collect()
    } else {
        smallvec::smallvec![note.frequency()]
    };

    // only a loop that starts right at `now` can draw a time already gone
    let at = (lp.next_fire as i64 + (jitter * transport.sample_rate() as f64).round() as i64).max(now as i64);
    *seq += 1;
    NoteEvent {
        at: at as u64,
        role,
        freqs,
        hold_frames: transport.beats_to_frames(duration.beats()).max(1),
        seq: *seq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::{plan_loop, plan_loops};
    use crate::music::{SeededRandom, SequenceRandom};
    use crate::shared::InstrumentState;

    const SR: u32 = 1_000;

    fn running(bpm: f64) -> Transport {
        let mut t = Transport::new(bpm, SR);
        t.start();
        t
    }

    fn pad_and_bass() -> Vec<LoopSpec> {
        let mut instruments = InstrumentState::defaults();
        for (role, s) in instruments.iter_mut() {
            s.active = matches!(role, InstrumentRole::Pad | InstrumentRole::Bass);
        }
        plan_loops("Lydian", &instruments)
    }

    #[test]
    fn install_staggers_first_firings() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        s.install(pad_and_bass(), 100, &t);
        assert_eq!(s.loop_count(), 2);
        assert_eq!(s.loop_roles(), [InstrumentRole::Pad, InstrumentRole::Bass]);
        assert_eq!(s.first_fire(InstrumentRole::Bass), Some(100));
        assert_eq!(s.first_fire(InstrumentRole::Pad), Some(400));
        // bass fires half a jitter window (10 ms) ahead of its grid time
        assert_eq!(s.next_due(), Some(90));
    }

    #[test]
    fn stop_all_is_idempotent_and_clears_queued_notes() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let mut rng = SequenceRandom::new(vec![0.5]);
        s.install(pad_and_bass(), 0, &t);
        s.fire_due(0, &t, &mut rng);
        assert_eq!(s.pending_len(), 1);
        assert_eq!(s.stop_all(), 2);
        assert_eq!(s.pending_len(), 0);
        assert_eq!(s.stop_all(), 0);
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn firing_uses_the_scripted_draws() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let bass = plan_loop(InstrumentRole::Bass, "Lydian", 0.4).unwrap();
        s.install(vec![bass], 0, &t);
        // note index 0 (C1), duration index 1 (0:0:8 = 2 beats), jitter centre
        let mut rng = SequenceRandom::new(vec![0.0, 0.9, 0.5]);
        s.fire_due(0, &t, &mut rng);
        let e = s.pop_due(0).unwrap();
        assert_eq!(e.role, InstrumentRole::Bass);
        assert_eq!(e.freqs.len(), 1);
        assert!((e.freqs[0] - 32.703).abs() < 0.01);
        assert_eq!(e.hold_frames, 2_000);
        assert_eq!(e.at, 0);
        // bass interval in Lydian is 0:0:8, two beats, fired 10 ms early
        assert_eq!(s.next_due(), Some(1_990));
    }

    #[test]
    fn jitter_stays_in_a_twenty_ms_window_around_the_grid() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let pad = plan_loop(InstrumentRole::Pad, "Lydian", 0.5).unwrap();
        s.install(vec![pad], 0, &t);
        let grid = s.first_fire(InstrumentRole::Pad).unwrap();
        let due = s.next_due().unwrap();
        assert_eq!(due, grid - 10);

        // latest jitter
        let mut rng = SequenceRandom::new(vec![0.0, 0.0, 0.999, 0.0, 0.0]);
        s.fire_due(due, &t, &mut rng);
        let e = s.pop_due(u64::MAX).unwrap();
        assert!(e.at > grid && e.at <= grid + 10, "{}", e.at);
        assert_eq!(e.freqs.len(), 3);

        // earliest jitter lands before the grid, but never before the firing point
        let due = s.next_due().unwrap();
        let grid = due + 10;
        let mut rng = SequenceRandom::new(vec![0.0, 0.0, 0.0, 0.0, 0.0]);
        s.fire_due(due, &t, &mut rng);
        let e = s.pop_due(u64::MAX).unwrap();
        assert_eq!(e.at, grid - 10);
        assert!(e.at >= due);
    }

    #[test]
    fn jitter_falls_on_both_sides_of_the_grid() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let bell = plan_loop(InstrumentRole::Bell, "Lydian", 0.5).unwrap();
        s.install(vec![bell], 0, &t);
        let mut rng = SeededRandom::new(9);
        let (mut early, mut late) = (0, 0);
        for _ in 0..200 {
            let now = s.next_due().unwrap();
            let grid = now + 10;
            s.fire_due(now, &t, &mut rng);
            let e = s.pop_due(u64::MAX).unwrap();
            assert!(e.at >= now && e.at <= grid + 10, "{} around {grid}", e.at);
            if e.at < grid {
                early += 1;
            } else if e.at > grid {
                late += 1;
            }
        }
        assert!(early > 50 && late > 50, "early {early} late {late}");
    }

    #[test]
    fn a_loop_starting_now_never_queues_into_the_past() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let bass = plan_loop(InstrumentRole::Bass, "Lydian", 0.4).unwrap();
        s.install(vec![bass], 500, &t);
        let mut rng = SequenceRandom::new(vec![0.0]);
        s.fire_due(500, &t, &mut rng);
        assert_eq!(s.pop_due(u64::MAX).unwrap().at, 500);
    }

    #[test]
    fn stop_one_drops_only_that_roles_notes() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        s.install(pad_and_bass(), 0, &t);
        let mut rng = SequenceRandom::new(vec![0.3]);
        s.fire_due(300, &t, &mut rng);
        assert_eq!(s.pending_len(), 2);
        assert!(s.stop_one(InstrumentRole::Pad));
        assert!(!s.stop_one(InstrumentRole::Pad));
        assert_eq!(s.pending_len(), 1);
        assert_eq!(s.loop_roles(), [InstrumentRole::Bass]);
    }

    #[test]
    fn restart_replaces_the_whole_set() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        s.install(pad_and_bass(), 0, &t);
        let dorian: Vec<_> = pad_and_bass()
            .into_iter()
            .filter_map(|l| plan_loop(l.role, "Dorian", l.volume))
            .collect();
        s.install(dorian, 50, &t);
        assert_eq!(s.loop_moods(), ["Dorian"]);
        assert_eq!(s.loop_count(), 2);
    }

    #[test]
    fn events_pop_in_time_order() {
        let t = running(60.0);
        let mut s = Scheduler::new();
        let all = RoleTable::from_fn(|role| InstrumentState { role, active: true, volume: 0.5 });
        s.install(plan_loops("Aeolian", &all), 0, &t);
        let mut rng = SequenceRandom::new(vec![0.1, 0.7, 0.5, 0.2]);
        s.fire_due(5_000, &t, &mut rng);
        let mut last = 0;
        while let Some(e) = s.pop_due(u64::MAX) {
            assert!(e.at >= last);
            last = e.at;
        }
    }
}
