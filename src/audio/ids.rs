use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

// which master bus a voice was connected to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BusId(pub u64);

// one decoded field recording
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(pub u64);

// fancy atomic counter lets us generate unique ids while in threads
pub fn next_bus_id() -> BusId {
    BusId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn next_track_id() -> TrackId {
    TrackId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
