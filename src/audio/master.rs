use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::frame::StereoFrame;
use super::ids::{BusId, next_bus_id};

// f32 bits in an atomic, so volume moves never need a lock
#[derive(Debug)]
struct SharedGain(AtomicU32);

impl SharedGain {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// The single point every voice passes through on its way out.
#[derive(Debug)]
pub struct MasterBus {
    id: BusId,
    gain: Arc<SharedGain>,
}

/// Cheap clone of the master gain for whoever needs to move it (control thread, ui).
#[derive(Clone, Debug)]
pub struct MasterBusHandle {
    gain: Arc<SharedGain>,
}

impl MasterBus {
    pub fn new(volume: f32) -> Self {
        Self { id: next_bus_id(), gain: Arc::new(SharedGain::new(clamp_volume(volume))) }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn handle(&self) -> MasterBusHandle {
        MasterBusHandle { gain: Arc::clone(&self.gain) }
    }

    pub fn volume(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_volume(&self, v: f32) {
        self.gain.set(clamp_volume(v));
    }

    pub fn process(&self, buf: &mut [StereoFrame]) {
        let g = self.gain.get();
        for f in buf.iter_mut() {
            *f = f.scaled(g);
        }
    }
}

impl MasterBusHandle {
    pub fn volume(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_volume(&self, v: f32) {
        self.gain.set(clamp_volume(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_moves_the_bus_gain() {
        let bus = MasterBus::new(0.7);
        let handle = bus.handle();
        handle.set_volume(0.25);
        assert_eq!(bus.volume(), 0.25);

        let mut buf = vec![StereoFrame::mono(1.0); 2];
        bus.process(&mut buf);
        assert_eq!(buf[1].left, 0.25);
    }

    #[test]
    fn volume_is_clamped() {
        let bus = MasterBus::new(3.0);
        assert_eq!(bus.volume(), 1.0);
        bus.handle().set_volume(f32::NAN);
        assert_eq!(bus.volume(), 0.0);
    }

    #[test]
    fn handle_works_across_threads() {
        let bus = MasterBus::new(0.5);
        let handle = bus.handle();
        std::thread::spawn(move || handle.set_volume(0.9)).join().unwrap();
        assert_eq!(bus.volume(), 0.9);
    }
}
