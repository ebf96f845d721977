// Audio system lifecycle. Owns the master bus, the global send pool and the five connected voices.
//
//   initialize: master bus -> global effects (wait) -> all five voices (wait, connect) -> table
//   dispose:    voices -> global effects -> master bus
//
// A failure anywhere in initialize drops whatever was built so far; nothing half-built escapes.

use std::time::{Duration, Instant};

use log::{error, info};

use super::effects::GlobalEffects;
use super::error::BuildError;
use super::instruments::{self, BuildContext, InstrumentPreset, InstrumentVoice, PendingInstrument};
use super::master::{MasterBus, MasterBusHandle};
use crate::shared::{InstrumentRole, RoleTable};

/// How long initialize waits, in total, for slow stages (reverb tails) to come up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(20);

pub struct AudioSystem {
    master: MasterBus,
    global: Option<GlobalEffects>,
    voices: RoleTable<Option<InstrumentVoice>>,
    sample_rate: u32,
    disposed: bool,
}

impl AudioSystem {
    pub fn initialize(master_volume: f32, ctx: &BuildContext) -> Result<Self, BuildError> {
        Self::initialize_within(master_volume, ctx, READY_TIMEOUT)
    }

    pub fn initialize_within(master_volume: f32, ctx: &BuildContext, timeout: Duration) -> Result<Self, BuildError> {
        Self::initialize_with(master_volume, ctx, &instruments::presets(), timeout)
    }

    /// Builds one voice per preset. Presets sharing a role replace each other in the table.
    pub fn initialize_with(
        master_volume: f32,
        ctx: &BuildContext,
        presets: &[&InstrumentPreset],
        timeout: Duration,
    ) -> Result<Self, BuildError> {
        let start = Instant::now();
        let left = || timeout.saturating_sub(start.elapsed());

        let master = MasterBus::new(master_volume);

        let mut global = GlobalEffects::create(ctx.sample_rate);
        global.await_ready(left()).inspect_err(|e| error!("global effects failed: {e}"))?;

        // start every builder before waiting on any, so the reverb workers overlap
        let pending: Vec<PendingInstrument> = presets.iter().map(|p| instruments::build(p, ctx)).collect();

        let mut voices: RoleTable<Option<InstrumentVoice>> = RoleTable::default();
        for p in pending {
            let role = p.role();
            let voice = p
                .await_ready(left())
                .and_then(|ready| ready.connect(&master))
                .inspect_err(|e| error!("voice {} failed: {e}", role.id()))?;
            voices[role] = Some(voice);
        }

        info!(
            "audio system up at {} Hz in {} ms",
            ctx.sample_rate,
            start.elapsed().as_millis()
        );
        Ok(Self { master, global: Some(global), voices, sample_rate: ctx.sample_rate, disposed: false })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn master(&self) -> &MasterBus {
        &self.master
    }

    pub fn master_handle(&self) -> MasterBusHandle {
        self.master.handle()
    }

    pub fn global(&mut self) -> Option<&mut GlobalEffects> {
        self.global.as_mut()
    }

    pub fn voice(&self, role: InstrumentRole) -> Option<&InstrumentVoice> {
        self.voices[role].as_ref()
    }

    pub fn voice_mut(&mut self, role: InstrumentRole) -> Option<&mut InstrumentVoice> {
        self.voices[role].as_mut()
    }

    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut InstrumentVoice> {
        self.voices.iter_mut().filter_map(|(_, v)| v.as_mut())
    }

    pub fn voice_count(&self) -> usize {
        self.voices.values().filter(|v| v.is_some()).count()
    }

    pub fn release_all(&mut self) {
        for voice in self.voices_mut() {
            voice.release_all();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Reverse of initialize. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for role in InstrumentRole::SYNTHESIZED.into_iter().rev() {
            if let Some(mut voice) = self.voices[role].take() {
                voice.release_all();
            }
        }
        self.global = None;
        self.master.set_volume(0.0);
        self.disposed = true;
        info!("audio system disposed");
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.dispose();
    }
}
