use endless_ambient::shared::{DisplayState, InstrumentRole};

// state local to tui, mirrors the bits of DisplayState that key resolution needs
// synced from DisplayState once per loop
#[derive(Clone, Debug)]
pub struct TuiState {
    pub selected: InstrumentRole, // instrument panel cursor
}

impl Default for TuiState {
    fn default() -> Self {
        Self { selected: InstrumentRole::Pad }
    }
}

impl TuiState {
    pub fn sync(&mut self, ds: &DisplayState) {
        self.selected = ds.selected;
    }
}
