//! Draft state and autosave scheduling for the snippet editor.

mod autosave;
mod draft;

pub use autosave::{DebounceTimer, AUTOSAVE_DELAY, SEARCH_DEBOUNCE};
pub use draft::{Draft, DraftState, SavePhase, LANGUAGES};
