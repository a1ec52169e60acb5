// Search form lifecycle: Initial -> Searching -> Results -> Initial
//
// The state decides which controls are enabled or shown; `Controls` is the
// snapshot a renderer applies.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const SEARCH_LABEL: &str = "busca vagas";
pub const SEARCHING_LABEL: &str = "🔍 Buscando...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LifecycleState {
    #[default]
    Initial,
    Searching,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Submit,
    ResponseReceived,
    Reset,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: {event:?} while {from:?}")]
    InvalidTransition {
        from: LifecycleState,
        event: LifecycleEvent,
    },
}

pub fn next_state(
    from: LifecycleState,
    event: LifecycleEvent,
) -> Result<LifecycleState, TransitionError> {
    match (from, event) {
        (LifecycleState::Initial, LifecycleEvent::Submit) => Ok(LifecycleState::Searching),
        (LifecycleState::Searching, LifecycleEvent::ResponseReceived) => {
            Ok(LifecycleState::Results)
        }
        (LifecycleState::Results, LifecycleEvent::Reset) => Ok(LifecycleState::Initial),
        _ => Err(TransitionError::InvalidTransition { from, event }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub enabled: bool,
    pub visible: bool,
}

impl ControlState {
    const ENABLED: ControlState = ControlState {
        enabled: true,
        visible: true,
    };
    const DISABLED: ControlState = ControlState {
        enabled: false,
        visible: true,
    };
    const HIDDEN: ControlState = ControlState {
        enabled: false,
        visible: false,
    };

    pub fn aria_disabled(&self) -> bool {
        !self.enabled
    }
}

/// Control snapshot for one lifecycle state, keyed by the element ids the
/// page uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub hotel_select: ControlState,
    pub check_in: ControlState,
    pub check_out: ControlState,
    pub search_button: ControlState,
    pub search_label: &'static str,
    pub reset_button: ControlState,
    pub copy_results: ControlState,
    pub clear_results: ControlState,
    pub guest_buttons: ControlState,
    pub guest_buttons_class: &'static str,
}

impl Controls {
    pub fn for_state(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Initial => Self {
                hotel_select: ControlState::ENABLED,
                check_in: ControlState::ENABLED,
                check_out: ControlState::ENABLED,
                search_button: ControlState::ENABLED,
                search_label: SEARCH_LABEL,
                reset_button: ControlState::HIDDEN,
                copy_results: ControlState::HIDDEN,
                clear_results: ControlState::HIDDEN,
                guest_buttons: ControlState::DISABLED,
                guest_buttons_class: "state-initial",
            },
            LifecycleState::Searching => Self {
                hotel_select: ControlState::DISABLED,
                check_in: ControlState::DISABLED,
                check_out: ControlState::DISABLED,
                search_button: ControlState::DISABLED,
                search_label: SEARCHING_LABEL,
                reset_button: ControlState::HIDDEN,
                copy_results: ControlState::HIDDEN,
                clear_results: ControlState::HIDDEN,
                guest_buttons: ControlState::DISABLED,
                guest_buttons_class: "state-searching",
            },
            LifecycleState::Results => Self {
                hotel_select: ControlState::DISABLED,
                check_in: ControlState::DISABLED,
                check_out: ControlState::DISABLED,
                search_button: ControlState::DISABLED,
                search_label: SEARCH_LABEL,
                reset_button: ControlState::ENABLED,
                copy_results: ControlState::ENABLED,
                clear_results: ControlState::ENABLED,
                guest_buttons: ControlState::ENABLED,
                guest_buttons_class: "state-results",
            },
        }
    }

    // Hotel and date inputs share one enablement
    pub fn inputs_enabled(&self) -> bool {
        self.hotel_select.enabled && self.check_in.enabled && self.check_out.enabled
    }
}

#[derive(Debug, Default)]
pub struct SearchLifecycle {
    state: LifecycleState,
    guest_filter_enabled: bool,
}

impl SearchLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(self.state)
    }

    pub fn guest_filter_enabled(&self) -> bool {
        self.guest_filter_enabled
    }

    pub fn dispatch(&mut self, event: LifecycleEvent) -> Result<LifecycleState, TransitionError> {
        let next = next_state(self.state, event).map_err(|e| {
            warn!(error = %e, "rejected lifecycle transition");
            e
        })?;

        info!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
        // The filter only runs over finished results
        self.guest_filter_enabled = next == LifecycleState::Results;
        Ok(next)
    }

    pub fn begin_search(&mut self) -> Result<LifecycleState, TransitionError> {
        self.dispatch(LifecycleEvent::Submit)
    }

    pub fn complete_search(&mut self) -> Result<LifecycleState, TransitionError> {
        self.dispatch(LifecycleEvent::ResponseReceived)
    }

    pub fn reset(&mut self) -> Result<LifecycleState, TransitionError> {
        self.dispatch(LifecycleEvent::Reset)
    }
}
