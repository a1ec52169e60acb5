// Search form controller: ties criteria, lifecycle, the API client, results
// and the guest filter together

use crate::api::{ApiError, Hotel, VacancyApi};
use crate::criteria::{CriteriaError, GuestCount, HotelSelection, SearchCriteria, ALL_HOTELS_ID};
use crate::guest_filter::{FilterStats, GuestNumberFilter};
use crate::holiday::{self, HolidayNotice};
use crate::lifecycle::{Controls, LifecycleState, SearchLifecycle, TransitionError};
use crate::results::{Page, ResultsView};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{}", join_errors(.0))]
    Invalid(Vec<CriteriaError>),

    #[error("Form inputs are locked until the search is reset")]
    InputsLocked,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Search(#[from] ApiError),
}

fn join_errors(errors: &[CriteriaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct SearchSession<A: VacancyApi> {
    api: Arc<A>,
    criteria: SearchCriteria,
    lifecycle: SearchLifecycle,
    filter: GuestNumberFilter,
    hotels: Vec<Hotel>,
    holiday_notice: HolidayNotice,
    results: Option<ResultsView>,
}

impl<A: VacancyApi> SearchSession<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            criteria: SearchCriteria::new(),
            lifecycle: SearchLifecycle::new(),
            filter: GuestNumberFilter::new(),
            hotels: Vec::new(),
            holiday_notice: HolidayNotice::None,
            results: None,
        }
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn controls(&self) -> Controls {
        let mut controls = self.lifecycle.controls();
        // Submit waits for a complete form
        if self.lifecycle.state() == LifecycleState::Initial && !self.criteria.is_complete() {
            controls.search_button.enabled = false;
        }
        controls
    }

    pub fn holiday_notice(&self) -> &HolidayNotice {
        &self.holiday_notice
    }

    pub fn results(&self) -> Option<&ResultsView> {
        self.results.as_ref()
    }

    pub fn hotels(&self) -> &[Hotel] {
        &self.hotels
    }

    pub fn filter_stats(&self) -> Option<FilterStats> {
        self.filter.last_stats()
    }

    pub async fn load_hotels(&mut self, force_refresh: bool) -> Result<&[Hotel], ApiError> {
        self.hotels = self.api.get_hotels(force_refresh).await?;
        Ok(&self.hotels)
    }

    fn ensure_inputs_enabled(&self) -> Result<(), SessionError> {
        if self.controls().inputs_enabled() {
            Ok(())
        } else {
            Err(SessionError::InputsLocked)
        }
    }

    pub fn select_hotel(&mut self, value: &str) -> Result<(), SessionError> {
        self.ensure_inputs_enabled()?;
        self.criteria.hotel = HotelSelection::from_value(value);
        Ok(())
    }

    pub fn set_check_in(&mut self, date: Option<NaiveDate>) -> Result<&HolidayNotice, SessionError> {
        self.ensure_inputs_enabled()?;
        self.criteria.check_in = date;
        Ok(self.refresh_holiday_notice())
    }

    pub fn set_check_out(&mut self, date: Option<NaiveDate>) -> Result<&HolidayNotice, SessionError> {
        self.ensure_inputs_enabled()?;
        self.criteria.check_out = date;
        Ok(self.refresh_holiday_notice())
    }

    pub fn set_apply_booking_rules(&mut self, apply: bool) -> Result<(), SessionError> {
        self.ensure_inputs_enabled()?;
        self.criteria.apply_booking_rules = apply;
        Ok(())
    }

    fn refresh_holiday_notice(&mut self) -> &HolidayNotice {
        self.holiday_notice =
            holiday::evaluate_optional(self.criteria.check_in, self.criteria.check_out);
        &self.holiday_notice
    }

    pub fn increment_guests(&mut self) -> Option<FilterStats> {
        self.change_guests(GuestCount::increment)
    }

    pub fn decrement_guests(&mut self) -> Option<FilterStats> {
        self.change_guests(GuestCount::decrement)
    }

    // Guest buttons only act once results are on screen
    fn change_guests(&mut self, change: fn(&mut GuestCount) -> bool) -> Option<FilterStats> {
        if !self.lifecycle.guest_filter_enabled() {
            warn!("guest filter disabled, ignoring guest count change");
            return None;
        }

        if !change(&mut self.criteria.guests) {
            return self.filter.last_stats();
        }
        Some(self.apply_guest_filter())
    }

    fn apply_guest_filter(&mut self) -> FilterStats {
        let guests = self.criteria.guests;
        match self.results.as_mut() {
            Some(view) => {
                let stats = self.filter.apply(view.cards_mut(), guests);
                view.summary.guests = guests.get();
                stats
            }
            None => self.filter.apply(&mut [], guests),
        }
    }

    fn hotel_label(&self, hotel_id: &str) -> String {
        if hotel_id == ALL_HOTELS_ID {
            return "Todos os hotéis".to_string();
        }
        self.hotels
            .iter()
            .find(|h| h.hotel_id == hotel_id)
            .map(|h| h.name.clone())
            .unwrap_or_else(|| hotel_id.to_string())
    }

    /// Runs the search. Validation failures leave the form untouched; once the
    /// request is sent the session always lands in Results, with an error
    /// panel when the API call failed.
    pub async fn submit(&mut self) -> Result<&ResultsView, SessionError> {
        let errors = self.criteria.validate();
        if !errors.is_empty() {
            warn!(?errors, "search form invalid");
            return Err(SessionError::Invalid(errors));
        }
        let query = self
            .criteria
            .to_query()
            .map_err(|e| SessionError::Invalid(vec![e]))?;

        self.lifecycle.begin_search()?;
        let label = self.hotel_label(&query.hotel);
        let guests = self.criteria.guests;

        let outcome = self.api.search_vacancies(&query).await;
        self.lifecycle.complete_search()?;

        let failure = match outcome {
            Ok(response) => {
                self.results = Some(ResultsView::from_response(&response, &query, &label, guests));
                None
            }
            Err(e) => {
                error!(error = %e, "search failed");
                self.results = Some(ResultsView::from_error(&e, &query, &label, guests));
                Some(e)
            }
        };

        let stats = self.apply_guest_filter();
        info!(
            state = ?self.lifecycle.state(),
            visible_hotels = stats.visible_hotels,
            "search finished"
        );

        match (failure, self.results.as_ref()) {
            (Some(e), _) => Err(SessionError::Search(e)),
            (None, Some(view)) => Ok(view),
            (None, None) => Err(SessionError::Search(ApiError::DecodeError(
                "search produced no results".to_string(),
            ))),
        }
    }

    // Back to Initial: dates and hotel stay, guests go back to the default
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.lifecycle.reset()?;
        if let Some(view) = self.results.as_mut() {
            self.filter.reset(view.cards_mut());
        }
        self.results = None;
        self.criteria.guests = GuestCount::default();
        info!("search form reset");
        Ok(())
    }

    pub fn clear_results(&mut self) -> Result<(), SessionError> {
        self.reset()
    }

    pub fn copy_results(&self) -> Option<String> {
        self.results.as_ref().map(ResultsView::to_plain_text)
    }

    pub fn page(&self, number: usize) -> Option<Page<'_>> {
        self.results.as_ref().map(|view| view.page(number))
    }
}
