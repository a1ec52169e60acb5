// Client-side guest capacity filter over rendered hotel cards
//
// Vacancy texts carry their room capacity as "até N pessoas". An entry is
// hidden only when that capacity is known and smaller than the guest count;
// anything unparseable stays visible.

use crate::criteria::GuestCount;
use crate::results::HotelCard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

static CAPACITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)at[eé]\s+(\d+)\s+pessoas?").unwrap());

pub fn parse_capacity(text: &str) -> Option<u32> {
    let captures = CAPACITY_RE.captures_iter(text).last()?;
    let capacity = captures.get(1)?.as_str().parse::<u32>().ok()?;
    (capacity > 0).then_some(capacity)
}

pub fn is_visible_for(capacity: Option<u32>, guests: GuestCount) -> bool {
    capacity.map_or(true, |c| guests.get() <= c)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub guest_count: u32,
    pub total_hotels: usize,
    pub visible_hotels: usize,
    pub hidden_hotels: usize,
    pub visible_vacancies: usize,
    pub hidden_vacancies: usize,
}

impl FilterStats {
    // Shown while the filter hides some, but not all, hotels
    pub fn counter_text(&self) -> Option<String> {
        if self.hidden_hotels == 0 || self.visible_hotels == 0 {
            return None;
        }
        let guests = GuestCount::new(self.guest_count);
        Some(format!(
            "Mostrando {} de {} hotéis para {} {}",
            self.visible_hotels,
            self.total_hotels,
            guests.get(),
            guests.label()
        ))
    }

    // Only when there were cards to begin with and the filter hid all of them
    pub fn no_results_message(&self) -> Option<String> {
        if self.total_hotels > 0 && self.visible_hotels == 0 {
            let guests = GuestCount::new(self.guest_count);
            Some(format!(
                "Sem vagas disponíveis para {} {}. Tente reduzir o número de hóspedes.",
                guests.get(),
                guests.label()
            ))
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct GuestNumberFilter {
    last: Option<FilterStats>,
}

impl GuestNumberFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, cards: &mut [HotelCard], guests: GuestCount) -> FilterStats {
        let mut stats = FilterStats {
            guest_count: guests.get(),
            total_hotels: cards.len(),
            ..FilterStats::default()
        };

        for card in cards.iter_mut() {
            for vacancy in card.vacancies.iter_mut() {
                vacancy.visible = is_visible_for(vacancy.capacity, guests);
                if vacancy.capacity.is_none() {
                    debug!(text = %vacancy.text, "no capacity found, keeping entry visible");
                }
            }

            let visible = card.visible_count();
            card.visible = visible > 0;
            stats.visible_vacancies += visible;
            stats.hidden_vacancies += card.vacancies.len() - visible;
            if card.visible {
                stats.visible_hotels += 1;
            } else {
                stats.hidden_hotels += 1;
            }
        }

        info!(
            guests = stats.guest_count,
            visible_hotels = stats.visible_hotels,
            total_hotels = stats.total_hotels,
            hidden_vacancies = stats.hidden_vacancies,
            "guest filter applied"
        );
        self.last = Some(stats);
        stats
    }

    // Shows everything again
    pub fn reset(&mut self, cards: &mut [HotelCard]) {
        for card in cards.iter_mut() {
            card.visible = true;
            for vacancy in card.vacancies.iter_mut() {
                vacancy.visible = true;
            }
        }
        self.last = None;
        debug!("guest filter reset");
    }

    pub fn last_stats(&self) -> Option<FilterStats> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn cards() -> Vec<HotelCard> {
        vec![
            HotelCard::new(
                "Amparo",
                &[
                    "COQUEIROS (até 3 pessoas)10/06 - 12/06".to_string(),
                    "JAZZ Luxo (até 2 pessoas)10/06 - 12/06".to_string(),
                ],
            ),
            HotelCard::new(
                "Appenzell",
                &["FURNAS STANDARD (até 2 pessoas)10/06 - 12/06".to_string()],
            ),
            HotelCard::new(
                "Areado",
                &["CHALÉ FAMÍLIA (ATE 6 PESSOAS)".to_string()],
            ),
        ]
    }

    #[test_case("COQUEIROS (até 3 pessoas)10/06", Some(3))]
    #[test_case("Suite (ATÉ 4 PESSOAS)", Some(4))]
    #[test_case("Chalé (ate 5 pessoas)", Some(5))]
    #[test_case("Quarto individual (até 1 pessoa)", Some(1))]
    #[test_case("Quarto  até   12  pessoas", Some(12))]
    #[test_case("Quarto (até 0 pessoas)", None; "zero capacity is unknown")]
    #[test_case("Apartamento duplo", None)]
    #[test_case("até pessoas", None)]
    fn test_parse_capacity(text: &str, expected: Option<u32>) {
        assert_eq!(parse_capacity(text), expected);
    }

    #[test]
    fn test_hides_entries_below_guest_count() {
        let mut cards = cards();
        let mut filter = GuestNumberFilter::new();
        let stats = filter.apply(&mut cards, GuestCount::new(3));

        assert!(cards[0].vacancies[0].visible);
        assert!(!cards[0].vacancies[1].visible);
        assert!(cards[0].visible);
        assert_eq!(cards[0].badge(), "1 vaga");
        assert!(!cards[1].visible);
        assert!(cards[2].visible);

        assert_eq!(stats.visible_hotels, 2);
        assert_eq!(stats.total_hotels, 3);
        assert_eq!(stats.hidden_hotels, 1);
        assert_eq!(stats.hidden_vacancies, 2);
        assert_eq!(
            stats.counter_text().as_deref(),
            Some("Mostrando 2 de 3 hotéis para 3 hóspedes")
        );
        assert_eq!(stats.no_results_message(), None);
    }

    #[test]
    fn test_visibility_matches_capacity_for_every_guest_count() {
        let mut filter = GuestNumberFilter::new();
        for guests in 1..=10 {
            let mut cards = cards();
            filter.apply(&mut cards, GuestCount::new(guests));
            for card in &cards {
                for vacancy in &card.vacancies {
                    let expected = vacancy.capacity.map_or(true, |c| guests <= c);
                    assert_eq!(vacancy.visible, expected, "{} for {}", vacancy.text, guests);
                }
                assert_eq!(card.visible, card.visible_count() > 0);
            }
        }
    }

    #[test]
    fn test_unparseable_entries_stay_visible() {
        let mut cards = vec![HotelCard::new("Avaré", &["Apartamento sem descrição".to_string()])];
        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(10));
        assert!(cards[0].visible);
        assert_eq!(stats.visible_vacancies, 1);
    }

    #[test]
    fn test_no_results_message_when_everything_hidden() {
        let mut cards = cards();
        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(7));
        assert_eq!(stats.visible_hotels, 0);
        assert_eq!(
            stats.no_results_message().unwrap(),
            "Sem vagas disponíveis para 7 hóspedes. Tente reduzir o número de hóspedes."
        );
    }

    #[test]
    fn test_counter_only_when_some_hotels_hidden() {
        let mut cards = cards();
        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(1));
        assert_eq!(stats.hidden_hotels, 0);
        assert_eq!(stats.counter_text(), None);

        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(7));
        assert_eq!(stats.counter_text(), None);
    }

    #[test]
    fn test_counter_uses_singular_guest_label() {
        let mut cards = vec![
            HotelCard::new("Amparo", &["SUÍTE (até 1 pessoa)".to_string()]),
            HotelCard::new("Areado", &["DUPLO (até 2 pessoas)".to_string()]),
        ];
        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(1));
        assert_eq!(stats.counter_text(), None);

        cards[0].vacancies[0].capacity = None;
        cards[1].vacancies[0].capacity = Some(0);
        let stats = GuestNumberFilter::new().apply(&mut cards, GuestCount::new(1));
        assert_eq!(stats.visible_hotels, 1);
        assert_eq!(
            stats.counter_text().as_deref(),
            Some("Mostrando 1 de 2 hotéis para 1 hóspede")
        );
    }

    #[test]
    fn test_reset_shows_everything() {
        let mut cards = cards();
        let mut filter = GuestNumberFilter::new();
        filter.apply(&mut cards, GuestCount::new(10));
        assert!(filter.last_stats().is_some());

        filter.reset(&mut cards);
        assert!(cards.iter().all(|c| c.visible && c.vacancies.iter().all(|v| v.visible)));
        assert!(filter.last_stats().is_none());
    }

    #[test]
    fn test_empty_results_have_no_message() {
        let stats = GuestNumberFilter::new().apply(&mut [], GuestCount::default());
        assert_eq!(stats.total_hotels, 0);
        assert_eq!(stats.no_results_message(), None);
    }
}
