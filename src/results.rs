// Presentation model for search results: hotel cards, holiday banner,
// error panel, pagination and the plain-text export

use crate::api::{ApiError, HolidayPackageInfo, SearchResponse};
use crate::config::RESULTS_PER_PAGE;
use crate::criteria::{GuestCount, SearchQuery};
use crate::guest_filter::parse_capacity;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacancyEntry {
    pub hotel_name: String,
    pub text: String,
    // None when the text carries no "até N pessoas"; such entries never get hidden
    pub capacity: Option<u32>,
    pub visible: bool,
}

impl VacancyEntry {
    pub fn new(hotel_name: &str, text: &str) -> Self {
        Self {
            hotel_name: hotel_name.to_string(),
            text: text.to_string(),
            capacity: parse_capacity(text),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelCard {
    pub hotel_name: String,
    pub vacancies: Vec<VacancyEntry>,
    pub visible: bool,
}

impl HotelCard {
    pub fn new(hotel_name: &str, texts: &[String]) -> Self {
        Self {
            hotel_name: hotel_name.to_string(),
            vacancies: texts
                .iter()
                .map(|text| VacancyEntry::new(hotel_name, text))
                .collect(),
            visible: true,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.vacancies.iter().filter(|v| v.visible).count()
    }

    pub fn badge(&self) -> String {
        vacancy_badge(self.visible_count())
    }

    pub fn visible_vacancies(&self) -> impl Iterator<Item = &VacancyEntry> {
        self.vacancies.iter().filter(|v| v.visible)
    }
}

pub fn vacancy_badge(count: usize) -> String {
    if count == 1 {
        "1 vaga".to_string()
    } else {
        format!("{} vagas", count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolidayBanner {
    pub icon: &'static str,
    pub title: String,
    pub description: String,
}

impl HolidayBanner {
    pub fn from_package(info: &HolidayPackageInfo) -> Self {
        let icon = match info.package_type.as_str() {
            "CHRISTMAS" => "🎄",
            "NEW_YEAR" => "🎆",
            _ => "🎉",
        };
        Self {
            icon,
            title: format!("Pacote {}", info.name),
            description: format!("{} - Período obrigatório de reserva", info.duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPanel {
    pub icon: &'static str,
    pub title: String,
    pub message: String,
    pub hint: Option<&'static str>,
}

impl ErrorPanel {
    pub fn from_error(error: &ApiError) -> Self {
        match error {
            ApiError::BookingRule { code, message } => Self {
                icon: "📋",
                title: "Regra de Reserva".to_string(),
                message: format!("{} ({})", message, code),
                hint: Some("Ajuste as datas ou desative as regras de reserva"),
            },
            ApiError::NetworkError(_) => Self {
                icon: "❌",
                title: "Erro na Busca".to_string(),
                message: error.to_string(),
                hint: Some(
                    "Não foi possível conectar à API. Verifique sua conexão ou se o servidor permite acesso (CORS)",
                ),
            },
            ApiError::Timeout(_) => Self {
                icon: "❌",
                title: "Erro na Busca".to_string(),
                message: error.to_string(),
                hint: Some("A busca demorou demais. Tente novamente em alguns instantes"),
            },
            _ => Self {
                icon: "❌",
                title: "Erro na Busca".to_string(),
                message: error.to_string(),
                hint: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSummary {
    pub hotel: String,
    pub check_in: String,
    pub check_out: String,
    pub nights: i64,
    pub guests: u32,
    pub apply_booking_rules: bool,
}

impl SearchSummary {
    pub fn new(query: &SearchQuery, hotel_label: &str, guests: GuestCount) -> Self {
        Self {
            hotel: hotel_label.to_string(),
            check_in: query.check_in.format("%d/%m/%Y").to_string(),
            check_out: query.check_out.format("%d/%m/%Y").to_string(),
            nights: query.nights(),
            guests: guests.get(),
            apply_booking_rules: query.apply_booking_rules,
        }
    }

    pub fn line(&self) -> String {
        let nights = if self.nights == 1 { "noite" } else { "noites" };
        let guests = GuestCount::new(self.guests);
        let mut line = format!(
            "{} | {} a {} ({} {}) | {} {}",
            self.hotel,
            self.check_in,
            self.check_out,
            self.nights,
            nights,
            guests.get(),
            guests.label()
        );
        if !self.apply_booking_rules {
            line.push_str(" | regras de reserva desativadas");
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResultsBody {
    Cards(Vec<HotelCard>),
    Empty { message: String },
    Error(ErrorPanel),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub summary: SearchSummary,
    pub banner: Option<HolidayBanner>,
    pub status: Option<String>,
    pub body: ResultsBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub cards: Vec<&'a HotelCard>,
}

impl ResultsView {
    pub fn from_response(
        response: &SearchResponse,
        query: &SearchQuery,
        hotel_label: &str,
        guests: GuestCount,
    ) -> Self {
        let result = &response.data.result;
        let cards: Vec<HotelCard> = result
            .grouped_vacancies()
            .iter()
            .filter(|(_, texts)| !texts.is_empty())
            .map(|(hotel, texts)| HotelCard::new(hotel, texts))
            .collect();

        let body = if response.data.has_availability && !cards.is_empty() {
            ResultsBody::Cards(cards)
        } else {
            ResultsBody::Empty {
                message: "Nenhuma vaga disponível para o período selecionado".to_string(),
            }
        };

        Self {
            summary: SearchSummary::new(query, hotel_label, guests),
            banner: response
                .holiday_package
                .as_ref()
                .map(HolidayBanner::from_package),
            status: result.status.clone(),
            body,
        }
    }

    pub fn from_error(
        error: &ApiError,
        query: &SearchQuery,
        hotel_label: &str,
        guests: GuestCount,
    ) -> Self {
        Self {
            summary: SearchSummary::new(query, hotel_label, guests),
            banner: None,
            status: None,
            body: ResultsBody::Error(ErrorPanel::from_error(error)),
        }
    }

    pub fn cards(&self) -> &[HotelCard] {
        match &self.body {
            ResultsBody::Cards(cards) => cards,
            _ => &[],
        }
    }

    pub fn cards_mut(&mut self) -> &mut [HotelCard] {
        match &mut self.body {
            ResultsBody::Cards(cards) => cards,
            _ => &mut [],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ResultsBody::Error(_))
    }

    // Pages count only cards the guest filter left visible. Page numbers start at 1
    // and out-of-range requests are clamped.
    pub fn page(&self, number: usize) -> Page<'_> {
        let visible: Vec<&HotelCard> = self.cards().iter().filter(|c| c.visible).collect();
        let total_pages = visible.len().div_ceil(RESULTS_PER_PAGE).max(1);
        let number = number.clamp(1, total_pages);

        let cards = visible
            .into_iter()
            .skip((number - 1) * RESULTS_PER_PAGE)
            .take(RESULTS_PER_PAGE)
            .collect();

        Page {
            number,
            total_pages,
            cards,
        }
    }

    /// Plain-text rendering of what is currently visible, for the clipboard.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Resultados da busca");
        let _ = writeln!(out, "{}", self.summary.line());
        if let Some(banner) = &self.banner {
            let _ = writeln!(out, "{} {} - {}", banner.icon, banner.title, banner.description);
        }
        out.push('\n');

        match &self.body {
            ResultsBody::Cards(cards) => {
                for card in cards.iter().filter(|c| c.visible) {
                    let _ = writeln!(out, "🏨 {} ({})", card.hotel_name, card.badge());
                    for (i, vacancy) in card.visible_vacancies().enumerate() {
                        let _ = writeln!(out, "  {}. {}", i + 1, vacancy.text);
                    }
                    out.push('\n');
                }
            }
            ResultsBody::Empty { message } => {
                let _ = writeln!(out, "{}", message);
            }
            ResultsBody::Error(panel) => {
                let _ = writeln!(out, "{} {}: {}", panel.icon, panel.title, panel.message);
            }
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_server::sample_search_response;
    use crate::api::decode;
    use crate::criteria::parse_iso_date;
    use serde_json::json;

    fn query() -> SearchQuery {
        SearchQuery {
            hotel: "-1".to_string(),
            check_in: parse_iso_date("2025-06-10").unwrap(),
            check_out: parse_iso_date("2025-06-12").unwrap(),
            apply_booking_rules: true,
        }
    }

    fn view() -> ResultsView {
        ResultsView::from_response(
            &sample_search_response(),
            &query(),
            "Todas",
            GuestCount::default(),
        )
    }

    #[test]
    fn test_cards_follow_hotel_group_order() {
        let view = view();
        let names: Vec<&str> = view.cards().iter().map(|c| c.hotel_name.as_str()).collect();
        assert_eq!(names, vec!["Amparo", "Appenzell"]);
        assert_eq!(view.cards()[0].badge(), "2 vagas");
        assert_eq!(view.cards()[1].badge(), "1 vaga");
        assert_eq!(view.cards()[0].vacancies[0].capacity, Some(3));
        assert_eq!(view.status.as_deref(), Some("AVAILABLE"));
    }

    #[test]
    fn test_no_availability_renders_empty_state() {
        let response: SearchResponse = decode(json!({
            "success": true,
            "data": { "success": true, "hasAvailability": false,
                      "result": { "status": "NO AVAILABILITY", "vacancies": [], "hotelGroups": {} } }
        }))
        .unwrap();
        let view = ResultsView::from_response(&response, &query(), "Todas", GuestCount::default());
        assert!(matches!(view.body, ResultsBody::Empty { .. }));
        assert!(view.cards().is_empty());
    }

    #[test]
    fn test_holiday_banner() {
        let mut response = sample_search_response();
        response.holiday_package = Some(HolidayPackageInfo {
            package_type: "CHRISTMAS".to_string(),
            name: "Natal".to_string(),
            duration: "5 dias / 4 noites".to_string(),
        });
        let view = ResultsView::from_response(&response, &query(), "Todas", GuestCount::default());
        let banner = view.banner.unwrap();
        assert_eq!(banner.icon, "🎄");
        assert_eq!(banner.title, "Pacote Natal");
    }

    #[test]
    fn test_error_panels() {
        let panel = ErrorPanel::from_error(&ApiError::Api("Invalid date format".into()));
        assert_eq!(panel.title, "Erro na Busca");
        assert_eq!(panel.message, "Invalid date format");

        let panel = ErrorPanel::from_error(&ApiError::BookingRule {
            code: "WEEKEND_ONLY".into(),
            message: "Apenas fins de semana".into(),
        });
        assert_eq!(panel.title, "Regra de Reserva");

        let panel = ErrorPanel::from_error(&ApiError::NetworkError("refused".into()));
        assert!(panel.hint.unwrap().contains("CORS"));
    }

    #[test]
    fn test_summary_line() {
        let summary = SearchSummary::new(&query(), "Todas", GuestCount::new(1));
        assert_eq!(summary.line(), "Todas | 10/06/2025 a 12/06/2025 (2 noites) | 1 hóspede");
    }

    #[test]
    fn test_pagination_counts_visible_cards() {
        let groups: serde_json::Map<String, serde_json::Value> = (0..25)
            .map(|i| (format!("Hotel {:02}", i), json!(["QUARTO (até 2 pessoas)"])))
            .collect();
        let response: SearchResponse = decode(json!({
            "success": true,
            "data": { "hasAvailability": true, "result": { "hotelGroups": groups } }
        }))
        .unwrap();
        let mut view = ResultsView::from_response(&response, &query(), "Todas", GuestCount::default());

        let page = view.page(3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.cards.len(), 5);
        assert_eq!(page.cards[0].hotel_name, "Hotel 20");

        for card in view.cards_mut().iter_mut().take(20) {
            card.visible = false;
        }
        let page = view.page(3);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.number, 1);
        assert_eq!(page.cards.len(), 5);
    }

    #[test]
    fn test_plain_text_skips_hidden_entries() {
        let mut view = view();
        view.cards_mut()[0].vacancies[0].visible = false;
        view.cards_mut()[1].visible = false;

        let text = view.to_plain_text();
        assert!(text.starts_with("Resultados da busca\nTodas | 10/06/2025"));
        assert!(text.contains("🏨 Amparo (1 vaga)"));
        assert!(text.contains("  1. JAZZ Luxo"));
        assert!(!text.contains("COQUEIROS"));
        assert!(!text.contains("Appenzell"));
    }
}
