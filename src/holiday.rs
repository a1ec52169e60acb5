// Holiday package booking rules
//
// Christmas and New Year stays are only sold as complete packages. A date range
// matching a package exactly is accepted; one that overlaps or touches a package
// gets a warning; anything else is unaffected.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackageId {
    Christmas,
    NewYear,
}

#[derive(Debug, PartialEq, Eq)]
pub struct HolidayPackage {
    pub id: PackageId,
    pub name: &'static str,
    // (month, day)
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub nights: u32,
    pub days: u32,
    pub icon: &'static str,
    pub message: &'static str,
    pub warning: &'static str,
}

pub const CHRISTMAS: HolidayPackage = HolidayPackage {
    id: PackageId::Christmas,
    name: "Natal",
    start: (12, 22),
    end: (12, 27),
    nights: 4,
    days: 5,
    icon: "🎄",
    message: "✅ 5 dias / 4 noites - Pacote de Natal completo",
    warning: "⚠ Datas em período de pacote obrigatório - Pacote de Natal: 22 a 27/dez",
};

pub const NEW_YEAR: HolidayPackage = HolidayPackage {
    id: PackageId::NewYear,
    name: "Ano Novo",
    start: (12, 27),
    end: (1, 2),
    nights: 5,
    days: 6,
    icon: "🎆",
    message: "✅ 6 dias / 5 noites - Pacote de Ano Novo completo",
    warning: "⚠ Datas em período de pacote obrigatório - Pacote de Ano Novo: 27/dez a 02/jan",
};

pub const HOLIDAY_PACKAGES: [&HolidayPackage; 2] = [&CHRISTMAS, &NEW_YEAR];

const BOTH_PACKAGES_WARNING: &str =
    "⚠ Datas em período de pacote obrigatório - Natal (22 a 27/dez) ou Ano Novo (27/dez a 02/jan)";

impl HolidayPackage {
    pub fn by_id(id: PackageId) -> &'static HolidayPackage {
        match id {
            PackageId::Christmas => &CHRISTMAS,
            PackageId::NewYear => &NEW_YEAR,
        }
    }

    // Check-in and check-out dates of the package starting in `year`.
    // A package whose end month precedes its start month ends the next year.
    pub fn window(&self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        let end_year = if self.end.0 < self.start.0 {
            year + 1
        } else {
            year
        };
        let start = NaiveDate::from_ymd_opt(year, self.start.0, self.start.1)?;
        let end = NaiveDate::from_ymd_opt(end_year, self.end.0, self.end.1)?;
        Some((start, end))
    }

    pub fn duration(&self) -> String {
        format!("{} dias / {} noites", self.days, self.nights)
    }

    pub fn matches(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.window(check_in.year()) == Some((check_in, check_out))
    }

    // Overlapping nights, or touching the package on a day no other package claims
    fn affects(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        (check_in.year() - 1..=check_out.year()).any(|year| {
            let Some((start, end)) = self.window(year) else {
                return false;
            };
            let overlaps = check_in < end && check_out > start;
            let touches_start = check_out == start && !is_shared_boundary(start);
            let touches_end = check_in == end && !is_shared_boundary(end);
            overlaps || touches_start || touches_end
        })
    }
}

// Dec 27 closes Christmas and opens New Year
fn is_shared_boundary(date: NaiveDate) -> bool {
    let month_day = (date.month(), date.day());
    HOLIDAY_PACKAGES.into_iter().any(|a| {
        HOLIDAY_PACKAGES
            .into_iter()
            .any(|b| a.id != b.id && a.end == month_day && b.start == month_day)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HolidayNotice {
    None,
    Complete(&'static HolidayPackage),
    Partial {
        packages: Vec<PackageId>,
        message: &'static str,
    },
}

impl HolidayNotice {
    pub fn is_valid(&self) -> bool {
        !matches!(self, HolidayNotice::Partial { .. })
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            HolidayNotice::None => None,
            HolidayNotice::Complete(package) => Some(package.message),
            HolidayNotice::Partial { message, .. } => Some(*message),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HolidayNotice::None => "none",
            HolidayNotice::Complete(_) => "complete",
            HolidayNotice::Partial { .. } => "partial",
        }
    }

    pub fn matched_package(&self) -> Option<&'static HolidayPackage> {
        match self {
            HolidayNotice::Complete(package) => Some(*package),
            _ => None,
        }
    }
}

pub fn evaluate(check_in: NaiveDate, check_out: NaiveDate) -> HolidayNotice {
    if check_out <= check_in {
        return HolidayNotice::None;
    }

    if let Some(package) = HOLIDAY_PACKAGES
        .into_iter()
        .find(|p| p.matches(check_in, check_out))
    {
        debug!(package = package.name, "holiday package matched exactly");
        return HolidayNotice::Complete(package);
    }

    let packages: Vec<PackageId> = HOLIDAY_PACKAGES
        .into_iter()
        .filter(|p| p.affects(check_in, check_out))
        .map(|p| p.id)
        .collect();

    let message = match packages.as_slice() {
        [] => return HolidayNotice::None,
        [single] => HolidayPackage::by_id(*single).warning,
        _ => BOTH_PACKAGES_WARNING,
    };

    debug!(?packages, "dates fall in a mandatory package period");
    HolidayNotice::Partial { packages, message }
}

// Form-level entry point: nothing to say until both dates are filled in
pub fn evaluate_optional(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> HolidayNotice {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => evaluate(check_in, check_out),
        _ => HolidayNotice::None,
    }
}
