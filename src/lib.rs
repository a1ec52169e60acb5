// Hotel vacancy search client for the busca_vagas API

pub mod api;
pub mod cache;
pub mod config;
pub mod criteria;
pub mod guest_filter;
pub mod holiday;
pub mod lifecycle;
pub mod results;
pub mod search;

// Re-export key types for convenience
pub use api::{ApiError, BuscaVagasClient, Hotel, SearchResponse, VacancyApi, WeekendSearchData};
pub use cache::{CacheStatsReport, HotelListCache, SearchResponseCache};
pub use config::{AppConfig, ConfigError, Environment};
pub use criteria::{CriteriaError, GuestCount, HotelSelection, SearchCriteria, SearchQuery};
pub use guest_filter::{FilterStats, GuestNumberFilter};
pub use holiday::{HolidayNotice, HolidayPackage, PackageId};
pub use lifecycle::{Controls, LifecycleState, SearchLifecycle, TransitionError};
pub use results::{HotelCard, ResultsView, VacancyEntry};
pub use search::{SearchSession, SessionError};
