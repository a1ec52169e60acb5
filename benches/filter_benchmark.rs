use bytes::Bytes;
use chrono::{Duration as DateDuration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use monitora_vagas::cache::SearchResponseCache;
use monitora_vagas::criteria::{GuestCount, SearchQuery};
use monitora_vagas::guest_filter::{parse_capacity, GuestNumberFilter};
use monitora_vagas::holiday;
use monitora_vagas::results::HotelCard;
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::time::Duration;

const ROOM_TYPES: [&str; 5] = [
    "COQUEIROS (até 3 pessoas)",
    "JAZZ Luxo (até 2 pessoas)",
    "CHALÉ FAMÍLIA (ATÉ 6 PESSOAS)",
    "SUÍTE MASTER (até 4 pessoas)",
    "Apartamento sem descrição",
];

fn random_cards(hotels: usize, per_hotel: usize) -> Vec<HotelCard> {
    let mut rng = thread_rng();
    (0..hotels)
        .map(|i| {
            let texts: Vec<String> = (0..per_hotel)
                .map(|_| {
                    let room = ROOM_TYPES.choose(&mut rng).unwrap_or(&ROOM_TYPES[0]);
                    format!("{}10/06 - 12/06 (2 dias livres) - {} Quarto(s)", room, rng.gen_range(1..5))
                })
                .collect();
            HotelCard::new(&format!("Hotel {}", i), &texts)
        })
        .collect()
}

pub fn guest_filter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("guest_filter");

    group.bench_function("parse_capacity", |b| {
        b.iter(|| {
            for room in ROOM_TYPES {
                black_box(parse_capacity(black_box(room)));
            }
        })
    });

    for hotels in [5, 25, 100].iter() {
        let cards = random_cards(*hotels, 8);
        group.bench_with_input(BenchmarkId::from_parameter(hotels), &cards, |b, cards| {
            let mut filter = GuestNumberFilter::new();
            let mut cards = cards.clone();
            b.iter(|| {
                for guests in 1..=10 {
                    black_box(filter.apply(&mut cards, GuestCount::new(guests)));
                }
            })
        });
    }

    group.finish();
}

pub fn holiday_benchmark(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap_or_default();
    let ranges: Vec<(NaiveDate, NaiveDate)> = (0..90)
        .map(|offset| {
            let check_in = start + DateDuration::days(offset);
            (check_in, check_in + DateDuration::days(offset % 7 + 1))
        })
        .collect();

    c.bench_function("holiday_evaluate", |b| {
        b.iter(|| {
            for (check_in, check_out) in &ranges {
                black_box(holiday::evaluate(*check_in, *check_out));
            }
        })
    });
}

pub fn response_cache_benchmark(c: &mut Criterion) {
    let cache = SearchResponseCache::new(100, Duration::from_secs(300));
    let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default();
    let queries: Vec<SearchQuery> = (0..200)
        .map(|i| SearchQuery {
            hotel: format!("hotel{}", i % 20),
            check_in: start + DateDuration::days(i % 30),
            check_out: start + DateDuration::days(i % 30 + 2),
            apply_booking_rules: true,
        })
        .collect();
    let body = Bytes::from(vec![b'x'; 4096]);

    c.bench_function("response_cache_mixed", |b| {
        let mut rng = thread_rng();
        b.iter(|| {
            for _ in 0..100 {
                let Some(query) = queries.choose(&mut rng) else {
                    continue;
                };
                if rng.gen_bool(0.8) {
                    black_box(cache.get(query));
                } else {
                    cache.store(query, body.clone(), None);
                }
            }
        })
    });
}

criterion_group!(
    benches,
    guest_filter_benchmark,
    holiday_benchmark,
    response_cache_benchmark
);
criterion_main!(benches);
