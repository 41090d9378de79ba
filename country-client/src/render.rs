//! Plain-text rendering for the terminal front end

use common::models::Country;
use std::fmt::Write;

use crate::weather::WeatherSummary;

const UNKNOWN: &str = "-";

fn join_or_unknown(values: &[&str]) -> String {
    if values.is_empty() {
        UNKNOWN.to_string()
    } else {
        values.join(", ")
    }
}

pub fn format_population(population: Option<u64>) -> String {
    match population {
        Some(population) => format!("{:.2} million", population as f64 / 1_000_000.0),
        None => UNKNOWN.to_string(),
    }
}

pub fn format_currencies(country: &Country) -> String {
    let currencies: Vec<String> = country
        .currency_codes()
        .into_iter()
        .map(|code| match country.currency_name(code) {
            Some(name) => format!("{} ({})", name, code),
            None => code.to_string(),
        })
        .collect();

    if currencies.is_empty() {
        UNKNOWN.to_string()
    } else {
        currencies.join(", ")
    }
}

pub fn format_density(population: Option<u64>, area: Option<f64>) -> String {
    match (population, area) {
        (Some(population), Some(area)) if area > 0.0 => {
            format!("{:.1} people/km²", population as f64 / area)
        }
        _ => UNKNOWN.to_string(),
    }
}

/// Size class by area: over 500k km² is large, over 100k km² medium
pub fn size_class(area: f64) -> &'static str {
    if area > 500_000.0 {
        "large"
    } else if area > 100_000.0 {
        "medium"
    } else {
        "small"
    }
}

/// Multi-line country card
pub fn render_country(country: &Country) -> String {
    let mut out = String::new();
    let name = country.common_name().unwrap_or(UNKNOWN);

    match country.official_name() {
        Some(official) if official != name => {
            let _ = writeln!(out, "{} ({})", name, official);
        }
        _ => {
            let _ = writeln!(out, "{}", name);
        }
    }

    let rows = [
        ("Population", format_population(country.population())),
        (
            "Density",
            format_density(country.population(), country.area()),
        ),
        ("Languages", join_or_unknown(&country.languages())),
        ("Capital", country.capital().unwrap_or(UNKNOWN).to_string()),
        ("Currency", format_currencies(country)),
        ("Region", country.region().unwrap_or(UNKNOWN).to_string()),
        (
            "Area",
            country
                .area()
                .map(|area| format!("{:.0} km² ({})", area, size_class(area)))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        ),
        ("Timezones", join_or_unknown(&country.timezones())),
        (
            "Calling code",
            country
                .calling_code()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        ),
        (
            "Driving side",
            country.driving_side().unwrap_or(UNKNOWN).to_string(),
        ),
        ("Domain", join_or_unknown(&country.top_level_domains())),
        ("Borders", join_or_unknown(&country.borders())),
        ("Flag", country.flag_png().unwrap_or(UNKNOWN).to_string()),
    ];

    for (label, value) in rows {
        let _ = writeln!(out, "  {:<13} {}", format!("{}:", label), value);
    }

    out
}

pub fn render_weather(summary: &WeatherSummary) -> String {
    let mut out = String::new();

    let title = match &summary.location {
        Some(location) => format!("Weather in {}", location),
        None => "Weather".to_string(),
    };
    let _ = writeln!(out, "{} {}", summary.symbol(), title);
    let _ = writeln!(
        out,
        "  {:.1}°C, {}",
        summary.temperature, summary.description
    );

    if let Some(feels_like) = summary.feels_like {
        let _ = writeln!(out, "  Feels like {:.1}°C", feels_like);
    }
    if let Some(humidity) = summary.humidity {
        let _ = writeln!(out, "  Humidity {}%", humidity);
    }
    if let Some(wind_speed) = summary.wind_speed {
        let _ = writeln!(out, "  Wind {:.1} m/s", wind_speed);
    }

    out
}

/// One line per country: name, capital, population
pub fn render_country_list(title: &str, countries: &[Country]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", title, countries.len());

    for country in countries {
        let _ = writeln!(
            out,
            "  {:<32} {:<20} {}",
            country.common_name().unwrap_or(UNKNOWN),
            country.capital().unwrap_or(UNKNOWN),
            format_population(country.population())
        );
    }

    out
}
